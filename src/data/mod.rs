//! This module contains everything relating to [Data].

mod track_metadata;

use std::collections::HashSet;

use serenity::GuildId;
use serenity::UserId;

use crate::error::UserError;
use crate::lib::controller::Controller;
use crate::lib::resolver::StreamResolver;
use crate::lib::voice::SongbirdVoice;
use crate::serenity;
use crate::Context;
pub use track_metadata::TrackMetadata;

/// The controller type the bot runs with.
pub type MusicController = Controller<SongbirdVoice, StreamResolver>;

/// The data kept between shards
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Playback for every guild.
    pub music: MusicController,
}

/// Shortcuts for commands.
pub trait GetData {
    /// The guild the command was used in. Errors if not in a guild.
    fn require_guild(&self) -> Result<GuildId, UserError>;
    /// Returns the [MusicController].
    fn music(&self) -> &MusicController;
}

impl GetData for Context<'_> {
    fn require_guild(&self) -> Result<GuildId, UserError> {
        self.guild_id().ok_or(UserError::GuildOnly)
    }

    fn music(&self) -> &MusicController {
        &self.data().music
    }
}
