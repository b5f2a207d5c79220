//! Manages voice connections through [songbird].
//!
//! The playback controller only talks to [VoiceGateway] and [Player], so it can be
//! driven without a live Discord connection.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::GuildId;
use songbird::input::Input;
use songbird::tracks::PlayMode;
use songbird::tracks::Track;
use songbird::tracks::TrackHandle;
use tracing::instrument;

use super::events;
use crate::error::UserError;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Convenience type alias for [songbird::Songbird].
type Manager = Arc<songbird::Songbird>;

/// What a track is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
    /// Ended, stopped, errored, or never started.
    Stopped,
}

impl PlayState {
    /// Whether the connection is in use (playing or paused).
    pub fn is_active(self) -> bool {
        matches!(self, PlayState::Playing | PlayState::Paused)
    }
}

/// Control over a single playing track.
#[async_trait]
pub trait Player: Clone + Send + Sync + 'static {
    async fn state(&self) -> PlayState;
    fn pause(&self) -> Result<(), BotError>;
    fn resume(&self) -> Result<(), BotError>;
    /// Set the volume multiplier, where `1.0` is unchanged.
    fn set_volume(&self, volume: f32) -> Result<(), BotError>;
}

/// Voice connections, one per guild at most.
#[async_trait]
pub trait VoiceGateway: Send + Sync + 'static {
    /// What can be played.
    type Source: Send + 'static;
    type Player: Player;

    /// The channel the bot is connected to in `guild`, if any.
    async fn channel(&self, guild: GuildId) -> Option<ChannelId>;
    /// Connect to `channel`, moving there if already connected elsewhere in `guild`.
    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<(), BotError>;
    /// Leave the voice channel in `guild`, halting playback.
    async fn disconnect(&self, guild: GuildId) -> Result<(), BotError>;
    /// Play `source` at `volume`, replacing whatever was playing.
    async fn play(
        &self,
        guild: GuildId,
        source: Self::Source,
        volume: f32,
    ) -> Result<Self::Player, BotError>;
}

/// The real [VoiceGateway], backed by the [songbird] manager.
#[derive(Clone)]
pub struct SongbirdVoice {
    manager: Manager,
}

impl SongbirdVoice {
    pub fn new(manager: Manager) -> Self {
        Self { manager }
    }

    /// Get the [Manager] from [serenity::Context]
    pub async fn from_serenity(ctx: &serenity::Context) -> Result<Self, BotError> {
        songbird::get(ctx)
            .await
            .map(Self::new)
            .ok_or(BotError::MissingFromSetup {
                reason: "Expecting songbird manager.".to_string(),
            })
    }
}

#[async_trait]
impl VoiceGateway for SongbirdVoice {
    type Source = Input;
    type Player = TrackHandle;

    async fn channel(&self, guild: GuildId) -> Option<ChannelId> {
        let call = self.manager.get(guild)?;
        let channel = call.lock().await.current_channel();
        // Convert songbird::ChannelId -> NonZeroU64 -> serenity::ChannelId
        channel.map(|c| ChannelId::from(c.0))
    }

    #[instrument(skip(self))]
    async fn join(&self, guild: GuildId, channel: ChannelId) -> Result<(), BotError> {
        // Events are registered once per call.
        let is_new = self.manager.get(guild).is_none();

        let call = self
            .manager
            .join(guild, channel)
            .await
            .map_err(|e| UserError::ConnectionError {
                reason: e.to_string(),
            })?;

        if is_new {
            events::register_global_events(&call).await;
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn disconnect(&self, guild: GuildId) -> Result<(), BotError> {
        self.manager.remove(guild).await?;
        Ok(())
    }

    #[instrument(skip(self, source))]
    async fn play(&self, guild: GuildId, source: Input, volume: f32) -> Result<TrackHandle, BotError> {
        let call = self.manager.get(guild).ok_or(UserError::NotConnected)?;

        let handle = {
            let mut call = call.lock().await;
            call.play_only(Track::new(source).volume(volume))
        };

        events::register_track_events(&handle)?;
        Ok(handle)
    }
}

#[async_trait]
impl Player for TrackHandle {
    async fn state(&self) -> PlayState {
        match self.get_info().await {
            Ok(info) => match info.playing {
                PlayMode::Play => PlayState::Playing,
                PlayMode::Pause => PlayState::Paused,
                _ => PlayState::Stopped,
            },
            // The driver drops finished tracks, so a dead handle means stopped.
            Err(_) => PlayState::Stopped,
        }
    }

    fn pause(&self) -> Result<(), BotError> {
        TrackHandle::pause(self)?;
        Ok(())
    }

    fn resume(&self) -> Result<(), BotError> {
        TrackHandle::play(self)?;
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), BotError> {
        TrackHandle::set_volume(self, volume)?;
        Ok(())
    }
}

/// The voice channel the command's author is sitting in, if any.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id()))]
pub fn author_channel(ctx: &Context<'_>) -> Result<Option<ChannelId>, BotError> {
    let guild = ctx.guild().ok_or(UserError::GuildOnly)?;
    let channel = guild
        .voice_states
        .get(&ctx.author().id)
        .and_then(|vs| vs.channel_id);
    Ok(channel)
}
