//! Implements the `/stop` command.
//!
//! This stops playback and disconnects the bot from the current voice channel.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::notice::Notice;
use crate::lib::notice::Tone;
use crate::BotError;
use crate::Context;

/// Stop playing and leave the voice channel.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.require_guild()?;
    ctx.music().stop(guild).await?;

    let notice = Notice::builder()
        .title("⏹️ Stop")
        .description("Music player stopped and disconnected.")
        .tone(Tone::Stop)
        .build();

    ctx.send(notice.reply()).await?;
    Ok(())
}
