//! Implements the `/pause` command.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::notice::Notice;
use crate::lib::notice::Tone;
use crate::BotError;
use crate::Context;

/// Pause the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.require_guild()?;
    let track = ctx.music().pause(guild).await?;

    let notice = Notice::builder()
        .title("⏸️ Paused")
        .description(format!("Pause: {}", track.display_title()))
        .tone(Tone::Pause)
        .maybe_thumbnail(track.thumbnail_url)
        .build();

    ctx.send(notice.reply()).await?;
    Ok(())
}
