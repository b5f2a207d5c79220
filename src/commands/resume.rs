//! Implements the `/resume` command.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::notice::Notice;
use crate::lib::notice::Tone;
use crate::BotError;
use crate::Context;

/// Resume the paused track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), BotError> {
    let guild = ctx.require_guild()?;
    let track = ctx.music().resume(guild).await?;

    let notice = Notice::builder()
        .title("▶️ Resume")
        .description(format!("Resuming: {}", track.display_title()))
        .tone(Tone::Success)
        .maybe_thumbnail(track.thumbnail_url)
        .build();

    ctx.send(notice.reply()).await?;
    Ok(())
}
