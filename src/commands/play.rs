//! Implements the `/play` command.
//!
//! Joins the author's voice channel and plays the first match for the query,
//! replacing whatever was playing.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::notice::Notice;
use crate::lib::notice::Tone;
use crate::lib::voice;
use crate::BotError;
use crate::Context;

/// Plays from the given link or searches youtube for the query.
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Link or search terms"]
    #[rest]
    query: String,
) -> Result<(), BotError> {
    let guild = ctx.require_guild()?;
    let channel = voice::author_channel(&ctx)?;

    // Extraction can take a while.
    ctx.defer_or_broadcast().await?;
    let track = ctx.music().play(guild, channel, &query).await?;

    let link = track.source_url.as_deref().unwrap_or(&query);
    let notice = Notice::builder()
        .title("🎵 Now playing:")
        .description(format!("[{}]({link})", track.display_title()))
        .tone(Tone::Success)
        .maybe_thumbnail(track.thumbnail_url.clone())
        .maybe_image(track.thumbnail_url.clone())
        .footer(format!("Requested by {}", ctx.author().name))
        .build();

    ctx.send(notice.reply()).await?;
    Ok(())
}
