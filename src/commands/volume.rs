//! Implements the `/volume` command.

use tracing::instrument;

use crate::data::GetData;
use crate::lib::notice::Notice;
use crate::lib::notice::Tone;
use crate::BotError;
use crate::Context;

/// Change the volume of the current track (1 to 100).
#[instrument(skip(ctx))]
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent"] level: i64,
) -> Result<(), BotError> {
    let guild = ctx.require_guild()?;
    ctx.music().volume(guild, level).await?;

    let thumbnail = ctx
        .music()
        .current(guild)
        .await
        .and_then(|track| track.thumbnail_url);

    let notice = Notice::builder()
        .title("🔊 Volume")
        .description(format!("Volume set on {level}%"))
        .tone(Tone::Volume)
        .maybe_thumbnail(thumbnail)
        .build();

    ctx.send(notice.reply()).await?;
    Ok(())
}
