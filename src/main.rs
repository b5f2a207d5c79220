//! A Discord music player: streams audio resolved by yt-dlp into voice channels.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod setup;

pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::BotError;
pub use setup::Config;

/// Convenient type alias for [poise::Context].
pub type Context<'a> = poise::Context<'a, Data, BotError>;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    let config = Config::read()?;

    // Keep the guard alive so buffered file logs get flushed on exit.
    let _guard = log::install_tracing(&config);

    let mut client = setup::client(config).await?;
    client.start().await?;

    Ok(())
}
