//! Builds the client, framework and shared data from a [Config].

mod config;
mod framework;

use songbird::SerenityInit;

use crate::serenity;
use crate::BotError;

pub use config::Config;

/// Constructs a [serenity::Client] with [songbird] registered.
pub(super) async fn client(config: Config) -> Result<serenity::Client, BotError> {
    // Get discord token from config file
    let token = config.token()?.to_string();

    // Prefix commands need to read messages.
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config))
        .register_songbird()
        .await?;

    Ok(client)
}
