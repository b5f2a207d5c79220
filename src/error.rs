//! Error types.
//!
//! [UserError]s are expected and shown to the user as a red notice.
//! Everything else in [BotError] is unexpected and gets logged as an error.

use std::time::Duration;

use songbird::error::JoinError;
use songbird::tracks::ControlError;

use crate::serenity;

/// The error type used throughout the bot and by [poise].
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Voice connection error: {0}")]
    Join(#[from] JoinError),

    #[error("Track control error: {0}")]
    Control(#[from] ControlError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("A command check failed{}", .reason.as_ref().map_or(String::new(), |r| format!(": {r}")))]
    CheckFailed { reason: Option<String> },

    #[error("Command panicked{}", .payload.as_ref().map_or(String::new(), |p| format!(": {p}")))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },

    #[error("Missing from setup: {reason}")]
    MissingFromSetup { reason: String },
}

/// Errors caused by (or explained to) the user invoking a command.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("You're not connected to a voice channel!")]
    NotInVoiceChannel,

    #[error("Failed to connect: {reason}")]
    ConnectionError { reason: String },

    #[error("Couldn't load that: {reason}")]
    ExtractionError { reason: String },

    #[error("I'm not playing anything! :triumph:")]
    NotPlaying,

    #[error("Nothing is playing!")]
    NothingPlaying,

    #[error("Music player isn't paused!")]
    NotPaused,

    #[error("I'm not in a voice channel!")]
    NotConnected,

    #[error("Enter a value between 1 and 100! (got {level})")]
    InvalidVolume { level: i64 },

    #[error("Give me a link or something to search for.")]
    EmptyQuery,

    #[error("A newer request replaced this one.")]
    Superseded,

    #[error("Operation failed: {reason}")]
    OperationFailed { reason: String },

    #[error("This command requires a subcommand: {subcmds}")]
    MissingSubcommand { subcmds: String },

    #[error("Couldn't understand the arguments{}", .input.as_ref().map_or(String::new(), |i| format!(" '{i}'")))]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {} seconds.", .remaining_cooldown.as_secs())]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I'm missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You're missing permissions{}", .missing_permissions.as_ref().map_or(String::new(), |p| format!(": {p}")))]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },

    #[error("Only the bot owner can do that.")]
    NotOwner,

    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("This command only works in direct messages.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,
}

/// Errors while reading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },

    #[error("Couldn't access the config file: {0}")]
    IoError(std::io::Error),
}

impl UserError {
    /// Wraps an unexpected error so it can be shown to a user.
    pub fn operation_failed(err: impl std::fmt::Display) -> Self {
        UserError::OperationFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn user_errors_read_like_replies() {
        assert_eq!(
            UserError::NotInVoiceChannel.to_string(),
            "You're not connected to a voice channel!"
        );
        assert_eq!(UserError::NotPaused.to_string(), "Music player isn't paused!");
        assert_eq!(
            UserError::GuildOnly.to_string(),
            "This command only works in a server."
        );
    }

    #[test]
    fn unexpected_errors_are_wrapped_with_their_message() {
        let err = BotError::Panic {
            payload: Some("boom".to_string()),
        };
        assert_eq!(
            UserError::operation_failed(&err).to_string(),
            "Operation failed: Command panicked: boom"
        );
    }
}
