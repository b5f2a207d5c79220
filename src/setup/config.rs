//! `config.toml`: everything the bot reads at startup.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::time::Duration;

use poise::Framework;
use serde::Deserialize;
use serde::Serialize;
use serenity::GuildId;
use serenity::UserId;

use crate::error::ConfigError;
use crate::lib::controller::PlaybackSettings;
use crate::serenity;

/// The path to the config file
const CONFIG_PATH: &str = "config.toml";

/// Written to a fresh config, rejected by [Config::token].
const PLACEHOLDER_TOKEN: &str = "put_token_here";

/// Settings read from [CONFIG_PATH].
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Token needed to use a bot account.
    discord_token: String,
    /// Prefix for text commands, e.g. `!play`.
    command_prefix: String,
    logging: LoggingConfig,
    music: MusicConfig,
    dev_utils: DevConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct LoggingConfig {
    /// DEBUG traces for this crate, with file and line info.
    console_debug: bool,
    /// Also write logs to `log_dir`.
    logs_enabled: bool,
    log_dir: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MusicConfig {
    /// Seconds without playback before leaving the voice channel.
    idle_timeout_secs: u64,
    /// Volume every track starts at, `1.0` being unchanged.
    default_volume: f32,
    /// Path to (or name of) the yt-dlp executable.
    ytdlp_path: String,
    /// Path to (or name of) the ffmpeg executable.
    ffmpeg_path: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DevConfig {
    /// Guild that gets commands registered instantly, unlike global registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dev_guild: Option<GuildId>,
    notifications: NotifyConfig,
}

/// Who gets a DM when something unexpected breaks.
#[derive(Debug, Serialize, Deserialize)]
struct NotifyConfig {
    enabled: bool,
    /// Include the bot owners.
    add_owners: bool,
    userids: Vec<UserId>,
}

impl Config {
    /// Reads [CONFIG_PATH].
    ///
    /// A missing or blank file is replaced with the defaults and reported as an error, so the
    /// token can be filled in before starting again. A file that doesn't parse is left alone and
    /// the error names the offending field.
    pub fn read() -> Result<Config, ConfigError> {
        match std::fs::read_to_string(CONFIG_PATH) {
            Ok(content) if !content.trim().is_empty() => parse(&content),
            Ok(_) => {
                write_default()?;
                Err(ConfigError::InvalidConfig {
                    reason: format!("{CONFIG_PATH} was empty, the defaults were written to it."),
                })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_default()?;
                Err(ConfigError::MissingConfig {
                    action_msg: format!("Created {CONFIG_PATH} with the defaults."),
                })
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// The discord token, unless it was left blank or at the placeholder.
    pub fn token(&self) -> Result<&str, ConfigError> {
        let token = self.discord_token.trim();
        if token.is_empty() || token.contains(PLACEHOLDER_TOKEN) {
            return Err(ConfigError::InvalidConfig {
                reason: format!("Missing discord token, set discord_token in {CONFIG_PATH}."),
            });
        }
        Ok(token)
    }

    /// Users to notify about bugs, with the owners of `fw` if configured.
    pub fn notify_list<U, E>(&self, fw: &Framework<U, E>) -> HashSet<UserId> {
        self.dev_utils.notifications.recipients(&fw.options().owners)
    }

    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn log_dir(&self) -> &str {
        &self.logging.log_dir
    }

    pub fn console_debug(&self) -> bool {
        self.logging.console_debug
    }

    pub fn logs_enabled(&self) -> bool {
        self.logging.logs_enabled
    }

    pub fn dev_guild(&self) -> Option<GuildId> {
        self.dev_utils.dev_guild
    }

    /// Playback tunables, with the volume clamped to something audible.
    pub fn playback(&self) -> PlaybackSettings {
        PlaybackSettings {
            idle_timeout: Duration::from_secs(self.music.idle_timeout_secs),
            default_volume: self.music.default_volume.clamp(0.01, 1.0),
        }
    }

    pub fn ytdlp_path(&self) -> &str {
        &self.music.ytdlp_path
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.music.ffmpeg_path
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: PLACEHOLDER_TOKEN.to_string(),
            command_prefix: "!".to_string(),
            logging: LoggingConfig {
                console_debug: false,
                logs_enabled: true,
                log_dir: "logs".to_string(),
            },
            music: MusicConfig {
                idle_timeout_secs: 120,
                default_volume: 0.5,
                ytdlp_path: "yt-dlp".to_string(),
                ffmpeg_path: "ffmpeg".to_string(),
            },
            dev_utils: DevConfig {
                dev_guild: None,
                notifications: NotifyConfig {
                    enabled: false,
                    add_owners: true,
                    userids: vec![],
                },
            },
        }
    }
}

impl NotifyConfig {
    fn recipients(&self, owners: &HashSet<UserId>) -> HashSet<UserId> {
        if !self.enabled {
            return HashSet::new();
        }

        let owners = self.add_owners.then_some(owners).into_iter().flatten();
        owners.chain(&self.userids).copied().collect()
    }
}

/// Deserialize a config, pointing at the offending field on failure.
fn parse(content: &str) -> Result<Config, ConfigError> {
    let de = toml::Deserializer::new(content);
    serde_path_to_error::deserialize(de).map_err(|error| ConfigError::InvalidConfig {
        reason: error.to_string(),
    })
}

fn write_default() -> Result<(), ConfigError> {
    let content =
        toml::to_string_pretty(&Config::default()).map_err(|e| ConfigError::InvalidConfig {
            reason: e.to_string(),
        })?;
    std::fs::write(CONFIG_PATH, content).map_err(ConfigError::IoError)
}
