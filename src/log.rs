//! Tracing setup and the framework error handler.
//!
//! Every error ends up in one of three places: a debug log plus a red notice for the user,
//! an error log plus a notice and a bug notification, or just a log line.

use itertools::Itertools;
use poise::BoxFuture;
use poise::FrameworkError;
use serenity::CreateMessage;
use tracing::debug;
use tracing::error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

use crate::error::UserError;
use crate::lib::notice::Notice;
use crate::serenity;
use crate::Config;
use crate::Context;
use crate::BotError;
use crate::Data;

/// The name of this crate, used to set filter target.
const THIS_CRATE: &str = env!("CARGO_CRATE_NAME");

/// INFO and above everywhere, plus DEBUG for this crate when `verbose`.
fn filter(verbose: bool) -> Targets {
    let targets = Targets::new().with_default(LevelFilter::INFO);
    if verbose {
        targets.with_target(THIS_CRATE, LevelFilter::DEBUG)
    } else {
        targets
    }
}

/// Installs a pretty console layer and, if enabled, an hourly rolling file layer.
/// The returned guard flushes the file writer when dropped.
pub(super) fn install_tracing(config: &Config) -> Option<WorkerGuard> {
    let timer = fmt::time::ChronoLocal::rfc_3339();
    let verbose = config.console_debug();
    let targets = filter(verbose);

    let console_layer = fmt::layer()
        .with_ansi(true)
        .with_file(verbose)
        .with_level(true)
        .with_line_number(verbose)
        .with_target(true)
        .with_timer(timer.clone())
        .pretty()
        .with_filter(targets.clone());

    let (file_layer, guard) = if config.logs_enabled() {
        // Files are named "{THIS_CRATE}.log.{TIMESTAMP}".
        let appender =
            tracing_appender::rolling::hourly(config.log_dir(), format!("{THIS_CRATE}.log"));
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_ansi(false)
            .with_file(verbose)
            .with_level(true)
            .with_line_number(verbose)
            .with_target(true)
            .with_timer(timer)
            .with_writer(writer)
            .compact()
            .with_filter(targets);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

/// How a [FrameworkError] gets reported.
#[derive(Debug)]
enum Report {
    /// Expected, explained to the user.
    User(UserError),
    /// Unexpected, shown as a failed operation and sent to the notify list.
    Bug(BotError),
    /// Already logged, nothing to answer.
    Quiet,
}

impl Report {
    /// What the user is told, if anything.
    fn reply(&self) -> Option<String> {
        match self {
            Report::User(e) => Some(e.to_string()),
            Report::Bug(e) => Some(UserError::operation_failed(e).to_string()),
            Report::Quiet => None,
        }
    }
}

/// Sorts a framework error into a [Report]. Errors nobody can be told about are logged here.
fn classify(err: FrameworkError<'_, Data, BotError>) -> Report {
    use FrameworkError as E;

    let user_error = match err {
        E::Command {
            error: BotError::UserError(e),
            ..
        } => e,
        E::Command { error, .. } => return Report::Bug(error),
        E::CommandPanic { payload, .. } => return Report::Bug(BotError::Panic { payload }),
        E::CommandStructureMismatch { description, .. } => {
            return Report::Bug(BotError::CommandStructureMismatch {
                description: description.to_string(),
            })
        }
        E::CommandCheckFailed { error, .. } => {
            return Report::Bug(BotError::CheckFailed {
                reason: error.map(|e| e.to_string()),
            })
        }

        E::SubcommandRequired { ctx } => UserError::MissingSubcommand {
            subcmds: ctx
                .command()
                .subcommands
                .iter()
                .map(|s| s.name.as_str())
                .join(", "),
        },
        E::ArgumentParse { error, input, .. } => {
            debug!("Couldn't parse arguments: {error}");
            UserError::BadArgs { input }
        }
        E::CooldownHit {
            remaining_cooldown, ..
        } => UserError::OnCooldown { remaining_cooldown },
        E::MissingBotPermissions {
            missing_permissions,
            ..
        } => UserError::MissingBotPermissions {
            missing_permissions,
        },
        E::MissingUserPermissions {
            missing_permissions,
            ..
        } => UserError::MissingUserPermissions {
            missing_permissions,
        },
        E::NotAnOwner { .. } => UserError::NotOwner,
        E::GuildOnly { .. } => UserError::GuildOnly,
        E::DmOnly { .. } => UserError::DmOnly,
        E::NsfwOnly { .. } => UserError::NsfwOnly,

        E::Setup { error, .. } => {
            error!("Error during startup: {error}");
            return Report::Quiet;
        }
        E::EventHandler { error, event, .. } => {
            error!("Error while handling {event:?}: {error}");
            return Report::Quiet;
        }
        // Someone typed the prefix followed by something else.
        E::UnknownCommand { msg_content, .. } => {
            debug!("Ignoring unknown command: {msg_content}");
            return Report::Quiet;
        }
        E::UnknownInteraction { interaction, .. } => {
            error!("Received unknown interaction: {}", interaction.data.name);
            return Report::Quiet;
        }
        other => {
            error!("Unhandled framework error: {other}");
            return Report::Quiet;
        }
    };

    Report::User(user_error)
}

/// The poise `on_error` hook. See [Report] for what happens to each error.
pub fn handle_framework_error(err: FrameworkError<'_, Data, BotError>) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        let ctx = err.ctx();
        let report = classify(err);

        let Some(ctx) = ctx else {
            if !matches!(report, Report::Quiet) {
                error!("Can't answer {report:?} without a command context.");
            }
            return;
        };

        match &report {
            Report::User(e) => debug!("{e} | {}", debug_info(&ctx)),
            Report::Bug(e) => {
                let info = debug_info(&ctx);
                error!("{e} | {info}");
                notify_bug(&ctx, format!("Debug Info: {info}\n{e}")).await;
            }
            Report::Quiet => {}
        }

        if let Some(reply) = report.reply() {
            error_reply(&ctx, reply).await;
        }
    })
}

/// Replies with a red [Notice], showing the current track's thumbnail if any.
async fn error_reply(ctx: &Context<'_>, content: String) {
    let thumbnail = match ctx.guild_id() {
        Some(guild) => ctx
            .data()
            .music
            .current(guild)
            .await
            .and_then(|track| track.thumbnail_url),
        None => None,
    };

    let notice = Notice::error(content, thumbnail);
    if let Err(e) = ctx.send(notice.reply()).await {
        error!("Failed to send error reply. {e}")
    };
}

/// DMs `content` to everyone in [Data::notify_list]. Failures are only logged.
async fn notify_bug(ctx: &Context<'_>, content: String) {
    let message = CreateMessage::new().content(content);

    for user in &ctx.data().notify_list {
        if let Err(e) = user.direct_message(ctx, message.clone()).await {
            error!("Failed to send bug notification to {user}. {e}");
        }
    }
}

/// Who ran what, for logs and bug notifications.
fn debug_info(ctx: &Context<'_>) -> String {
    let user = &ctx.author().name;
    let cmd = &ctx.command().name;
    let user_input = ctx.invocation_string();
    format!("{user} tried to use {cmd} with {user_input}.")
}
