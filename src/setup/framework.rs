//! Setup for [poise::Framework]

use crate::commands;
use crate::data::MusicController;
use crate::lib::resolver::StreamResolver;
use crate::lib::resolver::YtDlp;
use crate::lib::transcode::TranscodeOptions;
use crate::lib::voice::SongbirdVoice;
use crate::serenity;
use crate::BotError;
use crate::Config;
use crate::Data;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, BotError>;

/// Construct a [poise::Framework]
pub(super) fn framework(config: Config) -> Framework {
    poise::Framework::builder()
        .options(framework_options(&config))
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config))
        .build()
}

/// Configure options for the [Framework]
fn framework_options(config: &Config) -> poise::FrameworkOptions<Data, BotError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: commands::list(),
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(config.command_prefix().to_string()),
            ..Default::default()
        },
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author();
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Build the [MusicController] from the config.
async fn music_controller(
    ctx: &serenity::Context,
    config: &Config,
) -> Result<MusicController, BotError> {
    let voice = SongbirdVoice::from_serenity(ctx).await?;
    let resolver = StreamResolver::new(
        YtDlp::new(config.ytdlp_path()),
        TranscodeOptions::with_program(config.ffmpeg_path()),
    );
    Ok(MusicController::new(voice, resolver, config.playback()))
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    config: Config,
) -> poise::BoxFuture<'a, Result<Data, BotError>> {
    Box::pin(async move {
        // Register the commands
        let commands = &commands::list();
        let app_commands = poise::builtins::create_application_commands(commands);

        serenity::Command::set_global_commands(&ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }

        let music = music_controller(ctx, &config).await?;

        // Simple message that logs when the bot has initialized
        let bot_name = &rdy.user.name;
        tracing::info!("{bot_name} is ready!");

        let data = Data {
            notify_list: config.notify_list(fw),
            music,
        };

        Ok(data)
    })
}
