//! Bot commands. Each one is usable as a slash command or with the configured prefix.

mod pause;
mod play;
mod resume;
mod stop;
mod volume;

use crate::BotError;
use crate::Data;

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, BotError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        play::play(),
        stop::stop(),
        pause::pause(),
        resume::resume(),
        volume::volume(),
    ]
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_command_is_listed_once() {
        let names: Vec<String> = list().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["play", "stop", "pause", "resume", "volume"]);
    }

    #[test]
    fn commands_are_guild_only() {
        assert!(list().iter().all(|c| c.guild_only));
    }
}
