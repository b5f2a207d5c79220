//! Turns a resolved stream url (or downloaded file) into a songbird [Input] using ffmpeg.

use std::process::Stdio;
use std::time::Duration;

use songbird::input::AudioStream;
use songbird::input::ChildContainer;
use songbird::input::Input;
use songbird::input::LiveInput;
use symphonia::core::io::{MediaSource, ReadOnlySource};
use symphonia::core::probe::Hint;
use tracing::instrument;
use url::Url;

use crate::BotError;

/// Fixed ffmpeg options applied to every track.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// The ffmpeg executable.
    pub program: String,
    /// Reconnect when the connection drops.
    pub reconnect: bool,
    /// Also reconnect for streamed (non seekable) inputs.
    pub reconnect_streamed: bool,
    /// Longest wait between reconnect attempts.
    pub reconnect_delay_max: Duration,
    /// Drop any video stream.
    pub strip_video: bool,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            reconnect: true,
            reconnect_streamed: true,
            reconnect_delay_max: Duration::from_secs(5),
            strip_video: true,
        }
    }
}

impl TranscodeOptions {
    /// Options with a different ffmpeg executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Input options, only meaningful for network sources.
    pub fn before_args(&self) -> Vec<String> {
        let flag = |on: bool| (if on { "1" } else { "0" }).to_string();
        vec![
            "-reconnect".to_string(),
            flag(self.reconnect),
            "-reconnect_streamed".to_string(),
            flag(self.reconnect_streamed),
            "-reconnect_delay_max".to_string(),
            self.reconnect_delay_max.as_secs().to_string(),
        ]
    }

    /// Full ffmpeg argument list that reads `location` and writes wav to stdout.
    pub fn args(&self, location: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .map(String::from)
            .to_vec();

        if is_remote(location) {
            args.extend(self.before_args());
        }
        args.extend(["-i".to_string(), location.to_string()]);

        if self.strip_video {
            args.push("-vn".to_string());
        }

        // Songbird mixes at 48kHz stereo, so hand it exactly that.
        args.extend(
            ["-f", "wav", "-acodec", "pcm_s16le", "-ac", "2", "-ar", "48000", "pipe:1"]
                .map(String::from),
        );
        args
    }

    /// Spawn ffmpeg for `location` and wrap its stdout as a playable [Input].
    #[instrument(skip(self))]
    pub fn open(&self, location: &str) -> Result<Input, BotError> {
        let child = std::process::Command::new(&self.program)
            .args(self.args(location))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        tracing::debug!("Spawned {} for {location}.", self.program);

        let mut hint = Hint::new();
        hint.with_extension("wav");

        let stream = AudioStream {
            input: Box::new(ReadOnlySource::new(ChildContainer::from(child))) as Box<dyn MediaSource>,
            hint: Some(hint),
        };
        Ok(Input::Live(LiveInput::Raw(stream), None))
    }
}

/// Whether `location` is a network url rather than a local path.
fn is_remote(location: &str) -> bool {
    Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_reconnect_options() {
        let opts = TranscodeOptions::default();
        assert_eq!(
            opts.before_args(),
            vec![
                "-reconnect",
                "1",
                "-reconnect_streamed",
                "1",
                "-reconnect_delay_max",
                "5"
            ]
        );
    }

    #[test]
    fn remote_sources_get_reconnect_and_strip_video() {
        let args = TranscodeOptions::default().args("https://cdn.example/a.webm");
        let input_at = args.iter().position(|a| a == "-i").unwrap();
        let reconnect_at = args.iter().position(|a| a == "-reconnect").unwrap();

        assert!(reconnect_at < input_at);
        assert_eq!(args[input_at + 1], "https://cdn.example/a.webm");
        assert_eq!(args[input_at + 2], "-vn");
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn local_files_skip_reconnect() {
        let args = TranscodeOptions::default().args("youtube-abc-Song.m4a");
        assert!(!args.iter().any(|a| a == "-reconnect"));
        assert!(args.iter().any(|a| a == "youtube-abc-Song.m4a"));
    }

    #[test]
    fn keeping_video_drops_the_flag() {
        let opts = TranscodeOptions {
            strip_video: false,
            ..Default::default()
        };
        assert!(!opts.args("https://cdn.example/a").iter().any(|a| a == "-vn"));
    }
}
