//! Resolves links or search terms into something playable using yt-dlp.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use songbird::input::Input;
use tracing::instrument;

use super::transcode::TranscodeOptions;
use crate::data::TrackMetadata;
use crate::error::UserError;
use crate::BotError;

/// A playable source together with what is known about it.
pub struct Resolved<S> {
    pub metadata: TrackMetadata,
    pub source: S,
}

/// Anything that turns a query into a [Resolved] track.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    /// What the voice connection plays.
    type Source: Send + 'static;

    /// Resolve `query` into a single track.
    /// With `stream` the remote url is played directly, otherwise the track is downloaded first.
    async fn resolve(&self, query: &str, stream: bool) -> Result<Resolved<Self::Source>, BotError>;
}

/// Runs the extraction tool and returns its raw json answer.
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    async fn extract(&self, query: &str, download: bool) -> Result<Value, BotError>;

    /// Local filename a downloaded entry was saved to.
    fn prepare_filename(&self, entry: &Value) -> PathBuf;
}

/// Fixed yt-dlp settings.
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    pub format: String,
    pub output_template: String,
    pub restrict_filenames: bool,
    pub no_playlist: bool,
    pub no_check_certificate: bool,
    pub quiet: bool,
    pub no_warnings: bool,
    pub default_search: String,
    pub source_address: String,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            format: "bestaudio/best".to_string(),
            output_template: "%(extractor)s-%(id)s-%(title)s.%(ext)s".to_string(),
            restrict_filenames: true,
            no_playlist: true,
            no_check_certificate: true,
            quiet: true,
            no_warnings: true,
            default_search: "auto".to_string(),
            source_address: "0.0.0.0".to_string(),
        }
    }
}

impl ExtractorOptions {
    /// yt-dlp arguments for these options, without the query.
    pub fn args(&self, download: bool) -> Vec<String> {
        let mut args = vec![
            "--ignore-config".to_string(),
            "--dump-single-json".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            self.output_template.clone(),
            "--default-search".to_string(),
            self.default_search.clone(),
            "--source-address".to_string(),
            self.source_address.clone(),
        ];

        let flags = [
            (self.restrict_filenames, "--restrict-filenames"),
            (self.no_playlist, "--no-playlist"),
            (self.no_check_certificate, "--no-check-certificates"),
            (self.quiet, "--quiet"),
            (self.no_warnings, "--no-warnings"),
            // Dumping json implies simulating unless told otherwise.
            (download, "--no-simulate"),
        ];
        args.extend(
            flags
                .into_iter()
                .filter(|(on, _)| *on)
                .map(|(_, flag)| flag.to_string()),
        );
        args
    }

    /// Render [output_template](Self::output_template) for `entry`, the way yt-dlp names downloads.
    pub fn render_filename(&self, entry: &Value) -> PathBuf {
        let mut rendered = String::new();
        let mut rest = self.output_template.as_str();

        while let Some(start) = rest.find("%(") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find(")s") {
                Some(end) => {
                    let field = &after[..end];
                    let value = match entry.get(field) {
                        Some(Value::String(s)) => s.clone(),
                        Some(Value::Null) | None => "NA".to_string(),
                        Some(other) => other.to_string(),
                    };
                    rendered.push_str(&self.sanitize(&value));
                    rest = &after[end + 2..];
                }
                None => {
                    rendered.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        PathBuf::from(rendered)
    }

    /// Keep a field value safe to use inside a filename.
    ///
    /// With `restrict_filenames` this follows yt-dlp's `--restrict-filenames`, except that
    /// accented letters turn into `_` rather than being transliterated.
    fn sanitize(&self, value: &str) -> String {
        if !self.restrict_filenames {
            return value.replace(['/', '\\'], "_");
        }

        let mut replaced = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '?' | '"' => {}
                c if c.is_ascii_control() => {}
                ':' => replaced.push_str("_-"),
                '\\' | '/' | '|' | '*' | '<' | '>' => replaced.push('_'),
                '!' | '&' | '\'' | '(' | ')' | '[' | ']' | '{' | '}' | '$' | ';' | '`' | '^' | ','
                | '#' => replaced.push('_'),
                c if c.is_whitespace() || !c.is_ascii() => replaced.push('_'),
                c => replaced.push(c),
            }
        }

        // Runs of `_` become one, and none are left at the ends.
        let mut collapsed = String::with_capacity(replaced.len());
        for c in replaced.chars() {
            if !(c == '_' && collapsed.ends_with('_')) {
                collapsed.push(c);
            }
        }

        let mut name = collapsed.trim_matches('_');
        name = name.strip_prefix("-_").unwrap_or(name);
        let name = match name.strip_prefix('-') {
            Some(rest) => format!("_{rest}"),
            None => name.to_string(),
        };

        match name.trim_start_matches('.') {
            "" => "_".to_string(),
            name => name.to_string(),
        }
    }
}

/// The yt-dlp command line tool.
#[derive(Debug, Clone)]
pub struct YtDlp {
    /// The yt-dlp executable.
    program: String,
    options: ExtractorOptions,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            options: ExtractorOptions::default(),
        }
    }
}

#[async_trait]
impl Extractor for YtDlp {
    #[instrument(skip(self))]
    async fn extract(&self, query: &str, download: bool) -> Result<Value, BotError> {
        let mut args = self.options.args(download);
        args.extend(["--".to_string(), query.to_string()]);

        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
                .unwrap_or_else(|| format!("{} exited with {}", self.program, output.status));
            Err(UserError::ExtractionError { reason })?
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| UserError::operation_failed(format!("Malformed extractor response: {e}")).into())
    }

    fn prepare_filename(&self, entry: &Value) -> PathBuf {
        match entry.get("_filename").and_then(Value::as_str) {
            Some(name) => PathBuf::from(name),
            None => self.options.render_filename(entry),
        }
    }
}

/// Picks the first entry of a multi-entry result (e.g. a search), or the result itself.
pub fn first_entry(result: Value, query: &str) -> Result<Value, UserError> {
    let no_results = || UserError::ExtractionError {
        reason: format!("No results found for '{query}'."),
    };

    match result {
        Value::Object(mut map) => match map.remove("entries") {
            Some(Value::Array(entries)) => entries
                .into_iter()
                .next()
                .filter(|entry| !entry.is_null())
                .ok_or_else(no_results),
            Some(_) => Err(UserError::operation_failed("extractor entries aren't a list")),
            None => Ok(Value::Object(map)),
        },
        Value::Null => Err(no_results()),
        _ => Err(UserError::operation_failed("extractor response isn't an object")),
    }
}

/// Resolves queries with an [Extractor] and turns them into playable [Input]s with ffmpeg.
pub struct StreamResolver<E = YtDlp> {
    extractor: E,
    transcode: TranscodeOptions,
}

impl<E: Extractor> StreamResolver<E> {
    pub fn new(extractor: E, transcode: TranscodeOptions) -> Self {
        Self {
            extractor,
            transcode,
        }
    }

    /// Ask the extractor about `query` and keep only the first match.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &str, stream: bool) -> Result<TrackMetadata, BotError> {
        let query = query.trim();
        if query.is_empty() {
            Err(UserError::EmptyQuery)?
        }

        let result = self.extractor.extract(query, !stream).await?;
        let entry = first_entry(result, query)?;

        let filename = if stream {
            None
        } else {
            Some(self.extractor.prepare_filename(&entry))
        };

        let metadata = TrackMetadata::from_entry(entry, filename)?;
        tracing::info!("Resolved '{query}' to '{}'.", metadata.display_title());
        Ok(metadata)
    }
}

#[async_trait]
impl<E: Extractor> Resolve for StreamResolver<E> {
    type Source = Input;

    async fn resolve(&self, query: &str, stream: bool) -> Result<Resolved<Input>, BotError> {
        let metadata = self.lookup(query, stream).await?;
        let source = self.transcode.open(&metadata.playable())?;
        Ok(Resolved { metadata, source })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    /// Answers every query with the same json and remembers what it was asked.
    struct CannedExtractor {
        answer: Value,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl CannedExtractor {
        fn new(answer: Value) -> Self {
            Self {
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Extractor for CannedExtractor {
        async fn extract(&self, query: &str, download: bool) -> Result<Value, BotError> {
            self.calls
                .lock()
                .unwrap()
                .push((query.to_string(), download));
            Ok(self.answer.clone())
        }

        fn prepare_filename(&self, entry: &Value) -> PathBuf {
            ExtractorOptions::default().render_filename(entry)
        }
    }

    fn resolver(answer: Value) -> StreamResolver<CannedExtractor> {
        StreamResolver::new(CannedExtractor::new(answer), TranscodeOptions::default())
    }

    #[tokio::test]
    async fn search_results_use_the_first_entry() {
        let resolver = resolver(json!({
            "_type": "playlist",
            "entries": [
                { "title": "lofi hip hop radio", "url": "https://cdn.example/1" },
                { "title": "lofi chill mix", "url": "https://cdn.example/2" },
                { "title": "lofi study", "url": "https://cdn.example/3" },
            ]
        }));

        for _ in 0..3 {
            let meta = resolver.lookup("lofi", true).await.unwrap();
            assert_eq!(meta.title.as_deref(), Some("lofi hip hop radio"));
            assert_eq!(meta.stream_url, "https://cdn.example/1");
        }
    }

    #[tokio::test]
    async fn streaming_does_not_download() {
        let resolver = resolver(json!({ "title": "Song", "url": "https://cdn.example/s" }));

        let meta = resolver.lookup("https://example.com/song", true).await.unwrap();

        assert_eq!(meta.filename, None);
        let calls = resolver.extractor.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![("https://example.com/song".to_string(), false)]);
    }

    #[tokio::test]
    async fn downloading_computes_a_filename() {
        let resolver = resolver(json!({
            "extractor": "youtube",
            "id": "abc123",
            "title": "My Song (Live)",
            "ext": "webm",
            "url": "https://cdn.example/s",
        }));

        let meta = resolver.lookup("my song", false).await.unwrap();

        assert_eq!(
            meta.filename,
            Some(PathBuf::from("youtube-abc123-My_Song_Live.webm"))
        );
        assert_eq!(meta.playable(), "youtube-abc123-My_Song_Live.webm");
    }

    #[tokio::test]
    async fn empty_search_is_an_extraction_error() {
        let resolver = resolver(json!({ "_type": "playlist", "entries": [] }));
        let err = resolver.lookup("nothing matches", true).await.unwrap_err();
        assert!(matches!(
            err,
            BotError::UserError(UserError::ExtractionError { .. })
        ));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_extracting() {
        let resolver = resolver(json!({}));
        let err = resolver.lookup("   ", true).await.unwrap_err();
        assert!(matches!(err, BotError::UserError(UserError::EmptyQuery)));
        assert!(resolver.extractor.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn first_entry_of_single_result_is_itself() {
        let single = json!({ "title": "Only" });
        assert_eq!(first_entry(single.clone(), "q").unwrap(), single);
    }

    #[test]
    fn ytdlp_arguments() {
        let args = ExtractorOptions::default().args(false);
        for expected in [
            "--no-playlist",
            "--no-check-certificates",
            "--quiet",
            "--no-warnings",
            "--restrict-filenames",
            "bestaudio/best",
        ] {
            assert!(args.iter().any(|a| a == expected), "missing {expected}");
        }
        assert!(!args.iter().any(|a| a == "--no-simulate"));
        assert!(ExtractorOptions::default()
            .args(true)
            .iter()
            .any(|a| a == "--no-simulate"));
    }

    #[test]
    fn extractor_filename_wins_over_template() {
        let ytdlp = YtDlp::new("yt-dlp");
        let entry = json!({ "_filename": "given.m4a", "id": "x" });
        assert_eq!(ytdlp.prepare_filename(&entry), PathBuf::from("given.m4a"));
    }

    #[test]
    fn restricted_names_follow_ytdlp() {
        let opts = ExtractorOptions::default();

        assert_eq!(opts.sanitize("My Song (Live)"), "My_Song_Live");
        assert_eq!(opts.sanitize("AC/DC: Live!"), "AC_DC_-_Live");
        assert_eq!(opts.sanitize("Who?"), "Who");
        assert_eq!(opts.sanitize("-rf"), "_rf");
        assert_eq!(opts.sanitize("..."), "_");
        assert_eq!(opts.sanitize("(!)"), "_");
    }

    #[test]
    fn unrestricted_names_only_lose_slashes() {
        let opts = ExtractorOptions {
            restrict_filenames: false,
            ..Default::default()
        };
        assert_eq!(opts.sanitize("AC/DC (Live)"), "AC_DC (Live)");
    }
}
