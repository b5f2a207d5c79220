//! Stores track metadata and its display implementation.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::UserError;
use crate::lib;

/// Metadata of a resolved track.
/// Only built by [StreamResolver](crate::lib::resolver::StreamResolver).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    /// Title of the track.
    pub title: Option<String>,
    /// Url of the audio stream itself.
    pub stream_url: String,
    /// The url to the source's thumbnail.
    pub thumbnail_url: Option<String>,
    /// Url of the page the track came from.
    pub source_url: Option<String>,
    /// Duration of the track.
    pub duration: Option<Duration>,
    /// The source's channel name.
    pub channel: Option<String>,
    /// Where the track was downloaded to, if it was downloaded.
    pub filename: Option<PathBuf>,
    /// Everything the extractor said about this track.
    pub raw: Arc<Value>,
}

/// The fields picked out of a single extractor entry.
#[derive(Debug, Deserialize)]
struct ExtractedEntry {
    title: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
}

impl TrackMetadata {
    /// Builds [TrackMetadata] from a single extractor entry.
    pub fn from_entry(entry: Value, filename: Option<PathBuf>) -> Result<Self, UserError> {
        let fields: ExtractedEntry =
            serde_path_to_error::deserialize(&entry).map_err(UserError::operation_failed)?;

        let stream_url = fields.url.ok_or_else(|| {
            UserError::operation_failed("extractor response has no stream url")
        })?;

        let duration = fields
            .duration
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);

        Ok(TrackMetadata {
            title: fields.title,
            stream_url,
            thumbnail_url: fields.thumbnail,
            source_url: fields.webpage_url.or(fields.original_url),
            duration,
            channel: fields.channel.or(fields.uploader),
            filename,
            raw: Arc::new(entry),
        })
    }

    /// What the transcoder should open: the downloaded file if there is one, else the stream.
    pub fn playable(&self) -> String {
        match &self.filename {
            Some(path) => path.to_string_lossy().into_owned(),
            None => self.stream_url.clone(),
        }
    }

    /// The title, or a placeholder.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("<MISSING TITLE>")
    }
}

impl Display for TrackMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = self.display_title();
        let channel = self.channel.clone().unwrap_or_default();
        let duration = match self.duration {
            None => String::new(),
            Some(dur) => lib::format_duration(&dur),
        };

        if let Some(source_url) = &self.source_url {
            write!(f, "[{title} {duration} {channel}]({source_url})")
        } else {
            write!(f, "{title} {duration} {channel}")
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn entry_fields_are_picked() {
        let entry = json!({
            "title": "Lofi beats",
            "url": "https://cdn.example/audio.webm",
            "thumbnail": "https://img.example/1.jpg",
            "webpage_url": "https://www.youtube.com/watch?v=abc",
            "duration": 125.0,
            "uploader": "Lofi Girl",
        });

        let meta = TrackMetadata::from_entry(entry.clone(), None).unwrap();

        assert_eq!(meta.title.as_deref(), Some("Lofi beats"));
        assert_eq!(meta.stream_url, "https://cdn.example/audio.webm");
        assert_eq!(meta.thumbnail_url.as_deref(), Some("https://img.example/1.jpg"));
        assert_eq!(
            meta.source_url.as_deref(),
            Some("https://www.youtube.com/watch?v=abc")
        );
        assert_eq!(meta.duration, Some(Duration::from_secs(125)));
        assert_eq!(meta.channel.as_deref(), Some("Lofi Girl"));
        assert_eq!(*meta.raw, entry);
        assert_eq!(meta.playable(), "https://cdn.example/audio.webm");
    }

    #[test]
    fn missing_stream_url_is_an_operation_failure() {
        let entry = json!({ "title": "No url here" });
        let err = TrackMetadata::from_entry(entry, None).unwrap_err();
        assert!(matches!(err, UserError::OperationFailed { .. }));
    }

    #[test]
    fn downloaded_file_is_preferred() {
        let entry = json!({ "url": "https://cdn.example/a.m4a" });
        let meta =
            TrackMetadata::from_entry(entry, Some(PathBuf::from("youtube-abc-Song.m4a"))).unwrap();
        assert_eq!(meta.playable(), "youtube-abc-Song.m4a");
    }

    #[test]
    fn display_with_link() {
        let entry = json!({
            "title": "Song",
            "url": "https://cdn.example/a",
            "webpage_url": "https://example.com/song",
            "duration": 61,
            "channel": "Band",
        });
        let meta = TrackMetadata::from_entry(entry, None).unwrap();
        assert_eq!(
            meta.to_string(),
            "[Song [01m:01s] Band](https://example.com/song)"
        );
    }
}
