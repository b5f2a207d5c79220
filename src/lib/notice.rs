//! Embeds used to report the outcome of every command.

use poise::CreateReply;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;

use crate::serenity;

/// Footer used unless a notice sets its own.
pub const DEFAULT_FOOTER: &str = "Cicord Music Player";

/// What kind of outcome a [Notice] reports. Decides the embed color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Something started or continued playing.
    Success,
    Error,
    Stop,
    Pause,
    Volume,
}

impl Tone {
    /// The embed color for this tone.
    pub fn color(self) -> u32 {
        match self {
            Tone::Success => 0x00ff00,
            Tone::Error => 0xff0000,
            Tone::Stop => 0xff9900,
            Tone::Pause => 0xffff00,
            Tone::Volume => 0x0099ff,
        }
    }
}

/// A titled, colored message sent back to whoever used a command.
#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct Notice {
    title: String,
    description: String,
    tone: Tone,
    /// Small image in the corner, usually the current track's thumbnail.
    thumbnail: Option<String>,
    /// Large image below the description.
    image: Option<String>,
    #[builder(default = DEFAULT_FOOTER.to_string())]
    footer: String,
}

impl Notice {
    /// A red notice explaining what went wrong.
    pub fn error(description: impl Into<String>, thumbnail: Option<String>) -> Self {
        Notice::builder()
            .title("❌ Error")
            .description(description)
            .tone(Tone::Error)
            .maybe_thumbnail(thumbnail)
            .build()
    }

    pub fn embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.title)
            .description(&self.description)
            .color(self.tone.color())
            .footer(CreateEmbedFooter::new(&self.footer));

        if let Some(url) = &self.thumbnail {
            embed = embed.thumbnail(url);
        }
        if let Some(url) = &self.image {
            embed = embed.image(url);
        }
        embed
    }

    pub fn reply(&self) -> CreateReply {
        CreateReply::default().embed(self.embed())
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tones_have_distinct_colors() {
        assert_eq!(Tone::Success.color(), 0x00ff00);
        assert_eq!(Tone::Error.color(), 0xff0000);
        assert_eq!(Tone::Stop.color(), 0xff9900);
        assert_eq!(Tone::Pause.color(), 0xffff00);
        assert_eq!(Tone::Volume.color(), 0x0099ff);
    }

    #[test]
    fn error_notice_is_red_with_default_footer() {
        let notice = Notice::error("Nothing is playing!", None);
        assert_eq!(notice.tone(), Tone::Error);
        assert_eq!(notice.footer, DEFAULT_FOOTER);
        assert_eq!(notice.thumbnail, None);
    }

    #[test]
    fn embed_carries_title_and_color() {
        let notice = Notice::builder()
            .title("🔊 Volume")
            .description("Volume set on 40%")
            .tone(Tone::Volume)
            .thumbnail("https://img.example/t.jpg")
            .build();

        let embed = serde_json::to_value(notice.embed()).unwrap();
        assert_eq!(embed["title"], "🔊 Volume");
        assert_eq!(embed["color"], 0x0099ff);
        assert_eq!(embed["footer"]["text"], DEFAULT_FOOTER);
        assert_eq!(embed["thumbnail"]["url"], "https://img.example/t.jpg");
    }
}
