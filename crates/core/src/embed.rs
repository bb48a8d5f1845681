use serde::{Deserialize, Serialize};

/// How an embed came to exist on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedKind {
    /// Authored by a bot or integration. The only kind carried over.
    #[default]
    Rich,
    /// Auto-generated image preview.
    Image,
    /// Auto-generated video preview.
    Video,
    /// Auto-generated animated GIF preview.
    Gifv,
    /// Auto-generated article preview.
    Article,
    /// Auto-generated link preview.
    Link,
    /// Anything the platform adds later.
    #[serde(other)]
    Other,
}

/// A structured embed attached to a message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Embed {
    /// Embed kind.
    #[serde(rename = "type", default)]
    pub kind: EmbedKind,

    /// Embed title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Embed description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Link target of the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Embed color as a decimal integer (e.g., `16711680` for red).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,

    /// ISO 8601 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Embed fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,

    /// Footer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,

    /// Author block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,

    /// Large image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,

    /// Thumbnail image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
}

impl Embed {
    /// Rich embeds are authored content; every other kind is a preview the
    /// platform regenerates from the message text.
    pub fn is_rich(&self) -> bool {
        self.kind == EmbedKind::Rich
    }
}

/// A field within an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether this field should be displayed inline.
    #[serde(default)]
    pub inline: bool,
}

/// Footer for an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    /// Footer text.
    pub text: String,
    /// Footer icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Author block of an embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    /// Author name.
    pub name: String,
    /// Author link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Author icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Image or thumbnail reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    /// Media URL.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_deserializes_kind() {
        let json = r#"{"type":"rich","title":"Test","description":"Desc","color":255}"#;
        let embed: Embed = serde_json::from_str(json).unwrap();
        assert!(embed.is_rich());
        assert_eq!(embed.title.as_deref(), Some("Test"));
        assert_eq!(embed.color, Some(255));

        let link: Embed = serde_json::from_str(r#"{"type":"link","url":"https://x"}"#).unwrap();
        assert!(!link.is_rich());

        let future: Embed = serde_json::from_str(r#"{"type":"poll_result"}"#).unwrap();
        assert_eq!(future.kind, EmbedKind::Other);
    }

    #[test]
    fn embed_serializes_without_empty_fields() {
        let embed = Embed {
            title: Some("Alert".into()),
            fields: vec![EmbedField {
                name: "Status".into(),
                value: "Critical".into(),
                inline: true,
            }],
            ..Embed::default()
        };
        let json = serde_json::to_value(&embed).unwrap();
        assert_eq!(json["type"], "rich");
        assert_eq!(json["fields"][0]["name"], "Status");
        assert!(json.get("footer").is_none());
        assert!(json.get("description").is_none());
    }
}
