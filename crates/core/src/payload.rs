use bytes::Bytes;
use serde::Serialize;

use crate::embed::Embed;

/// A file ready to upload alongside a proxied message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingFile {
    /// File name shown in the destination.
    pub filename: String,
    /// MIME type, when known.
    pub content_type: Option<String>,
    /// Alt text.
    pub description: Option<String>,
    /// File contents.
    pub data: Bytes,
}

/// One message to send through the send-identity proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingPayload {
    /// Message text, always within the platform character limit.
    pub content: String,
    /// Display name to impersonate.
    pub username: String,
    /// Avatar to impersonate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Rich embeds carried over verbatim.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
    /// Files to upload; sent as multipart parts, never serialized.
    #[serde(skip)]
    pub files: Vec<OutgoingFile>,
}
