//! Common type definitions shared by the request pipeline.
//!
//! - [`MediaKind`]: which of the four generation operations a request targets
//! - [`Upload`]: an uploaded file held in memory until it passes validation
//! - [`GenerationRequest`]: prompt plus optional upload, as received from a client
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

pub type AttachmentId = Uuid;

/// Fallback media type for uploads that declare nothing and have no recognisable extension
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// The four logical generation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Text,
    Image,
    Document,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Text => "text",
            MediaKind::Image => "image",
            MediaKind::Document => "document",
            MediaKind::Audio => "audio",
        }
    }

    /// Capitalised name used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Text => "Text",
            MediaKind::Image => "Image",
            MediaKind::Document => "Document",
            MediaKind::Audio => "Audio",
        }
    }

    /// Multipart field carrying the attachment, `None` for text-only requests
    pub fn file_field(&self) -> Option<&'static str> {
        match self {
            MediaKind::Text => None,
            MediaKind::Image => Some("image"),
            MediaKind::Document => Some("document"),
            MediaKind::Audio => Some("audio"),
        }
    }

    /// Route path below `/gemini-api`
    pub fn route(&self) -> &'static str {
        match self {
            MediaKind::Text => "/generate-text",
            MediaKind::Image => "/generate-from-image",
            MediaKind::Document => "/generate-from-document",
            MediaKind::Audio => "/generate-from-audio",
        }
    }

    /// Pick the operation for an attachment by its MIME prefix. Anything that is not an
    /// image or audio file is sent as a document.
    pub fn for_attachment(media_type: &str) -> Self {
        let media_type = normalize_media_type(media_type);
        if media_type.starts_with("image/") {
            MediaKind::Image
        } else if media_type.starts_with("audio/") {
            MediaKind::Audio
        } else {
            MediaKind::Document
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip parameters and lowercase, so `Text/Plain; charset=utf-8` compares as `text/plain`.
pub fn normalize_media_type(media_type: &str) -> String {
    media_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// A file received with a request, still in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub media_type: String,
    pub bytes: Bytes,
}

impl Upload {
    /// Build an upload from what the client declared. A missing or generic
    /// (`application/octet-stream`) content type is guessed from the file name.
    pub fn new(file_name: Option<String>, declared_media_type: Option<&str>, bytes: Bytes) -> Self {
        Self::build(file_name, declared_media_type, bytes, None)
    }

    /// Like [`Upload::new`], for a file received in `kind`'s field. A guessed `video/*`
    /// container type (`.webm`, `.mp4`) becomes its `audio/*` twin for audio uploads.
    pub fn received_as(kind: MediaKind, file_name: Option<String>, declared_media_type: Option<&str>, bytes: Bytes) -> Self {
        Self::build(file_name, declared_media_type, bytes, Some(kind))
    }

    fn build(file_name: Option<String>, declared_media_type: Option<&str>, bytes: Bytes, kind: Option<MediaKind>) -> Self {
        let declared = declared_media_type.map(normalize_media_type).filter(|declared| !declared.is_empty());
        let media_type = match declared {
            Some(declared) if declared != OCTET_STREAM => declared,
            _ => guess_media_type(file_name.as_deref(), kind),
        };

        Self {
            file_name,
            media_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn guess_media_type(file_name: Option<&str>, kind: Option<MediaKind>) -> String {
    let Some(guess) = file_name.and_then(|name| mime_guess::from_path(name).first_raw()) else {
        return OCTET_STREAM.to_string();
    };

    match (kind, guess.strip_prefix("video/")) {
        (Some(MediaKind::Audio), Some(subtype)) => format!("audio/{subtype}"),
        _ => guess.to_string(),
    }
}

/// An inbound generation call before validation.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    pub upload: Option<Upload>,
}
