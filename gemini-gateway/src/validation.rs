//! Request validation.
//!
//! Every operation requires a prompt. Image, document and audio operations also require an
//! attachment whose declared media type appears in [`MEDIA_POLICIES`], the single table mapping
//! an operation to the media types it accepts. Validation never touches storage.

use crate::types::{GenerationRequest, MediaKind, Upload};
use thiserror::Error as ThisError;

/// Media types accepted for one kind of attachment.
#[derive(Debug)]
pub struct MediaPolicy {
    pub kind: MediaKind,
    pub allowed: &'static [&'static str],
    pub rejection: &'static str,
}

pub static MEDIA_POLICIES: [MediaPolicy; 3] = [
    MediaPolicy {
        kind: MediaKind::Image,
        allowed: &["image/png", "image/jpeg"],
        rejection: "Only PNG or JPEG images are allowed",
    },
    MediaPolicy {
        kind: MediaKind::Document,
        allowed: &[
            "application/pdf",
            "application/msword",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "text/plain",
            "application/vnd.ms-excel",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ],
        rejection: "Only PDF, DOC, DOCX, TXT, XLS or XLSX documents are allowed",
    },
    MediaPolicy {
        kind: MediaKind::Audio,
        allowed: &["audio/mpeg", "audio/wav", "audio/ogg", "audio/webm", "audio/mp4"],
        rejection: "Only MP3, WAV, OGG, WEBM or MP4 audio files are allowed",
    },
];

/// Look up the attachment policy for an operation. Text-only requests have none.
pub fn policy_for(kind: MediaKind) -> Option<&'static MediaPolicy> {
    MEDIA_POLICIES.iter().find(|policy| policy.kind == kind)
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Prompt is required and must be a string")]
    MissingPrompt,

    #[error("{} file is required", .kind.label())]
    MissingAttachment { kind: MediaKind },

    #[error("{rejection}")]
    DisallowedMediaType { media_type: String, rejection: &'static str },
}

/// A request that passed validation: the prompt is present and any attachment matches the
/// operation's policy.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub prompt: String,
    pub upload: Option<Upload>,
}

/// Check a request against the rules for `kind`.
///
/// Text-only requests drop any upload they carry.
pub fn validate(request: GenerationRequest, kind: MediaKind) -> Result<ValidatedRequest, ValidationError> {
    let prompt = match request.prompt {
        Some(prompt) if !prompt.trim().is_empty() => prompt,
        _ => return Err(ValidationError::MissingPrompt),
    };

    let Some(policy) = policy_for(kind) else {
        return Ok(ValidatedRequest { prompt, upload: None });
    };

    let upload = request.upload.ok_or(ValidationError::MissingAttachment { kind })?;

    if !policy.allowed.contains(&upload.media_type.as_str()) {
        return Err(ValidationError::DisallowedMediaType {
            media_type: upload.media_type,
            rejection: policy.rejection,
        });
    }

    Ok(ValidatedRequest {
        prompt,
        upload: Some(upload),
    })
}
