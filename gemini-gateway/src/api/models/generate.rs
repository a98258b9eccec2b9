//! Request body shapes for the generation endpoints.
//!
//! These only describe the accepted bodies in the OpenAPI document. Parsing is done by
//! [`crate::api::handlers::generate::GenerationForm`], which tolerates missing fields so that
//! validation can report them with the documented messages.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Text-only generation request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextPrompt {
    /// Instruction sent to the model
    #[schema(example = "Write a haiku about autumn")]
    pub prompt: String,
}

/// Prompt plus a PNG or JPEG image
#[derive(Debug, ToSchema)]
pub struct ImagePromptForm {
    pub prompt: String,
    /// PNG or JPEG image
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

/// Prompt plus a document
#[derive(Debug, ToSchema)]
pub struct DocumentPromptForm {
    pub prompt: String,
    /// PDF, DOC, DOCX, TXT, XLS or XLSX document
    #[schema(value_type = String, format = Binary)]
    pub document: Vec<u8>,
}

/// Prompt plus an audio recording
#[derive(Debug, ToSchema)]
pub struct AudioPromptForm {
    pub prompt: String,
    /// MP3, WAV, OGG, WEBM or MP4 audio
    #[schema(value_type = String, format = Binary)]
    pub audio: Vec<u8>,
}
