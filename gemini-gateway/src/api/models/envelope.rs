use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform response body for every generation endpoint.
///
/// Exactly one of `output` and `error` is present: `output` when `success` is true, `error`
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResponseEnvelope {
    pub success: bool,
    /// Text generated by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "The image shows a cat sleeping on a sofa.")]
    pub output: Option<String>,
    /// Human-readable failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Prompt is required and must be a string")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}
