use crate::api::models::envelope::ResponseEnvelope;
use crate::validation::ValidationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data: missing prompt, missing attachment or a disallowed media type
    #[error("{message}")]
    BadRequest { message: String },

    /// The model answered without any usable text
    #[error("No valid output from model")]
    EmptyResult,

    /// The generation call itself failed; the message is passed through untouched
    #[error("{message}")]
    Upstream { message: String },

    /// Attachment could not be written or read back
    #[error("Failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::EmptyResult | Error::Upstream { .. } | Error::Io { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message placed in the response envelope
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::Upstream { message } => message.clone(),
            Error::EmptyResult | Error::Io { .. } => self.to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::BadRequest { message: err.to_string() }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Other(_) | Error::Io { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Upstream { .. } => {
                tracing::error!("Upstream generation error: {}", self);
            }
            Error::EmptyResult => {
                tracing::warn!("Model returned no usable output");
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(ResponseEnvelope::failure(self.user_message()))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_status_codes() {
        let bad = Error::BadRequest {
            message: "nope".to_string(),
        };
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::EmptyResult.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            Error::Upstream {
                message: "quota exceeded".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = Error::io("read attachment", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(io.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_other_errors_hide_details() {
        let err = Error::Other(anyhow::anyhow!("connection pool exhausted"));
        assert_eq!(err.user_message(), "Internal server error");
    }

    #[test]
    fn test_validation_error_becomes_bad_request() {
        let err: Error = ValidationError::MissingPrompt.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Prompt is required and must be a string");
    }

    #[tokio::test]
    async fn test_upstream_error_renders_envelope() {
        let response = Error::Upstream {
            message: "quota exceeded".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let envelope: ResponseEnvelope = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope, ResponseEnvelope::failure("quota exceeded"));
    }
}
