//! The four generation endpoints under `/gemini-api`.
//!
//! Every endpoint answers with a [`ResponseEnvelope`]: 200 with `output` on success, 400 for
//! validation failures and 500 for everything else.

use crate::AppState;
use crate::api::models::envelope::ResponseEnvelope;
use crate::api::models::generate::{AudioPromptForm, DocumentPromptForm, ImagePromptForm, TextPrompt};
use crate::errors::{Error, Result};
use crate::types::{GenerationRequest, MediaKind, Upload, normalize_media_type};
use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::header::CONTENT_TYPE,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

const PROMPT_FIELD: &str = "prompt";

/// Prompt and files pulled out of a request body, before validation.
///
/// Accepts `multipart/form-data`, `application/json` and `application/x-www-form-urlencoded`.
/// Any other body is treated as an empty form, so the caller gets the missing-prompt error
/// rather than a content-type complaint. Only the first occurrence of each field is kept.
#[derive(Debug, Default)]
pub struct GenerationForm {
    prompt: Option<String>,
    files: HashMap<&'static str, Upload>,
}

impl GenerationForm {
    /// Keep the upload the given operation expects and drop the rest
    pub fn into_request(mut self, kind: MediaKind) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            upload: kind.file_field().and_then(|field| self.files.remove(field)),
        }
    }

    fn file_field(name: &str) -> Option<(&'static str, MediaKind)> {
        [MediaKind::Image, MediaKind::Document, MediaKind::Audio]
            .into_iter()
            .find_map(|kind| kind.file_field().filter(|field| *field == name).map(|field| (field, kind)))
    }

    async fn from_multipart(mut multipart: Multipart, max_file_size: u64) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == PROMPT_FIELD {
                let text = field.text().await.map_err(multipart_error)?;
                form.prompt.get_or_insert(text);
                continue;
            }

            let Some((file_field, field_kind)) = Self::file_field(&name) else {
                debug!(field = %name, "Ignoring unexpected multipart field");
                continue;
            };
            if form.files.contains_key(file_field) {
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(multipart_error)?;

            if bytes.len() as u64 > max_file_size {
                return Err(Error::BadRequest {
                    message: format!("File exceeds the maximum size of {max_file_size} bytes"),
                });
            }

            form.files.insert(
                file_field,
                Upload::received_as(field_kind, file_name, content_type.as_deref(), bytes),
            );
        }

        Ok(form)
    }
}

fn multipart_error(e: MultipartError) -> Error {
    Error::BadRequest {
        message: format!("Failed to parse multipart data: {}", e.body_text()),
    }
}

impl FromRequest<AppState> for GenerationForm {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(normalize_media_type)
            .unwrap_or_default();

        match content_type.as_str() {
            "multipart/form-data" => {
                let multipart = Multipart::from_request(req, state).await.map_err(|e| Error::BadRequest {
                    message: e.body_text(),
                })?;
                Self::from_multipart(multipart, state.config.uploads.max_file_size).await
            }
            "application/json" => {
                let Json(body) = Json::<serde_json::Value>::from_request(req, state)
                    .await
                    .map_err(|e| Error::BadRequest { message: e.body_text() })?;
                // A non-string prompt is reported the same way as a missing one
                let prompt = body.get(PROMPT_FIELD).and_then(|value| value.as_str()).map(str::to_string);
                Ok(Self {
                    prompt,
                    ..Default::default()
                })
            }
            "application/x-www-form-urlencoded" => {
                let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| Error::BadRequest { message: e.body_text() })?;
                Ok(Self {
                    prompt: fields.remove(PROMPT_FIELD),
                    ..Default::default()
                })
            }
            _ => Ok(Self::default()),
        }
    }
}

async fn respond(state: &AppState, kind: MediaKind, form: GenerationForm) -> Result<Json<ResponseEnvelope>> {
    let output = state.pipeline.run(kind, form.into_request(kind)).await?;
    Ok(Json(ResponseEnvelope::ok(output.into_text())))
}

#[utoipa::path(
    post,
    path = "/generate-text",
    tag = "generation",
    summary = "Generate from text",
    description = "Send a text prompt to the model and return its reply. Accepts a JSON body or a form.",
    request_body(content(
        (TextPrompt = "application/json"),
        (TextPrompt = "multipart/form-data"),
    )),
    responses(
        (status = 200, description = "Model output", body = ResponseEnvelope),
        (status = 400, description = "Prompt missing", body = ResponseEnvelope),
        (status = 500, description = "Upstream failure or empty model output", body = ResponseEnvelope)
    )
)]
#[instrument(skip_all)]
pub async fn generate_text(State(state): State<AppState>, form: GenerationForm) -> Result<Json<ResponseEnvelope>> {
    respond(&state, MediaKind::Text, form).await
}

#[utoipa::path(
    post,
    path = "/generate-from-image",
    tag = "generation",
    summary = "Generate from image",
    description = "Send a prompt together with a PNG or JPEG image.",
    request_body(content = ImagePromptForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Model output", body = ResponseEnvelope),
        (status = 400, description = "Prompt or image missing, or image type not allowed", body = ResponseEnvelope),
        (status = 500, description = "Upstream failure or empty model output", body = ResponseEnvelope)
    )
)]
#[instrument(skip_all)]
pub async fn generate_from_image(State(state): State<AppState>, form: GenerationForm) -> Result<Json<ResponseEnvelope>> {
    respond(&state, MediaKind::Image, form).await
}

#[utoipa::path(
    post,
    path = "/generate-from-document",
    tag = "generation",
    summary = "Generate from document",
    description = "Send a prompt together with a PDF, DOC, DOCX, TXT, XLS or XLSX document.",
    request_body(content = DocumentPromptForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Model output", body = ResponseEnvelope),
        (status = 400, description = "Prompt or document missing, or document type not allowed", body = ResponseEnvelope),
        (status = 500, description = "Upstream failure or empty model output", body = ResponseEnvelope)
    )
)]
#[instrument(skip_all)]
pub async fn generate_from_document(State(state): State<AppState>, form: GenerationForm) -> Result<Json<ResponseEnvelope>> {
    respond(&state, MediaKind::Document, form).await
}

#[utoipa::path(
    post,
    path = "/generate-from-audio",
    tag = "generation",
    summary = "Generate from audio",
    description = "Send a prompt together with an MP3, WAV, OGG, WEBM or MP4 recording.",
    request_body(content = AudioPromptForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Model output", body = ResponseEnvelope),
        (status = 400, description = "Prompt or audio missing, or audio type not allowed", body = ResponseEnvelope),
        (status = 500, description = "Upstream failure or empty model output", body = ResponseEnvelope)
    )
)]
#[instrument(skip_all)]
pub async fn generate_from_audio(State(state): State<AppState>, form: GenerationForm) -> Result<Json<ResponseEnvelope>> {
    respond(&state, MediaKind::Audio, form).await
}
