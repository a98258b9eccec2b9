//! HTTP client for a running gateway, used by the `gemini-chat` binary.

use crate::api::models::envelope::ResponseEnvelope;
use crate::gemini::client::ensure_slash;
use crate::types::{MediaKind, Upload};
use anyhow::{Context, anyhow};
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ChatClient {
    /// `base_url` is the gateway root, e.g. `http://localhost:5000`
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client, base_url })
    }

    /// Operation an attachment is sent to, chosen by its MIME prefix
    pub fn kind_for(upload: Option<&Upload>) -> MediaKind {
        upload.map_or(MediaKind::Text, |upload| MediaKind::for_attachment(&upload.media_type))
    }

    fn endpoint(&self, kind: MediaKind) -> anyhow::Result<Url> {
        ensure_slash(&self.base_url)
            .join(&format!("gemini-api{}", kind.route()))
            .context("Failed to construct gateway URL")
    }

    /// Send a prompt, with an optional file, and decode the envelope whatever the status code.
    #[instrument(skip_all, fields(has_attachment = upload.is_some()))]
    pub async fn send(&self, prompt: &str, upload: Option<Upload>) -> anyhow::Result<ResponseEnvelope> {
        let kind = Self::kind_for(upload.as_ref());
        let url = self.endpoint(kind)?;

        let mut form = Form::new().text("prompt", prompt.to_string());
        if let (Some(upload), Some(field)) = (upload, kind.file_field()) {
            let mut part = Part::bytes(upload.bytes.to_vec()).mime_str(&upload.media_type)?;
            if let Some(file_name) = upload.file_name {
                part = part.file_name(file_name);
            }
            form = form.part(field, part);
        }

        debug!(%url, kind = %kind, "Sending prompt to gateway");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach gateway")?;

        let status = response.status();
        response
            .json::<ResponseEnvelope>()
            .await
            .with_context(|| format!("Gateway answered {status} without a response envelope"))
    }
}

/// Read a file from disk into an [`Upload`], guessing its media type from the extension
pub async fn load_upload(path: &Path) -> anyhow::Result<Upload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path.file_name().map(|name| name.to_string_lossy().into_owned());
    Ok(Upload::new(file_name, None, bytes.into()))
}
