//! HTTP client for the Gemini API.

use super::types::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};
use crate::config::GeminiConfig;
use crate::errors::{Error, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

/// A trait for calling `generateContent`.
/// In practise this goes over http to the Gemini API using `reqwest`, see [`GeminiClient`].
/// Tests substitute scripted implementations.
#[async_trait]
pub trait GenerateContent: Send + Sync {
    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse>;
}

/// The concrete implementation of `GenerateContent`.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GeminiClient {
    const API_KEY_HEADER: &'static str = "x-goog-api-key";

    pub fn new(config: &GeminiConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("gemini.api_key is not configured"))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> Result<Url> {
        let model = model.trim_start_matches("models/");
        ensure_slash(&self.base_url)
            .join(&format!("v1beta/models/{model}:generateContent"))
            .map_err(|e| Error::Other(anyhow!("Failed to construct generateContent URL: {}", e)))
    }
}

/// Makes sure a url has a trailing slash.
///
/// `Url::join` replaces the last path segment unless the base ends in '/', so
/// 'https://host/proxy' joined with 'v1beta' would give 'https://host/v1beta'.
pub(crate) fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[async_trait]
impl GenerateContent for GeminiClient {
    #[instrument(skip(self, request), err)]
    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model)?;
        debug!("Calling generateContent at {}", url);

        let response = self
            .client
            .post(url)
            .header(Self::API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Upstream { message: e.to_string() })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Upstream { message: e.to_string() })?;

        if !status.is_success() {
            // Google wraps failures as {"error": {"message": ...}}; pass that message through as-is
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => format!("Gemini API error: {} - {}", status, body),
            };
            return Err(Error::Upstream { message });
        }

        serde_json::from_str::<GenerateContentResponse>(&body).map_err(|e| {
            tracing::error!("Failed to parse generateContent response as JSON. Error: {}", e);
            tracing::debug!("Response body was: {}", body);
            Error::Upstream {
                message: format!("error decoding response body: {}", e),
            }
        })
    }
}
