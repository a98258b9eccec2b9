//! Test doubles shared by the unit and handler tests.

use crate::attachments::{Attachment, AttachmentStore, LocalAttachmentStore};
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::gemini::GenerateContent;
use crate::gemini::types::{Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part};
use crate::types::Upload;
use async_trait::async_trait;
use axum_test::TestServer;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

enum Script {
    Respond(GenerateContentResponse),
    Fail(String),
}

/// A model that always gives the same answer and records every call it receives.
pub struct ScriptedModel {
    script: Script,
    calls: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedModel {
    pub fn responding(response: GenerateContentResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Respond(response),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Reply with a single candidate holding one text part
    pub fn replying(text: &str) -> Arc<Self> {
        Self::responding(GenerateContentResponse {
            candidates: Some(vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts: Some(vec![Part::text(text)]),
                }),
                finish_reason: Some("STOP".to_string()),
            }]),
            ..Default::default()
        })
    }

    /// Fail every call with an upstream error carrying `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail(message.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, GenerateContentRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerateContent for ScriptedModel {
    async fn generate_content(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse> {
        self.calls.lock().unwrap().push((model.to_string(), request.clone()));
        match &self.script {
            Script::Respond(response) => Ok(response.clone()),
            Script::Fail(message) => Err(Error::Upstream { message: message.clone() }),
        }
    }
}

/// Local storage that counts acquisitions and releases.
pub struct RecordingStore {
    inner: LocalAttachmentStore,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl RecordingStore {
    pub async fn create(base_path: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalAttachmentStore::create(base_path).await.unwrap(),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AttachmentStore for RecordingStore {
    async fn acquire(&self, upload: &Upload) -> Result<Attachment> {
        let attachment = self.inner.acquire(upload).await?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(attachment)
    }

    async fn release(&self, attachment: Attachment) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(attachment).await;
    }
}

pub fn create_test_config(upload_dir: &Path) -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.gemini.api_key = Some("test-key".to_string());
    config.uploads.dir = upload_dir.to_path_buf();
    config
}

/// Build the full router over a scripted model, with uploads in a fresh temp dir.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn create_test_app(model: Arc<ScriptedModel>) -> (TestServer, TempDir) {
    let upload_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(upload_dir.path());

    let app = crate::Application::with_client(config, model)
        .await
        .expect("Failed to create application");

    (app.into_test_server(), upload_dir)
}
