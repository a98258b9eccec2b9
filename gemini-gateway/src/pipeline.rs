//! The request pipeline shared by all four generation operations.
//!
//! Validate → acquire attachment → encode → dispatch → release. Validation happens before
//! anything is written to storage. Once an attachment is acquired, release runs whatever the
//! outcome of encoding or dispatch.

use crate::attachments::{Attachment, AttachmentStore};
use crate::encoder;
use crate::errors::Result;
use crate::gemini::{Dispatcher, GenerationOutput};
use crate::metrics;
use crate::types::{GenerationRequest, MediaKind, abbrev_uuid};
use crate::validation::{self, ValidatedRequest};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn AttachmentStore>,
    dispatcher: Dispatcher,
}

impl Pipeline {
    pub fn new(store: Arc<dyn AttachmentStore>, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Run one request for the given operation.
    #[instrument(skip_all, fields(kind = %kind))]
    pub async fn run(&self, kind: MediaKind, request: GenerationRequest) -> Result<GenerationOutput> {
        let result = self.execute(kind, request).await;
        metrics::record_generation(kind, &result);
        result
    }

    async fn execute(&self, kind: MediaKind, request: GenerationRequest) -> Result<GenerationOutput> {
        let ValidatedRequest { prompt, upload } = validation::validate(request, kind)?;

        let Some(upload) = upload else {
            return self.dispatcher.generate(&prompt, None).await;
        };

        let attachment = self.store.acquire(&upload).await?;
        info!(
            attachment_id = %abbrev_uuid(&attachment.id()),
            media_type = %attachment.media_type(),
            size_bytes = attachment.size_bytes(),
            "Dispatching prompt with attachment"
        );

        let outcome = self.dispatch_with(&prompt, &attachment).await;
        self.store.release(attachment).await;
        outcome
    }

    async fn dispatch_with(&self, prompt: &str, attachment: &Attachment) -> Result<GenerationOutput> {
        let encoded = encoder::encode(attachment).await?;
        self.dispatcher.generate(prompt, Some(encoded)).await
    }
}
