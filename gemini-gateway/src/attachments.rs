//! Request-scoped attachment storage.
//!
//! An uploaded file is written to the scratch directory once it has passed validation, read
//! back by the encoder, and removed when the request finishes. Each acquired [`Attachment`] is
//! deleted exactly once: by [`AttachmentStore::release`] on every normal exit path, or by its
//! `Drop` impl if the request future is dropped before release runs.

use crate::errors::{Error, Result};
use crate::types::{AttachmentId, Upload, abbrev_uuid};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// A stored upload, owned by the request that created it.
#[derive(Debug)]
pub struct Attachment {
    id: AttachmentId,
    storage_path: PathBuf,
    media_type: String,
    size_bytes: u64,
    released: bool,
}

impl Attachment {
    pub fn id(&self) -> AttachmentId {
        self.id
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    fn mark_released(&mut self) {
        self.released = true;
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.storage_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(attachment_id = %abbrev_uuid(&self.id), error = %e, "Failed to remove abandoned attachment");
        }
    }
}

/// Trait for attachment storage backends
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Persist an upload under a fresh path
    async fn acquire(&self, upload: &Upload) -> Result<Attachment>;

    /// Delete the stored artifact. Failures are logged, never returned.
    async fn release(&self, attachment: Attachment);
}

/// Local filesystem storage backend - one file per attachment in a scratch directory
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    base_path: PathBuf,
}

impl LocalAttachmentStore {
    /// Use `base_path` as the scratch directory, creating it if absent
    pub async fn create(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| Error::io(format!("create upload directory {}", base_path.display()), e))?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    async fn write(path: &Path, upload: &Upload) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(&upload.bytes).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn acquire(&self, upload: &Upload) -> Result<Attachment> {
        let id = Uuid::new_v4();
        let storage_path = self.base_path.join(format!("{id}.upload"));

        if let Err(e) = Self::write(&storage_path, upload).await {
            // Partially written files would otherwise outlive the request
            let _ = fs::remove_file(&storage_path).await;
            return Err(Error::io("store attachment", e));
        }

        debug!(
            attachment_id = %abbrev_uuid(&id),
            media_type = %upload.media_type,
            size_bytes = upload.size_bytes(),
            "Stored attachment"
        );

        Ok(Attachment {
            id,
            storage_path,
            media_type: upload.media_type.clone(),
            size_bytes: upload.size_bytes(),
            released: false,
        })
    }

    async fn release(&self, mut attachment: Attachment) {
        match fs::remove_file(&attachment.storage_path).await {
            Ok(()) => debug!(attachment_id = %abbrev_uuid(&attachment.id), "Released attachment"),
            Err(e) => warn!(
                attachment_id = %abbrev_uuid(&attachment.id),
                path = %attachment.storage_path.display(),
                error = %e,
                "Failed to release attachment"
            ),
        }
        attachment.mark_released();
    }
}
