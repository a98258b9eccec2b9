//! Base64 encoding of stored attachments.

use crate::attachments::Attachment;
use crate::errors::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::fs;

/// An attachment in transport form: base64 payload plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAttachment {
    pub media_type: String,
    pub data: String,
}

/// Read the stored artifact and encode it. Nothing is cached; every call re-reads the file.
pub async fn encode(attachment: &Attachment) -> Result<EncodedAttachment> {
    let bytes = fs::read(attachment.storage_path())
        .await
        .map_err(|e| Error::io("read attachment", e))?;

    Ok(EncodedAttachment {
        media_type: attachment.media_type().to_string(),
        data: STANDARD.encode(bytes),
    })
}
