//! Chat transcript kept by clients of the gateway.
//!
//! A transcript is an ordered list of [`ChatEntry`] values, oldest first. The browser client
//! keeps its copy in `localStorage`; the `gemini-chat` binary uses [`JsonFileTranscript`], a
//! JSON array on disk in the same shape.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// File sent alongside a user message. Only its description is kept, never the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub media_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>, attachment: Option<AttachmentRef>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            attachment,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            timestamp: Utc::now(),
            attachment: None,
        }
    }
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(&self, entry: ChatEntry) -> anyhow::Result<()>;

    /// Every entry, oldest first
    async fn load_all(&self) -> anyhow::Result<Vec<ChatEntry>>;

    async fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTranscript {
    entries: Mutex<Vec<ChatEntry>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscript {
    async fn append(&self, entry: ChatEntry) -> anyhow::Result<()> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn load_all(&self) -> anyhow::Result<Vec<ChatEntry>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        self.entries.lock().await.clear();
        Ok(())
    }
}

/// Transcript persisted as a pretty-printed JSON array. A missing file is an empty transcript.
///
/// An unreadable or corrupt file is an error rather than a fresh start, so that the next append
/// can't overwrite history it failed to read.
#[derive(Debug)]
pub struct JsonFileTranscript {
    path: PathBuf,
    // Serialises the read-modify-write in `append`
    lock: Mutex<()>,
}

impl JsonFileTranscript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> anyhow::Result<Vec<ChatEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read transcript {}", self.path.display())),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).with_context(|| format!("Transcript {} is not a valid chat history", self.path.display()))
    }

    async fn write(&self, entries: &[ChatEntry]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&self.path, content)
            .await
            .with_context(|| format!("Failed to write transcript {}", self.path.display()))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Saved transcript");
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for JsonFileTranscript {
    async fn append(&self, entry: ChatEntry) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        entries.push(entry);
        self.write(&entries).await
    }

    async fn load_all(&self) -> anyhow::Result<Vec<ChatEntry>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove transcript {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn exercise(store: &dyn TranscriptStore) {
        assert!(store.load_all().await.unwrap().is_empty());

        let attachment = AttachmentRef {
            media_type: "image/png".to_string(),
            file_name: "cat.png".to_string(),
        };
        store.append(ChatEntry::user("Describe", Some(attachment.clone()))).await.unwrap();
        store.append(ChatEntry::bot("A cat on a sofa")).await.unwrap();

        let entries = store.load_all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].sender, Sender::User);
        assert_eq!(entries[0].attachment, Some(attachment));
        assert_eq!(entries[1].sender, Sender::Bot);
        assert_eq!(entries[1].text, "A cat on a sofa");

        store.clear().await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_transcript() {
        exercise(&MemoryTranscript::new()).await;
    }

    #[tokio::test]
    async fn test_json_file_transcript() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&JsonFileTranscript::new(dir.path().join("history").join("chat.json"))).await;
    }

    #[tokio::test]
    async fn test_json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");

        JsonFileTranscript::new(&path).append(ChatEntry::user("Hello", None)).await.unwrap();
        let entries = JsonFileTranscript::new(&path).load_all().await.unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Hello");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error_and_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, "{not a list").unwrap();

        let store = JsonFileTranscript::new(&path);
        assert!(store.load_all().await.is_err());
        assert!(store.append(ChatEntry::bot("lost?")).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not a list");
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = ChatEntry {
            sender: Sender::Bot,
            text: "Hi there".to_string(),
            timestamp: "2024-05-01T10:00:00Z".parse().unwrap(),
            attachment: None,
        };

        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"sender": "bot", "text": "Hi there", "timestamp": "2024-05-01T10:00:00Z"})
        );
    }
}
