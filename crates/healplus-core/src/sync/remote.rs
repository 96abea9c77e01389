//! Remote mirror client abstraction.
//!
//! The mirror is a document store addressed by collection and document ID.
//! Writes are merge-upserts: the document is created when absent, and only
//! the supplied fields are overwritten when present.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::payload::Document;

/// Remote mirror errors. Also returned by host-implemented transports.
#[derive(Error, Debug, Clone, PartialEq, uniffi::Error)]
pub enum RemoteError {
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for RemoteError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        RemoteError::Unavailable(e.reason)
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Client for the remote document store.
#[async_trait]
pub trait RemoteMirror: Send + Sync {
    /// Merge `fields` into `collection/document_id`, creating it if needed.
    async fn merge_upsert(
        &self,
        collection: &str,
        document_id: &str,
        fields: Document,
    ) -> RemoteResult<()>;
}

/// A recorded upsert call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertCall {
    pub collection: String,
    pub document_id: String,
    pub fields: Document,
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<(String, String), Document>,
    calls: Vec<UpsertCall>,
    failures_remaining: usize,
    offline: bool,
}

/// In-process document store with merge-upsert semantics.
///
/// Used as an offline mirror and as the test double for the coordinator.
/// Every call is recorded, including failed ones.
#[derive(Default)]
pub struct MemoryMirror {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl MemoryMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every upsert by `latency` before it lands.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next `count` upserts.
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// Fail every upsert until switched back online.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Current content of a document.
    pub fn document(&self, collection: &str, document_id: &str) -> Option<Document> {
        self.lock()
            .documents
            .get(&(collection.to_string(), document_id.to_string()))
            .cloned()
    }

    /// Number of documents in a collection.
    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .documents
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }

    /// Every upsert attempted so far, in arrival order.
    pub fn calls(&self) -> Vec<UpsertCall> {
        self.lock().calls.clone()
    }

    /// Upserts attempted against one document.
    pub fn calls_for(&self, collection: &str, document_id: &str) -> Vec<UpsertCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.collection == collection && c.document_id == document_id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RemoteMirror for MemoryMirror {
    async fn merge_upsert(
        &self,
        collection: &str,
        document_id: &str,
        fields: Document,
    ) -> RemoteResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        state.calls.push(UpsertCall {
            collection: collection.to_string(),
            document_id: document_id.to_string(),
            fields: fields.clone(),
        });

        if state.offline {
            return Err(RemoteError::Unavailable("mirror offline".into()));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(RemoteError::Unavailable("injected failure".into()));
        }

        state
            .documents
            .entry((collection.to_string(), document_id.to_string()))
            .or_default()
            .extend(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, serde_json::Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_upsert_creates_document() {
        let mirror = MemoryMirror::new();
        mirror
            .merge_upsert("patients", "1", fields(&[("full_name", json!("Maria"))]))
            .await
            .unwrap();

        let doc = mirror.document("patients", "1").unwrap();
        assert_eq!(doc["full_name"], json!("Maria"));
        assert_eq!(mirror.document_count("patients"), 1);
    }

    #[tokio::test]
    async fn test_upsert_merges_fields() {
        let mirror = MemoryMirror::new();
        mirror
            .merge_upsert(
                "patients",
                "1",
                fields(&[("full_name", json!("Maria")), ("phone", json!("123"))]),
            )
            .await
            .unwrap();
        mirror
            .merge_upsert("patients", "1", fields(&[("full_name", json!("Maria S."))]))
            .await
            .unwrap();

        let doc = mirror.document("patients", "1").unwrap();
        assert_eq!(doc["full_name"], json!("Maria S."));
        // Unspecified fields survive the merge
        assert_eq!(doc["phone"], json!("123"));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mirror = MemoryMirror::new();
        mirror.fail_next(1);

        let first = mirror
            .merge_upsert("patients", "1", fields(&[("full_name", json!("Maria"))]))
            .await;
        assert!(matches!(first, Err(RemoteError::Unavailable(_))));
        assert!(mirror.document("patients", "1").is_none());

        mirror
            .merge_upsert("patients", "1", fields(&[("full_name", json!("Maria"))]))
            .await
            .unwrap();
        assert_eq!(mirror.calls_for("patients", "1").len(), 2);
    }

    #[tokio::test]
    async fn test_offline_mirror() {
        let mirror = MemoryMirror::new();
        mirror.set_offline(true);
        assert!(mirror
            .merge_upsert("appointments", "1", Document::new())
            .await
            .is_err());

        mirror.set_offline(false);
        assert!(mirror
            .merge_upsert("appointments", "1", Document::new())
            .await
            .is_ok());
    }
}
