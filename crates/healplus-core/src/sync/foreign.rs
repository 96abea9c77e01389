//! Remote mirror backed by a host-side document store client.

use std::sync::Arc;

use async_trait::async_trait;

use super::payload::Document;
use super::remote::{RemoteError, RemoteMirror, RemoteResult};

/// Document store client implemented by the host platform.
///
/// Each call blocks until the store acknowledges or rejects the write. It
/// runs on a blocking worker thread, never on the caller's UI thread.
#[uniffi::export(with_foreign)]
pub trait MirrorTransport: Send + Sync {
    /// Merge the JSON object `fields_json` into `collection/document_id`,
    /// creating the document when absent.
    fn merge_upsert(
        &self,
        collection: String,
        document_id: String,
        fields_json: String,
    ) -> Result<(), RemoteError>;
}

/// Adapts a [`MirrorTransport`] to [`RemoteMirror`].
pub struct ForeignMirror {
    transport: Arc<dyn MirrorTransport>,
}

impl ForeignMirror {
    pub fn new(transport: Arc<dyn MirrorTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RemoteMirror for ForeignMirror {
    async fn merge_upsert(
        &self,
        collection: &str,
        document_id: &str,
        fields: Document,
    ) -> RemoteResult<()> {
        let fields_json = serde_json::to_string(&fields)?;
        let transport = Arc::clone(&self.transport);
        let collection = collection.to_string();
        let document_id = document_id.to_string();

        tokio::task::spawn_blocking(move || {
            transport.merge_upsert(collection, document_id, fields_json)
        })
        .await
        .map_err(|e| RemoteError::Unavailable(format!("transport call did not complete: {}", e)))?
    }
}
