//! Change-hash cache.
//!
//! Remembers, per document ID, the hash of the last payload the remote
//! mirror acknowledged. Lives only as long as its owner; an empty cache
//! treats every record as changed.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::payload::Document;

/// Deterministic hash of a hashable payload.
///
/// SHA-256 over the entries in key order, truncated to the first 8 bytes.
pub fn payload_hash(doc: &Document) -> u64 {
    let mut hasher = Sha256::new();
    for (key, value) in doc {
        hasher.update(key.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.to_string().as_bytes());
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Last mirrored payload hash per document ID.
#[derive(Debug, Default, Clone)]
pub struct ChangeHashCache {
    entries: HashMap<String, u64>,
}

impl ChangeHashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `hash` is what the mirror last acknowledged for `document_id`.
    pub fn is_current(&self, document_id: &str, hash: u64) -> bool {
        self.entries.get(document_id) == Some(&hash)
    }

    /// Record a successful upsert.
    pub fn record(&mut self, document_id: impl Into<String>, hash: u64) {
        self.entries.insert(document_id.into(), hash);
    }

    pub fn get(&self, document_id: &str) -> Option<u64> {
        self.entries.get(document_id).copied()
    }

    /// Forget a document so its next snapshot is uploaded again.
    pub fn invalidate(&mut self, document_id: &str) -> bool {
        self.entries.remove(document_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
