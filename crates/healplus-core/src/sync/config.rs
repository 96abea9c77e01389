//! Sync configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote collection names, one per record category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollectionNames {
    pub patients: String,
    pub intake_forms: String,
    pub appointments: String,
    pub profile_settings: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            patients: "patients".to_string(),
            intake_forms: "intake_forms".to_string(),
            appointments: "appointments".to_string(),
            profile_settings: "profile_settings".to_string(),
        }
    }
}

/// Sync coordinator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a snapshot is processed (milliseconds)
    pub debounce_ms: u64,
    /// Remote collection names
    pub collections: CollectionNames,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            collections: CollectionNames::default(),
        }
    }
}

impl SyncConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
