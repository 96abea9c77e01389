//! Patient models.

use serde::{Deserialize, Serialize};

/// A patient record.
///
/// `id` is assigned by the local store on first insert; a patient that has
/// never been saved has no identifier and is never mirrored remotely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Patient {
    /// Local row ID - null until first insert
    pub id: Option<i64>,
    /// Full name, also used to link intake forms
    pub full_name: String,
    /// Date of birth (dd/mm/yyyy as entered)
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub marital_status: Option<String>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Archived records are hidden from active lists and never synced
    pub archived: bool,
    /// Creation timestamp (epoch millis, set by the store)
    pub created_at: i64,
    /// Last update timestamp (epoch millis, set by the store)
    pub updated_at: i64,
}

impl Patient {
    /// Create an unsaved patient with the required fields.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    /// Check if this patient has been persisted locally.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Case-insensitive substring match on the name.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.full_name.to_lowercase().contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("Maria Souza");
        assert_eq!(patient.full_name, "Maria Souza");
        assert!(!patient.is_persisted());
        assert!(!patient.archived);
        assert_eq!(patient.phone, None);
    }

    #[test]
    fn test_matches_query() {
        let patient = Patient::new("Maria Souza");
        assert!(patient.matches_query("souza"));
        assert!(patient.matches_query("  MARIA "));
        assert!(patient.matches_query(""));
        assert!(!patient.matches_query("joao"));
    }
}
