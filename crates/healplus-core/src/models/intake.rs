//! Intake (anamnesis) form models.

use serde::{Deserialize, Serialize};

/// An intake form filled in at the first consultation.
///
/// The structured answers live in `data_json` as an opaque JSON document;
/// the store does not interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeForm {
    /// Local row ID - null until first insert
    pub id: Option<i64>,
    /// Patient full name (links the form to a patient)
    pub full_name: String,
    /// Consultation date (dd/mm/yyyy)
    pub consultation_date: Option<String>,
    /// Where the consultation took place
    pub location: Option<String>,
    /// Structured answers
    pub data_json: String,
    pub archived: bool,
    /// Creation timestamp (epoch millis)
    pub created_at: i64,
    /// Last update timestamp (epoch millis)
    pub updated_at: i64,
}

impl Default for IntakeForm {
    fn default() -> Self {
        Self {
            id: None,
            full_name: String::new(),
            consultation_date: None,
            location: None,
            data_json: "{}".to_string(),
            archived: false,
            created_at: 0,
            updated_at: 0,
        }
    }
}

impl IntakeForm {
    /// Create an unsaved intake form for a patient.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    /// Attach structured answers.
    pub fn with_data(mut self, data: &serde_json::Value) -> Self {
        self.data_json = data.to_string();
        self
    }

    /// Parse the structured answers, falling back to an empty object.
    pub fn data(&self) -> serde_json::Value {
        serde_json::from_str(&self.data_json).unwrap_or_else(|_| serde_json::json!({}))
    }
}
