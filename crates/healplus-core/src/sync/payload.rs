//! Mirror payloads for each record category.
//!
//! A hashable payload holds exactly the fields compared for change
//! detection. It never carries a timestamp, and blank optional fields are
//! left out rather than uploaded empty.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::models::{Appointment, IntakeForm, Patient, ProfileSettings};

/// An ordered field map, as written to the remote mirror.
pub type Document = BTreeMap<String, Value>;

/// Field carrying the upload time in every mirrored document.
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// A record that can be mirrored to the remote document store.
pub trait Syncable {
    /// Remote document ID, or `None` for a record that was never persisted.
    fn document_id(&self) -> Option<String>;

    /// Fields compared for change detection (no timestamps).
    fn hashable_payload(&self) -> Document;
}

/// Hashable payload plus a fresh upload timestamp.
pub fn upload_payload(mut fields: Document, now: DateTime<Utc>) -> Document {
    fields.insert(
        UPDATED_AT_FIELD.to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    fields
}

fn put(doc: &mut Document, key: &str, value: impl Into<Value>) {
    doc.insert(key.to_string(), value.into());
}

fn put_non_blank(doc: &mut Document, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        put(doc, key, v);
    }
}

impl Syncable for Patient {
    fn document_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn hashable_payload(&self) -> Document {
        let mut doc = Document::new();
        put(&mut doc, "full_name", self.full_name.as_str());
        put_non_blank(&mut doc, "birth_date", &self.birth_date);
        put_non_blank(&mut doc, "phone", &self.phone);
        put_non_blank(&mut doc, "email", &self.email);
        put_non_blank(&mut doc, "occupation", &self.occupation);
        put_non_blank(&mut doc, "marital_status", &self.marital_status);
        put_non_blank(&mut doc, "notes", &self.notes);
        doc
    }
}

impl Syncable for IntakeForm {
    fn document_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn hashable_payload(&self) -> Document {
        let mut doc = Document::new();
        put(&mut doc, "full_name", self.full_name.as_str());
        put(&mut doc, "data_json", self.data_json.as_str());
        put_non_blank(&mut doc, "consultation_date", &self.consultation_date);
        put_non_blank(&mut doc, "location", &self.location);
        doc
    }
}

impl Syncable for Appointment {
    fn document_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string())
    }

    fn hashable_payload(&self) -> Document {
        let mut doc = Document::new();
        put(&mut doc, "status", self.status.as_str());
        put(&mut doc, "date", self.date.as_str());
        if let Some(patient_id) = self.patient_id {
            put(&mut doc, "patient_id", patient_id);
        }
        put_non_blank(&mut doc, "time", &self.time);
        put_non_blank(&mut doc, "consultation_type", &self.consultation_type);
        put_non_blank(&mut doc, "notes", &self.notes);
        doc
    }
}

impl Syncable for ProfileSettings {
    fn document_id(&self) -> Option<String> {
        Some(self.device_id.clone()).filter(|id| !id.trim().is_empty())
    }

    fn hashable_payload(&self) -> Document {
        let mut doc = Document::new();
        put(&mut doc, "dark_mode", self.settings.dark_mode);
        put(&mut doc, "high_contrast", self.settings.high_contrast);
        put(&mut doc, "font_scale", self.settings.font_scale);
        put(&mut doc, "language", self.settings.language.as_str());
        put(&mut doc, "device_id", self.device_id.as_str());
        doc
    }
}
