//! Appointment models.

use serde::{Deserialize, Serialize};

/// Appointment lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Upcoming, reminders pending
    #[default]
    Scheduled,
    /// The consultation took place
    Completed,
    /// Called off
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled consultation.
///
/// `date` and `time` are kept exactly as entered (`dd/mm/yyyy`, `HH:MM`);
/// they are interpreted as wall-clock time in the device's zone only when
/// reminders are computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Appointment {
    /// Local row ID - null until first insert
    pub id: Option<i64>,
    /// Linked patient, if any
    pub patient_id: Option<i64>,
    /// Date (dd/mm/yyyy)
    pub date: String,
    /// Time (HH:MM); reminders assume midnight when absent
    pub time: Option<String>,
    /// Kind of consultation (first visit, follow-up, ...)
    pub consultation_type: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub archived: bool,
    /// Creation timestamp (epoch millis)
    pub created_at: i64,
    /// Last update timestamp (epoch millis)
    pub updated_at: i64,
}

impl Appointment {
    /// Create an unsaved, scheduled appointment.
    pub fn new(date: impl Into<String>, time: Option<String>) -> Self {
        Self {
            date: date.into(),
            time,
            ..Self::default()
        }
    }

    /// Whether reminders should be pending for this appointment.
    pub fn is_scheduled(&self) -> bool {
        self.status == AppointmentStatus::Scheduled && !self.archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse(" Canceled "), Some(AppointmentStatus::Cancelled));
        assert_eq!(AppointmentStatus::parse("postponed"), None);
    }

    #[test]
    fn test_new_appointment_is_scheduled() {
        let appt = Appointment::new("25/12/2025", Some("10:00".into()));
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert!(appt.is_scheduled());
        assert_eq!(appt.id, None);
    }

    #[test]
    fn test_archived_is_not_scheduled() {
        let mut appt = Appointment::new("25/12/2025", None);
        appt.archived = true;
        assert!(!appt.is_scheduled());
    }
}
