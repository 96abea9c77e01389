//! Reminder configuration.

use serde::{Deserialize, Serialize};

/// Alert channel used for appointment reminders.
pub const DEFAULT_CHANNEL_ID: &str = "healplus_appointments";

/// Reminder scheduling and presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReminderConfig {
    /// Lead times, in hours before the appointment
    pub offsets_hours: Vec<u32>,
    /// Alert channel for reminders and the daily digest
    pub channel_id: String,
    /// `chrono` format of the appointment date field
    pub date_format: String,
    /// `chrono` format of the appointment time field
    pub time_format: String,
    /// Time assumed when an appointment has none
    pub default_time: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            offsets_hours: vec![24, 1],
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            date_format: "%d/%m/%Y".to_string(),
            time_format: "%H:%M".to_string(),
            default_time: "00:00".to_string(),
        }
    }
}

impl ReminderConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReminderConfig::default();
        assert_eq!(config.offsets_hours, vec![24, 1]);
        assert_eq!(config.channel_id, "healplus_appointments");
        assert_eq!(config.default_time, "00:00");
    }

    #[test]
    fn test_partial_json() {
        let config = ReminderConfig::from_json(r#"{"offsets_hours": [2]}"#).unwrap();
        assert_eq!(config.offsets_hours, vec![2]);
        assert_eq!(config.date_format, "%d/%m/%Y");
    }
}
