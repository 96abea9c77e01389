//! Home screen summary.

use chrono::{Datelike, Days, NaiveDate};

use super::appointments::APPOINTMENT_DATE_FORMAT;
use super::{Database, DbResult};
use crate::models::Appointment;

/// Days ahead (inclusive) covered by the upcoming list.
pub const UPCOMING_WINDOW_DAYS: u64 = 7;
/// Appointments shown in the upcoming list.
pub const UPCOMING_LIMIT: usize = 5;
/// Entries shown in the activity feed.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;
const RECENT_PER_KIND: usize = 3;

/// Kind of record behind an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum ActivityKind {
    IntakeForm,
    Appointment,
}

/// One entry of the recent activity feed.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub record_id: i64,
    pub title: String,
    pub subtitle: String,
    /// Last update of the record (epoch millis)
    pub timestamp: i64,
}

/// Counts and short lists for the home screen, as of a given day.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_patients: u32,
    pub total_intake_forms: u32,
    /// Intake forms whose consultation date falls in the current month
    pub intake_forms_this_month: u32,
    /// Scheduled appointments in the next week, soonest first
    pub upcoming: Vec<Appointment>,
    pub pending_appointments: u32,
    /// Latest edits across intake forms and appointments, newest first
    pub recent_activity: Vec<ActivityItem>,
}

impl Database {
    /// Build the home screen summary for `today`.
    pub fn dashboard_summary(&self, today: NaiveDate) -> DbResult<DashboardSummary> {
        let forms = self.list_active_intake_forms()?;
        let intake_forms_this_month = forms
            .iter()
            .filter_map(|f| f.consultation_date.as_deref())
            .filter_map(|d| NaiveDate::parse_from_str(d.trim(), APPOINTMENT_DATE_FORMAT).ok())
            .filter(|d| d.year() == today.year() && d.month() == today.month())
            .count() as u32;

        let horizon = today
            .checked_add_days(Days::new(UPCOMING_WINDOW_DAYS))
            .unwrap_or(NaiveDate::MAX);
        let upcoming = self
            .list_upcoming_appointments(today)?
            .into_iter()
            .filter(|a| a.is_scheduled())
            .filter(|a| {
                NaiveDate::parse_from_str(a.date.trim(), APPOINTMENT_DATE_FORMAT)
                    .map(|d| d <= horizon)
                    .unwrap_or(false)
            })
            .take(UPCOMING_LIMIT)
            .collect();

        let mut appointments = self.list_active_appointments()?;
        appointments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        // Intake forms come back newest first already.
        let mut recent_activity: Vec<ActivityItem> = forms
            .iter()
            .take(RECENT_PER_KIND)
            .filter_map(|f| {
                Some(ActivityItem {
                    kind: ActivityKind::IntakeForm,
                    record_id: f.id?,
                    title: format!("Intake form: {}", f.full_name),
                    subtitle: f
                        .consultation_date
                        .clone()
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or_else(|| "No date".to_string()),
                    timestamp: f.updated_at,
                })
            })
            .chain(appointments.iter().take(RECENT_PER_KIND).filter_map(|a| {
                Some(ActivityItem {
                    kind: ActivityKind::Appointment,
                    record_id: a.id?,
                    title: format!("Appointment {}", a.status),
                    subtitle: match a.time.as_deref().map(str::trim) {
                        Some(time) if !time.is_empty() => format!("{} {}", a.date, time),
                        _ => a.date.clone(),
                    },
                    timestamp: a.updated_at,
                })
            }))
            .collect();
        recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent_activity.truncate(RECENT_ACTIVITY_LIMIT);

        Ok(DashboardSummary {
            total_patients: self.count_active_patients()?,
            total_intake_forms: forms.len() as u32,
            intake_forms_this_month,
            upcoming,
            pending_appointments: self.count_pending_appointments()?,
            recent_activity,
        })
    }
}
