//! Alerts for fired reminders.
//!
//! Rendering is pure: the platform hands back the payload it was given at
//! registration and gets an alert to show. Presenting it is left to a
//! [`NotificationPresenter`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use super::config::ReminderConfig;
use super::scheduler::ReminderPayload;
use crate::models::Appointment;

/// Display ID of the daily digest alert.
pub const DAILY_DIGEST_ID: i64 = 1000;

/// Appointments listed in the daily digest.
pub const DIGEST_MAX_LINES: usize = 5;

/// Screen opened by tapping the daily digest.
pub const DIGEST_ROUTE: &str = "appointments/today";

/// Screen opened by tapping a reminder for `appointment_id`.
pub fn appointment_route(appointment_id: i64) -> String {
    format!("appointments/{}", appointment_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum AlertPriority {
    Default,
    High,
}

/// A user-visible alert, ready for the platform notification API.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct ReminderAlert {
    /// Showing an alert with the same ID replaces the previous one
    pub display_id: i64,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub big_text: String,
    /// Inbox-style lines (digest only)
    pub lines: Vec<String>,
    pub priority: AlertPriority,
    /// Dismiss the alert when tapped
    pub auto_cancel: bool,
    /// In-app route opened when the alert is tapped
    pub tap_route: String,
}

/// Render the alert for a fired reminder on the default channel.
pub fn render_reminder(payload: &ReminderPayload) -> ReminderAlert {
    render_reminder_with(payload, &ReminderConfig::default())
}

/// Render the alert for a fired reminder.
pub fn render_reminder_with(payload: &ReminderPayload, config: &ReminderConfig) -> ReminderAlert {
    let time = payload.time.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let text = match time {
        Some(time) => format!(
            "Appointment in {}h: {} {}",
            payload.hours_before, payload.date, time
        ),
        None => format!("Appointment in {}h: {}", payload.hours_before, payload.date),
    };

    ReminderAlert {
        display_id: payload.appointment_id,
        channel_id: config.channel_id.clone(),
        title: "Appointment reminder".to_string(),
        text,
        big_text: format!(
            "You have an appointment scheduled for {} at {}",
            payload.date,
            time.unwrap_or("time not set")
        ),
        lines: Vec::new(),
        priority: AlertPriority::High,
        auto_cancel: true,
        tap_route: appointment_route(payload.appointment_id),
    }
}

/// Summary of today's appointments, or `None` when there are none.
pub fn render_daily_digest(
    appointments: &[Appointment],
    config: &ReminderConfig,
) -> Option<ReminderAlert> {
    if appointments.is_empty() {
        return None;
    }

    let text = match appointments.len() {
        1 => "You have 1 appointment today".to_string(),
        n => format!("You have {} appointments today", n),
    };
    let lines = appointments
        .iter()
        .take(DIGEST_MAX_LINES)
        .map(|a| format!("{} - {}", a.date, a.time.as_deref().unwrap_or("")))
        .collect();

    Some(ReminderAlert {
        display_id: DAILY_DIGEST_ID,
        channel_id: config.channel_id.clone(),
        title: "Today's appointments".to_string(),
        big_text: text.clone(),
        text,
        lines,
        priority: AlertPriority::Default,
        auto_cancel: true,
        tap_route: DIGEST_ROUTE.to_string(),
    })
}

/// Shows and withdraws alerts on the platform.
pub trait NotificationPresenter: Send + Sync {
    fn present(&self, alert: ReminderAlert);

    fn cancel(&self, display_id: i64);
}

/// Render a fired reminder and present it. Returns the display ID.
pub fn dispatch(
    presenter: &dyn NotificationPresenter,
    payload: &ReminderPayload,
    config: &ReminderConfig,
) -> i64 {
    let alert = render_reminder_with(payload, config);
    let display_id = alert.display_id;
    tracing::debug!(display_id, hours_before = payload.hours_before, "Presenting reminder");
    presenter.present(alert);
    display_id
}

#[derive(Debug, Default)]
struct PresenterState {
    shown: BTreeMap<i64, ReminderAlert>,
    history: Vec<ReminderAlert>,
}

/// Presenter that keeps alerts in memory.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    state: Mutex<PresenterState>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts currently shown, one per display ID.
    pub fn shown(&self) -> Vec<ReminderAlert> {
        self.lock().shown.values().cloned().collect()
    }

    /// Every alert presented, in order.
    pub fn history(&self) -> Vec<ReminderAlert> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PresenterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn present(&self, alert: ReminderAlert) {
        let mut state = self.lock();
        state.history.push(alert.clone());
        state.shown.insert(alert.display_id, alert);
    }

    fn cancel(&self, display_id: i64) {
        self.lock().shown.remove(&display_id);
    }
}
