//! Reminder triggers for scheduled appointments.
//!
//! Each reminder is a one-shot platform trigger identified by an integer
//! request code derived from the appointment ID and the lead time, so
//! registering the same reminder twice replaces it instead of duplicating
//! it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::config::ReminderConfig;
use crate::clock::{Clock, SystemClock};
use crate::models::Appointment;

/// Identity of one reminder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReminderKey {
    pub appointment_id: i64,
    pub hours_before: u32,
}

impl ReminderKey {
    pub fn new(appointment_id: i64, hours_before: u32) -> Self {
        Self {
            appointment_id,
            hours_before,
        }
    }

    /// Platform request code: `appointment_id * 100 + hours_before`.
    ///
    /// `None` when the lead time is 100 hours or more (the slot would
    /// collide with the next appointment's) or when the code does not fit
    /// a 32-bit platform request code.
    pub fn request_code(&self) -> Option<i32> {
        if self.hours_before >= 100 {
            return None;
        }
        let code = self
            .appointment_id
            .checked_mul(100)?
            .checked_add(i64::from(self.hours_before))?;
        i32::try_from(code).ok()
    }
}

/// Data delivered back to the app when a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct ReminderPayload {
    pub appointment_id: i64,
    pub date: String,
    pub time: Option<String>,
    pub hours_before: u32,
}

/// A trigger handed to the alarm service.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderTrigger {
    pub key: ReminderKey,
    pub fire_at: DateTime<Utc>,
    pub payload: ReminderPayload,
}

/// Platform service for one-shot timed triggers.
///
/// Scheduling a request code that is already pending replaces it.
/// Cancelling an unknown request code does nothing.
#[uniffi::export(with_foreign)]
pub trait AlarmService: Send + Sync {
    fn schedule_exact(&self, request_code: i32, fire_at_millis: i64, payload: ReminderPayload);

    fn cancel(&self, request_code: i32);
}

/// A trigger pending in [`MemoryAlarms`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAlarm {
    pub request_code: i32,
    pub fire_at_millis: i64,
    pub payload: ReminderPayload,
}

/// In-process alarm table keyed by request code.
#[derive(Debug, Default)]
pub struct MemoryAlarms {
    pending: Mutex<BTreeMap<i32, PendingAlarm>>,
}

impl MemoryAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending triggers, ordered by request code.
    pub fn pending(&self) -> Vec<PendingAlarm> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, request_code: i32) -> Option<PendingAlarm> {
        self.lock().get(&request_code).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return every trigger due at `now`, earliest first.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<ReminderPayload> {
        let now_millis = now.timestamp_millis();
        let mut pending = self.lock();
        let mut fired: Vec<PendingAlarm> = Vec::new();
        pending.retain(|_, alarm| {
            if alarm.fire_at_millis <= now_millis {
                fired.push(alarm.clone());
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|alarm| alarm.fire_at_millis);
        fired.into_iter().map(|alarm| alarm.payload).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<i32, PendingAlarm>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlarmService for MemoryAlarms {
    fn schedule_exact(&self, request_code: i32, fire_at_millis: i64, payload: ReminderPayload) {
        self.lock().insert(
            request_code,
            PendingAlarm {
                request_code,
                fire_at_millis,
                payload,
            },
        );
    }

    fn cancel(&self, request_code: i32) {
        self.lock().remove(&request_code);
    }
}

/// Computes reminder fire times and registers them with the alarm service.
///
/// Appointment date and time are wall-clock values in `tz`. Lead times
/// registered by this scheduler are remembered per appointment, so
/// cancelling still reaches them after the configured offsets change.
pub struct ReminderScheduler<Tz: TimeZone = Local> {
    alarms: Arc<dyn AlarmService>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    config: ReminderConfig,
    registered: Mutex<BTreeMap<i64, BTreeSet<u32>>>,
}

impl ReminderScheduler<Local> {
    /// Scheduler for the device's zone and the system clock.
    pub fn new(alarms: Arc<dyn AlarmService>, config: ReminderConfig) -> Self {
        Self::with_zone(alarms, Arc::new(SystemClock), Local, config)
    }
}

impl<Tz: TimeZone> ReminderScheduler<Tz> {
    pub fn with_zone(
        alarms: Arc<dyn AlarmService>,
        clock: Arc<dyn Clock>,
        tz: Tz,
        config: ReminderConfig,
    ) -> Self {
        Self {
            alarms,
            clock,
            tz,
            config,
            registered: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn config(&self) -> &ReminderConfig {
        &self.config
    }

    /// Replace the configuration. Reminders already registered keep their
    /// fire times until the appointment is rescheduled.
    pub fn set_config(&mut self, config: ReminderConfig) {
        self.config = config;
    }

    /// The appointment's instant, or `None` if its fields don't parse or
    /// name a wall-clock time that does not exist in the zone.
    pub fn appointment_instant(&self, date: &str, time: Option<&str>) -> Option<DateTime<Utc>> {
        let time = time
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.config.default_time);
        let format = format!("{} {}", self.config.date_format, self.config.time_format);
        let naive = NaiveDateTime::parse_from_str(&format!("{} {}", date.trim(), time), &format).ok()?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Fire time for one lead time, or `None` when it is not strictly in
    /// the future (including unparseable dates).
    pub fn fire_time(&self, appointment: &Appointment, hours_before: u32) -> Option<DateTime<Utc>> {
        let instant = self.appointment_instant(&appointment.date, appointment.time.as_deref())?;
        let fire_at = instant.checked_sub_signed(Duration::hours(i64::from(hours_before)))?;
        (fire_at > self.clock.now()).then_some(fire_at)
    }

    /// Register every reminder still ahead for a scheduled appointment.
    ///
    /// Does nothing for unsaved, archived, completed or cancelled
    /// appointments. Returns the triggers that were registered.
    pub fn register_reminders(&self, appointment: &Appointment) -> Vec<ReminderTrigger> {
        let Some(appointment_id) = appointment.id else {
            tracing::debug!("Skipping reminders for unsaved appointment");
            return Vec::new();
        };
        if !appointment.is_scheduled() {
            return Vec::new();
        }

        let mut triggers = Vec::new();
        for &hours_before in &self.config.offsets_hours {
            let key = ReminderKey::new(appointment_id, hours_before);
            let Some(request_code) = key.request_code() else {
                tracing::warn!(
                    appointment_id,
                    hours_before,
                    "Reminder not scheduled, no valid request code"
                );
                continue;
            };
            let Some(fire_at) = self.fire_time(appointment, hours_before) else {
                tracing::debug!(
                    appointment_id,
                    hours_before,
                    date = %appointment.date,
                    "Reminder not scheduled, fire time unknown or past"
                );
                continue;
            };

            let payload = ReminderPayload {
                appointment_id,
                date: appointment.date.clone(),
                time: appointment.time.clone(),
                hours_before,
            };
            self.alarms
                .schedule_exact(request_code, fire_at.timestamp_millis(), payload.clone());
            self.lock_registered()
                .entry(appointment_id)
                .or_default()
                .insert(hours_before);
            tracing::debug!(request_code, fire_at = %fire_at, "Reminder scheduled");
            triggers.push(ReminderTrigger {
                key,
                fire_at,
                payload,
            });
        }
        triggers
    }

    /// Cancel every reminder slot of an appointment: the configured lead
    /// times plus any registered under an earlier configuration.
    pub fn cancel_reminders(&self, appointment_id: i64) {
        let mut offsets: BTreeSet<u32> = self.config.offsets_hours.iter().copied().collect();
        if let Some(registered) = self.lock_registered().remove(&appointment_id) {
            offsets.extend(registered);
        }
        for hours_before in offsets {
            if let Some(code) = ReminderKey::new(appointment_id, hours_before).request_code() {
                self.alarms.cancel(code);
            }
        }
    }

    fn lock_registered(&self) -> std::sync::MutexGuard<'_, BTreeMap<i64, BTreeSet<u32>>> {
        self.registered.lock().unwrap_or_else(|e| e.into_inner())
    }
}
