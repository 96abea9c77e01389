//! Appointment lifecycle with reminder policy.

use std::sync::Arc;

use chrono::{Local, TimeZone};

use super::scheduler::{ReminderScheduler, ReminderTrigger};
use crate::db::DbResult;
use crate::models::{Appointment, AppointmentStatus};
use crate::store::LocalStore;

/// Writes appointments through the local store and keeps their reminders
/// in step: scheduled appointments hold their pending reminders, every
/// other state holds none.
pub struct AppointmentDesk<Tz: TimeZone = Local> {
    store: Arc<LocalStore>,
    scheduler: ReminderScheduler<Tz>,
}

impl<Tz: TimeZone> AppointmentDesk<Tz> {
    pub fn new(store: Arc<LocalStore>, scheduler: ReminderScheduler<Tz>) -> Self {
        Self { store, scheduler }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn scheduler(&self) -> &ReminderScheduler<Tz> {
        &self.scheduler
    }

    /// Save a new or edited appointment and reschedule its reminders.
    ///
    /// An edited appointment loses its pending reminders before the write,
    /// so a failed save never leaves triggers for the old date behind.
    pub fn save(&self, appointment: &Appointment) -> DbResult<i64> {
        if let Some(id) = appointment.id {
            self.scheduler.cancel_reminders(id);
        }
        let id = self.store.save_appointment(appointment)?;
        self.reschedule(id)?;
        Ok(id)
    }

    /// Change an appointment's status. Returns `false` if it doesn't exist.
    pub fn update_status(&self, id: i64, status: AppointmentStatus) -> DbResult<bool> {
        if !self.store.update_appointment_status(id, status)? {
            return Ok(false);
        }
        match status {
            AppointmentStatus::Scheduled => {
                self.reschedule(id)?;
            }
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => {
                self.scheduler.cancel_reminders(id);
            }
        }
        Ok(true)
    }

    /// Archive an appointment, cancelling its reminders first.
    pub fn archive(&self, id: i64) -> DbResult<bool> {
        self.scheduler.cancel_reminders(id);
        self.store.archive_appointment(id)
    }

    /// Restore an archived appointment and its reminders.
    pub fn unarchive(&self, id: i64) -> DbResult<bool> {
        if !self.store.unarchive_appointment(id)? {
            return Ok(false);
        }
        self.reschedule(id)?;
        Ok(true)
    }

    /// Drop any pending reminders and register fresh ones from the stored
    /// appointment.
    fn reschedule(&self, id: i64) -> DbResult<Vec<ReminderTrigger>> {
        self.scheduler.cancel_reminders(id);
        Ok(self
            .store
            .get_appointment(id)?
            .map(|stored| self.scheduler.register_reminders(&stored))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::reminders::{MemoryAlarms, ReminderConfig, ReminderKey};
    use chrono::Utc;

    fn code(id: i64, hours_before: u32) -> i32 {
        ReminderKey::new(id, hours_before).request_code().unwrap()
    }

    fn desk() -> (Arc<MemoryAlarms>, AppointmentDesk<Utc>) {
        let alarms = Arc::new(MemoryAlarms::new());
        let scheduler = ReminderScheduler::with_zone(
            alarms.clone(),
            Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap())),
            Utc,
            ReminderConfig::default(),
        );
        let store = Arc::new(LocalStore::open_in_memory().unwrap());
        (alarms, AppointmentDesk::new(store, scheduler))
    }

    #[test]
    fn test_save_registers_reminders() {
        let (alarms, desk) = desk();
        let id = desk
            .save(&Appointment::new("25/12/2025", Some("10:00".into())))
            .unwrap();

        assert_eq!(alarms.len(), 2);
        assert!(alarms.get(code(id, 24)).is_some());
        assert!(alarms.get(code(id, 1)).is_some());
    }

    #[test]
    fn test_edit_moves_reminders() {
        let (alarms, desk) = desk();
        let id = desk
            .save(&Appointment::new("25/12/2025", Some("10:00".into())))
            .unwrap();

        let mut edited = desk.store().get_appointment(id).unwrap().unwrap();
        edited.time = Some("16:00".into());
        desk.save(&edited).unwrap();

        assert_eq!(alarms.len(), 2);
        assert_eq!(
            alarms.get(code(id, 1)).unwrap().fire_at_millis,
            Utc.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap().timestamp_millis()
        );
    }

    #[test]
    fn test_cancel_then_reschedule() {
        let (alarms, desk) = desk();
        let id = desk
            .save(&Appointment::new("25/12/2025", Some("10:00".into())))
            .unwrap();

        assert!(desk.update_status(id, AppointmentStatus::Cancelled).unwrap());
        assert!(alarms.is_empty());

        assert!(desk.update_status(id, AppointmentStatus::Scheduled).unwrap());
        assert_eq!(alarms.len(), 2);

        assert!(desk.update_status(id, AppointmentStatus::Completed).unwrap());
        assert!(alarms.is_empty());
    }

    #[test]
    fn test_status_change_of_missing_appointment() {
        let (alarms, desk) = desk();
        assert!(!desk.update_status(99, AppointmentStatus::Scheduled).unwrap());
        assert!(alarms.is_empty());
    }

    #[test]
    fn test_archive_cancels_and_unarchive_restores() {
        let (alarms, desk) = desk();
        let id = desk
            .save(&Appointment::new("25/12/2025", Some("10:00".into())))
            .unwrap();

        assert!(desk.archive(id).unwrap());
        assert!(alarms.is_empty());

        assert!(desk.unarchive(id).unwrap());
        assert_eq!(alarms.len(), 2);
    }

    #[test]
    fn test_failed_edit_still_drops_stale_reminders() {
        let (alarms, desk) = desk();
        let mut ghost = Appointment::new("25/12/2025", Some("10:00".into()));
        ghost.id = Some(42);
        desk.scheduler().register_reminders(&ghost);
        assert_eq!(alarms.len(), 2);

        // No row 42 in the store: the update fails after the cancel
        assert!(desk.save(&ghost).is_err());
        assert!(alarms.is_empty());
    }

    #[test]
    fn test_saving_cancelled_appointment_registers_nothing() {
        let (alarms, desk) = desk();
        let mut appt = Appointment::new("25/12/2025", Some("10:00".into()));
        appt.status = AppointmentStatus::Cancelled;
        desk.save(&appt).unwrap();
        assert!(alarms.is_empty());
    }
}
