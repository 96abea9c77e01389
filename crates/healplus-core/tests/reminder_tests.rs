//! Reminder lifecycle integration tests.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use healplus_core::clock::{Clock, FixedClock};
use healplus_core::models::{Appointment, AppointmentStatus};
use healplus_core::reminders::{
    dispatch, AppointmentDesk, MemoryAlarms, RecordingPresenter, ReminderConfig,
    ReminderKey, ReminderScheduler,
};
use healplus_core::store::LocalStore;

struct Fixture {
    clock: Arc<FixedClock>,
    alarms: Arc<MemoryAlarms>,
    desk: AppointmentDesk<Utc>,
}

fn fixture() -> Fixture {
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap(),
    ));
    let alarms = Arc::new(MemoryAlarms::new());
    let scheduler = ReminderScheduler::with_zone(
        alarms.clone(),
        clock.clone(),
        Utc,
        ReminderConfig::default(),
    );
    let store = Arc::new(LocalStore::open_in_memory().unwrap());
    Fixture {
        clock,
        alarms,
        desk: AppointmentDesk::new(store, scheduler),
    }
}

#[test]
fn test_fired_reminders_render_their_lead_time() {
    let f = fixture();
    let presenter = RecordingPresenter::new();
    let id = f
        .desk
        .save(&Appointment::new("25/12/2025", Some("10:00".into())))
        .unwrap();

    f.clock.advance(Duration::days(4) + Duration::hours(1));
    for payload in f.alarms.due(f.clock.now()) {
        dispatch(&presenter, &payload, f.desk.scheduler().config());
    }
    let history = presenter.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].display_id, id);
    assert_eq!(history[0].text, "Appointment in 24h: 25/12/2025 10:00");

    f.clock.advance(Duration::hours(23));
    for payload in f.alarms.due(f.clock.now()) {
        dispatch(&presenter, &payload, f.desk.scheduler().config());
    }
    assert_eq!(presenter.history().len(), 2);
    assert_eq!(presenter.shown().len(), 1);
    assert_eq!(presenter.shown()[0].text, "Appointment in 1h: 25/12/2025 10:00");
    assert!(f.alarms.is_empty());
}

#[test]
fn test_cancelled_appointment_never_fires() {
    let f = fixture();
    let id = f
        .desk
        .save(&Appointment::new("25/12/2025", Some("10:00".into())))
        .unwrap();

    f.desk.update_status(id, AppointmentStatus::Cancelled).unwrap();
    f.clock.advance(Duration::days(10));

    assert!(f.alarms.due(f.clock.now()).is_empty());
}

#[test]
fn test_rescheduling_after_first_reminder_passed() {
    let f = fixture();
    let id = f
        .desk
        .save(&Appointment::new("25/12/2025", Some("10:00".into())))
        .unwrap();
    f.desk.update_status(id, AppointmentStatus::Cancelled).unwrap();

    // Back to scheduled once the 24h reminder is already behind us
    f.clock
        .set(Utc.with_ymd_and_hms(2025, 12, 25, 8, 0, 0).unwrap());
    f.desk.update_status(id, AppointmentStatus::Scheduled).unwrap();

    let pending = f.alarms.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request_code, ReminderKey::new(id, 1).request_code().unwrap());
}
