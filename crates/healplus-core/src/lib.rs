//! HealPlus Core Library
//!
//! Local-first patient records with background mirroring to a remote
//! document store and appointment reminders.
//!
//! # Architecture
//!
//! ```text
//!             UI writes (patients, intake forms, appointments, settings)
//!                                     │
//!                         ┌───────────▼───────────┐
//!                         │  LocalStore (SQLite)  │
//!                         │  watch channel per    │
//!                         │  category             │
//!                         └─────┬───────────┬─────┘
//!                               │           │
//!                 change streams│           │appointment lifecycle
//!                               ▼           ▼
//!                    SyncCoordinator    AppointmentDesk
//!                    debounce           cancel stale triggers
//!                    hash compare       register 24h / 1h
//!                    merge-upsert             │
//!                               │             ▼
//!                               ▼       AlarmService ──(fires)──► render_reminder
//!                         RemoteMirror                              │
//!                                                                   ▼
//!                                                            ReminderAlert
//! ```
//!
//! Over FFI the host supplies a [`MirrorTransport`]; the coordinator then
//! runs on a runtime owned by [`BackgroundSync`].
//!
//! # Core Principle
//!
//! **The local store is the source of truth.** The mirror is written to,
//! never read from, and a failed remote write never blocks a local one.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer and the home screen summary
//! - [`models`]: Domain types (Patient, IntakeForm, Appointment, settings)
//! - [`store`]: Database wrapper publishing change streams
//! - [`sync`]: Change-hash cache, remote mirror and sync coordinator
//! - [`reminders`]: Reminder scheduling, lifecycle policy and alerts
//! - [`clock`]: Wall-clock sources

pub mod clock;
pub mod db;
pub mod models;
pub mod reminders;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{ActivityItem, ActivityKind, DashboardSummary, Database};
pub use models::{Appointment, AppointmentStatus, IntakeForm, Patient, UserSettings};
pub use reminders::{
    render_reminder, AlarmService, AppointmentDesk, ReminderAlert, ReminderConfig,
    ReminderPayload, ReminderScheduler,
};
pub use store::LocalStore;
pub use sync::{
    BackgroundSync, ForeignMirror, MemoryMirror, MirrorTransport, RemoteError, RemoteMirror,
    SyncConfig, SyncCoordinator, SyncHandle,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum HealPlusError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Sync error: {0}")]
    SyncError(String),
}

impl From<db::DbError> for HealPlusError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(what) => HealPlusError::NotFound(what),
            db::DbError::Json(e) => HealPlusError::SerializationError(e.to_string()),
            db::DbError::Constraint(msg) => HealPlusError::InvalidInput(msg),
            other => HealPlusError::DatabaseError(other.to_string()),
        }
    }
}

impl From<sync::SyncError> for HealPlusError {
    fn from(e: sync::SyncError) -> Self {
        HealPlusError::SyncError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for HealPlusError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        HealPlusError::SyncError("sync state lock poisoned".into())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
///
/// `alarms` is the platform alarm service reminders are registered with.
#[uniffi::export]
pub fn open_database(
    path: String,
    alarms: Arc<dyn AlarmService>,
) -> Result<Arc<HealPlusCore>, HealPlusError> {
    let store = LocalStore::open(&path)?;
    Ok(Arc::new(HealPlusCore::new(store, alarms)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory(
    alarms: Arc<dyn AlarmService>,
) -> Result<Arc<HealPlusCore>, HealPlusError> {
    let store = LocalStore::open_in_memory()?;
    Ok(Arc::new(HealPlusCore::new(store, alarms)))
}

/// Render the alert for a fired reminder trigger.
#[uniffi::export]
pub fn render_reminder_alert(payload: ReminderPayload) -> ReminderAlert {
    render_reminder(&payload)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store and reminder policy for FFI.
#[derive(uniffi::Object)]
pub struct HealPlusCore {
    store: Arc<LocalStore>,
    desk: AppointmentDesk,
    sync: Mutex<Option<BackgroundSync>>,
}

impl HealPlusCore {
    fn new(store: LocalStore, alarms: Arc<dyn AlarmService>) -> Self {
        let store = Arc::new(store);
        let scheduler = ReminderScheduler::new(alarms, ReminderConfig::default());
        Self {
            desk: AppointmentDesk::new(store.clone(), scheduler),
            store,
            sync: Mutex::new(None),
        }
    }

    /// Shared handle to the local store, for Rust callers running their own
    /// coordinator.
    pub fn local_store(&self) -> Arc<LocalStore> {
        self.store.clone()
    }
}

#[uniffi::export]
impl HealPlusCore {
    /// Stable identifier of this install.
    pub fn install_id(&self) -> String {
        self.store.install_id().to_string()
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Create or update a patient, returning its ID.
    pub fn save_patient(&self, patient: FfiPatient) -> Result<i64, HealPlusError> {
        Ok(self.store.save_patient(&patient.into())?)
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<FfiPatient>, HealPlusError> {
        let patient = self.store.get_patient(id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// Active patients, ordered by name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, HealPlusError> {
        let patients = self.store.read(|db| db.list_active_patients())?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    pub fn list_archived_patients(&self) -> Result<Vec<FfiPatient>, HealPlusError> {
        let patients = self.store.read(|db| db.list_archived_patients())?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search active patients by name.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, HealPlusError> {
        let patients = self.store.search_patients(&query)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    pub fn archive_patient(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.store.archive_patient(id)?)
    }

    pub fn unarchive_patient(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.store.unarchive_patient(id)?)
    }

    // =========================================================================
    // Intake Form Operations
    // =========================================================================

    /// Create or update an intake form, returning its ID.
    ///
    /// A new form creates its patient if none exists under that name.
    pub fn save_intake_form(&self, form: FfiIntakeForm) -> Result<i64, HealPlusError> {
        Ok(self.store.save_intake_form(&form.into())?)
    }

    pub fn get_intake_form(&self, id: i64) -> Result<Option<FfiIntakeForm>, HealPlusError> {
        let form = self.store.get_intake_form(id)?;
        Ok(form.map(|f| f.into()))
    }

    pub fn list_intake_forms(&self) -> Result<Vec<FfiIntakeForm>, HealPlusError> {
        let forms = self.store.read(|db| db.list_active_intake_forms())?;
        Ok(forms.into_iter().map(|f| f.into()).collect())
    }

    pub fn search_intake_forms(&self, query: String) -> Result<Vec<FfiIntakeForm>, HealPlusError> {
        let forms = self.store.search_intake_forms(&query)?;
        Ok(forms.into_iter().map(|f| f.into()).collect())
    }

    pub fn archive_intake_form(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.store.archive_intake_form(id)?)
    }

    pub fn unarchive_intake_form(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.store.unarchive_intake_form(id)?)
    }

    /// Delete every intake form of a patient. Returns the number removed.
    pub fn delete_intake_forms_by_patient_name(
        &self,
        full_name: String,
    ) -> Result<u32, HealPlusError> {
        let removed = self.store.delete_intake_forms_by_patient_name(&full_name)?;
        Ok(removed as u32)
    }

    // =========================================================================
    // Appointment Operations
    // =========================================================================

    /// Create or update an appointment and reschedule its reminders.
    pub fn save_appointment(&self, appointment: FfiAppointment) -> Result<i64, HealPlusError> {
        let appointment = Appointment::try_from(appointment)?;
        Ok(self.desk.save(&appointment)?)
    }

    pub fn get_appointment(&self, id: i64) -> Result<Option<FfiAppointment>, HealPlusError> {
        let appointment = self.store.get_appointment(id)?;
        Ok(appointment.map(|a| a.into()))
    }

    pub fn list_appointments(&self) -> Result<Vec<FfiAppointment>, HealPlusError> {
        let appointments = self.store.read(|db| db.list_active_appointments())?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Active appointments on a date (dd/mm/yyyy).
    pub fn appointments_on(&self, date: String) -> Result<Vec<FfiAppointment>, HealPlusError> {
        let appointments = self.store.appointments_on(&date)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    pub fn appointments_for_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<FfiAppointment>, HealPlusError> {
        let appointments = self.store.appointments_for_patient(patient_id)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Active appointments from `today` (dd/mm/yyyy) on, soonest first.
    pub fn upcoming_appointments(&self, today: String) -> Result<Vec<FfiAppointment>, HealPlusError> {
        let today = self.parse_date(&today)?;
        let appointments = self.store.upcoming_appointments(today)?;
        Ok(appointments.into_iter().map(|a| a.into()).collect())
    }

    /// Change an appointment's status, applying the reminder policy.
    pub fn update_appointment_status(&self, id: i64, status: String) -> Result<bool, HealPlusError> {
        let status = parse_status(&status)?;
        Ok(self.desk.update_status(id, status)?)
    }

    /// Archive an appointment, cancelling its reminders.
    pub fn archive_appointment(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.desk.archive(id)?)
    }

    pub fn unarchive_appointment(&self, id: i64) -> Result<bool, HealPlusError> {
        Ok(self.desk.unarchive(id)?)
    }

    /// Digest alert for the scheduled appointments on a date, if any.
    pub fn daily_digest(&self, date: String) -> Result<Option<ReminderAlert>, HealPlusError> {
        let scheduled: Vec<Appointment> = self
            .store
            .appointments_on(&date)?
            .into_iter()
            .filter(|a| a.is_scheduled())
            .collect();
        Ok(reminders::render_daily_digest(
            &scheduled,
            self.desk.scheduler().config(),
        ))
    }

    /// Home screen summary as of `today` (dd/mm/yyyy).
    pub fn dashboard(&self, today: String) -> Result<FfiDashboardSummary, HealPlusError> {
        let today = self.parse_date(&today)?;
        Ok(self.store.dashboard(today)?.into())
    }

    // =========================================================================
    // Settings Operations
    // =========================================================================

    pub fn get_settings(&self) -> FfiUserSettings {
        self.store.user_settings().into()
    }

    pub fn update_settings(&self, settings: FfiUserSettings) -> Result<(), HealPlusError> {
        Ok(self.store.update_settings(&settings.into())?)
    }

    // =========================================================================
    // Sync Operations
    // =========================================================================

    /// Start mirroring the store through `transport`, replacing any earlier
    /// sync session. `config_json` overrides [`SyncConfig`] fields.
    pub fn enable_sync(
        &self,
        transport: Arc<dyn MirrorTransport>,
        config_json: Option<String>,
    ) -> Result<(), HealPlusError> {
        let config = match config_json {
            Some(json) => SyncConfig::from_json(&json)
                .map_err(|e| HealPlusError::InvalidInput(format!("sync config: {}", e)))?,
            None => SyncConfig::default(),
        };
        let mirror: Arc<dyn RemoteMirror> = Arc::new(ForeignMirror::new(transport));
        let mut session = BackgroundSync::new(mirror, config)
            .map_err(|e| HealPlusError::SyncError(e.to_string()))?;

        let mut slot = self.sync.lock()?;
        if let Some(previous) = slot.take() {
            previous.shutdown()?;
        }
        session.resume(&self.store);
        *slot = Some(session);
        Ok(())
    }

    /// Stop uploading while keeping the change caches. Returns `false` if
    /// sync was not running.
    pub fn pause_sync(&self) -> Result<bool, HealPlusError> {
        match self.sync.lock()?.as_mut() {
            Some(session) => Ok(session.pause()?),
            None => Ok(false),
        }
    }

    /// Resume a paused session. Returns `false` if it was already running.
    pub fn resume_sync(&self) -> Result<bool, HealPlusError> {
        match self.sync.lock()?.as_mut() {
            Some(session) => Ok(session.resume(&self.store)),
            None => Err(HealPlusError::InvalidInput("sync is not enabled".into())),
        }
    }

    pub fn is_sync_running(&self) -> bool {
        self.sync
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|s| s.is_running()))
            .unwrap_or(false)
    }

    /// Stop sync and drop the session.
    pub fn disable_sync(&self) -> Result<(), HealPlusError> {
        if let Some(session) = self.sync.lock()?.take() {
            session.shutdown()?;
        }
        Ok(())
    }
}

impl HealPlusCore {
    fn parse_date(&self, date: &str) -> Result<NaiveDate, HealPlusError> {
        let format = &self.desk.scheduler().config().date_format;
        NaiveDate::parse_from_str(date.trim(), format)
            .map_err(|e| HealPlusError::InvalidInput(format!("date '{}': {}", date, e)))
    }
}

fn parse_status(status: &str) -> Result<AppointmentStatus, HealPlusError> {
    AppointmentStatus::parse(status)
        .ok_or_else(|| HealPlusError::InvalidInput(format!("unknown status '{}'", status)))
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: Option<i64>,
    pub full_name: String,
    pub birth_date: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub marital_status: Option<String>,
    pub notes: Option<String>,
    pub archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            id: patient.id,
            full_name: patient.full_name,
            birth_date: patient.birth_date,
            phone: patient.phone,
            email: patient.email,
            occupation: patient.occupation,
            marital_status: patient.marital_status,
            notes: patient.notes,
            archived: patient.archived,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

impl From<FfiPatient> for Patient {
    fn from(patient: FfiPatient) -> Self {
        Patient {
            id: patient.id,
            full_name: patient.full_name,
            birth_date: patient.birth_date,
            phone: patient.phone,
            email: patient.email,
            occupation: patient.occupation,
            marital_status: patient.marital_status,
            notes: patient.notes,
            archived: patient.archived,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

/// FFI-safe intake form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiIntakeForm {
    pub id: Option<i64>,
    pub full_name: String,
    pub consultation_date: Option<String>,
    pub location: Option<String>,
    pub data_json: String,
    pub archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<IntakeForm> for FfiIntakeForm {
    fn from(form: IntakeForm) -> Self {
        Self {
            id: form.id,
            full_name: form.full_name,
            consultation_date: form.consultation_date,
            location: form.location,
            data_json: form.data_json,
            archived: form.archived,
            created_at: form.created_at,
            updated_at: form.updated_at,
        }
    }
}

impl From<FfiIntakeForm> for IntakeForm {
    fn from(form: FfiIntakeForm) -> Self {
        IntakeForm {
            id: form.id,
            full_name: form.full_name,
            consultation_date: form.consultation_date,
            location: form.location,
            data_json: form.data_json,
            archived: form.archived,
            created_at: form.created_at,
            updated_at: form.updated_at,
        }
    }
}

/// FFI-safe appointment. `status` is one of `scheduled`, `completed`,
/// `cancelled`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: Option<i64>,
    pub patient_id: Option<i64>,
    pub date: String,
    pub time: Option<String>,
    pub consultation_type: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub archived: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            time: appointment.time,
            consultation_type: appointment.consultation_type,
            notes: appointment.notes,
            status: appointment.status.as_str().to_string(),
            archived: appointment.archived,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

impl TryFrom<FfiAppointment> for Appointment {
    type Error = HealPlusError;

    fn try_from(appointment: FfiAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            id: appointment.id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            time: appointment.time,
            consultation_type: appointment.consultation_type,
            notes: appointment.notes,
            status: parse_status(&appointment.status)?,
            archived: appointment.archived,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        })
    }
}

/// FFI-safe home screen summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDashboardSummary {
    pub total_patients: u32,
    pub total_intake_forms: u32,
    pub intake_forms_this_month: u32,
    pub upcoming: Vec<FfiAppointment>,
    pub pending_appointments: u32,
    pub recent_activity: Vec<ActivityItem>,
}

impl From<DashboardSummary> for FfiDashboardSummary {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            total_patients: summary.total_patients,
            total_intake_forms: summary.total_intake_forms,
            intake_forms_this_month: summary.intake_forms_this_month,
            upcoming: summary.upcoming.into_iter().map(|a| a.into()).collect(),
            pending_appointments: summary.pending_appointments,
            recent_activity: summary.recent_activity,
        }
    }
}

/// FFI-safe user settings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUserSettings {
    pub dark_mode: bool,
    pub high_contrast: bool,
    pub font_scale: f64,
    pub language: String,
}

impl From<UserSettings> for FfiUserSettings {
    fn from(settings: UserSettings) -> Self {
        Self {
            dark_mode: settings.dark_mode,
            high_contrast: settings.high_contrast,
            font_scale: settings.font_scale,
            language: settings.language,
        }
    }
}

impl From<FfiUserSettings> for UserSettings {
    fn from(settings: FfiUserSettings) -> Self {
        UserSettings {
            dark_mode: settings.dark_mode,
            high_contrast: settings.high_contrast,
            font_scale: settings.font_scale,
            language: settings.language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminders::MemoryAlarms;

    fn core() -> (Arc<MemoryAlarms>, Arc<HealPlusCore>) {
        let alarms = Arc::new(MemoryAlarms::new());
        let core = open_database_in_memory(alarms.clone()).unwrap();
        (alarms, core)
    }

    fn ffi_appointment(date: &str, time: &str, status: &str) -> FfiAppointment {
        FfiAppointment::from(Appointment {
            status: parse_status(status).unwrap(),
            ..Appointment::new(date, Some(time.to_string()))
        })
    }

    #[test]
    fn test_patient_round_trip() {
        let (_, core) = core();
        let id = core
            .save_patient(FfiPatient::from(Patient::new("Maria Souza")))
            .unwrap();

        let patient = core.get_patient(id).unwrap().unwrap();
        assert_eq!(patient.full_name, "Maria Souza");
        assert_eq!(core.search_patients("souza".into()).unwrap().len(), 1);

        assert!(core.archive_patient(id).unwrap());
        assert!(core.list_patients().unwrap().is_empty());
        assert_eq!(core.list_archived_patients().unwrap().len(), 1);
    }

    #[test]
    fn test_intake_form_creates_patient() {
        let (_, core) = core();
        core.save_intake_form(FfiIntakeForm::from(IntakeForm::new("Ana Lima")))
            .unwrap();
        assert_eq!(core.list_patients().unwrap().len(), 1);
        assert_eq!(
            core.delete_intake_forms_by_patient_name("Ana Lima".into())
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_invalid_status_rejected() {
        let (_, core) = core();
        let mut appt = ffi_appointment("25/12/2099", "10:00", "scheduled");
        appt.status = "postponed".into();
        assert!(matches!(
            core.save_appointment(appt),
            Err(HealPlusError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_status_change_cancels_reminders() {
        let (alarms, core) = core();
        let id = core
            .save_appointment(ffi_appointment("25/12/2099", "10:00", "scheduled"))
            .unwrap();
        assert_eq!(alarms.len(), 2);

        assert!(core
            .update_appointment_status(id, "cancelled".into())
            .unwrap());
        assert!(alarms.is_empty());
        assert_eq!(core.get_appointment(id).unwrap().unwrap().status, "cancelled");
    }

    #[test]
    fn test_daily_digest_lists_scheduled_only() {
        let (_, core) = core();
        core.save_appointment(ffi_appointment("25/12/2099", "10:00", "scheduled"))
            .unwrap();
        core.save_appointment(ffi_appointment("25/12/2099", "11:00", "cancelled"))
            .unwrap();

        let digest = core.daily_digest("25/12/2099".into()).unwrap().unwrap();
        assert_eq!(digest.lines, vec!["25/12/2099 - 10:00".to_string()]);
        assert!(core.daily_digest("26/12/2099".into()).unwrap().is_none());
    }

    #[test]
    fn test_upcoming_requires_valid_date() {
        let (_, core) = core();
        assert!(matches!(
            core.upcoming_appointments("2099-12-25".into()),
            Err(HealPlusError::InvalidInput(_))
        ));
        assert!(core.upcoming_appointments("01/01/2099".into()).unwrap().is_empty());
    }

    #[test]
    fn test_settings_round_trip() {
        let (_, core) = core();
        let mut settings = core.get_settings();
        settings.dark_mode = true;
        core.update_settings(settings).unwrap();
        assert!(core.get_settings().dark_mode);
    }

    #[test]
    fn test_non_finite_font_scale_rejected() {
        let (_, core) = core();
        let mut settings = core.get_settings();
        settings.font_scale = f64::NAN;
        assert!(matches!(
            core.update_settings(settings),
            Err(HealPlusError::InvalidInput(_))
        ));
        assert_eq!(core.get_settings().font_scale, 1.0);
    }

    #[test]
    fn test_dashboard_summary() {
        let (_, core) = core();
        let mut form = FfiIntakeForm::from(IntakeForm::new("Ana Lima"));
        form.consultation_date = Some("02/12/2025".into());
        core.save_intake_form(form).unwrap();
        core.save_appointment(ffi_appointment("22/12/2025", "10:00", "scheduled"))
            .unwrap();

        let summary = core.dashboard("20/12/2025".into()).unwrap();
        assert_eq!(summary.total_patients, 1);
        assert_eq!(summary.intake_forms_this_month, 1);
        assert_eq!(summary.pending_appointments, 1);
        assert_eq!(summary.upcoming[0].status, "scheduled");
        assert_eq!(summary.recent_activity.len(), 2);

        assert!(matches!(
            core.dashboard("2025-12-20".into()),
            Err(HealPlusError::InvalidInput(_))
        ));
    }

    #[derive(Default)]
    struct RecordingTransport {
        writes: std::sync::Mutex<Vec<(String, String)>>,
    }

    impl RecordingTransport {
        fn writes_to(&self, collection: &str) -> usize {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == collection)
                .count()
        }
    }

    impl MirrorTransport for RecordingTransport {
        fn merge_upsert(
            &self,
            collection: String,
            document_id: String,
            _fields_json: String,
        ) -> Result<(), RemoteError> {
            self.writes.lock().unwrap().push((collection, document_id));
            Ok(())
        }
    }

    #[test]
    fn test_sync_lifecycle() {
        let (_, core) = core();
        core.save_patient(FfiPatient::from(Patient::new("Maria Souza")))
            .unwrap();
        assert!(!core.is_sync_running());
        assert!(!core.pause_sync().unwrap());
        assert!(matches!(core.resume_sync(), Err(HealPlusError::InvalidInput(_))));

        let transport = Arc::new(RecordingTransport::default());
        core.enable_sync(transport.clone(), Some(r#"{"debounce_ms": 10}"#.into()))
            .unwrap();
        assert!(core.is_sync_running());
        std::thread::sleep(std::time::Duration::from_millis(800));
        assert_eq!(transport.writes_to("patients"), 1);
        assert_eq!(transport.writes_to("profile_settings"), 1);

        assert!(core.pause_sync().unwrap());
        assert!(!core.is_sync_running());
        assert!(core.resume_sync().unwrap());
        assert!(!core.resume_sync().unwrap());
        std::thread::sleep(std::time::Duration::from_millis(500));
        assert_eq!(transport.writes_to("patients"), 1);

        core.disable_sync().unwrap();
        assert!(!core.is_sync_running());
    }

    #[test]
    fn test_sync_config_must_parse() {
        let (_, core) = core();
        let transport = Arc::new(RecordingTransport::default());
        assert!(matches!(
            core.enable_sync(transport, Some("{not json".into())),
            Err(HealPlusError::InvalidInput(_))
        ));
        assert!(!core.is_sync_running());
    }

    #[test]
    fn test_render_reminder_alert() {
        let alert = render_reminder_alert(ReminderPayload {
            appointment_id: 3,
            date: "25/12/2025".into(),
            time: Some("10:00".into()),
            hours_before: 1,
        });
        assert_eq!(alert.display_id, 3);
        assert_eq!(alert.text, "Appointment in 1h: 25/12/2025 10:00");
    }
}
