//! Local store with change streams.
//!
//! Wraps the SQLite [`Database`] behind a mutex and republishes the full
//! active snapshot of a category on a `watch` channel after every successful
//! write. Subscribers always observe the latest snapshot; intermediate
//! snapshots may be skipped when writes come in faster than they are read.

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::db::{DashboardSummary, Database, DbResult};
use crate::models::{Appointment, AppointmentStatus, IntakeForm, Patient, UserSettings};

/// Local store shared by the UI layer, the sync coordinator and the
/// reminder policy.
pub struct LocalStore {
    db: Mutex<Database>,
    install_id: String,
    patients: watch::Sender<Vec<Patient>>,
    intake_forms: watch::Sender<Vec<IntakeForm>>,
    appointments: watch::Sender<Vec<Appointment>>,
    settings: watch::Sender<UserSettings>,
}

impl LocalStore {
    /// Open a store backed by a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_database(Database::open(path)?)
    }

    /// Open a store backed by an in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    /// Wrap an already opened database, seeding every stream.
    pub fn from_database(db: Database) -> DbResult<Self> {
        let install_id = db.install_id()?;
        let (patients, _) = watch::channel(db.list_active_patients()?);
        let (intake_forms, _) = watch::channel(db.list_active_intake_forms()?);
        let (appointments, _) = watch::channel(db.list_active_appointments()?);
        let (settings, _) = watch::channel(db.load_user_settings()?);

        Ok(Self {
            db: Mutex::new(db),
            install_id,
            patients,
            intake_forms,
            appointments,
            settings,
        })
    }

    /// Stable identifier of this install.
    pub fn install_id(&self) -> &str {
        &self.install_id
    }

    /// Run a read-only query against the database.
    pub fn read<R>(&self, f: impl FnOnce(&Database) -> DbResult<R>) -> DbResult<R> {
        let db = self.db.lock()?;
        f(&db)
    }

    // =========================================================================
    // Change streams
    // =========================================================================

    /// Snapshot stream of active patients.
    pub fn subscribe_patients(&self) -> watch::Receiver<Vec<Patient>> {
        self.patients.subscribe()
    }

    /// Snapshot stream of active intake forms.
    pub fn subscribe_intake_forms(&self) -> watch::Receiver<Vec<IntakeForm>> {
        self.intake_forms.subscribe()
    }

    /// Snapshot stream of active appointments.
    pub fn subscribe_appointments(&self) -> watch::Receiver<Vec<Appointment>> {
        self.appointments.subscribe()
    }

    /// Stream of user preference changes.
    pub fn subscribe_settings(&self) -> watch::Receiver<UserSettings> {
        self.settings.subscribe()
    }

    fn publish_patients(&self, db: &Database) -> DbResult<()> {
        self.patients.send_replace(db.list_active_patients()?);
        Ok(())
    }

    fn publish_intake_forms(&self, db: &Database) -> DbResult<()> {
        self.intake_forms.send_replace(db.list_active_intake_forms()?);
        Ok(())
    }

    fn publish_appointments(&self, db: &Database) -> DbResult<()> {
        self.appointments.send_replace(db.list_active_appointments()?);
        Ok(())
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Save a patient, returning its ID.
    pub fn save_patient(&self, patient: &Patient) -> DbResult<i64> {
        let db = self.db.lock()?;
        let id = db.save_patient(patient)?;
        self.publish_patients(&db)?;
        Ok(id)
    }

    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.read(|db| db.get_patient(id))
    }

    pub fn search_patients(&self, query: &str) -> DbResult<Vec<Patient>> {
        self.read(|db| db.search_active_patients(query))
    }

    /// Archive a patient; returns whether it existed.
    pub fn archive_patient(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.archive_patient(id)?;
        if changed {
            self.publish_patients(&db)?;
        }
        Ok(changed)
    }

    pub fn unarchive_patient(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.unarchive_patient(id)?;
        if changed {
            self.publish_patients(&db)?;
        }
        Ok(changed)
    }

    // =========================================================================
    // Intake forms
    // =========================================================================

    /// Save an intake form, returning its ID.
    ///
    /// May create or rename the linked patient, so both streams are
    /// republished.
    pub fn save_intake_form(&self, form: &IntakeForm) -> DbResult<i64> {
        let db = self.db.lock()?;
        let id = db.save_intake_form(form)?;
        self.publish_intake_forms(&db)?;
        self.publish_patients(&db)?;
        Ok(id)
    }

    pub fn get_intake_form(&self, id: i64) -> DbResult<Option<IntakeForm>> {
        self.read(|db| db.get_intake_form(id))
    }

    pub fn search_intake_forms(&self, query: &str) -> DbResult<Vec<IntakeForm>> {
        self.read(|db| db.search_active_intake_forms(query))
    }

    pub fn archive_intake_form(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.archive_intake_form(id)?;
        if changed {
            self.publish_intake_forms(&db)?;
        }
        Ok(changed)
    }

    pub fn unarchive_intake_form(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.unarchive_intake_form(id)?;
        if changed {
            self.publish_intake_forms(&db)?;
        }
        Ok(changed)
    }

    /// Delete every intake form recorded under a patient name.
    pub fn delete_intake_forms_by_patient_name(&self, full_name: &str) -> DbResult<usize> {
        let db = self.db.lock()?;
        let removed = db.delete_intake_forms_by_patient_name(full_name)?;
        if removed > 0 {
            self.publish_intake_forms(&db)?;
        }
        Ok(removed)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    /// Save an appointment, returning its ID.
    pub fn save_appointment(&self, appointment: &Appointment) -> DbResult<i64> {
        let db = self.db.lock()?;
        let id = db.save_appointment(appointment)?;
        self.publish_appointments(&db)?;
        Ok(id)
    }

    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        self.read(|db| db.get_appointment(id))
    }

    pub fn update_appointment_status(&self, id: i64, status: AppointmentStatus) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.update_appointment_status(id, status)?;
        if changed {
            self.publish_appointments(&db)?;
        }
        Ok(changed)
    }

    pub fn archive_appointment(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.archive_appointment(id)?;
        if changed {
            self.publish_appointments(&db)?;
        }
        Ok(changed)
    }

    pub fn unarchive_appointment(&self, id: i64) -> DbResult<bool> {
        let db = self.db.lock()?;
        let changed = db.unarchive_appointment(id)?;
        if changed {
            self.publish_appointments(&db)?;
        }
        Ok(changed)
    }

    pub fn upcoming_appointments(&self, today: NaiveDate) -> DbResult<Vec<Appointment>> {
        self.read(|db| db.list_upcoming_appointments(today))
    }

    pub fn appointments_on(&self, date: &str) -> DbResult<Vec<Appointment>> {
        self.read(|db| db.list_appointments_by_date(date))
    }

    pub fn appointments_for_patient(&self, patient_id: i64) -> DbResult<Vec<Appointment>> {
        self.read(|db| db.list_appointments_by_patient(patient_id))
    }

    /// Home screen summary as of `today`.
    pub fn dashboard(&self, today: NaiveDate) -> DbResult<DashboardSummary> {
        self.read(|db| db.dashboard_summary(today))
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn user_settings(&self) -> UserSettings {
        self.settings.borrow().clone()
    }

    /// Persist preferences and notify settings subscribers.
    pub fn update_settings(&self, settings: &UserSettings) -> DbResult<()> {
        let db = self.db.lock()?;
        db.save_user_settings(settings)?;
        self.settings.send_replace(settings.clone());
        Ok(())
    }
}
