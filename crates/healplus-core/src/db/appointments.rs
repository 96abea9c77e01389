//! Appointment database operations.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, OptionalExtension, Row};

use super::{non_blank, now_millis, Database, DbError, DbResult};
use crate::models::{Appointment, AppointmentStatus};

const APPOINTMENT_COLUMNS: &str = r#"
    id, patient_id, date, time, consultation_type, notes,
    status, archived, created_at, updated_at
"#;

/// Date format used by appointment records.
pub const APPOINTMENT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    id: i64,
    patient_id: Option<i64>,
    date: String,
    time: Option<String>,
    consultation_type: Option<String>,
    notes: Option<String>,
    status: String,
    archived: bool,
    created_at: i64,
    updated_at: i64,
}

impl AppointmentRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            date: row.get(2)?,
            time: row.get(3)?,
            consultation_type: row.get(4)?,
            notes: row.get(5)?,
            status: row.get(6)?,
            archived: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown appointment status: {}", row.status)))?;

        Ok(Appointment {
            id: Some(row.id),
            patient_id: row.patient_id,
            date: row.date,
            time: row.time,
            consultation_type: row.consultation_type,
            notes: row.notes,
            status,
            archived: row.archived,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl Database {
    /// Insert a new appointment, returning its assigned ID.
    pub fn insert_appointment(&self, appointment: &Appointment) -> DbResult<i64> {
        let now = now_millis();
        self.conn.execute(
            r#"
            INSERT INTO appointments (
                patient_id, date, time, consultation_type, notes,
                status, archived, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                appointment.patient_id,
                appointment.date,
                non_blank(&appointment.time),
                non_blank(&appointment.consultation_type),
                non_blank(&appointment.notes),
                appointment.status.as_str(),
                appointment.archived,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update an existing appointment.
    pub fn update_appointment(&self, appointment: &Appointment) -> DbResult<bool> {
        let id = appointment
            .id
            .ok_or_else(|| DbError::Constraint("Cannot update an unsaved appointment".into()))?;
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                patient_id = ?2,
                date = ?3,
                time = ?4,
                consultation_type = ?5,
                notes = ?6,
                status = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                id,
                appointment.patient_id,
                appointment.date,
                non_blank(&appointment.time),
                non_blank(&appointment.consultation_type),
                non_blank(&appointment.notes),
                appointment.status.as_str(),
                now_millis(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Insert when unsaved, update otherwise. Returns the appointment ID.
    pub fn save_appointment(&self, appointment: &Appointment) -> DbResult<i64> {
        match appointment.id {
            None => self.insert_appointment(appointment),
            Some(id) => {
                if !self.update_appointment(appointment)? {
                    return Err(DbError::NotFound(format!("appointment {}", id)));
                }
                Ok(id)
            }
        }
    }

    /// Get an appointment by ID.
    pub fn get_appointment(&self, id: i64) -> DbResult<Option<Appointment>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS),
                [id],
                AppointmentRow::from_row,
            )
            .optional()?;
        row.map(Appointment::try_from).transpose()
    }

    /// Change an appointment's status.
    pub fn update_appointment_status(&self, id: i64, status: AppointmentStatus) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), now_millis(), id],
        )?;
        Ok(rows_affected > 0)
    }

    /// List active appointments, most recently created first.
    pub fn list_active_appointments(&self) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            "WHERE archived = 0 ORDER BY created_at DESC, id DESC",
            params![],
        )
    }

    /// List archived appointments.
    pub fn list_archived_appointments(&self) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            "WHERE archived = 1 ORDER BY created_at DESC, id DESC",
            params![],
        )
    }

    /// List active appointments on a given date (dd/mm/yyyy).
    pub fn list_appointments_by_date(&self, date: &str) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            "WHERE archived = 0 AND date = ? ORDER BY time, id",
            params![date],
        )
    }

    /// List active appointments for a patient.
    pub fn list_appointments_by_patient(&self, patient_id: i64) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            "WHERE archived = 0 AND patient_id = ? ORDER BY created_at DESC, id DESC",
            params![patient_id],
        )
    }

    /// List active appointments on or after `today`, in chronological order.
    ///
    /// Rows whose date does not parse are left out.
    pub fn list_upcoming_appointments(&self, today: NaiveDate) -> DbResult<Vec<Appointment>> {
        let mut upcoming: Vec<(NaiveDate, NaiveTime, Appointment)> = self
            .list_active_appointments()?
            .into_iter()
            .filter_map(|appt| {
                let date = NaiveDate::parse_from_str(appt.date.trim(), APPOINTMENT_DATE_FORMAT).ok()?;
                let time = appt
                    .time
                    .as_deref()
                    .and_then(|t| NaiveTime::parse_from_str(t.trim(), "%H:%M").ok())
                    .unwrap_or(NaiveTime::MIN);
                Some((date, time, appt))
            })
            .filter(|(date, _, _)| *date >= today)
            .collect();

        upcoming.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(upcoming.into_iter().map(|(_, _, appt)| appt).collect())
    }

    /// Archive an appointment.
    pub fn archive_appointment(&self, id: i64) -> DbResult<bool> {
        self.set_appointment_archived(id, true)
    }

    /// Restore an archived appointment.
    pub fn unarchive_appointment(&self, id: i64) -> DbResult<bool> {
        self.set_appointment_archived(id, false)
    }

    fn set_appointment_archived(&self, id: i64, archived: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE appointments SET archived = ?, updated_at = ? WHERE id = ?",
            params![archived, now_millis(), id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Count active appointments still scheduled.
    pub fn count_pending_appointments(&self) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM appointments WHERE archived = 0 AND status = 'scheduled'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    fn query_appointments(
        &self,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM appointments {}",
            APPOINTMENT_COLUMNS, clause
        ))?;
        let rows = stmt.query_map(params, AppointmentRow::from_row)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(Appointment::try_from(row?)?);
        }
        Ok(appointments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn appt(date: &str, time: Option<&str>) -> Appointment {
        Appointment::new(date, time.map(String::from))
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let patient_id = db.insert_patient(&Patient::new("Maria Souza")).unwrap();
        let mut appointment = appt("25/12/2025", Some("10:00"));
        appointment.patient_id = Some(patient_id);
        appointment.consultation_type = Some("Follow-up".into());

        let id = db.insert_appointment(&appointment).unwrap();
        let retrieved = db.get_appointment(id).unwrap().unwrap();

        assert_eq!(retrieved.id, Some(id));
        assert_eq!(retrieved.patient_id, Some(patient_id));
        assert_eq!(retrieved.time, Some("10:00".into()));
        assert_eq!(retrieved.status, AppointmentStatus::Scheduled);
        assert_eq!(retrieved.consultation_type, Some("Follow-up".into()));
    }

    #[test]
    fn test_update_status() {
        let db = setup_db();

        let id = db.insert_appointment(&appt("25/12/2025", None)).unwrap();
        assert!(db.update_appointment_status(id, AppointmentStatus::Cancelled).unwrap());

        let retrieved = db.get_appointment(id).unwrap().unwrap();
        assert_eq!(retrieved.status, AppointmentStatus::Cancelled);
        assert_eq!(db.count_pending_appointments().unwrap(), 0);
        assert!(!db.update_appointment_status(999, AppointmentStatus::Completed).unwrap());
    }

    #[test]
    fn test_list_by_date_and_patient() {
        let db = setup_db();

        let patient_id = db.insert_patient(&Patient::new("Maria Souza")).unwrap();
        let mut first = appt("25/12/2025", Some("14:00"));
        first.patient_id = Some(patient_id);
        db.insert_appointment(&first).unwrap();
        db.insert_appointment(&appt("25/12/2025", Some("09:30"))).unwrap();
        db.insert_appointment(&appt("26/12/2025", None)).unwrap();

        let on_day = db.list_appointments_by_date("25/12/2025").unwrap();
        assert_eq!(on_day.len(), 2);
        assert_eq!(on_day[0].time, Some("09:30".into()));

        let for_patient = db.list_appointments_by_patient(patient_id).unwrap();
        assert_eq!(for_patient.len(), 1);
        assert_eq!(for_patient[0].time, Some("14:00".into()));
    }

    #[test]
    fn test_list_upcoming() {
        let db = setup_db();

        db.insert_appointment(&appt("10/01/2026", Some("08:00"))).unwrap();
        db.insert_appointment(&appt("19/12/2025", Some("08:00"))).unwrap();
        db.insert_appointment(&appt("20/12/2025", Some("15:00"))).unwrap();
        db.insert_appointment(&appt("20/12/2025", None)).unwrap();
        db.insert_appointment(&appt("someday", None)).unwrap();
        let archived = db.insert_appointment(&appt("21/12/2025", None)).unwrap();
        db.archive_appointment(archived).unwrap();

        let today = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        let upcoming = db.list_upcoming_appointments(today).unwrap();

        let keys: Vec<_> = upcoming
            .iter()
            .map(|a| (a.date.as_str(), a.time.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("20/12/2025", None),
                ("20/12/2025", Some("15:00")),
                ("10/01/2026", Some("08:00")),
            ]
        );
    }

    #[test]
    fn test_archive_hides_from_active() {
        let db = setup_db();

        let id = db.insert_appointment(&appt("25/12/2025", None)).unwrap();
        db.archive_appointment(id).unwrap();

        assert!(db.list_active_appointments().unwrap().is_empty());
        assert_eq!(db.list_archived_appointments().unwrap().len(), 1);
        assert!(db.get_appointment(id).unwrap().unwrap().archived);

        db.unarchive_appointment(id).unwrap();
        assert_eq!(db.list_active_appointments().unwrap().len(), 1);
    }
}
