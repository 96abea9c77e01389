//! Patient database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{non_blank, now_millis, Database, DbError, DbResult};
use crate::models::Patient;

const PATIENT_COLUMNS: &str = r#"
    id, full_name, birth_date, phone, email, occupation,
    marital_status, notes, archived, created_at, updated_at
"#;

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        full_name: row.get(1)?,
        birth_date: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        occupation: row.get(5)?,
        marital_status: row.get(6)?,
        notes: row.get(7)?,
        archived: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Insert a new patient, returning its assigned ID.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<i64> {
        let now = now_millis();
        self.conn.execute(
            r#"
            INSERT INTO patients (
                full_name, birth_date, phone, email, occupation,
                marital_status, notes, archived, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                patient.full_name,
                non_blank(&patient.birth_date),
                non_blank(&patient.phone),
                non_blank(&patient.email),
                non_blank(&patient.occupation),
                non_blank(&patient.marital_status),
                non_blank(&patient.notes),
                patient.archived,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Update an existing patient.
    pub fn update_patient(&self, patient: &Patient) -> DbResult<bool> {
        let id = patient
            .id
            .ok_or_else(|| DbError::Constraint("Cannot update an unsaved patient".into()))?;
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                full_name = ?2,
                birth_date = ?3,
                phone = ?4,
                email = ?5,
                occupation = ?6,
                marital_status = ?7,
                notes = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
            params![
                id,
                patient.full_name,
                non_blank(&patient.birth_date),
                non_blank(&patient.phone),
                non_blank(&patient.email),
                non_blank(&patient.occupation),
                non_blank(&patient.marital_status),
                non_blank(&patient.notes),
                now_millis(),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Insert when unsaved, update otherwise. Returns the patient ID.
    pub fn save_patient(&self, patient: &Patient) -> DbResult<i64> {
        match patient.id {
            None => self.insert_patient(patient),
            Some(id) => {
                if !self.update_patient(patient)? {
                    return Err(DbError::NotFound(format!("patient {}", id)));
                }
                Ok(id)
            }
        }
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: i64) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE id = ?", PATIENT_COLUMNS),
                [id],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a patient by exact full name.
    pub fn get_patient_by_name(&self, full_name: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM patients WHERE full_name = ? ORDER BY id LIMIT 1",
                    PATIENT_COLUMNS
                ),
                [full_name],
                patient_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List active (non-archived) patients ordered by name.
    pub fn list_active_patients(&self) -> DbResult<Vec<Patient>> {
        self.list_patients_where_archived(false)
    }

    /// List archived patients ordered by name.
    pub fn list_archived_patients(&self) -> DbResult<Vec<Patient>> {
        self.list_patients_where_archived(true)
    }

    fn list_patients_where_archived(&self, archived: bool) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients WHERE archived = ? ORDER BY full_name COLLATE NOCASE, id",
            PATIENT_COLUMNS
        ))?;
        let rows = stmt.query_map([archived], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search active patients by name (case-insensitive substring).
    pub fn search_active_patients(&self, query: &str) -> DbResult<Vec<Patient>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM patients
            WHERE archived = 0 AND full_name LIKE ?
            ORDER BY full_name COLLATE NOCASE, id
            "#,
            PATIENT_COLUMNS
        ))?;
        let rows = stmt.query_map([pattern], patient_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Archive a patient.
    pub fn archive_patient(&self, id: i64) -> DbResult<bool> {
        self.set_patient_archived(id, true)
    }

    /// Restore an archived patient.
    pub fn unarchive_patient(&self, id: i64) -> DbResult<bool> {
        self.set_patient_archived(id, false)
    }

    fn set_patient_archived(&self, id: i64, archived: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET archived = ?, updated_at = ? WHERE id = ?",
            params![archived, now_millis(), id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Count active patients.
    pub fn count_active_patients(&self) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patients WHERE archived = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Rename every patient carrying `old_name`.
    pub fn rename_patient(&self, old_name: &str, new_name: &str) -> DbResult<usize> {
        let rows_affected = self.conn.execute(
            "UPDATE patients SET full_name = ?, updated_at = ? WHERE full_name = ?",
            params![new_name, now_millis(), old_name],
        )?;
        Ok(rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();

        let mut patient = Patient::new("Maria Souza");
        patient.phone = Some("11 99999-0000".into());
        patient.email = Some("   ".into());

        let id = db.insert_patient(&patient).unwrap();

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.id, Some(id));
        assert_eq!(retrieved.full_name, "Maria Souza");
        assert_eq!(retrieved.phone, Some("11 99999-0000".into()));
        assert_eq!(retrieved.email, None);
        assert!(retrieved.created_at > 0);
        assert_eq!(retrieved.created_at, retrieved.updated_at);
    }

    #[test]
    fn test_save_inserts_then_updates() {
        let db = setup_db();

        let mut patient = Patient::new("Maria Souza");
        let id = db.save_patient(&patient).unwrap();

        patient.id = Some(id);
        patient.occupation = Some("Teacher".into());
        assert_eq!(db.save_patient(&patient).unwrap(), id);

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.occupation, Some("Teacher".into()));
        assert_eq!(db.count_active_patients().unwrap(), 1);
    }

    #[test]
    fn test_save_missing_patient_fails() {
        let db = setup_db();

        let mut patient = Patient::new("Ghost");
        patient.id = Some(42);
        assert!(matches!(db.save_patient(&patient), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_archive_and_unarchive() {
        let db = setup_db();

        let id = db.insert_patient(&Patient::new("Maria Souza")).unwrap();
        db.insert_patient(&Patient::new("Ana Lima")).unwrap();

        assert!(db.archive_patient(id).unwrap());
        assert_eq!(db.list_active_patients().unwrap().len(), 1);
        assert_eq!(db.list_archived_patients().unwrap()[0].id, Some(id));

        assert!(db.unarchive_patient(id).unwrap());
        assert_eq!(db.list_active_patients().unwrap().len(), 2);
        assert!(!db.archive_patient(999).unwrap());
    }

    #[test]
    fn test_search_active_patients() {
        let db = setup_db();

        db.insert_patient(&Patient::new("Maria Souza")).unwrap();
        db.insert_patient(&Patient::new("Mariana Alves")).unwrap();
        let archived = db.insert_patient(&Patient::new("Marisa Costa")).unwrap();
        db.insert_patient(&Patient::new("Ana Lima")).unwrap();
        db.archive_patient(archived).unwrap();

        let results = db.search_active_patients("mari").unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.full_name.starts_with("Mari")));
    }

    #[test]
    fn test_rename_patient() {
        let db = setup_db();

        let id = db.insert_patient(&Patient::new("Maria Souza")).unwrap();
        assert_eq!(db.rename_patient("Maria Souza", "Maria S. Lima").unwrap(), 1);

        let retrieved = db.get_patient(id).unwrap().unwrap();
        assert_eq!(retrieved.full_name, "Maria S. Lima");
        assert!(db.get_patient_by_name("Maria Souza").unwrap().is_none());
    }
}
