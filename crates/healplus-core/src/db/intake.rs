//! Intake form database operations.
//!
//! Intake forms are linked to patients by full name: saving a form for an
//! unknown name creates the patient, and renaming a form renames the patient.

use rusqlite::{params, OptionalExtension, Row};

use super::{non_blank, now_millis, Database, DbError, DbResult};
use crate::models::{IntakeForm, Patient};

const INTAKE_COLUMNS: &str = r#"
    id, full_name, consultation_date, location, data_json,
    archived, created_at, updated_at
"#;

fn intake_from_row(row: &Row<'_>) -> rusqlite::Result<IntakeForm> {
    Ok(IntakeForm {
        id: row.get(0)?,
        full_name: row.get(1)?,
        consultation_date: row.get(2)?,
        location: row.get(3)?,
        data_json: row.get(4)?,
        archived: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    /// Insert a new intake form, creating its patient if needed.
    pub fn insert_intake_form(&self, form: &IntakeForm) -> DbResult<i64> {
        // Reject malformed answers before anything is written
        serde_json::from_str::<serde_json::Value>(&form.data_json)?;

        let tx = self.transaction()?;
        let now = now_millis();
        self.conn.execute(
            r#"
            INSERT INTO intake_forms (
                full_name, consultation_date, location, data_json,
                archived, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                form.full_name,
                non_blank(&form.consultation_date),
                non_blank(&form.location),
                form.data_json,
                form.archived,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        if self.get_patient_by_name(&form.full_name)?.is_none() {
            self.insert_patient(&Patient::new(form.full_name.clone()))?;
        }

        tx.commit()?;
        Ok(id)
    }

    /// Update an existing intake form, propagating a name change to the patient.
    pub fn update_intake_form(&self, form: &IntakeForm) -> DbResult<bool> {
        let id = form
            .id
            .ok_or_else(|| DbError::Constraint("Cannot update an unsaved intake form".into()))?;
        serde_json::from_str::<serde_json::Value>(&form.data_json)?;

        let tx = self.transaction()?;
        let old_name = self.get_intake_form(id)?.map(|f| f.full_name);

        let rows_affected = self.conn.execute(
            r#"
            UPDATE intake_forms SET
                full_name = ?2,
                consultation_date = ?3,
                location = ?4,
                data_json = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                id,
                form.full_name,
                non_blank(&form.consultation_date),
                non_blank(&form.location),
                form.data_json,
                now_millis(),
            ],
        )?;

        if let Some(old_name) = old_name {
            if old_name != form.full_name {
                self.rename_patient(&old_name, &form.full_name)?;
            }
        }

        tx.commit()?;
        Ok(rows_affected > 0)
    }

    /// Insert when unsaved, update otherwise. Returns the form ID.
    pub fn save_intake_form(&self, form: &IntakeForm) -> DbResult<i64> {
        match form.id {
            None => self.insert_intake_form(form),
            Some(id) => {
                if !self.update_intake_form(form)? {
                    return Err(DbError::NotFound(format!("intake form {}", id)));
                }
                Ok(id)
            }
        }
    }

    /// Get an intake form by ID.
    pub fn get_intake_form(&self, id: i64) -> DbResult<Option<IntakeForm>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM intake_forms WHERE id = ?", INTAKE_COLUMNS),
                [id],
                intake_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get the most recent intake form for a patient name.
    pub fn get_intake_form_by_patient_name(&self, full_name: &str) -> DbResult<Option<IntakeForm>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM intake_forms WHERE full_name = ? ORDER BY id DESC LIMIT 1",
                    INTAKE_COLUMNS
                ),
                [full_name],
                intake_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List active intake forms, newest first.
    pub fn list_active_intake_forms(&self) -> DbResult<Vec<IntakeForm>> {
        self.list_intake_forms_where_archived(false)
    }

    /// List archived intake forms, newest first.
    pub fn list_archived_intake_forms(&self) -> DbResult<Vec<IntakeForm>> {
        self.list_intake_forms_where_archived(true)
    }

    fn list_intake_forms_where_archived(&self, archived: bool) -> DbResult<Vec<IntakeForm>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM intake_forms WHERE archived = ? ORDER BY updated_at DESC, id DESC",
            INTAKE_COLUMNS
        ))?;
        let rows = stmt.query_map([archived], intake_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search active intake forms by patient name.
    pub fn search_active_intake_forms(&self, query: &str) -> DbResult<Vec<IntakeForm>> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM intake_forms
            WHERE archived = 0 AND full_name LIKE ?
            ORDER BY updated_at DESC, id DESC
            "#,
            INTAKE_COLUMNS
        ))?;
        let rows = stmt.query_map([pattern], intake_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Archive an intake form.
    pub fn archive_intake_form(&self, id: i64) -> DbResult<bool> {
        self.set_intake_form_archived(id, true)
    }

    /// Restore an archived intake form.
    pub fn unarchive_intake_form(&self, id: i64) -> DbResult<bool> {
        self.set_intake_form_archived(id, false)
    }

    fn set_intake_form_archived(&self, id: i64, archived: bool) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE intake_forms SET archived = ?, updated_at = ? WHERE id = ?",
            params![archived, now_millis(), id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Count active intake forms.
    pub fn count_active_intake_forms(&self) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM intake_forms WHERE archived = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Delete every intake form for a patient name.
    pub fn delete_intake_forms_by_patient_name(&self, full_name: &str) -> DbResult<usize> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM intake_forms WHERE full_name = ?", [full_name])?;
        Ok(rows_affected)
    }
}
