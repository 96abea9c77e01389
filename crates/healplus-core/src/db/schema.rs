//! SQLite schema definition.

/// Complete database schema for the local store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,
    birth_date TEXT,
    phone TEXT,
    email TEXT,
    occupation TEXT,
    marital_status TEXT,
    notes TEXT,
    archived INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,                 -- epoch millis
    updated_at INTEGER NOT NULL                  -- epoch millis
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(full_name);
CREATE INDEX IF NOT EXISTS idx_patients_archived ON patients(archived);

-- ============================================================================
-- Intake Forms
-- ============================================================================

CREATE TABLE IF NOT EXISTS intake_forms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL,                     -- links to patients.full_name
    consultation_date TEXT,                      -- dd/mm/yyyy
    location TEXT,
    data_json TEXT NOT NULL DEFAULT '{}',        -- structured answers
    archived INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_intake_name ON intake_forms(full_name);
CREATE INDEX IF NOT EXISTS idx_intake_archived ON intake_forms(archived);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id INTEGER REFERENCES patients(id) ON DELETE SET NULL,
    date TEXT NOT NULL,                          -- dd/mm/yyyy
    time TEXT,                                   -- HH:MM
    consultation_type TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'scheduled'
        CHECK (status IN ('scheduled', 'completed', 'cancelled')),
    archived INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(date);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);

-- ============================================================================
-- Settings (key/value)
-- ============================================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT 0
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_appointment_status_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        let result = conn.execute(
            "INSERT INTO appointments (date, status, created_at, updated_at) VALUES ('01/01/2026', 'postponed', 0, 0)",
            [],
        );
        assert!(result.is_err());

        let result = conn.execute(
            "INSERT INTO appointments (date, status, created_at, updated_at) VALUES ('01/01/2026', 'scheduled', 0, 0)",
            [],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();

        conn.execute(
            "INSERT INTO patients (full_name, created_at, updated_at) VALUES ('A', 0, 0)",
            [],
        )
        .unwrap();
        let first = conn.last_insert_rowid();
        conn.execute("DELETE FROM patients WHERE id = ?", [first]).unwrap();
        conn.execute(
            "INSERT INTO patients (full_name, created_at, updated_at) VALUES ('B', 0, 0)",
            [],
        )
        .unwrap();
        assert!(conn.last_insert_rowid() > first);
    }
}
