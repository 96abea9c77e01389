//! Key/value settings operations.

use rusqlite::{params, OptionalExtension};

use super::{now_millis, Database, DbError, DbResult};
use crate::models::UserSettings;

/// Settings key holding the serialized [`UserSettings`].
pub const USER_SETTINGS_KEY: &str = "user_settings";

/// Settings key holding the per-install identifier.
pub const INSTALL_ID_KEY: &str = "install_id";

impl Database {
    /// Get a raw setting value.
    pub fn get_setting(&self, key: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row("SELECT value FROM settings WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Into::into)
    }

    /// Set a raw setting value.
    pub fn set_setting(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, now_millis()],
        )?;
        Ok(())
    }

    /// Load user preferences, falling back to defaults when never saved.
    pub fn load_user_settings(&self) -> DbResult<UserSettings> {
        match self.get_setting(USER_SETTINGS_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(UserSettings::default()),
        }
    }

    /// Persist user preferences. The font scale must be a positive finite
    /// number: anything else would not read back.
    pub fn save_user_settings(&self, settings: &UserSettings) -> DbResult<()> {
        if !settings.font_scale.is_finite() || settings.font_scale <= 0.0 {
            return Err(DbError::Constraint(format!(
                "font_scale must be a positive number, got {}",
                settings.font_scale
            )));
        }
        let json = serde_json::to_string(settings)?;
        self.set_setting(USER_SETTINGS_KEY, &json)
    }

    /// Stable identifier for this install, generated on first use.
    pub fn install_id(&self) -> DbResult<String> {
        self.conn.execute(
            "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![INSTALL_ID_KEY, uuid::Uuid::new_v4().to_string(), now_millis()],
        )?;
        let id: String = self.conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            [INSTALL_ID_KEY],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}
