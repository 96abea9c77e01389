//! User preference models.

use serde::{Deserialize, Serialize};

/// Display and locale preferences, stored and mirrored as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub dark_mode: bool,
    pub high_contrast: bool,
    /// Font scale multiplier (1.0 = system default)
    pub font_scale: f64,
    /// BCP 47 language tag
    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            high_contrast: false,
            font_scale: 1.0,
            language: "pt-BR".to_string(),
        }
    }
}

/// Settings snapshot tagged with the install it belongs to.
///
/// Mirrored under a single document keyed by the install ID.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettings {
    pub device_id: String,
    pub settings: UserSettings,
}
