//! Domain models for the HealPlus core.

mod appointment;
mod intake;
mod patient;
mod settings;

pub use appointment::*;
pub use intake::*;
pub use patient::*;
pub use settings::*;
