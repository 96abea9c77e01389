//! Appointment reminders.
//!
//! The [`ReminderScheduler`] turns a scheduled appointment into one-shot
//! platform triggers, the [`AppointmentDesk`] applies the lifecycle policy
//! on top of the local store, and [`render_reminder`] turns a fired
//! trigger's payload into an alert.

mod config;
mod desk;
mod dispatcher;
mod scheduler;

pub use config::*;
pub use desk::*;
pub use dispatcher::*;
pub use scheduler::*;
