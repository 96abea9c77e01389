//! Local-to-remote mirroring.
//!
//! The local store is authoritative. Its change streams feed the
//! [`SyncCoordinator`], which pushes changed records to a [`RemoteMirror`]
//! with merge-upsert semantics. Nothing flows back from the mirror.

mod background;
mod cache;
mod cancel;
mod config;
mod coordinator;
mod foreign;
mod payload;
mod remote;

pub use background::*;
pub use cache::*;
pub use cancel::*;
pub use config::*;
pub use coordinator::*;
pub use foreign::*;
pub use payload::*;
pub use remote::*;
