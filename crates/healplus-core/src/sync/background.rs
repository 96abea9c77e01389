//! Sync coordinator hosted on its own runtime.
//!
//! For callers without a Tokio runtime of their own (the FFI facade). The
//! host pauses sync when its UI goes to the background and resumes it when
//! the UI is visible again; caches survive the pause.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use super::config::SyncConfig;
use super::coordinator::{SyncCoordinator, SyncError, SyncHandle};
use super::remote::RemoteMirror;
use crate::store::LocalStore;

enum Phase {
    Idle(SyncCoordinator),
    Running(SyncHandle),
}

/// A coordinator plus the runtime that drives it.
///
/// `pause` blocks the calling thread until the sync tasks wind down, so it
/// must not be called from inside an async context.
pub struct BackgroundSync {
    runtime: Runtime,
    mirror: Arc<dyn RemoteMirror>,
    config: SyncConfig,
    phase: Option<Phase>,
}

impl BackgroundSync {
    pub fn new(mirror: Arc<dyn RemoteMirror>, config: SyncConfig) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("healplus-sync")
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            mirror,
            config,
            phase: None,
        })
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Some(Phase::Running(_)))
    }

    /// Start observing `store`. Returns `false` if already running.
    ///
    /// After a failed pause the caches are gone and a cold coordinator is
    /// started.
    pub fn resume(&mut self, store: &LocalStore) -> bool {
        let coordinator = match self.phase.take() {
            Some(Phase::Running(handle)) => {
                self.phase = Some(Phase::Running(handle));
                return false;
            }
            Some(Phase::Idle(coordinator)) => coordinator,
            None => SyncCoordinator::new(self.mirror.clone(), self.config.clone()),
        };

        let _guard = self.runtime.enter();
        self.phase = Some(Phase::Running(coordinator.start(store)));
        true
    }

    /// Stop observing, keeping the caches. Returns `false` if not running.
    pub fn pause(&mut self) -> Result<bool, SyncError> {
        match self.phase.take() {
            Some(Phase::Running(handle)) => {
                let coordinator = self.runtime.block_on(handle.stop())?;
                self.phase = Some(Phase::Idle(coordinator));
                Ok(true)
            }
            other => {
                self.phase = other;
                Ok(false)
            }
        }
    }

    /// Pause, then tear the runtime down without waiting for upserts still
    /// in flight.
    pub fn shutdown(mut self) -> Result<(), SyncError> {
        let paused = self.pause();
        self.runtime.shutdown_background();
        paused.map(|_| ())
    }
}
