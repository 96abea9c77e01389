//! Sync coordinator.
//!
//! One task per change stream. Each task waits for a quiet period after the
//! latest emission, then runs a pass over the snapshot: records whose
//! hashable payload matches the cached hash are skipped, the rest are
//! merge-upserted and cached once the mirror acknowledges them. A failed
//! upsert leaves the cache untouched so the record is retried on the next
//! emission.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};

use super::cache::{payload_hash, ChangeHashCache};
use super::cancel::{CancelSource, CancelToken};
use super::config::SyncConfig;
use super::payload::{upload_payload, Syncable};
use super::remote::{RemoteMirror, RemoteResult};
use crate::clock::{Clock, SystemClock};
use crate::models::{Appointment, IntakeForm, Patient, ProfileSettings, UserSettings};
use crate::store::LocalStore;

/// Coordinator lifecycle errors.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Outcome of one pass over a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Upserts acknowledged by the mirror
    pub mirrored: usize,
    /// Records whose payload matched the cache
    pub unchanged: usize,
    /// Records without a local ID
    pub skipped_unsaved: usize,
    /// Upserts that failed (records stay dirty)
    pub failed: usize,
    /// The pass stopped early on cancellation
    pub cancelled: bool,
}

impl PassReport {
    /// Upserts issued during the pass, whatever their outcome.
    pub fn attempted(&self) -> usize {
        self.mirrored + self.failed
    }

    fn absorb(&mut self, other: PassReport) {
        self.mirrored += other.mirrored;
        self.unchanged += other.unchanged;
        self.skipped_unsaved += other.skipped_unsaved;
        self.failed += other.failed;
        self.cancelled |= other.cancelled;
    }
}

/// Collaborators shared by every pass.
#[derive(Clone)]
pub struct SyncContext {
    pub mirror: Arc<dyn RemoteMirror>,
    pub clock: Arc<dyn Clock>,
}

/// Sync state for one record category: its collection and hash cache.
pub struct CategorySync<T> {
    collection: String,
    cache: ChangeHashCache,
    _records: PhantomData<fn(&T)>,
}

type UpsertOutcome = (String, u64, RemoteResult<()>);

impl<T: Syncable> CategorySync<T> {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            cache: ChangeHashCache::new(),
            _records: PhantomData,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn cache(&self) -> &ChangeHashCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ChangeHashCache {
        &mut self.cache
    }

    /// Mirror every changed record of `records`.
    ///
    /// Upserts are dispatched in list order without waiting for each other;
    /// the pass then collects their outcomes. On cancellation, records not
    /// yet dispatched are dropped and in-flight upserts are detached: they
    /// may still land remotely, but the cache does not learn about them.
    pub async fn run_pass(
        &mut self,
        records: &[T],
        ctx: &SyncContext,
        cancel: &mut CancelToken,
    ) -> PassReport {
        let mut report = PassReport::default();
        let mut in_flight: JoinSet<UpsertOutcome> = JoinSet::new();

        for record in records {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let Some(document_id) = record.document_id() else {
                report.skipped_unsaved += 1;
                continue;
            };

            let fields = record.hashable_payload();
            let hash = payload_hash(&fields);
            if self.cache.is_current(&document_id, hash) {
                report.unchanged += 1;
                continue;
            }

            let upload = upload_payload(fields, ctx.clock.now());
            let mirror = Arc::clone(&ctx.mirror);
            let collection = self.collection.clone();
            in_flight.spawn(async move {
                let result = mirror.merge_upsert(&collection, &document_id, upload).await;
                (document_id, hash, result)
            });
        }

        if report.cancelled {
            in_flight.detach_all();
            return report;
        }

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = in_flight.join_next() => Some(joined),
            };

            match next {
                None => {
                    report.cancelled = true;
                    in_flight.detach_all();
                    break;
                }
                Some(None) => break,
                Some(Some(Ok((document_id, hash, Ok(()))))) => {
                    self.cache.record(document_id, hash);
                    report.mirrored += 1;
                }
                Some(Some(Ok((document_id, _, Err(e))))) => {
                    tracing::warn!(
                        collection = %self.collection,
                        document_id = %document_id,
                        error = %e,
                        "Remote upsert failed, record left dirty"
                    );
                    report.failed += 1;
                }
                Some(Some(Err(e))) => {
                    tracing::warn!(
                        collection = %self.collection,
                        error = %e,
                        "Upsert task did not complete"
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl<T> CategorySync<T>
where
    T: Syncable + Send + Sync + 'static,
{
    /// Follow a change stream until cancelled or the stream closes.
    ///
    /// The value current at subscription time is processed first. Returns
    /// `self` so the warm cache survives a stop/start cycle.
    async fn observe<S, F>(
        mut self,
        mut rx: watch::Receiver<S>,
        project: F,
        ctx: SyncContext,
        debounce: Duration,
        mut cancel: CancelToken,
    ) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(&S) -> Vec<T> + Send + 'static,
    {
        let mut pending = true;
        loop {
            if !pending {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            pending = false;

            // Quiet period, restarted by every new emission
            let mut closed = false;
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return self,
                    changed = rx.changed(), if !closed => {
                        if changed.is_err() {
                            closed = true;
                        }
                    }
                    _ = tokio::time::sleep(debounce) => break,
                }
            }

            let records = project(&rx.borrow_and_update());
            let report = self.run_pass(&records, &ctx, &mut cancel).await;
            tracing::debug!(
                collection = %self.collection,
                mirrored = report.mirrored,
                unchanged = report.unchanged,
                skipped = report.skipped_unsaved,
                failed = report.failed,
                "Sync pass finished"
            );

            if report.cancelled || closed {
                break;
            }
        }
        self
    }
}

/// Per-category reports from an immediate sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub patients: PassReport,
    pub intake_forms: PassReport,
    pub appointments: PassReport,
    pub settings: PassReport,
}

impl SyncSummary {
    /// Totals across all categories.
    pub fn total(&self) -> PassReport {
        let mut total = PassReport::default();
        for report in [self.patients, self.intake_forms, self.appointments, self.settings] {
            total.absorb(report);
        }
        total
    }
}

/// Mirrors local store changes to the remote document store.
///
/// Owns one [`ChangeHashCache`] per category. The caches start empty and
/// are dropped with the coordinator.
pub struct SyncCoordinator {
    ctx: SyncContext,
    config: SyncConfig,
    patients: CategorySync<Patient>,
    intake_forms: CategorySync<IntakeForm>,
    appointments: CategorySync<Appointment>,
    settings: CategorySync<ProfileSettings>,
}

impl SyncCoordinator {
    pub fn new(mirror: Arc<dyn RemoteMirror>, config: SyncConfig) -> Self {
        let collections = &config.collections;
        Self {
            patients: CategorySync::new(collections.patients.clone()),
            intake_forms: CategorySync::new(collections.intake_forms.clone()),
            appointments: CategorySync::new(collections.appointments.clone()),
            settings: CategorySync::new(collections.profile_settings.clone()),
            ctx: SyncContext {
                mirror,
                clock: Arc::new(SystemClock),
            },
            config,
        }
    }

    /// Replace the clock used for upload timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn patients(&self) -> &CategorySync<Patient> {
        &self.patients
    }

    pub fn intake_forms(&self) -> &CategorySync<IntakeForm> {
        &self.intake_forms
    }

    pub fn appointments(&self) -> &CategorySync<Appointment> {
        &self.appointments
    }

    pub fn settings(&self) -> &CategorySync<ProfileSettings> {
        &self.settings
    }

    /// Run one pass over every category right away, without debouncing.
    pub async fn sync_now(&mut self, store: &LocalStore) -> SyncSummary {
        // Held for the whole call: a dropped source reads as cancellation
        let source = CancelSource::new();
        let mut cancel = source.token();

        let patients = store.subscribe_patients().borrow().clone();
        let intake_forms = store.subscribe_intake_forms().borrow().clone();
        let appointments = store.subscribe_appointments().borrow().clone();
        let profile = profile_settings(store.install_id(), &store.user_settings());

        SyncSummary {
            patients: self.patients.run_pass(&patients, &self.ctx, &mut cancel).await,
            intake_forms: self
                .intake_forms
                .run_pass(&intake_forms, &self.ctx, &mut cancel)
                .await,
            appointments: self
                .appointments
                .run_pass(&appointments, &self.ctx, &mut cancel)
                .await,
            settings: self.settings.run_pass(&[profile], &self.ctx, &mut cancel).await,
        }
    }

    /// Start observing the store. Must be called from within a Tokio runtime.
    pub fn start(self, store: &LocalStore) -> SyncHandle {
        let cancel = CancelSource::new();
        let debounce = self.config.debounce();
        tracing::info!(debounce_ms = self.config.debounce_ms, "Sync coordinator started");

        let patients = tokio::spawn(self.patients.observe(
            store.subscribe_patients(),
            |snapshot: &Vec<Patient>| snapshot.clone(),
            self.ctx.clone(),
            debounce,
            cancel.token(),
        ));
        let intake_forms = tokio::spawn(self.intake_forms.observe(
            store.subscribe_intake_forms(),
            |snapshot: &Vec<IntakeForm>| snapshot.clone(),
            self.ctx.clone(),
            debounce,
            cancel.token(),
        ));
        let appointments = tokio::spawn(self.appointments.observe(
            store.subscribe_appointments(),
            |snapshot: &Vec<Appointment>| snapshot.clone(),
            self.ctx.clone(),
            debounce,
            cancel.token(),
        ));
        let device_id = store.install_id().to_string();
        let settings = tokio::spawn(self.settings.observe(
            store.subscribe_settings(),
            move |settings: &UserSettings| vec![profile_settings(&device_id, settings)],
            self.ctx.clone(),
            debounce,
            cancel.token(),
        ));

        SyncHandle {
            cancel,
            ctx: self.ctx,
            config: self.config,
            patients,
            intake_forms,
            appointments,
            settings,
        }
    }
}

fn profile_settings(device_id: &str, settings: &UserSettings) -> ProfileSettings {
    ProfileSettings {
        device_id: device_id.to_string(),
        settings: settings.clone(),
    }
}

/// Running coordinator. Stop it to get the coordinator (and its caches) back.
///
/// Dropping the handle also stops the tasks, but their caches are lost.
pub struct SyncHandle {
    cancel: CancelSource,
    ctx: SyncContext,
    config: SyncConfig,
    patients: JoinHandle<CategorySync<Patient>>,
    intake_forms: JoinHandle<CategorySync<IntakeForm>>,
    appointments: JoinHandle<CategorySync<Appointment>>,
    settings: JoinHandle<CategorySync<ProfileSettings>>,
}

impl SyncHandle {
    /// Request cancellation without waiting for the tasks.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel every task and wait for them to wind down.
    pub async fn stop(self) -> Result<SyncCoordinator, SyncError> {
        self.cancel.cancel();

        let patients = self.patients.await?;
        let intake_forms = self.intake_forms.await?;
        let appointments = self.appointments.await?;
        let settings = self.settings.await?;
        tracing::info!("Sync coordinator stopped");

        Ok(SyncCoordinator {
            ctx: self.ctx,
            config: self.config,
            patients,
            intake_forms,
            appointments,
            settings,
        })
    }
}
