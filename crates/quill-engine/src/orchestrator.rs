//! The [`JobOrchestrator`] turns one uploaded file or a batch of
//! remote-folder changes into persisted, indexed documents.
//!
//! One orchestrator exists per live session, scoped to one (org,
//! workspace). It owns the session's manifest: concurrent uploads join the
//! in-flight batch, and a fresh manifest replaces it after the terminal
//! broadcast. All manifest mutation happens under one mutex; the task that
//! first observes global completion flips the done-latch and owns the
//! single terminal broadcast.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use metrics::{counter, gauge};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use quill_core::constants::DEFAULT_GROUP;
use quill_core::envelope;
use quill_core::manifest::{BatchStage, EventStream, FileMeta, FileProps, FileRecord, Manifest};
use quill_core::progress::{Stage, StageAction};
use quill_embeddings::Embedder;
use quill_extract::TextExtractor;
use quill_index::VectorIndex;
use quill_remote::RemoteFolderService;
use quill_settings::IngestSettings;
use quill_store::{DocumentStore, FolderEntry, UsageMeter};

use crate::errors::EngineError;
use crate::pipeline::{
    MissingRemoteProfile, NewLocalProfile, NewRemoteProfile, SyncProfile, UpdatedRemoteProfile,
};
use crate::reconcile::{LedgerRecord, reconcile};
use crate::reporter::{Broadcaster, ProgressReporter};

/// Shared collaborator handles an orchestrator is built from.
#[derive(Clone)]
pub struct OrchestratorDeps {
    /// Document/config/ledger store.
    pub store: Arc<dyn DocumentStore>,
    /// Vector index.
    pub index: Arc<dyn VectorIndex>,
    /// Remote folder service.
    pub remote: Arc<dyn RemoteFolderService>,
    /// MIME-dispatching text extraction.
    pub extractor: Arc<dyn TextExtractor>,
    /// Embedding provider.
    pub embedder: Arc<dyn Embedder>,
    /// Billing usage meter.
    pub meter: Arc<dyn UsageMeter>,
    /// Broadcast seam (the hub).
    pub broadcaster: Arc<dyn Broadcaster>,
}

/// What a batch invocation accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Number of items accepted into the batch.
    pub accepted: usize,
}

struct BatchState {
    manifest: Manifest,
    done_sent: bool,
}

/// Per-session ingestion coordinator.
pub struct JobOrchestrator {
    pub(crate) deps: OrchestratorDeps,
    pub(crate) org_id: String,
    pub(crate) workspace_id: String,
    pub(crate) ingest: IngestSettings,
    limiter: Arc<Semaphore>,
    state: Mutex<BatchState>,
}

enum ItemWork {
    Local(NewLocalProfile),
    New {
        credential: String,
        profile: NewRemoteProfile,
    },
    Updated {
        credential: String,
        profile: UpdatedRemoteProfile,
    },
    Missing(MissingRemoteProfile),
}

impl ItemWork {
    fn meta(&self) -> &FileMeta {
        match self {
            ItemWork::Local(p) => &p.meta,
            ItemWork::New { profile, .. } => &profile.meta,
            ItemWork::Updated { profile, .. } => &profile.meta,
            ItemWork::Missing(p) => &p.meta,
        }
    }
}

impl JobOrchestrator {
    /// Build an orchestrator for one session's (org, workspace).
    pub fn new(
        deps: OrchestratorDeps,
        org_id: &str,
        workspace_id: &str,
        ingest: IngestSettings,
    ) -> Self {
        let width = ingest.max_concurrent_items.max(1);
        Self {
            deps,
            org_id: org_id.to_string(),
            workspace_id: workspace_id.to_string(),
            ingest,
            limiter: Arc::new(Semaphore::new(width)),
            state: Mutex::new(BatchState {
                manifest: Manifest::new(),
                done_sent: false,
            }),
        }
    }

    fn reporter(&self) -> ProgressReporter {
        ProgressReporter::new(Arc::clone(&self.deps.broadcaster), &self.workspace_id)
    }

    /// Snapshot of the current manifest (test and diagnostics helper).
    pub fn manifest(&self) -> Manifest {
        self.state.lock().manifest.clone()
    }

    /// Ingest one manually uploaded file.
    ///
    /// Runs the item to completion: callers that must not block (the
    /// session reader) spawn this onto its own task.
    #[instrument(skip(self, props, data), fields(org = %self.org_id, workspace = %self.workspace_id))]
    pub async fn upload_local(
        self: &Arc<Self>,
        props: FileProps,
        data: Vec<u8>,
    ) -> Result<BatchOutcome, EngineError> {
        let size = props.size;
        self.quota_gate(size).await?;

        let meta = FileMeta::minted(&self.workspace_id, props);
        debug!(document = %meta.document_id, name = %meta.props.name, "accepting local upload");

        let snapshot = {
            let mut state = self.state.lock();
            if state.done_sent {
                state.manifest = Manifest::new();
                state.done_sent = false;
            }
            state.manifest.insert(DEFAULT_GROUP, FileRecord::new(meta.clone()));
            state.manifest.clone()
        };
        self.deps
            .broadcaster
            .broadcast(envelope::upload_manifest(
                BatchStage::Active,
                &self.workspace_id,
                &snapshot,
            ))
            .await;
        counter!("ingest_batches_total").increment(1);

        let profile = NewLocalProfile {
            meta,
            data: Bytes::from(data),
        };
        Arc::clone(self)
            .run_item(DEFAULT_GROUP.to_string(), ItemWork::Local(profile))
            .await;
        Ok(BatchOutcome { accepted: 1 })
    }

    /// Register the requested folders and reconcile every synced folder of
    /// the workspace, running the classified work as one batch.
    #[instrument(skip(self, credential), fields(org = %self.org_id, workspace = %self.workspace_id))]
    pub async fn sync_folders(
        self: &Arc<Self>,
        credential: &str,
        folder_ids: &[String],
    ) -> Result<BatchOutcome, EngineError> {
        // Additive registration of newly selected folders.
        for folder_id in folder_ids {
            let folder = self
                .remote_checked(self.deps.remote.get_folder(credential, folder_id).await)
                .await?;
            let _ = self
                .deps
                .store
                .upsert_folder_entry(FolderEntry {
                    id: Uuid::new_v4().to_string(),
                    workspace_id: self.workspace_id.clone(),
                    name: folder.name,
                    remote_id: folder.id,
                    remote_parent_id: folder.parent_id,
                    service_type: self.deps.remote.service_type().to_string(),
                    last_synced: Utc::now(),
                })
                .await?;
        }

        // Reconcile every synced folder against its live listing.
        let folders = self.deps.store.list_folder_entries(&self.workspace_id).await?;
        let ledger = self.deps.store.list_ledger(&self.workspace_id).await?;

        let mut diffs = Vec::new();
        for folder in &folders {
            let listing = self
                .remote_checked(
                    self.deps
                        .remote
                        .list_children(credential, &folder.remote_id)
                        .await,
                )
                .await?;
            let records = self.ledger_records(&ledger, &folder.remote_id).await;
            let diff = reconcile(&records, &listing);
            if diff.is_empty() {
                continue;
            }
            debug!(
                folder = %folder.remote_id,
                new = diff.new.len(),
                updated = diff.updated.len(),
                missing = diff.missing.len(),
                "classified folder changes"
            );
            diffs.push((folder.remote_id.clone(), diff));
        }

        if diffs.is_empty() {
            info!("reconciliation found no changes");
            return Ok(BatchOutcome { accepted: 0 });
        }

        // One quota gate for the whole batch, before any stage runs.
        let delta: i64 = diffs.iter().map(|(_, d)| d.size_delta()).sum();
        self.quota_gate(delta).await?;

        // Build profiles and manifest records, then announce the batch.
        let mut profiles = Vec::with_capacity(diffs.len());
        let snapshot = {
            let mut state = self.state.lock();
            if state.done_sent {
                state.manifest = Manifest::new();
                state.done_sent = false;
            }
            for (folder_id, diff) in diffs {
                let (profile, records) = SyncProfile::from_diff(&folder_id, &self.workspace_id, diff);
                for record in records {
                    state.manifest.insert(&folder_id, record);
                }
                profiles.push(profile);
            }
            state.manifest.clone()
        };
        self.deps
            .broadcaster
            .broadcast(envelope::upload_manifest(
                BatchStage::Active,
                &self.workspace_id,
                &snapshot,
            ))
            .await;
        counter!("ingest_batches_total").increment(1);

        // Fan the items out; the limiter bounds how many run at once.
        let mut tasks = JoinSet::new();
        let mut accepted = 0;
        for profile in profiles {
            let folder_id = profile.folder_id.clone();
            for new in profile.new {
                accepted += 1;
                let _ = tasks.spawn(Arc::clone(self).run_item(
                    folder_id.clone(),
                    ItemWork::New {
                        credential: credential.to_string(),
                        profile: new,
                    },
                ));
            }
            for updated in profile.updated {
                accepted += 1;
                let _ = tasks.spawn(Arc::clone(self).run_item(
                    folder_id.clone(),
                    ItemWork::Updated {
                        credential: credential.to_string(),
                        profile: updated,
                    },
                ));
            }
            for missing in profile.missing {
                accepted += 1;
                let _ = tasks.spawn(
                    Arc::clone(self).run_item(folder_id.clone(), ItemWork::Missing(missing)),
                );
            }
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "item task panicked");
            }
        }

        Ok(BatchOutcome { accepted })
    }

    /// Join one ledger slice with its documents' remembered properties.
    async fn ledger_records(
        &self,
        ledger: &[quill_store::LedgerEntry],
        folder_remote_id: &str,
    ) -> Vec<LedgerRecord> {
        let mut records = Vec::new();
        for entry in ledger
            .iter()
            .filter(|e| e.remote_parent_id == folder_remote_id)
        {
            match self.deps.store.get_document(&entry.document_id).await {
                Ok(document) => records.push(LedgerRecord {
                    entry: entry.clone(),
                    props: document.props,
                }),
                Err(err) => {
                    // Ledger row without a document row: reconcile with
                    // empty props rather than dropping the entry, so the
                    // remote's truth still wins.
                    warn!(entry = %entry.id, error = %err, "ledger entry has no document row");
                    records.push(LedgerRecord {
                        entry: entry.clone(),
                        props: FileProps::default(),
                    });
                }
            }
        }
        records
    }

    /// Evaluate the storage ceiling once per batch. `delta` is the batch's
    /// net size change in bytes; subscribing tenants are never gated.
    async fn quota_gate(&self, delta: i64) -> Result<(), EngineError> {
        if self.deps.store.subscription_active(&self.org_id).await? {
            return Ok(());
        }
        let current = self.deps.store.total_size(&self.org_id).await?;
        let limit = self.ingest.non_subscriber_storage_limit;
        if current + delta > limit {
            let message = format!(
                "tenant storage limit exceeded: {current} + {delta} > {limit} bytes"
            );
            warn!(%message, "rejecting batch");
            self.deps
                .broadcaster
                .broadcast(envelope::auth_error(
                    &message,
                    402,
                    &self.workspace_id,
                    &self.org_id,
                ))
                .await;
            return Err(EngineError::Quota(message));
        }
        Ok(())
    }

    /// Turn an unauthorized remote result into a broadcast auth rejection;
    /// pass everything else through.
    async fn remote_checked<T>(
        &self,
        result: Result<T, quill_remote::RemoteError>,
    ) -> Result<T, EngineError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let err: EngineError = err.into();
                if let EngineError::Auth { status, message } = &err {
                    warn!(status = *status, %message, "remote credential rejected");
                    self.deps
                        .broadcaster
                        .broadcast(envelope::auth_error(
                            message,
                            *status,
                            &self.workspace_id,
                            &self.org_id,
                        ))
                        .await;
                }
                Err(err)
            }
        }
    }

    /// Run one item's full stage sequence as its own unit of work, then
    /// finalize its manifest slot. Only this task ever touches that slot.
    async fn run_item(self: Arc<Self>, group: String, work: ItemWork) {
        // New items wait here for a free limiter slot.
        let Ok(_permit) = Arc::clone(&self.limiter).acquire_owned().await else {
            return; // limiter closed: shutting down
        };
        gauge!("ingest_items_active").increment(1.0);

        let reporter = self.reporter();
        let meta = work.meta().clone();
        let document_id = meta.document_id.clone();
        let mut events = EventStream::new();

        let outcome = self.run_stages(&reporter, &mut events, &work).await;
        match &outcome {
            Ok(()) => {
                let _ = reporter
                    .transition(Stage::Operation, StageAction::Completed, &document_id, None)
                    .await;
            }
            Err(err) => {
                counter!("ingest_item_failures_total").increment(1);
                warn!(document = %document_id, error = %err, "item failed; batch continues");
                let _ = reporter
                    .transition(
                        Stage::Operation,
                        StageAction::Completed,
                        &document_id,
                        Some(&err.to_string()),
                    )
                    .await;
            }
        }

        self.finalize_item(&group, &document_id, events).await;
        gauge!("ingest_items_active").decrement(1.0);
    }

    async fn run_stages(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        work: &ItemWork,
    ) -> Result<(), EngineError> {
        match work {
            ItemWork::Local(profile) => {
                let text = self
                    .parse_stage(
                        reporter,
                        events,
                        &profile.meta.props.mime_type,
                        &profile.data,
                        &profile.meta.document_id,
                    )
                    .await?;
                let chunks = self
                    .split_embed_upload(reporter, events, &profile.meta, &text)
                    .await?;
                self.persist_local(reporter, events, &profile.meta, chunks)
                    .await
            }
            ItemWork::New { credential, profile } => {
                let (data, mime) = self
                    .fetch_stage(
                        reporter,
                        events,
                        credential,
                        &profile.item,
                        &profile.meta.document_id,
                    )
                    .await?;
                let text = self
                    .parse_stage(reporter, events, &mime, &data, &profile.meta.document_id)
                    .await?;
                let chunks = self
                    .split_embed_upload(reporter, events, &profile.meta, &text)
                    .await?;
                self.persist_new_remote(reporter, events, profile, chunks)
                    .await
            }
            ItemWork::Updated { credential, profile } => {
                let _ = self.purge_vectors(reporter, events, &profile.meta).await?;
                let (data, mime) = self
                    .fetch_stage(
                        reporter,
                        events,
                        credential,
                        &profile.item,
                        &profile.meta.document_id,
                    )
                    .await?;
                let text = self
                    .parse_stage(reporter, events, &mime, &data, &profile.meta.document_id)
                    .await?;
                let chunks = self
                    .split_embed_upload(reporter, events, &profile.meta, &text)
                    .await?;
                self.persist_updated_remote(reporter, events, profile, chunks)
                    .await
            }
            ItemWork::Missing(profile) => {
                let _ = self.purge_vectors(reporter, events, &profile.meta).await?;
                self.persist_missing_remote(reporter, events, profile).await
            }
        }
    }

    /// Install the item's event stream and flip its completion flag. If
    /// this was the last open record, emit the single terminal broadcast
    /// and the subscriber usage event.
    async fn finalize_item(&self, group: &str, document_id: &str, events: EventStream) {
        let done_snapshot = {
            let mut state = self.state.lock();
            if !state.manifest.finalize(group, document_id, events) {
                warn!(group, document_id, "no manifest slot for finished item");
            }
            if state.manifest.is_done() && !state.done_sent {
                state.done_sent = true;
                Some(state.manifest.clone())
            } else {
                None
            }
        };

        let Some(snapshot) = done_snapshot else {
            return;
        };
        info!(records = snapshot.len(), "batch complete");
        self.deps
            .broadcaster
            .broadcast(envelope::upload_manifest(
                BatchStage::Done,
                &self.workspace_id,
                &snapshot,
            ))
            .await;
        self.record_usage().await;
    }

    /// One usage event per completed batch, subscribing tenants only.
    async fn record_usage(&self) {
        match self.deps.store.subscription_active(&self.org_id).await {
            Ok(true) => {
                let total = match self.deps.store.total_size(&self.org_id).await {
                    Ok(total) => total,
                    Err(err) => {
                        warn!(error = %err, "could not size tenant for usage event");
                        return;
                    }
                };
                if let Err(err) = self.deps.meter.record(&self.org_id, total).await {
                    warn!(error = %err, "usage event failed");
                }
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "could not resolve subscription state"),
        }
    }
}
