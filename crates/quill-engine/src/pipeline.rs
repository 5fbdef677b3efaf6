//! Per-item pipeline stages and the work profiles that drive them.
//!
//! Every stage boundary emits a Started event immediately before the work
//! and a Completed/Failed event immediately after, unbatched, so viewers
//! see monotonically increasing progress. A failed stage short-circuits
//! the item's remaining stages; the item still counts toward batch
//! completion.

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use quill_core::manifest::{EventStream, FileMeta, FileProps, FileRecord};
use quill_core::progress::{Stage, StageAction};
use quill_remote::{NATIVE_DOCUMENT_MIME, RemoteItem, export_type_for};
use quill_store::{Document, LedgerEntry};

use crate::errors::EngineError;
use crate::orchestrator::JobOrchestrator;
use crate::reconcile::Reconciliation;
use crate::reporter::ProgressReporter;

/// A manually uploaded file, ready to ingest.
#[derive(Clone, Debug)]
pub struct NewLocalProfile {
    /// Identity and core properties.
    pub meta: FileMeta,
    /// Raw file content from the upload frame.
    pub data: Bytes,
}

/// A remote item with no ledger entry yet.
#[derive(Clone, Debug)]
pub struct NewRemoteProfile {
    /// Freshly minted identity.
    pub meta: FileMeta,
    /// Live remote metadata.
    pub item: RemoteItem,
}

/// A remote item whose content changed since the last sync.
#[derive(Clone, Debug)]
pub struct UpdatedRemoteProfile {
    /// Adopted identity of the existing document.
    pub meta: FileMeta,
    /// Ledger entry to rewrite after re-ingest.
    pub entry_id: String,
    /// Live remote metadata.
    pub item: RemoteItem,
    /// Previously recorded size, for storage accounting.
    pub prior_size: i64,
}

/// A ledger entry whose remote item vanished.
#[derive(Clone, Debug)]
pub struct MissingRemoteProfile {
    /// Adopted identity of the document to remove.
    pub meta: FileMeta,
    /// Ledger entry to delete.
    pub entry_id: String,
}

/// One folder's classified work, carrying everything its pipeline runs
/// need.
#[derive(Clone, Debug, Default)]
pub struct SyncProfile {
    /// Source folder id (the manifest group key).
    pub folder_id: String,
    /// Items to ingest for the first time.
    pub new: Vec<NewRemoteProfile>,
    /// Items to purge and re-ingest.
    pub updated: Vec<UpdatedRemoteProfile>,
    /// Items to remove.
    pub missing: Vec<MissingRemoteProfile>,
}

impl SyncProfile {
    /// Build a folder's profile from its reconciliation, minting manifest
    /// records alongside.
    pub fn from_diff(
        folder_id: &str,
        workspace_id: &str,
        diff: Reconciliation,
    ) -> (Self, Vec<FileRecord>) {
        let mut records = Vec::with_capacity(diff.len());
        let mut profile = SyncProfile {
            folder_id: folder_id.to_string(),
            ..SyncProfile::default()
        };

        for item in diff.new {
            let meta = FileMeta::minted(workspace_id, props_of(&item));
            records.push(FileRecord::new(meta.clone()));
            profile.new.push(NewRemoteProfile { meta, item });
        }
        for updated in diff.updated {
            let meta = FileMeta::adopted(&updated.document_id, workspace_id, props_of(&updated.item));
            records.push(FileRecord::new(meta.clone()));
            profile.updated.push(UpdatedRemoteProfile {
                meta,
                entry_id: updated.entry_id,
                item: updated.item,
                prior_size: updated.prior_size,
            });
        }
        for missing in diff.missing {
            let meta = FileMeta::adopted(&missing.document_id, workspace_id, missing.props);
            records.push(FileRecord::new(meta.clone()));
            profile.missing.push(MissingRemoteProfile {
                meta,
                entry_id: missing.entry_id,
            });
        }

        (profile, records)
    }

    /// Total items across the three classes.
    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.missing.len()
    }

    /// Whether the profile carries no work.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn props_of(item: &RemoteItem) -> FileProps {
    FileProps {
        name: item.name.clone(),
        size: item.size,
        mime_type: item.mime_type.clone(),
    }
}

/// Run one stage: Started event, the work itself, then Completed or Failed.
/// Both boundary events are appended to the item's stream.
async fn run_stage<T, F>(
    reporter: &ProgressReporter,
    events: &mut EventStream,
    stage: Stage,
    document_id: &str,
    work: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    events.push(
        reporter
            .transition(stage, StageAction::Started, document_id, None)
            .await,
    );
    match work.await {
        Ok(value) => {
            events.push(
                reporter
                    .transition(stage, StageAction::Completed, document_id, None)
                    .await,
            );
            Ok(value)
        }
        Err(err) => {
            events.push(
                reporter
                    .transition(stage, StageAction::Completed, document_id, Some(&err.to_string()))
                    .await,
            );
            Err(err)
        }
    }
}

impl JobOrchestrator {
    /// Fetch a remote item's bytes: export for provider-native documents,
    /// plain download otherwise. Returns the bytes and the format they
    /// arrived in.
    pub(crate) async fn fetch_stage(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        credential: &str,
        item: &RemoteItem,
        document_id: &str,
    ) -> Result<(Bytes, String), EngineError> {
        let export_type = export_type_for(&item.mime_type).to_string();
        if item.mime_type == NATIVE_DOCUMENT_MIME {
            let data = run_stage(reporter, events, Stage::Exporting, document_id, async {
                Ok(self
                    .deps
                    .remote
                    .export(credential, &item.id, &export_type)
                    .await?)
            })
            .await?;
            Ok((data, export_type))
        } else {
            let data = run_stage(reporter, events, Stage::Downloading, document_id, async {
                Ok(self.deps.remote.download(credential, &item.id).await?)
            })
            .await?;
            Ok((data, export_type))
        }
    }

    /// Extract text from raw bytes.
    pub(crate) async fn parse_stage(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        mime_type: &str,
        data: &[u8],
        document_id: &str,
    ) -> Result<String, EngineError> {
        run_stage(reporter, events, Stage::Parsing, document_id, async {
            Ok(self.deps.extractor.extract(mime_type, data)?)
        })
        .await
    }

    /// Split, embed, and write vectors to the index. Returns the chunk
    /// count for the document row.
    pub(crate) async fn split_embed_upload(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        meta: &FileMeta,
        text: &str,
    ) -> Result<i64, EngineError> {
        let document_id = meta.document_id.as_str();
        let chunk_size = self.ingest.chunk_size;
        let overlap = self.ingest.chunk_overlap;

        let chunks = run_stage(reporter, events, Stage::Splitting, document_id, async {
            Ok(quill_extract::split_text(text, chunk_size, overlap))
        })
        .await?;

        let vectors = run_stage(reporter, events, Stage::Embedding, document_id, async {
            Ok(self.deps.embedder.embed(&chunks).await?)
        })
        .await?;

        let written = run_stage(reporter, events, Stage::Uploading, document_id, async {
            Ok(self
                .deps
                .index
                .upsert(&self.org_id, &meta.workspace_id, document_id, vectors, chunks)
                .await?)
        })
        .await?;

        Ok(written as i64)
    }

    /// Purge a document's existing vectors (updated and missing items).
    pub(crate) async fn purge_vectors(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        meta: &FileMeta,
    ) -> Result<u64, EngineError> {
        run_stage(reporter, events, Stage::Deleting, &meta.document_id, async {
            Ok(self
                .deps
                .index
                .delete_by_document(&self.org_id, &meta.workspace_id, &meta.document_id)
                .await?)
        })
        .await
    }

    /// Persist a manually uploaded document.
    pub(crate) async fn persist_local(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        meta: &FileMeta,
        chunk_count: i64,
    ) -> Result<(), EngineError> {
        let document = self.document_row(meta, chunk_count);
        let _ = run_stage(reporter, events, Stage::Updating, &meta.document_id, async {
            Ok(self.deps.store.create_document(document).await?)
        })
        .await?;
        Ok(())
    }

    /// Persist a newly synced remote document plus its ledger entry.
    pub(crate) async fn persist_new_remote(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        profile: &NewRemoteProfile,
        chunk_count: i64,
    ) -> Result<(), EngineError> {
        let meta = &profile.meta;
        let document = self.document_row(meta, chunk_count);
        let _ = run_stage(reporter, events, Stage::Updating, &meta.document_id, async {
            Ok(self.deps.store.create_document(document).await?)
        })
        .await?;

        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            workspace_id: meta.workspace_id.clone(),
            document_id: meta.document_id.clone(),
            remote_id: profile.item.id.clone(),
            remote_parent_id: profile.item.parent_id.clone(),
            service_type: self.deps.remote.service_type().to_string(),
            last_modified: profile.item.last_modified,
        };
        let _ = run_stage(
            reporter,
            events,
            Stage::Synchronizing,
            &meta.document_id,
            async { Ok(self.deps.store.create_ledger_entry(entry).await?) },
        )
        .await?;
        Ok(())
    }

    /// Rewrite an updated document's row and its ledger entry.
    pub(crate) async fn persist_updated_remote(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        profile: &UpdatedRemoteProfile,
        chunk_count: i64,
    ) -> Result<(), EngineError> {
        let meta = &profile.meta;
        let chunk_size = self.ingest.chunk_size as i64;
        let _ = run_stage(reporter, events, Stage::Updating, &meta.document_id, async {
            Ok(self
                .deps
                .store
                .update_document(
                    &meta.document_id,
                    &profile.item.name,
                    profile.item.size,
                    chunk_count,
                    chunk_size,
                    Utc::now(),
                )
                .await?)
        })
        .await?;

        let _ = run_stage(
            reporter,
            events,
            Stage::Synchronizing,
            &meta.document_id,
            async {
                Ok(self
                    .deps
                    .store
                    .update_ledger_last_modified(&profile.entry_id, profile.item.last_modified)
                    .await?)
            },
        )
        .await?;
        Ok(())
    }

    /// Remove a vanished item's document row and ledger entry.
    pub(crate) async fn persist_missing_remote(
        &self,
        reporter: &ProgressReporter,
        events: &mut EventStream,
        profile: &MissingRemoteProfile,
    ) -> Result<(), EngineError> {
        let meta = &profile.meta;
        let _ = run_stage(reporter, events, Stage::Updating, &meta.document_id, async {
            Ok(self.deps.store.delete_document(&meta.document_id).await?)
        })
        .await?;

        let _ = run_stage(
            reporter,
            events,
            Stage::Synchronizing,
            &meta.document_id,
            async { Ok(self.deps.store.delete_ledger_entry(&profile.entry_id).await?) },
        )
        .await?;
        Ok(())
    }

    fn document_row(&self, meta: &FileMeta, chunk_count: i64) -> Document {
        Document {
            id: meta.document_id.clone(),
            org_id: self.org_id.clone(),
            workspace_id: meta.workspace_id.clone(),
            props: meta.props.clone(),
            chunk_count,
            chunk_size: self.ingest.chunk_size as i64,
            timestamp: Utc::now(),
        }
    }
}
