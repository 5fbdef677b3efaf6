//! The [`DocumentStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::StoreError;
use crate::types::{Document, FolderEntry, LedgerEntry};

/// The persistence seam for documents, tenant config, synced folders, and
/// the sync ledger.
///
/// All mutation is row-at-a-time; cross-batch ordering within a workspace
/// is whatever the backend provides, never in-process locking.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document row.
    async fn create_document(&self, document: Document) -> Result<Document, StoreError>;

    /// Rewrite a document's properties after re-ingest.
    async fn update_document(
        &self,
        document_id: &str,
        name: &str,
        size: i64,
        chunk_count: i64,
        chunk_size: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<Document, StoreError>;

    /// Delete a document row.
    async fn delete_document(&self, document_id: &str) -> Result<(), StoreError>;

    /// Fetch one document.
    async fn get_document(&self, document_id: &str) -> Result<Document, StoreError>;

    /// All documents in a workspace.
    async fn list_documents(&self, workspace_id: &str) -> Result<Vec<Document>, StoreError>;

    /// Total stored bytes across a tenant.
    async fn total_size(&self, org_id: &str) -> Result<i64, StoreError>;

    /// Whether the tenant has an active subscription.
    async fn subscription_active(&self, org_id: &str) -> Result<bool, StoreError>;

    /// Register a remote folder for synchronization. Re-registering the
    /// same remote folder refreshes its entry rather than duplicating it.
    async fn upsert_folder_entry(&self, entry: FolderEntry) -> Result<FolderEntry, StoreError>;

    /// All synced folders in a workspace.
    async fn list_folder_entries(&self, workspace_id: &str)
    -> Result<Vec<FolderEntry>, StoreError>;

    /// Insert a ledger entry for a newly ingested remote item.
    async fn create_ledger_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, StoreError>;

    /// All ledger entries in a workspace.
    async fn list_ledger(&self, workspace_id: &str) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Rewrite a ledger entry's remembered last-modified value.
    async fn update_ledger_last_modified(
        &self,
        entry_id: &str,
        last_modified: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete one ledger entry.
    async fn delete_ledger_entry(&self, entry_id: &str) -> Result<(), StoreError>;

    /// Delete any ledger entries pointing at a document.
    async fn delete_ledger_by_document(&self, document_id: &str) -> Result<(), StoreError>;
}
