//! In-memory [`DocumentStore`] for tests and local runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::errors::StoreError;
use crate::store::DocumentStore;
use crate::types::{Document, FolderEntry, LedgerEntry};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Document>,
    folders: Vec<FolderEntry>,
    ledger: HashMap<String, LedgerEntry>,
    subscribed_orgs: HashSet<String>,
}

/// Hash-map-backed store. All rows live behind one mutex; critical
/// sections are short and never await.
#[derive(Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl MemoryDocumentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a tenant's subscription flag.
    pub fn set_subscription(&self, org_id: &str, active: bool) {
        let mut inner = self.inner.lock();
        if active {
            let _ = inner.subscribed_orgs.insert(org_id.to_string());
        } else {
            let _ = inner.subscribed_orgs.remove(org_id);
        }
    }

    /// Number of document rows (test helper).
    pub fn document_count(&self) -> usize {
        self.inner.lock().documents.len()
    }

    /// Number of ledger rows (test helper).
    pub fn ledger_count(&self) -> usize {
        self.inner.lock().ledger.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(&self, document: Document) -> Result<Document, StoreError> {
        let mut inner = self.inner.lock();
        if inner.documents.contains_key(&document.id) {
            return Err(StoreError::Conflict(document.id));
        }
        let _ = inner
            .documents
            .insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn update_document(
        &self,
        document_id: &str,
        name: &str,
        size: i64,
        chunk_count: i64,
        chunk_size: i64,
        timestamp: DateTime<Utc>,
    ) -> Result<Document, StoreError> {
        let mut inner = self.inner.lock();
        let document = inner
            .documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        document.props.name = name.to_string();
        document.props.size = size;
        document.chunk_count = chunk_count;
        document.chunk_size = chunk_size;
        document.timestamp = timestamp;
        Ok(document.clone())
    }

    async fn delete_document(&self, document_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.documents.remove(document_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(document_id.to_string())),
        }
    }

    async fn get_document(&self, document_id: &str) -> Result<Document, StoreError> {
        self.inner
            .lock()
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))
    }

    async fn list_documents(&self, workspace_id: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn total_size(&self, org_id: &str) -> Result<i64, StoreError> {
        Ok(self
            .inner
            .lock()
            .documents
            .values()
            .filter(|d| d.org_id == org_id)
            .map(|d| d.props.size)
            .sum())
    }

    async fn subscription_active(&self, org_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().subscribed_orgs.contains(org_id))
    }

    async fn upsert_folder_entry(&self, entry: FolderEntry) -> Result<FolderEntry, StoreError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner
            .folders
            .iter_mut()
            .find(|f| f.workspace_id == entry.workspace_id && f.remote_id == entry.remote_id)
        {
            existing.name = entry.name.clone();
            existing.last_synced = entry.last_synced;
            return Ok(existing.clone());
        }
        inner.folders.push(entry.clone());
        Ok(entry)
    }

    async fn list_folder_entries(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<FolderEntry>, StoreError> {
        Ok(self
            .inner
            .lock()
            .folders
            .iter()
            .filter(|f| f.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn create_ledger_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, StoreError> {
        let mut inner = self.inner.lock();
        if inner.ledger.contains_key(&entry.id) {
            return Err(StoreError::Conflict(entry.id));
        }
        let _ = inner.ledger.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn list_ledger(&self, workspace_id: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .inner
            .lock()
            .ledger
            .values()
            .filter(|e| e.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn update_ledger_last_modified(
        &self,
        entry_id: &str,
        last_modified: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let entry = inner
            .ledger
            .get_mut(entry_id)
            .ok_or_else(|| StoreError::NotFound(entry_id.to_string()))?;
        entry.last_modified = last_modified;
        Ok(())
    }

    async fn delete_ledger_entry(&self, entry_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        match inner.ledger.remove(entry_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(entry_id.to_string())),
        }
    }

    async fn delete_ledger_by_document(&self, document_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.ledger.retain(|_, e| e.document_id != document_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::manifest::FileProps;

    fn document(id: &str, org: &str, workspace: &str, size: i64) -> Document {
        Document {
            id: id.to_string(),
            org_id: org.to_string(),
            workspace_id: workspace.to_string(),
            props: FileProps {
                name: format!("{id}.txt"),
                size,
                mime_type: "text/plain".to_string(),
            },
            chunk_count: 1,
            chunk_size: 500,
            timestamp: Utc::now(),
        }
    }

    fn ledger_entry(id: &str, workspace: &str, document_id: &str, remote_id: &str) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            workspace_id: workspace.to_string(),
            document_id: document_id.to_string(),
            remote_id: remote_id.to_string(),
            remote_parent_id: "folder1".to_string(),
            service_type: "fixture".to_string(),
            last_modified: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_get_delete_document() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_document(document("d1", "org1", "ws1", 10))
            .await
            .unwrap();
        assert_eq!(store.get_document("d1").await.unwrap().props.size, 10);
        store.delete_document("d1").await.unwrap();
        assert!(matches!(
            store.get_document("d1").await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_document_conflicts() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_document(document("d1", "org1", "ws1", 10))
            .await
            .unwrap();
        let result = store.create_document(document("d1", "org1", "ws1", 20)).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn total_size_sums_per_org() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_document(document("d1", "org1", "ws1", 100))
            .await
            .unwrap();
        let _ = store
            .create_document(document("d2", "org1", "ws2", 50))
            .await
            .unwrap();
        let _ = store
            .create_document(document("d3", "org2", "ws3", 999))
            .await
            .unwrap();
        assert_eq!(store.total_size("org1").await.unwrap(), 150);
        assert_eq!(store.total_size("org2").await.unwrap(), 999);
        assert_eq!(store.total_size("org3").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_document_rewrites_props() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_document(document("d1", "org1", "ws1", 10))
            .await
            .unwrap();
        let updated = store
            .update_document("d1", "renamed.txt", 32, 4, 500, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.props.name, "renamed.txt");
        assert_eq!(updated.props.size, 32);
        assert_eq!(updated.chunk_count, 4);
    }

    #[tokio::test]
    async fn subscription_defaults_to_inactive() {
        let store = MemoryDocumentStore::new();
        assert!(!store.subscription_active("org1").await.unwrap());
        store.set_subscription("org1", true);
        assert!(store.subscription_active("org1").await.unwrap());
        store.set_subscription("org1", false);
        assert!(!store.subscription_active("org1").await.unwrap());
    }

    #[tokio::test]
    async fn folder_upsert_refreshes_instead_of_duplicating() {
        let store = MemoryDocumentStore::new();
        let entry = FolderEntry {
            id: "f1".to_string(),
            workspace_id: "ws1".to_string(),
            name: "Contracts".to_string(),
            remote_id: "remote-folder".to_string(),
            remote_parent_id: "root".to_string(),
            service_type: "fixture".to_string(),
            last_synced: Utc::now(),
        };
        let _ = store.upsert_folder_entry(entry.clone()).await.unwrap();
        let mut renamed = entry.clone();
        renamed.name = "Contracts (renamed)".to_string();
        let _ = store.upsert_folder_entry(renamed).await.unwrap();

        let folders = store.list_folder_entries("ws1").await.unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "Contracts (renamed)");
    }

    #[tokio::test]
    async fn ledger_lifecycle() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_ledger_entry(ledger_entry("s1", "ws1", "d1", "r1"))
            .await
            .unwrap();
        let _ = store
            .create_ledger_entry(ledger_entry("s2", "ws1", "d2", "r2"))
            .await
            .unwrap();
        assert_eq!(store.list_ledger("ws1").await.unwrap().len(), 2);

        let later = Utc::now();
        store.update_ledger_last_modified("s1", later).await.unwrap();
        let entries = store.list_ledger("ws1").await.unwrap();
        let s1 = entries.iter().find(|e| e.id == "s1").unwrap();
        assert_eq!(s1.last_modified, later);

        store.delete_ledger_by_document("d2").await.unwrap();
        assert_eq!(store.ledger_count(), 1);
        store.delete_ledger_entry("s1").await.unwrap();
        assert_eq!(store.ledger_count(), 0);
    }

    #[tokio::test]
    async fn ledger_scoped_by_workspace() {
        let store = MemoryDocumentStore::new();
        let _ = store
            .create_ledger_entry(ledger_entry("s1", "ws1", "d1", "r1"))
            .await
            .unwrap();
        let _ = store
            .create_ledger_entry(ledger_entry("s2", "ws2", "d2", "r2"))
            .await
            .unwrap();
        assert_eq!(store.list_ledger("ws1").await.unwrap().len(), 1);
        assert_eq!(store.list_ledger("ws2").await.unwrap().len(), 1);
    }
}
