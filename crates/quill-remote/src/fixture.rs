//! Scriptable in-memory [`RemoteFolderService`] for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::errors::RemoteError;
use crate::service::RemoteFolderService;
use crate::types::{RemoteFolder, RemoteItem};

#[derive(Default)]
struct Inner {
    folders: HashMap<String, RemoteFolder>,
    children: HashMap<String, Vec<RemoteItem>>,
    content: HashMap<String, Bytes>,
}

/// In-memory remote with a fixed accepted credential and mutable listings,
/// so tests can change "what the remote reports" between reconciliation
/// passes.
pub struct FixtureRemote {
    accepted_credential: String,
    inner: Mutex<Inner>,
}

impl FixtureRemote {
    /// A remote that accepts exactly `credential`.
    pub fn new(credential: &str) -> Self {
        Self {
            accepted_credential: credential.to_string(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a folder.
    pub fn add_folder(&self, id: &str, name: &str) {
        let mut inner = self.inner.lock();
        let _ = inner.folders.insert(
            id.to_string(),
            RemoteFolder {
                id: id.to_string(),
                parent_id: "root".to_string(),
                name: name.to_string(),
            },
        );
        let _ = inner.children.entry(id.to_string()).or_default();
    }

    /// Add (or replace) an item in a folder's listing, with its bytes.
    pub fn put_item(&self, folder_id: &str, item: RemoteItem, content: Bytes) {
        let mut inner = self.inner.lock();
        let _ = inner.content.insert(item.id.clone(), content);
        let children = inner.children.entry(folder_id.to_string()).or_default();
        children.retain(|existing| existing.id != item.id);
        children.push(item);
    }

    /// Drop an item from a folder's listing (the remote "deleted" it).
    pub fn remove_item(&self, folder_id: &str, item_id: &str) {
        let mut inner = self.inner.lock();
        if let Some(children) = inner.children.get_mut(folder_id) {
            children.retain(|item| item.id != item_id);
        }
        let _ = inner.content.remove(item_id);
    }

    /// Bump an item's last-modified value (the remote "edited" it).
    pub fn touch_item(
        &self,
        folder_id: &str,
        item_id: &str,
        last_modified: chrono::DateTime<chrono::Utc>,
    ) {
        let mut inner = self.inner.lock();
        if let Some(children) = inner.children.get_mut(folder_id) {
            if let Some(item) = children.iter_mut().find(|item| item.id == item_id) {
                item.last_modified = last_modified;
            }
        }
    }

    fn check_credential(&self, credential: &str) -> Result<(), RemoteError> {
        if credential.is_empty() {
            return Err(RemoteError::no_credential());
        }
        if credential != self.accepted_credential {
            return Err(RemoteError::forbidden("credential rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteFolderService for FixtureRemote {
    async fn get_folder(
        &self,
        credential: &str,
        folder_id: &str,
    ) -> Result<RemoteFolder, RemoteError> {
        self.check_credential(credential)?;
        self.inner
            .lock()
            .folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(folder_id.to_string()))
    }

    async fn list_children(
        &self,
        credential: &str,
        folder_id: &str,
    ) -> Result<Vec<RemoteItem>, RemoteError> {
        self.check_credential(credential)?;
        self.inner
            .lock()
            .children
            .get(folder_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(folder_id.to_string()))
    }

    async fn download(&self, credential: &str, item_id: &str) -> Result<Bytes, RemoteError> {
        self.check_credential(credential)?;
        self.inner
            .lock()
            .content
            .get(item_id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(item_id.to_string()))
    }

    async fn export(
        &self,
        credential: &str,
        item_id: &str,
        _export_type: &str,
    ) -> Result<Bytes, RemoteError> {
        // The fixture's "native" documents are already plain text.
        self.download(credential, item_id).await
    }

    fn service_type(&self) -> &str {
        "fixture"
    }
}
