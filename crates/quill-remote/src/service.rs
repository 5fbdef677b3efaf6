//! The [`RemoteFolderService`] trait.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::RemoteError;
use crate::types::{RemoteFolder, RemoteItem};

/// The remote-folder seam.
///
/// Every call takes the session's bearer credential; a bad credential
/// surfaces as [`RemoteError::Unauthorized`] from whichever call hits it
/// first, which the orchestrator turns into a batch-level auth rejection.
#[async_trait]
pub trait RemoteFolderService: Send + Sync {
    /// Folder metadata by id.
    async fn get_folder(
        &self,
        credential: &str,
        folder_id: &str,
    ) -> Result<RemoteFolder, RemoteError>;

    /// A folder's live children (documents only, never sub-folders).
    async fn list_children(
        &self,
        credential: &str,
        folder_id: &str,
    ) -> Result<Vec<RemoteItem>, RemoteError>;

    /// Raw bytes of an item.
    async fn download(&self, credential: &str, item_id: &str) -> Result<Bytes, RemoteError>;

    /// Provider-native documents can't be downloaded raw; export converts
    /// them to the requested portable format.
    async fn export(
        &self,
        credential: &str,
        item_id: &str,
        export_type: &str,
    ) -> Result<Bytes, RemoteError>;

    /// Service discriminator recorded in folder/ledger rows.
    fn service_type(&self) -> &str;
}
