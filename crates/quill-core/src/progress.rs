//! Pipeline stages and the fixed progress lookup table.
//!
//! Progress percentages are an intentional heuristic keyed by stage name,
//! never computed from bytes or rows processed. Viewers see monotonically
//! increasing percentages because stages always run in table order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline stage boundary, as reported to live viewers.
///
/// Manual uploads run `Parsing → Splitting → Embedding → Uploading →
/// Updating`. Remote syncs prepend `Downloading`/`Exporting` (and `Deleting`
/// for updated items) and append `Synchronizing`. `Operation` is the
/// terminal per-item marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Fetching raw bytes from the remote folder service.
    Downloading,
    /// Exporting a provider-native document to a portable format.
    Exporting,
    /// Purging a document's existing vectors before re-ingest.
    Deleting,
    /// Extracting text from the raw bytes.
    Parsing,
    /// Chunking extracted text.
    Splitting,
    /// Embedding chunks into vectors.
    Embedding,
    /// Writing vectors to the index.
    Uploading,
    /// Persisting the document row.
    Updating,
    /// Persisting the ledger row.
    Synchronizing,
    /// Terminal marker for one item's whole run.
    Operation,
}

impl Stage {
    /// Fixed progress percentage for this stage.
    pub fn progress(self) -> u8 {
        match self {
            Stage::Downloading | Stage::Exporting | Stage::Deleting => 10,
            Stage::Parsing => 15,
            Stage::Splitting => 30,
            Stage::Embedding => 45,
            Stage::Uploading => 60,
            Stage::Updating => 80,
            Stage::Synchronizing => 90,
            Stage::Operation => 100,
        }
    }

    /// Stage name as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Downloading => "Downloading",
            Stage::Exporting => "Exporting",
            Stage::Deleting => "Deleting",
            Stage::Parsing => "Parsing",
            Stage::Splitting => "Splitting",
            Stage::Embedding => "Embedding",
            Stage::Uploading => "Uploading",
            Stage::Updating => "Updating",
            Stage::Synchronizing => "Synchronizing",
            Stage::Operation => "Operation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened at a stage boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageAction {
    /// The stage is about to run.
    Started,
    /// The stage finished without error.
    Completed,
    /// The stage returned an error.
    Failed,
}
