//! Three-way reconciliation between the local ledger and a live remote
//! listing.
//!
//! Pure functions: no I/O, no side effects, unit-testable against fixture
//! listings alone. Identity is solely the remote id, never inferred from
//! name or size similarity.

use chrono::{DateTime, Utc};
use quill_core::manifest::FileProps;
use quill_remote::RemoteItem;
use quill_store::LedgerEntry;
use serde::{Deserialize, Serialize};

/// One ledger entry joined with its document's remembered properties
/// (name/size/mime), which missing and updated classifications report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    /// The ledger row.
    pub entry: LedgerEntry,
    /// The document row's remembered properties.
    pub props: FileProps,
}

/// A ledger entry whose remote item reports a different last-modified
/// value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedRecord {
    /// Ledger entry id, for the last-modified rewrite.
    pub entry_id: String,
    /// Existing document id, reused through re-ingest.
    pub document_id: String,
    /// Previously recorded file size, for storage-delta accounting.
    pub prior_size: i64,
    /// The item's current remote metadata.
    pub item: RemoteItem,
}

/// A ledger entry whose id no longer appears in the remote listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingRecord {
    /// Ledger entry id, for the delete.
    pub entry_id: String,
    /// Document id, for row and vector removal.
    pub document_id: String,
    /// Remembered properties of the vanished item.
    pub props: FileProps,
}

/// The three disjoint classifications for one folder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// Remote items with no matching ledger entry.
    pub new: Vec<RemoteItem>,
    /// Ledger entries whose remote last-modified differs.
    pub updated: Vec<UpdatedRecord>,
    /// Ledger entries absent from the remote listing.
    pub missing: Vec<MissingRecord>,
}

impl Reconciliation {
    /// Whether all three classifications are empty.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty() && self.missing.is_empty()
    }

    /// Number of classified items.
    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.missing.len()
    }

    /// Net storage delta the classifications imply: additions minus
    /// removals, in bytes.
    pub fn size_delta(&self) -> i64 {
        let added: i64 = self.new.iter().map(|i| i.size).sum();
        let updated: i64 = self
            .updated
            .iter()
            .map(|u| u.item.size - u.prior_size)
            .sum();
        let removed: i64 = self.missing.iter().map(|m| m.props.size).sum();
        added + updated - removed
    }
}

/// Timestamps compare at the canonical whole-second precision of their
/// RFC 3339 representation; sub-second drift between the remote's clock
/// and the ledger's round-trip must not flag an update.
fn same_instant(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.timestamp() == b.timestamp()
}

/// Diff one folder's ledger records against its live remote listing.
pub fn reconcile(records: &[LedgerRecord], listing: &[RemoteItem]) -> Reconciliation {
    let mut result = Reconciliation::default();

    for item in listing {
        if !records.iter().any(|r| r.entry.remote_id == item.id) {
            result.new.push(item.clone());
        }
    }

    for record in records {
        match listing.iter().find(|i| i.id == record.entry.remote_id) {
            Some(item) => {
                if !same_instant(record.entry.last_modified, item.last_modified) {
                    result.updated.push(UpdatedRecord {
                        entry_id: record.entry.id.clone(),
                        document_id: record.entry.document_id.clone(),
                        prior_size: record.props.size,
                        item: item.clone(),
                    });
                }
            }
            None => result.missing.push(MissingRecord {
                entry_id: record.entry.id.clone(),
                document_id: record.entry.document_id.clone(),
                props: record.props.clone(),
            }),
        }
    }

    result
}
