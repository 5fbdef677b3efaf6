//! The [`UsageMeter`] billing seam.
//!
//! Vendor billing mechanics are out of scope; the orchestrator only needs
//! "record the tenant's current stored total once per completed batch".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// One recorded usage event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// Tenant the event belongs to.
    pub org_id: String,
    /// Total stored bytes at recording time.
    pub total_bytes: i64,
    /// Recording time.
    pub timestamp: DateTime<Utc>,
}

/// Records usage events for subscribing tenants.
#[async_trait]
pub trait UsageMeter: Send + Sync {
    /// Record one usage event.
    async fn record(&self, org_id: &str, total_bytes: i64) -> Result<UsageRecord, StoreError>;
}

/// In-memory meter that keeps every record for inspection.
#[derive(Default)]
pub struct RecordingUsageMeter {
    records: Mutex<Vec<UsageRecord>>,
}

impl RecordingUsageMeter {
    /// An empty meter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All records so far.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl UsageMeter for RecordingUsageMeter {
    async fn record(&self, org_id: &str, total_bytes: i64) -> Result<UsageRecord, StoreError> {
        let record = UsageRecord {
            org_id: org_id.to_string(),
            total_bytes,
            timestamp: Utc::now(),
        };
        self.records.lock().push(record.clone());
        Ok(record)
    }
}
