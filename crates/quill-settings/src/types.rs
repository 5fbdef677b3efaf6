//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON files deserialize with defaults for missing fields.

use serde::{Deserialize, Serialize};

/// Root settings type for the Quill service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuillSettings {
    /// Settings schema version.
    pub version: String,
    /// Network settings.
    pub server: ServerSettings,
    /// Ingestion pipeline settings.
    pub ingest: IngestSettings,
    /// Similarity-search settings.
    pub search: SearchSettings,
    /// Live-session settings.
    pub session: SessionSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for QuillSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            ingest: IngestSettings::default(),
            search: SearchSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl QuillSettings {
    /// Correct invalid invariants in place, warning on each fix.
    pub fn validate(&mut self) {
        if self.ingest.max_concurrent_items == 0 {
            tracing::warn!("maxConcurrentItems must be at least 1, correcting");
            self.ingest.max_concurrent_items = 1;
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            tracing::warn!(
                "chunkOverlap ({}) must be below chunkSize ({}), correcting",
                self.ingest.chunk_overlap,
                self.ingest.chunk_size
            );
            self.ingest.chunk_overlap = self.ingest.chunk_size / 2;
        }
        if self.session.ping_interval_secs >= self.session.read_timeout_secs {
            tracing::warn!(
                "pingIntervalSecs ({}) must be below readTimeoutSecs ({}), correcting",
                self.session.ping_interval_secs,
                self.session.read_timeout_secs
            );
            self.session.ping_interval_secs = self.session.read_timeout_secs * 9 / 10;
        }
    }
}

/// Network settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestSettings {
    /// Chunk size for text splitting, in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Width of the per-batch concurrency limiter.
    pub max_concurrent_items: usize,
    /// Storage ceiling for non-subscribing tenants, in bytes.
    pub non_subscriber_storage_limit: i64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            max_concurrent_items: 4,
            non_subscriber_storage_limit: 5_000_000,
        }
    }
}

/// Similarity-search settings (workspace-level defaults).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Maximum number of documents returned per search.
    pub document_limit: u32,
    /// Maximum chunks returned per document.
    pub chunk_limit: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            document_limit: 40,
            chunk_limit: 2,
        }
    }
}

/// Live-session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Seconds without any inbound frame before the peer is presumed gone.
    pub read_timeout_secs: u64,
    /// Liveness-probe interval; must stay below `read_timeout_secs`.
    pub ping_interval_secs: u64,
    /// Maximum accepted inbound frame size, in bytes.
    pub max_frame_bytes: usize,
    /// Bound of each session's outbound queue, in envelopes.
    pub outbound_queue: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            read_timeout_secs: 60,
            ping_interval_secs: 54,
            max_frame_bytes: 10_000_000,
            outbound_queue: 64,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
