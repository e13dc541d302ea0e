//! Storage abstraction for the knowledge base.
//!
//! The [`KnowledgeStore`] trait defines every storage operation the
//! ingestion and retrieval pipeline needs, enabling pluggable backends
//! (SQLite for the service, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentChunk, DocumentInfo, StoredChunk};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Abstract storage backend for documents and their chunks.
///
/// All operations are async (via `async-trait`). The in-memory
/// implementation returns immediately-ready futures.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Whether a live document at `source_path` already carries `hash`.
    /// Unchanged documents are skipped during ingestion.
    async fn is_unchanged(&self, source_path: &str, hash: &str) -> Result<bool>;

    /// Replace the document at `doc.source_path` and all of its chunks in
    /// one transaction. Readers observe either the old version or the new
    /// one, never a mix.
    async fn replace_document(&self, doc: &Document, chunks: &[DocumentChunk]) -> Result<()>;

    /// Remove the document at `source_path` along with its chunks. A miss
    /// is not an error.
    async fn remove_document(&self, source_path: &str) -> Result<()>;

    /// All chunks with resolved document metadata, optionally filtered by
    /// exact category, ordered by source path then chunk index.
    async fn find_chunks(&self, category: Option<&str>) -> Result<Vec<StoredChunk>>;

    /// Live `(documents, chunks)` counts.
    async fn counts(&self) -> Result<(i64, i64)>;

    /// Number of live documents, optionally restricted to a category.
    async fn count_documents(&self, category: Option<&str>) -> Result<i64>;

    /// Paged document metadata for the listing endpoint, newest first.
    /// `page` is 1-based.
    async fn list_documents(
        &self,
        page: i64,
        limit: i64,
        category: Option<&str>,
    ) -> Result<Vec<DocumentInfo>>;

    /// Source paths of all live documents, for pruning vanished files.
    async fn list_source_paths(&self) -> Result<Vec<String>>;
}

/// Format a unix timestamp as UTC ISO-8601 for API responses.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_ts_iso(1700000000), "2023-11-14T22:13:20Z");
    }
}
