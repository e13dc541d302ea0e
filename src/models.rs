//! Core data models for the knowledge-base retrieval pipeline.
//!
//! These types represent the documents, chunks, and query results that flow
//! through ingestion and retrieval.

use serde::{Deserialize, Serialize};

/// An ingested markdown source file, normalized for storage.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Path relative to the configured source root. At most one live
    /// document exists per path.
    pub source_path: String,
    /// SHA-256 hex digest of the raw content, used for change detection.
    pub hash: String,
    pub category: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One retrievable unit of a [`Document`].
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    /// 0-based position in the chunker's output sequence.
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A chunk as returned from a store scan, with the parent document's
/// title and category already resolved.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub title: String,
    pub category: String,
}

/// Lightweight document metadata for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub id: String,
    pub title: String,
    pub source_path: String,
    pub category: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A ranked chunk returned from similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkHit {
    pub chunk_id: String,
    pub document_id: String,
    pub title: String,
    pub content: String,
    pub similarity: f64,
    pub category: String,
}

/// An incoming retrieval query from the web layer.
#[derive(Debug, Clone, Deserialize)]
pub struct RagQuery {
    pub query: String,
    #[serde(default)]
    pub top_k: i64,
    #[serde(default)]
    pub category: Option<String>,
}

/// The composed answer returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub query: String,
    pub relevant_chunks: Vec<ChunkHit>,
    pub enhanced_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_response: Option<String>,
    pub processing_time: f64,
}

/// Knowledge-base freshness snapshot for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStatus {
    pub last_update_time: String,
    pub documents_count: i64,
    pub chunks_count: i64,
}
