//! In-memory [`KnowledgeStore`] used by tests.
//!
//! Not a production backend: everything lives in a `RwLock`-guarded map
//! and is lost on drop. Behavior mirrors the SQLite store, including the
//! one-live-document-per-path rule and ordering guarantees.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Document, DocumentChunk, DocumentInfo, StoredChunk};
use crate::store::{format_ts_iso, KnowledgeStore};

#[derive(Default)]
struct Inner {
    /// Keyed by source path, the document's identity.
    documents: HashMap<String, Document>,
    /// Keyed by parent document id.
    chunks: HashMap<String, Vec<DocumentChunk>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn is_unchanged(&self, source_path: &str, hash: &str) -> Result<bool> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .documents
            .get(source_path)
            .is_some_and(|doc| doc.hash == hash))
    }

    async fn replace_document(&self, doc: &Document, chunks: &[DocumentChunk]) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if let Some(old) = inner.documents.remove(&doc.source_path) {
            inner.chunks.remove(&old.id);
        }
        inner.chunks.insert(doc.id.clone(), chunks.to_vec());
        inner.documents.insert(doc.source_path.clone(), doc.clone());
        Ok(())
    }

    async fn remove_document(&self, source_path: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        if let Some(doc) = inner.documents.remove(source_path) {
            inner.chunks.remove(&doc.id);
        }
        Ok(())
    }

    async fn find_chunks(&self, category: Option<&str>) -> Result<Vec<StoredChunk>> {
        let inner = self.inner.read().expect("store lock poisoned");

        let mut paths: Vec<&String> = inner
            .documents
            .values()
            .filter(|doc| category.is_none_or(|c| doc.category == c))
            .map(|doc| &doc.source_path)
            .collect();
        paths.sort();

        let mut out = Vec::new();
        for path in paths {
            let doc = &inner.documents[path];
            let Some(chunks) = inner.chunks.get(&doc.id) else {
                continue;
            };
            for chunk in chunks {
                out.push(StoredChunk {
                    chunk_id: chunk.id.clone(),
                    document_id: chunk.document_id.clone(),
                    chunk_index: chunk.chunk_index,
                    content: chunk.content.clone(),
                    embedding: chunk.embedding.clone(),
                    title: doc.title.clone(),
                    category: doc.category.clone(),
                });
            }
        }

        Ok(out)
    }

    async fn counts(&self) -> Result<(i64, i64)> {
        let inner = self.inner.read().expect("store lock poisoned");
        let docs = inner.documents.len() as i64;
        let chunks = inner.chunks.values().map(|c| c.len() as i64).sum();
        Ok((docs, chunks))
    }

    async fn count_documents(&self, category: Option<&str>) -> Result<i64> {
        let inner = self.inner.read().expect("store lock poisoned");
        Ok(inner
            .documents
            .values()
            .filter(|doc| category.is_none_or(|c| doc.category == c))
            .count() as i64)
    }

    async fn list_documents(
        &self,
        page: i64,
        limit: i64,
        category: Option<&str>,
    ) -> Result<Vec<DocumentInfo>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let page = page.max(1);
        let limit = limit.clamp(1, 100);

        let mut docs: Vec<&Document> = inner
            .documents
            .values()
            .filter(|doc| category.is_none_or(|c| doc.category == c))
            .collect();
        docs.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.source_path.cmp(&b.source_path))
        });

        Ok(docs
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .map(|doc| DocumentInfo {
                id: doc.id.clone(),
                title: doc.title.clone(),
                source_path: doc.source_path.clone(),
                category: doc.category.clone(),
                created_at: format_ts_iso(doc.created_at),
                updated_at: format_ts_iso(doc.updated_at),
            })
            .collect())
    }

    async fn list_source_paths(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().expect("store lock poisoned");
        let mut paths: Vec<String> = inner.documents.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}
