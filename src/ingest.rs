//! Knowledge-base ingestion: scan, chunk, embed, store.
//!
//! The [`Ingestor`] walks the configured source tree, fingerprints each
//! markdown file, and rebuilds the stored document only when the content
//! actually changed. [`Ingestor::load_all`] checks fingerprints against the
//! store; [`Ingestor::refresh`] additionally keeps an in-process path→hash
//! map across calls so repeated passes skip unchanged files without store
//! round-trips, and prunes documents whose source files vanished. The map's
//! mutex also serializes ingestion passes; queries keep reading the store
//! concurrently and observe each document's swap atomically.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunk::split_document;
use crate::config::{ChunkingConfig, SourceConfig};
use crate::embedding::Embedder;
use crate::extract;
use crate::members::{render_members_markdown, MemberRecord, MEMBERS_FILE};
use crate::models::{Document, DocumentChunk, UpdateStatus};
use crate::store::KnowledgeStore;

/// Outcome of one ingestion pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestSummary {
    pub processed: usize,
    pub skipped: usize,
    pub removed: usize,
}

pub struct Ingestor {
    store: Arc<dyn KnowledgeStore>,
    embedder: Arc<Embedder>,
    source: SourceConfig,
    chunking: ChunkingConfig,
    /// Path→fingerprint state carried across refresh passes. The lock
    /// also serializes ingestion; queries never take it.
    hashes: Mutex<HashMap<String, String>>,
    /// Set after the first successful pass.
    last_update: RwLock<Option<DateTime<Utc>>>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embedder: Arc<Embedder>,
        source: SourceConfig,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            source,
            chunking,
            hashes: Mutex::new(HashMap::new()),
            last_update: RwLock::new(None),
        }
    }

    /// Full pass over the source tree. Every matching file is fingerprinted
    /// and rebuilt unless the store already holds that exact content.
    pub async fn load_all(&self) -> Result<IngestSummary> {
        let mut hashes = self.hashes.lock().await;

        let files = self.scan()?;
        let mut summary = IngestSummary::default();

        for (path, content) in &files {
            let hash = extract::fingerprint(content);
            if self.process_file(path, content, &hash).await? {
                summary.processed += 1;
            } else {
                summary.skipped += 1;
            }
            hashes.insert(path.clone(), hash);
        }

        self.mark_updated();
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            "knowledge base load complete"
        );

        Ok(summary)
    }

    /// Incremental pass: files whose fingerprint matches the in-process
    /// state from the previous pass are skipped outright, and documents
    /// whose source files vanished are removed from the store.
    pub async fn refresh(&self) -> Result<IngestSummary> {
        let mut hashes = self.hashes.lock().await;

        let files = self.scan()?;
        let live: HashSet<&str> = files.iter().map(|(path, _)| path.as_str()).collect();
        let mut summary = IngestSummary::default();

        for stored_path in self.store.list_source_paths().await? {
            if !live.contains(stored_path.as_str()) {
                info!(path = %stored_path, "source file removed, dropping document");
                self.store.remove_document(&stored_path).await?;
                hashes.remove(&stored_path);
                summary.removed += 1;
            }
        }

        for (path, content) in &files {
            let hash = extract::fingerprint(content);
            if hashes.get(path) == Some(&hash) {
                debug!(path = %path, "fingerprint unchanged since last pass");
                summary.skipped += 1;
                continue;
            }
            if self.process_file(path, content, &hash).await? {
                summary.processed += 1;
            } else {
                summary.skipped += 1;
            }
            hashes.insert(path.clone(), hash);
        }

        self.mark_updated();
        info!(
            processed = summary.processed,
            skipped = summary.skipped,
            removed = summary.removed,
            "knowledge base refresh complete"
        );

        Ok(summary)
    }

    /// Replace the member roster document and fold it into the knowledge
    /// base with a refresh pass.
    pub async fn sync_members(&self, members: &[MemberRecord]) -> Result<IngestSummary> {
        let markdown = render_members_markdown(members, Utc::now());
        let target = self.source.root.join(MEMBERS_FILE);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, markdown)?;
        info!(count = members.len(), path = %target.display(), "member roster written");

        // The roster file is on disk either way; a failed refresh only
        // delays its ingestion until the next pass.
        match self.refresh().await {
            Ok(summary) => Ok(summary),
            Err(err) => {
                warn!(%err, "roster written but refresh failed");
                Ok(IngestSummary::default())
            }
        }
    }

    /// Knowledge-base freshness snapshot. `last_update_time` is `"never"`
    /// until the first successful ingestion pass.
    pub async fn status(&self) -> Result<UpdateStatus> {
        let (documents_count, chunks_count) = self.store.counts().await?;
        let last = *self.last_update.read().expect("last_update lock poisoned");
        Ok(UpdateStatus {
            last_update_time: last
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_else(|| "never".to_string()),
            documents_count,
            chunks_count,
        })
    }

    fn mark_updated(&self) {
        *self.last_update.write().expect("last_update lock poisoned") = Some(Utc::now());
    }

    /// Walk the source tree, returning `(relative_path, content)` pairs in
    /// deterministic path order.
    fn scan(&self) -> Result<Vec<(String, String)>> {
        let root = &self.source.root;
        if !root.exists() {
            bail!("knowledge source root does not exist: {}", root.display());
        }

        let include_set = build_globset(&self.source.include_globs)?;
        let exclude_set = build_globset(&self.source.exclude_globs)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }

            let content = std::fs::read_to_string(path)?;
            files.push((rel_str, content));
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }

    /// Ingest one file. Returns `true` when the document was rebuilt,
    /// `false` when the stored version was already current.
    async fn process_file(&self, rel_path: &str, content: &str, hash: &str) -> Result<bool> {
        if self.store.is_unchanged(rel_path, hash).await? {
            debug!(path = %rel_path, "stored content current, skipping");
            return Ok(false);
        }

        let title = extract::extract_title(content).unwrap_or_else(|| file_stem(rel_path));
        let category = extract::extract_category(content);
        let now = Utc::now().timestamp();

        let doc = Document {
            id: Uuid::new_v4().to_string(),
            title,
            content: content.to_string(),
            source_path: rel_path.to_string(),
            hash: hash.to_string(),
            category,
            created_at: now,
            updated_at: now,
        };

        let mut chunks = Vec::new();
        for (index, text) in split_document(content, &self.chunking).into_iter().enumerate() {
            let embedding = self.embedder.embed(&text).await;
            if embedding.len() != self.embedder.dims() {
                warn!(
                    path = %rel_path,
                    index,
                    got = embedding.len(),
                    want = self.embedder.dims(),
                    "unexpected embedding dimensionality, chunk skipped"
                );
                continue;
            }
            chunks.push(DocumentChunk {
                id: Uuid::new_v4().to_string(),
                document_id: doc.id.clone(),
                chunk_index: chunks.len() as i64,
                content: text,
                embedding,
            });
        }

        info!(path = %rel_path, chunks = chunks.len(), "document ingested");
        self.store.replace_document(&doc, &chunks).await?;
        Ok(true)
    }
}

fn file_stem(rel_path: &str) -> String {
    Path::new(rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| rel_path.to_string())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
