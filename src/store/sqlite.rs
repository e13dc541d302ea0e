//! SQLite-backed [`KnowledgeStore`] implementation.
//!
//! One live document per `source_path`; embeddings are stored inline on
//! the chunk rows as little-endian f32 BLOBs.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{Document, DocumentChunk, DocumentInfo, StoredChunk};
use crate::store::{format_ts_iso, KnowledgeStore};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn is_unchanged(&self, source_path: &str, hash: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM documents WHERE source_path = ? AND hash = ?")
            .bind(source_path)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn replace_document(&self, doc: &Document, chunks: &[DocumentChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Drop any previous version at this path before inserting, so the
        // old document's chunks never outlive it.
        sqlx::query(
            "DELETE FROM chunks WHERE document_id IN (SELECT id FROM documents WHERE source_path = ?)",
        )
        .bind(&doc.source_path)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM documents WHERE source_path = ?")
            .bind(&doc.source_path)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, content, source_path, hash, category,
                                   created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(&doc.source_path)
        .bind(&doc.hash)
        .bind(&doc.category)
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&mut *tx)
        .await?;

        for chunk in chunks {
            let blob = vec_to_blob(&chunk.embedding);
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, content, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_document(&self, source_path: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chunks WHERE document_id IN (SELECT id FROM documents WHERE source_path = ?)",
        )
        .bind(source_path)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM documents WHERE source_path = ?")
            .bind(source_path)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_chunks(&self, category: Option<&str>) -> Result<Vec<StoredChunk>> {
        let base = r#"
            SELECT c.id AS chunk_id, c.document_id, c.chunk_index, c.content,
                   c.embedding, d.title, d.category
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
        "#;

        let rows = match category {
            Some(cat) => {
                sqlx::query(&format!(
                    "{} WHERE d.category = ? ORDER BY d.source_path, c.chunk_index",
                    base
                ))
                .bind(cat)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY d.source_path, c.chunk_index", base))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut chunks = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("embedding")?;
            chunks.push(StoredChunk {
                chunk_id: row.try_get("chunk_id")?,
                document_id: row.try_get("document_id")?,
                chunk_index: row.try_get("chunk_index")?,
                content: row.try_get("content")?,
                embedding: blob_to_vec(&blob),
                title: row.try_get("title")?,
                category: row.try_get("category")?,
            });
        }

        Ok(chunks)
    }

    async fn counts(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT (SELECT COUNT(*) FROM documents) AS docs, (SELECT COUNT(*) FROM chunks) AS chunks",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok((row.try_get("docs")?, row.try_get("chunks")?))
    }

    async fn count_documents(&self, category: Option<&str>) -> Result<i64> {
        let count = match category {
            Some(cat) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE category = ?")
                    .bind(cat)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM documents")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    async fn list_documents(
        &self,
        page: i64,
        limit: i64,
        category: Option<&str>,
    ) -> Result<Vec<DocumentInfo>> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let base = r#"
            SELECT id, title, source_path, category, created_at, updated_at
            FROM documents
        "#;

        let rows = match category {
            Some(cat) => {
                sqlx::query(&format!(
                    "{} WHERE category = ? ORDER BY updated_at DESC, source_path LIMIT ? OFFSET ?",
                    base
                ))
                .bind(cat)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{} ORDER BY updated_at DESC, source_path LIMIT ? OFFSET ?",
                    base
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let created_at: i64 = row.try_get("created_at")?;
            let updated_at: i64 = row.try_get("updated_at")?;
            docs.push(DocumentInfo {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                source_path: row.try_get("source_path")?,
                category: row.try_get("category")?,
                created_at: format_ts_iso(created_at),
                updated_at: format_ts_iso(updated_at),
            });
        }

        Ok(docs)
    }

    async fn list_source_paths(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT source_path FROM documents ORDER BY source_path")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get("source_path").map_err(Into::into))
            .collect()
    }
}
