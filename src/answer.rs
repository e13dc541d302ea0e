//! Query answering: FAQ short-circuit, retrieval, prompt composition.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::info;

use crate::compose::{enhance_query, faq_answer};
use crate::faq;
use crate::models::{RagQuery, RagResponse};
use crate::search::SearchEngine;

pub struct AnswerService {
    search: Arc<SearchEngine>,
}

impl AnswerService {
    pub fn new(search: Arc<SearchEngine>) -> Self {
        Self { search }
    }

    /// Answer a query. An exact FAQ match bypasses retrieval entirely and
    /// carries no chunks; otherwise the ranked chunks are folded into the
    /// enhanced prompt.
    pub async fn answer(&self, request: &RagQuery) -> Result<RagResponse> {
        let started = Instant::now();
        let query = request.query.trim();
        if query.is_empty() {
            bail!("query must not be empty");
        }

        if let Some(hit) = faq::find_exact_match(query) {
            info!(question = %hit.question, "FAQ exact match");
            return Ok(RagResponse {
                query: query.to_string(),
                relevant_chunks: Vec::new(),
                enhanced_query: faq_answer(hit),
                webhook_response: None,
                processing_time: started.elapsed().as_secs_f64(),
            });
        }

        let hits = self
            .search
            .search(query, request.top_k, request.category.as_deref())
            .await?;
        let enhanced_query = enhance_query(query, &hits);

        Ok(RagResponse {
            query: query.to_string(),
            relevant_chunks: hits,
            enhanced_query,
            webhook_response: None,
            processing_time: started.elapsed().as_secs_f64(),
        })
    }
}
