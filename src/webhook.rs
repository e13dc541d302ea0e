//! Forwarding of composed answers to the downstream workflow webhook.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::info;

use crate::compose::{compress_chunk, compress_output};
use crate::config::WebhookConfig;
use crate::models::ChunkHit;

/// Per-chunk byte budget inside the forwarded context block.
const CONTEXT_CHUNK_LIMIT: usize = 500;
/// Byte budget for the webhook's response body after compression.
const RESPONSE_LIMIT: usize = 1000;

#[derive(Serialize)]
struct WebhookRequest<'a> {
    query: &'a str,
    context: String,
    user_question: &'a str,
}

pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Forward the enhanced query downstream and return the compressed
    /// response body. Compression of both directions keeps the payloads
    /// inside the workflow engine's practical limits.
    pub async fn forward(
        &self,
        enhanced_query: &str,
        original_query: &str,
        hits: &[ChunkHit],
    ) -> Result<String> {
        let url = match &self.url {
            Some(url) => url,
            None => bail!("webhook URL is not configured"),
        };

        let mut context = String::new();
        for (i, hit) in hits.iter().enumerate() {
            context.push_str(&format!(
                "【参考资料{} - {}】\n{}\n\n",
                i + 1,
                hit.title,
                compress_chunk(&hit.content, CONTEXT_CHUNK_LIMIT)
            ));
        }

        let request = WebhookRequest {
            query: enhanced_query,
            context,
            user_question: original_query,
        };

        let response = self.client.post(url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            bail!("webhook returned {}", status);
        }

        info!(bytes = body.len(), "webhook response received");
        Ok(compress_output(&body, RESPONSE_LIMIT))
    }
}
