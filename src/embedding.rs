//! Embedding generation with a deterministic local fallback.
//!
//! [`Embedder::embed`] is total: it first tries the remote embedding API
//! (when a `DEEPSEEK_API_KEY` is present in the environment) and on any
//! failure — missing key, transport error, non-2xx status, malformed body —
//! falls back to [`local_embedding`], a pure feature vector of the same
//! fixed dimensionality. The similarity engine therefore always has
//! comparable vectors, even fully offline.
//!
//! Also provides vector utilities shared by the store implementations:
//! [`cosine_similarity`], [`vec_to_blob`], and [`blob_to_vec`].

use anyhow::{bail, Result};
use std::time::Duration;
use tracing::{debug, warn};

use crate::compose;
use crate::config::EmbeddingConfig;

/// Domain keyword list for the local feature vector, flag slots 2..26.
const DOMAIN_KEYWORDS: [&str; 24] = [
    "mad", "mmd", "视频", "剪辑", "制作", "教程", "软件", "特效", "模型", "动画", "音乐", "素材",
    "创作", "学习", "技术", "工具", "社团", "成员", "活动", "比赛", "项目", "培训", "指导", "问题",
];

/// Common characters for the frequency features, slots 50..60.
const COMMON_CHARS: [char; 10] = ['的', '是', '和', '在', '有', '用', '要', '可', '以', '会'];

/// Maximum input length (bytes) forwarded to the remote embedding API.
const REMOTE_INPUT_LIMIT: usize = 100;

pub struct Embedder {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    dims: usize,
}

impl Embedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_key = std::env::var("DEEPSEEK_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            debug!("DEEPSEEK_API_KEY not set, embeddings are computed locally");
        }

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            dims: config.dims,
        })
    }

    /// The fixed dimensionality of locally generated vectors.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed a text. Never fails: any remote problem degrades to the
    /// deterministic local vector.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_remote(text).await {
            Ok(vector) => vector,
            Err(err) => {
                if self.api_key.is_some() {
                    warn!(%err, "remote embedding failed, using local fallback");
                }
                local_embedding(text, self.dims)
            }
        }
    }

    async fn try_remote(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => bail!("no embedding API key configured"),
        };

        // Bound the payload before it leaves the process.
        let input = compose::compress_chunk(text, REMOTE_INPUT_LIMIT);

        let body = serde_json::json!({
            "model": self.model,
            "input": [input],
            "encoding_format": "float",
        });

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("embedding API returned {}", status);
        }

        let json: serde_json::Value = response.json().await?;
        let embedding = json
            .get("data")
            .and_then(|d| d.as_array())
            .and_then(|d| d.first())
            .and_then(|item| item.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("malformed embedding response"))?;

        if embedding.is_empty() {
            bail!("embedding response contained no data");
        }

        Ok(embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

/// Deterministic local feature vector, a pure function of the input text.
///
/// Layout (fixed slots, unused slots stay zero):
/// - `[0]` byte length / 1000, `[1]` whitespace word count / 100
/// - `[2..26]` presence flags for [`DOMAIN_KEYWORDS`]
/// - `[50..60]` normalized frequency of [`COMMON_CHARS`]
/// - `[100..103]` structural flags: heading marker, fenced code, URL
/// - `[200..]` byte-derived values cycling over the text, filled only while
///   the slot index is below the text's byte length — short texts leave the
///   tail zero, which keeps short queries keyword-driven
pub fn local_embedding(text: &str, dims: usize) -> Vec<f32> {
    let text = text.trim().to_lowercase();
    let mut vector = vec![0.0f32; dims];

    if text.split_whitespace().next().is_none() {
        return vector;
    }

    if !vector.is_empty() {
        vector[0] = text.len() as f32 / 1000.0;
    }
    if vector.len() > 1 {
        vector[1] = text.split_whitespace().count() as f32 / 100.0;
    }

    for (i, keyword) in DOMAIN_KEYWORDS.iter().enumerate() {
        if i + 2 < dims && text.contains(keyword) {
            vector[i + 2] = 1.0;
        }
    }

    for (i, ch) in COMMON_CHARS.iter().enumerate() {
        if i + 50 < dims {
            let count = text.chars().filter(|c| c == ch).count();
            if count > 0 {
                vector[i + 50] = count as f32 / text.len() as f32;
            }
        }
    }

    if dims > 100 && text.contains('#') {
        vector[100] = 1.0;
    }
    if dims > 101 && text.contains("```") {
        vector[101] = 1.0;
    }
    if dims > 102 && text.contains("http") {
        vector[102] = 1.0;
    }

    let bytes = text.as_bytes();
    for i in 200..dims.min(bytes.len()) {
        vector[i] = bytes[i % bytes.len()] as f32 / 255.0;
    }

    vector
}

/// Encode a float vector as a BLOB (little-endian f32 bytes) for SQLite.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector. Reverses [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or when
/// either vector has zero norm — never `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: usize = 1024;

    #[test]
    fn test_local_embedding_fixed_dims() {
        assert_eq!(local_embedding("test", DIMS).len(), DIMS);
        assert_eq!(local_embedding("", DIMS).len(), DIMS);
    }

    #[test]
    fn test_local_embedding_deterministic() {
        let a = local_embedding("如何制作MAD视频", DIMS);
        let b = local_embedding("如何制作MAD视频", DIMS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_local_embedding_keyword_flags() {
        let v = local_embedding("学习mad剪辑", DIMS);
        assert_eq!(v[2], 1.0); // mad
        assert_eq!(v[3], 0.0); // mmd
        assert_eq!(v[5], 1.0); // 剪辑
    }

    #[test]
    fn test_local_embedding_case_folded() {
        let upper = local_embedding("MAD视频", DIMS);
        let lower = local_embedding("mad视频", DIMS);
        assert_eq!(upper, lower);
    }

    #[test]
    fn test_local_embedding_structural_flags() {
        let v = local_embedding("# 标题\n```rust\n```\nhttps://example.com", DIMS);
        assert_eq!(v[100], 1.0);
        assert_eq!(v[101], 1.0);
        assert_eq!(v[102], 1.0);
    }

    #[test]
    fn test_local_embedding_empty_is_zero_vector() {
        let v = local_embedding("   ", DIMS);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_short_text_leaves_tail_zero() {
        let v = local_embedding("短查询mad", DIMS);
        assert!(v[200..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_long_text_fills_tail() {
        let text = "内容很长。".repeat(100);
        let v = local_embedding(&text, DIMS);
        assert!(v[200..].iter().any(|&x| x > 0.0));
    }

    #[test]
    fn test_cosine_identical_is_one() {
        let v = local_embedding("如何保证节奏同步感", DIMS);
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        let v = vec![1.0f32, 2.0, 3.0];
        let zero = vec![0.0f32; 3];
        assert_eq!(cosine_similarity(&v, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }
}
