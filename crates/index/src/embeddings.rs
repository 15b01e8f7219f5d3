use crate::cache::EmbeddingCache;
use crate::error::EmbeddingError;
use crate::similarity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A sentence-embedding model producing L2-normalised vectors.
///
/// Only the encoders are required; the similarity helpers default to dot
/// products over the returned vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn similarity_matrix(&self, vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
        similarity::similarity_matrix(vectors)
    }

    fn find_similar(
        &self,
        query: &[f32],
        corpus: &[Vec<f32>],
        top_k: usize,
        threshold: f32,
    ) -> Vec<(usize, f32)> {
        similarity::find_similar(query, corpus, top_k, threshold)
    }

    fn find_duplicates(&self, vectors: &[Vec<f32>], threshold: f32) -> Vec<(usize, usize, f32)> {
        similarity::find_duplicates(vectors, threshold)
    }

    fn find_related_pairs(
        &self,
        vectors: &[Vec<f32>],
        threshold: f32,
        max_per_item: usize,
    ) -> Vec<(usize, usize, f32)> {
        similarity::find_related_pairs(vectors, threshold, max_per_item)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    /// E5-style prefixes distinguishing indexed passages from search queries.
    pub passage_prefix: String,
    pub query_prefix: String,
    pub batch_size: usize,
    pub cache_max_entries: usize,
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434".to_string(),
            model: "jeffh/intfloat-multilingual-e5-large:f16".to_string(),
            passage_prefix: "passage: ".to_string(),
            query_prefix: "query: ".to_string(),
            batch_size: 32,
            cache_max_entries: 1000,
            request_timeout_secs: 60,
        }
    }
}

/// Embedding client for an Ollama server's `/api/embed` endpoint.
#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    passage_prefix: String,
    query_prefix: String,
    client: reqwest::Client,
    cache: EmbeddingCache,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            passage_prefix: config.passage_prefix.clone(),
            query_prefix: config.query_prefix.clone(),
            client,
            cache: EmbeddingCache::new(config.cache_max_entries),
        })
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    /// Embed `texts` under `prefix`, serving repeats from the cache and sending
    /// the rest in one request.
    async fn encode(&self, texts: &[String], prefix: &str) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        let mut vectors: Vec<Option<Vec<f32>>> = prefixed.iter().map(|t| self.cache.get(t)).collect();

        let missing: Vec<usize> = (0..prefixed.len()).filter(|&i| vectors[i].is_none()).collect();
        if !missing.is_empty() {
            let inputs: Vec<String> = missing.iter().map(|&i| prefixed[i].clone()).collect();
            let fresh = self.request(&inputs).await?;
            for (&idx, mut vector) in missing.iter().zip(fresh) {
                similarity::l2_normalize(&mut vector);
                self.cache.insert(&prefixed[idx], vector.clone());
                vectors[idx] = Some(vector);
            }
            tracing::debug!(requested = inputs.len(), cached = texts.len() - inputs.len(), "Embedded batch");
        }

        let vectors: Vec<Vec<f32>> = vectors.into_iter().flatten().collect();
        check_dimensions(&vectors)?;
        Ok(vectors)
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: inputs,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        let parsed: EmbedResponse = response.json().await?;
        if parsed.embeddings.len() != inputs.len() {
            return Err(EmbeddingError::Count {
                expected: inputs.len(),
                got: parsed.embeddings.len(),
            });
        }
        Ok(parsed.embeddings)
    }
}

fn check_dimensions(vectors: &[Vec<f32>]) -> Result<(), EmbeddingError> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    match vectors.iter().find(|v| v.len() != first.len()) {
        Some(bad) => Err(EmbeddingError::Dimension {
            expected: first.len(),
            got: bad.len(),
        }),
        None => Ok(()),
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedder {
    async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.encode(texts, &self.passage_prefix).await
    }

    async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.encode(&[text.to_string()], &self.query_prefix).await?;
        vectors.pop().ok_or(EmbeddingError::Count {
            expected: 1,
            got: 0,
        })
    }
}
