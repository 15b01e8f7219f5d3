use crate::embeddings::EmbeddingService;
use crate::error::EmbeddingError;
use ingest::{ContentType, SemanticChunk};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub similarity_threshold: f32,
    /// Chunk-id prefixes of tabular sources, never treated as duplicates.
    pub tabular_id_prefixes: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.92,
            tabular_id_prefixes: vec!["csv_".to_string()],
        }
    }
}

/// Audit record for one removed chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub kept_id: String,
    pub removed_id: String,
    pub kept_source: String,
    pub removed_source: String,
    pub similarity: f32,
    pub kept_quality: f64,
    pub removed_quality: f64,
}

pub struct SemanticDeduplicator<'a> {
    service: &'a dyn EmbeddingService,
    config: DedupConfig,
}

impl<'a> SemanticDeduplicator<'a> {
    pub fn new(service: &'a dyn EmbeddingService, config: DedupConfig) -> Self {
        Self { service, config }
    }

    /// Embed every chunk's content, `batch_size` texts per request.
    pub async fn compute_embeddings(
        &self,
        chunks: Vec<SemanticChunk>,
        batch_size: usize,
    ) -> Result<Vec<SemanticChunk>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embedded = self.service.encode_passages(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(EmbeddingError::Count {
                    expected: texts.len(),
                    got: embedded.len(),
                });
            }
            vectors.extend(embedded);
        }

        Ok(chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.with_embedding(vector))
            .collect())
    }

    /// Drop near-duplicate chunks, keeping the higher-quality one of each pair.
    ///
    /// Chunks without an embedding are never compared. Pairs involving a table
    /// row or a tabular-source id are exempt, as is any pair one of whose members
    /// was already removed.
    pub fn deduplicate(
        &self,
        chunks: Vec<SemanticChunk>,
    ) -> (Vec<SemanticChunk>, Vec<DuplicateRecord>) {
        let (positions, vectors): (Vec<usize>, Vec<Vec<f32>>) = chunks
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.embedding.clone().map(|e| (idx, e)))
            .unzip();
        if vectors.len() < 2 {
            return (chunks, Vec::new());
        }

        let mut removed = HashSet::new();
        let mut records = Vec::new();

        for (i, j, similarity) in self
            .service
            .find_duplicates(&vectors, self.config.similarity_threshold)
        {
            let (first_idx, second_idx) = (positions[i], positions[j]);
            if removed.contains(&first_idx) || removed.contains(&second_idx) {
                continue;
            }
            let (first, second) = (&chunks[first_idx], &chunks[second_idx]);
            if self.is_exempt(first) || self.is_exempt(second) {
                continue;
            }

            let (kept, dropped, dropped_idx) = if first.quality_score >= second.quality_score {
                (first, second, second_idx)
            } else {
                (second, first, first_idx)
            };
            records.push(DuplicateRecord {
                kept_id: kept.id.clone(),
                removed_id: dropped.id.clone(),
                kept_source: kept.source_file.clone(),
                removed_source: dropped.source_file.clone(),
                similarity,
                kept_quality: kept.quality_score,
                removed_quality: dropped.quality_score,
            });
            removed.insert(dropped_idx);
        }

        if !records.is_empty() {
            tracing::info!(removed = records.len(), "Removed semantic duplicates");
        }

        let unique = chunks
            .into_iter()
            .enumerate()
            .filter(|(idx, _)| !removed.contains(idx))
            .map(|(_, chunk)| chunk)
            .collect();
        (unique, records)
    }

    fn is_exempt(&self, chunk: &SemanticChunk) -> bool {
        chunk.content_type == ContentType::TableRow
            || self
                .config
                .tabular_id_prefixes
                .iter()
                .any(|prefix| chunk.id.starts_with(prefix.as_str()))
    }
}
