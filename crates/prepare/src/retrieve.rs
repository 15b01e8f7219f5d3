use index::{EmbeddingError, EmbeddingService};
use ingest::SemanticChunk;
use rand::seq::SliceRandom;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    /// Cosine similarity; absent for category-sampled results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct RetrieveQuery<'a> {
    pub question: &'a str,
    pub top_k: usize,
    pub threshold: f32,
    pub category: Option<&'a str>,
    /// Passages per `encode_passages` call when chunks carry no stored embedding.
    pub batch_size: usize,
}

/// Top-k chunks for a question by embedding similarity, falling back to a
/// random sample of the category's chunks when no service is available, the
/// service fails, or nothing clears the threshold.
pub async fn retrieve(
    chunks: &[SemanticChunk],
    query: &RetrieveQuery<'_>,
    service: Option<&dyn EmbeddingService>,
) -> Vec<RetrievedChunk> {
    if let Some(service) = service {
        match semantic_search(chunks, query, service).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => tracing::info!("No chunk cleared the threshold, sampling by category"),
            Err(err) => tracing::warn!(error = %err, "Embedding retrieval failed, sampling by category"),
        }
    }
    sample_by_category(chunks, query.category, query.top_k)
}

async fn semantic_search(
    chunks: &[SemanticChunk],
    query: &RetrieveQuery<'_>,
    service: &dyn EmbeddingService,
) -> Result<Vec<RetrievedChunk>, EmbeddingError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    let query_vector = service.encode_query(query.question).await?;

    let stored: Option<Vec<Vec<f32>>> = chunks.iter().map(|c| c.embedding.clone()).collect();
    let corpus = match stored {
        Some(vectors) => vectors,
        None => encode_corpus(chunks, service, query.batch_size).await?,
    };

    Ok(service
        .find_similar(&query_vector, &corpus, query.top_k, query.threshold)
        .into_iter()
        .filter_map(|(idx, score)| {
            let chunk = chunks.get(idx)?;
            Some(RetrievedChunk {
                id: chunk.id.clone(),
                score: Some(score),
                content: chunk.content.clone(),
            })
        })
        .collect())
}

/// One vector per chunk, `batch_size` passages per request.
async fn encode_corpus(
    chunks: &[SemanticChunk],
    service: &dyn EmbeddingService,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let embedded = service.encode_passages(&texts).await?;
        if embedded.len() != texts.len() {
            return Err(EmbeddingError::Count {
                expected: texts.len(),
                got: embedded.len(),
            });
        }
        vectors.extend(embedded);
    }
    Ok(vectors)
}

/// Chunks whose id contains `category` (all chunks if none do), sampled
/// without replacement.
pub fn sample_by_category(
    chunks: &[SemanticChunk],
    category: Option<&str>,
    top_k: usize,
) -> Vec<RetrievedChunk> {
    let mut candidates: Vec<&SemanticChunk> = match category {
        Some(category) => chunks.iter().filter(|c| c.id.contains(category)).collect(),
        None => Vec::new(),
    };
    if candidates.is_empty() {
        candidates = chunks.iter().collect();
    }

    candidates
        .choose_multiple(&mut rand::thread_rng(), top_k)
        .map(|chunk| RetrievedChunk {
            id: chunk.id.clone(),
            score: None,
            content: chunk.content.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest::{ChunkMetadata, ContentType, Position, Topic};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunk(id: &str, content: &str, embedding: Option<Vec<f32>>) -> SemanticChunk {
        SemanticChunk {
            id: id.to_string(),
            content: content.to_string(),
            content_type: ContentType::Description,
            source_file: "x.md".to_string(),
            section_path: Vec::new(),
            position: Position::Middle,
            sibling_chunks: Vec::new(),
            parent_chunk: None,
            primary_topic: Topic::Umum,
            secondary_topics: Vec::new(),
            entities_mentioned: Vec::new(),
            question_types_answerable: Vec::new(),
            requires_other_chunks: false,
            summary: String::new(),
            hypothetical_questions: vec!["?".to_string()],
            search_keywords: Vec::new(),
            token_count: 1,
            char_count: content.len(),
            quality_score: 0.5,
            metadata: ChunkMetadata::default(),
            embedding,
        }
    }

    /// Fee questions point along the first axis, everything else the second.
    struct FeeAxis;

    fn axis(text: &str) -> Vec<f32> {
        if text.to_lowercase().contains("biaya") {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    }

    #[async_trait]
    impl EmbeddingService for FeeAxis {
        async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|t| axis(t)).collect())
        }

        async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(axis(text))
        }
    }

    /// Records the size of every passage batch it is asked to encode.
    struct Batching {
        sizes: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl EmbeddingService for Batching {
        async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.sizes.lock().unwrap().push(texts.len());
            Ok(texts.iter().map(|t| axis(t)).collect())
        }

        async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(axis(text))
        }
    }

    fn query<'a>(question: &'a str, category: Option<&'a str>) -> RetrieveQuery<'a> {
        RetrieveQuery {
            question,
            top_k: 3,
            threshold: 0.3,
            category,
            batch_size: 32,
        }
    }

    #[tokio::test]
    async fn test_semantic_hits_use_stored_embeddings() {
        let chunks = vec![
            chunk("jadwal_0001", "Pendaftaran dibuka Januari", Some(vec![0.0, 1.0])),
            chunk("biaya_0001", "Rp 250.000", Some(vec![1.0, 0.0])),
        ];
        let found = retrieve(&chunks, &query("Berapa biaya daftar?", None), Some(&FeeAxis)).await;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "biaya_0001");
        assert_eq!(found[0].score, Some(1.0));
    }

    #[tokio::test]
    async fn test_encodes_passages_without_stored_embeddings() {
        let chunks = vec![
            chunk("a_0001", "Jadwal gelombang 1", None),
            chunk("a_0002", "Biaya pendaftaran Rp 250.000", None),
        ];
        let found = retrieve(&chunks, &query("biaya kuliah", None), Some(&FeeAxis)).await;
        assert_eq!(found[0].id, "a_0002");
    }

    /// Counts calls and returns one vector too few on every call.
    struct ShortBatches {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingService for ShortBatches {
        async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().skip(1).map(|t| axis(t)).collect())
        }

        async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(axis(text))
        }
    }

    #[tokio::test]
    async fn test_passages_encoded_in_batches() {
        let chunks: Vec<_> = (0..5)
            .map(|i| chunk(&format!("biaya_{i:04}"), "Biaya kuliah per semester", None))
            .collect();
        let batches = Batching {
            sizes: Mutex::new(Vec::new()),
        };
        let mut q = query("biaya", None);
        q.batch_size = 2;

        let found = retrieve(&chunks, &q, Some(&batches)).await;
        assert_eq!(found.len(), 3);
        assert_eq!(*batches.sizes.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_short_vector_count_falls_back() {
        let chunks = vec![
            chunk("biaya_0001", "Biaya pendaftaran", None),
            chunk("jadwal_0001", "Jadwal gelombang 1", None),
        ];
        let service = ShortBatches {
            calls: AtomicUsize::new(0),
        };
        let found = retrieve(&chunks, &query("biaya", Some("jadwal")), Some(&service)).await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "jadwal_0001");
        assert!(found[0].score.is_none());
    }

    #[tokio::test]
    async fn test_falls_back_to_category_sample() {
        let chunks = vec![
            chunk("jadwal_0001", "Jadwal gelombang 1", None),
            chunk("jadwal_0002", "Jadwal gelombang 2", None),
            chunk("profil_0001", "Profil kampus", None),
        ];
        let found = retrieve(&chunks, &query("kapan daftar?", Some("jadwal")), None).await;

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.id.starts_with("jadwal") && c.score.is_none()));
    }

    #[test]
    fn test_unknown_category_samples_everything() {
        let chunks = vec![
            chunk("jadwal_0001", "a", None),
            chunk("profil_0001", "b", None),
        ];
        assert_eq!(sample_by_category(&chunks, Some("beasiswa"), 3).len(), 2);
        assert_eq!(sample_by_category(&chunks, None, 1).len(), 1);
        assert!(sample_by_category(&[], Some("jadwal"), 3).is_empty());
    }
}
