use crate::embeddings::EmbeddingService;
use crate::error::EmbeddingError;
use crate::similarity::l2_normalize;
use async_trait::async_trait;
use ingest::{ChunkMetadata, ContentType, Position, SemanticChunk, Topic};

/// Deterministic embedder: one dimension per keyword plus a catch-all.
pub struct KeywordEmbedder;

const KEYWORDS: [&str; 2] = ["biaya", "jadwal"];

fn embed(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = KEYWORDS
        .iter()
        .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
        .collect();
    v.push(if v.iter().all(|x| *x == 0.0) { 1.0 } else { 0.0 });
    l2_normalize(&mut v);
    v
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| embed(t)).collect())
    }

    async fn encode_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(embed(text))
    }
}

pub fn sample_chunk(id: &str, content: &str, content_type: ContentType) -> SemanticChunk {
    SemanticChunk {
        id: id.to_string(),
        content: content.to_string(),
        content_type,
        source_file: "sample.md".to_string(),
        section_path: vec!["Intro".to_string()],
        position: Position::Middle,
        sibling_chunks: Vec::new(),
        parent_chunk: None,
        primary_topic: Topic::Umum,
        secondary_topics: Vec::new(),
        entities_mentioned: Vec::new(),
        question_types_answerable: Vec::new(),
        requires_other_chunks: false,
        summary: String::new(),
        hypothetical_questions: vec!["Informasi tentang umum?".to_string()],
        search_keywords: Vec::new(),
        token_count: content.split_whitespace().count(),
        char_count: content.chars().count(),
        quality_score: 0.0,
        metadata: ChunkMetadata::default(),
        embedding: None,
    }
}
