//! Writers for everything a preparation run leaves on disk.

use anyhow::{Context, Result};
use extract::EntityExtractor;
use graph::ChunkGraph;
use index::DuplicateRecord;
use indexmap::IndexMap;
use ingest::SemanticChunk;
use quality::ChunkIssues;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;

pub const CHUNKS_FILE: &str = "chunks.jsonl";

/// Run summary written to `metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub created_at: String,
    pub docs_processed: Vec<String>,
    pub csv_processed: Vec<String>,
    pub total_chunks: usize,
    pub total_entities: usize,
    pub total_relations: usize,
    pub basic_relations: usize,
    pub semantic_relations: usize,
    pub semantic_duplicates_removed: usize,
    pub quality_issues: usize,
    pub embeddings_enabled: bool,
    pub duration_seconds: f64,
}

/// Inverted lookups over the accepted chunks.
#[derive(Debug, Default, Serialize)]
pub struct Indices {
    pub by_topic: IndexMap<String, Vec<String>>,
    pub by_entity: IndexMap<String, Vec<String>>,
    /// Question text to the chunk that answers it; later chunks win.
    pub hypothetical_qa: IndexMap<String, String>,
}

impl Indices {
    pub fn build(chunks: &[SemanticChunk]) -> Self {
        let mut indices = Self::default();
        for chunk in chunks {
            indices
                .by_topic
                .entry(chunk.primary_topic.to_string())
                .or_default()
                .push(chunk.id.clone());
            for entity in &chunk.entities_mentioned {
                indices
                    .by_entity
                    .entry(entity.clone())
                    .or_default()
                    .push(chunk.id.clone());
            }
            for question in &chunk.hypothetical_questions {
                indices
                    .hypothetical_qa
                    .insert(question.clone(), chunk.id.clone());
            }
        }
        indices
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index dir: {}", dir.display()))?;
        write_json(&dir.join("by_topic.json"), &self.by_topic)?;
        write_json(&dir.join("by_entity.json"), &self.by_entity)?;
        write_json(&dir.join("hypothetical_qa.json"), &self.hypothetical_qa)?;
        tracing::debug!(
            topics = self.by_topic.len(),
            entities = self.by_entity.len(),
            questions = self.hypothetical_qa.len(),
            "Saved indices"
        );
        Ok(())
    }
}

/// Everything produced by one run, borrowed for writing.
pub struct RunOutputs<'a> {
    pub chunks: &'a [SemanticChunk],
    pub extractor: &'a EntityExtractor,
    pub graph: &'a ChunkGraph,
    pub duplicates: &'a [DuplicateRecord],
    pub issues: &'a [ChunkIssues],
    pub metadata: &'a RunMetadata,
}

impl RunOutputs<'_> {
    pub fn write(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir: {}", dir.display()))?;

        write_chunks(&dir.join(CHUNKS_FILE), self.chunks)?;
        self.extractor.save(&dir.join("entities.json"))?;
        self.graph.save(&dir.join("chunk_graph.json"))?;
        if !self.duplicates.is_empty() {
            write_json(&dir.join("dedup_report.json"), &self.duplicates)?;
        }
        if !self.issues.is_empty() {
            quality::save_issues(self.issues, &dir.join("quality_issues.json"))?;
        }
        Indices::build(self.chunks).save(&dir.join("indices"))?;
        write_json(&dir.join("metadata.json"), self.metadata)?;

        tracing::info!(dir = %dir.display(), chunks = self.chunks.len(), "Wrote outputs");
        Ok(())
    }
}

pub fn write_chunks(path: &Path, chunks: &[SemanticChunk]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for chunk in chunks {
        serde_json::to_writer(&mut writer, chunk)
            .with_context(|| format!("Failed to serialize chunk {}", chunk.id))?;
        writer.write_all(b"\n")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_chunks(path: &Path) -> Result<Vec<SemanticChunk>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Invalid chunk on line {} of {}", n + 1, path.display()))
        })
        .collect()
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest::{ChunkMetadata, ContentType, Position, Topic};

    fn chunk(id: &str, topic: Topic, entities: &[&str], questions: &[&str]) -> SemanticChunk {
        SemanticChunk {
            id: id.to_string(),
            content: format!("Isi {id}"),
            content_type: ContentType::Description,
            source_file: "biaya.md".to_string(),
            section_path: vec!["Biaya".to_string()],
            position: Position::Middle,
            sibling_chunks: Vec::new(),
            parent_chunk: None,
            primary_topic: topic,
            secondary_topics: Vec::new(),
            entities_mentioned: entities.iter().map(|e| e.to_string()).collect(),
            question_types_answerable: Vec::new(),
            requires_other_chunks: false,
            summary: String::new(),
            hypothetical_questions: questions.iter().map(|q| q.to_string()).collect(),
            search_keywords: Vec::new(),
            token_count: 2,
            char_count: 10,
            quality_score: 0.5,
            metadata: ChunkMetadata::default(),
            embedding: None,
        }
    }

    #[test]
    fn test_indices_group_ids() {
        let chunks = vec![
            chunk("biaya_0001", Topic::Biaya, &["Manajemen"], &["Berapa biaya?"]),
            chunk("biaya_0002", Topic::Biaya, &["Manajemen", "Akuntansi"], &["Berapa biaya?"]),
            chunk("jadwal_0001", Topic::Jadwal, &[], &["Kapan daftar?"]),
        ];
        let indices = Indices::build(&chunks);

        assert_eq!(indices.by_topic["biaya"], vec!["biaya_0001", "biaya_0002"]);
        assert_eq!(indices.by_topic["jadwal"], vec!["jadwal_0001"]);
        assert_eq!(indices.by_entity["Manajemen"], vec!["biaya_0001", "biaya_0002"]);
        assert_eq!(indices.by_entity["Akuntansi"], vec!["biaya_0002"]);
        assert_eq!(indices.hypothetical_qa["Berapa biaya?"], "biaya_0002");
        assert_eq!(indices.hypothetical_qa.len(), 2);
    }

    #[test]
    fn test_chunks_jsonl_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHUNKS_FILE);
        let chunks = vec![
            chunk("biaya_0001", Topic::Biaya, &[], &["Berapa biaya?"]),
            chunk("biaya_0002", Topic::Biaya, &[], &["Berapa biaya?"]).with_embedding(vec![1.0, 0.0]),
        ];
        write_chunks(&path, &chunks).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let loaded = read_chunks(&path).unwrap();
        assert_eq!(loaded[0].id, "biaya_0001");
        assert_eq!(loaded[1].embedding, Some(vec![1.0, 0.0]));
    }
}
