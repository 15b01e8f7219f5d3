pub mod layout;
pub mod relation;

pub use layout::{ChunkLayout, Placement};
pub use relation::{ChunkRelation, RelationType};

use anyhow::{Context, Result};
use index::EmbeddingService;
use indexmap::IndexMap;
use ingest::{ContentType, SemanticChunk, Topic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Locality window: each chunk links to at most this many following chunks.
const NEXT_NEIGHBOURS: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub max_relations_per_topic: usize,
    pub max_table_relations: usize,
    /// Entities mentioned by more chunks than this are too generic to link on.
    pub max_entity_fanout: usize,
    pub semantic_threshold: f32,
    pub max_semantic_per_chunk: usize,
    pub topic_strength: f32,
    pub entity_strength: f32,
    pub table_strength: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_relations_per_topic: 10,
            max_table_relations: 10,
            max_entity_fanout: 5,
            semantic_threshold: 0.75,
            max_semantic_per_chunk: 5,
            topic_strength: 0.7,
            entity_strength: 0.9,
            table_strength: 0.8,
        }
    }
}

/// Relations between chunks plus the section layout derived while building them.
#[derive(Debug, Default)]
pub struct ChunkGraph {
    config: GraphConfig,
    relations: Vec<ChunkRelation>,
    layout: ChunkLayout,
}

impl ChunkGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Structural relations: same topic, same entity, table-row adjacency.
    /// Sibling positions go to [`ChunkGraph::layout`].
    pub fn build_graph(&mut self, chunks: &[SemanticChunk]) -> &[ChunkRelation] {
        let mut by_topic: IndexMap<Topic, Vec<&SemanticChunk>> = IndexMap::new();
        let mut by_entity: IndexMap<&str, Vec<&SemanticChunk>> = IndexMap::new();

        for chunk in chunks {
            by_topic.entry(chunk.primary_topic).or_default().push(chunk);
            for entity in &chunk.entities_mentioned {
                let members = by_entity.entry(entity.as_str()).or_default();
                if members.last().is_none_or(|last| last.id != chunk.id) {
                    members.push(chunk);
                }
            }
        }

        let start = self.relations.len();
        self.link_same_topic(&by_topic);
        self.link_same_entity(&by_entity);
        self.link_table_rows(chunks);
        self.layout = ChunkLayout::from_chunks(chunks);

        tracing::info!(
            relations = self.relations.len() - start,
            topics = by_topic.len(),
            entities = by_entity.len(),
            "Built structural relations"
        );
        &self.relations[start..]
    }

    /// Link each chunk to its next two same-topic chunks, at most
    /// `max_relations_per_topic` edges per topic.
    fn link_same_topic(&mut self, by_topic: &IndexMap<Topic, Vec<&SemanticChunk>>) {
        for members in by_topic.values() {
            let edges = next_neighbour_pairs(members, self.config.max_relations_per_topic);
            self.relations.extend(edges.into_iter().map(|(a, b)| {
                ChunkRelation::new(a, b, RelationType::RelatesTo, self.config.topic_strength)
            }));
        }
    }

    /// Link every pair of chunks sharing a moderately common entity, each pair once.
    fn link_same_entity(&mut self, by_entity: &IndexMap<&str, Vec<&SemanticChunk>>) {
        let mut seen_pairs: HashSet<(&str, &str)> = HashSet::new();

        for members in by_entity.values() {
            if members.len() <= 1 || members.len() > self.config.max_entity_fanout {
                continue;
            }
            for (i, first) in members.iter().enumerate() {
                for second in &members[i + 1..] {
                    let key = if first.id <= second.id {
                        (first.id.as_str(), second.id.as_str())
                    } else {
                        (second.id.as_str(), first.id.as_str())
                    };
                    if seen_pairs.insert(key) {
                        self.relations.push(ChunkRelation::new(
                            &first.id,
                            &second.id,
                            RelationType::RelatesTo,
                            self.config.entity_strength,
                        ));
                    }
                }
            }
        }
    }

    fn link_table_rows(&mut self, chunks: &[SemanticChunk]) {
        let rows: Vec<&SemanticChunk> = chunks
            .iter()
            .filter(|c| c.content_type == ContentType::TableRow)
            .collect();
        let edges = next_neighbour_pairs(&rows, self.config.max_table_relations);
        self.relations.extend(edges.into_iter().map(|(a, b)| {
            ChunkRelation::new(a, b, RelationType::ComparesTo, self.config.table_strength)
        }));
    }

    /// Add `semantic_similarity` edges between embedded chunks whose cosine
    /// similarity clears the threshold, at most `max_semantic_per_chunk` per chunk.
    /// Returns the number of edges added.
    pub fn build_semantic_relations(
        &mut self,
        chunks: &[SemanticChunk],
        service: &dyn EmbeddingService,
    ) -> usize {
        let (embedded, vectors): (Vec<&SemanticChunk>, Vec<Vec<f32>>) = chunks
            .iter()
            .filter_map(|c| c.embedding.clone().map(|e| (c, e)))
            .unzip();
        if vectors.len() < 2 {
            return 0;
        }

        let pairs = service.find_related_pairs(
            &vectors,
            self.config.semantic_threshold,
            self.config.max_semantic_per_chunk,
        );
        let added = pairs.len();
        self.relations.extend(pairs.into_iter().map(|(i, j, score)| {
            ChunkRelation::new(
                &embedded[i].id,
                &embedded[j].id,
                RelationType::SemanticSimilarity,
                score,
            )
        }));

        tracing::info!(relations = added, "Built semantic relations");
        added
    }

    pub fn relations(&self) -> &[ChunkRelation] {
        &self.relations
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    /// Drop relations with an endpoint outside `chunks`. Returns how many were dropped.
    pub fn retain_chunks(&mut self, chunks: &[SemanticChunk]) -> usize {
        let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let before = self.relations.len();
        self.relations.retain(|r| {
            ids.contains(r.source_id.as_str()) && ids.contains(r.target_id.as_str())
        });
        before - self.relations.len()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.relations)
            .context("Failed to serialize chunk graph")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write chunk graph: {}", path.display()))?;
        Ok(())
    }
}

/// `(members[i], members[i+1..i+3])` pairs in order, stopping at `cap` pairs.
fn next_neighbour_pairs<'a>(members: &[&'a SemanticChunk], cap: usize) -> Vec<(&'a str, &'a str)> {
    let mut pairs = Vec::new();
    'outer: for (i, first) in members.iter().enumerate() {
        for second in members.iter().skip(i + 1).take(NEXT_NEIGHBOURS) {
            if pairs.len() >= cap {
                break 'outer;
            }
            pairs.push((first.id.as_str(), second.id.as_str()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use index::EmbeddingError;
    use ingest::{ChunkMetadata, Position};

    pub(crate) fn chunk(id: &str, section: &str, topic: Topic, content_type: ContentType) -> SemanticChunk {
        SemanticChunk {
            id: id.to_string(),
            content: format!("isi {id}"),
            content_type,
            source_file: "doc.md".to_string(),
            section_path: vec![section.to_string()],
            position: Position::Middle,
            sibling_chunks: Vec::new(),
            parent_chunk: None,
            primary_topic: topic,
            secondary_topics: Vec::new(),
            entities_mentioned: Vec::new(),
            question_types_answerable: Vec::new(),
            requires_other_chunks: false,
            summary: String::new(),
            hypothetical_questions: vec!["?".to_string()],
            search_keywords: Vec::new(),
            token_count: 2,
            char_count: 10,
            quality_score: 0.5,
            metadata: ChunkMetadata::default(),
            embedding: None,
        }
    }

    fn with_entities(mut c: SemanticChunk, entities: &[&str]) -> SemanticChunk {
        c.entities_mentioned = entities.iter().map(|e| e.to_string()).collect();
        c
    }

    fn count(graph: &ChunkGraph, relation_type: RelationType) -> usize {
        graph
            .relations()
            .iter()
            .filter(|r| r.relation_type == relation_type)
            .count()
    }

    #[test]
    fn test_topic_relations_capped() {
        let chunks: Vec<_> = (0..50)
            .map(|i| chunk(&format!("b_{i:04}"), &format!("S{i}"), Topic::Biaya, ContentType::Description))
            .collect();
        let mut graph = ChunkGraph::new(GraphConfig::default());
        let relations = graph.build_graph(&chunks);

        assert_eq!(relations.len(), 10);
        assert!(relations.iter().all(|r| r.strength == 0.7));
        assert_eq!(relations[0].source_id, "b_0000");
        assert_eq!(relations[1].target_id, "b_0002");
    }

    #[test]
    fn test_entity_fanout_and_pair_dedup() {
        let chunks = vec![
            with_entities(chunk("a", "S1", Topic::Biaya, ContentType::Faq), &["Manajemen", "Akuntansi"]),
            with_entities(chunk("b", "S2", Topic::Jadwal, ContentType::Faq), &["Manajemen", "Akuntansi"]),
            with_entities(chunk("c", "S3", Topic::Kontak, ContentType::Faq), &["UNSIQ"]),
        ];
        let mut graph = ChunkGraph::new(GraphConfig::default());
        graph.build_graph(&chunks);

        let entity_edges: Vec<_> = graph
            .relations()
            .iter()
            .filter(|r| r.strength == 0.9)
            .collect();
        assert_eq!(entity_edges.len(), 1);
        assert_eq!((entity_edges[0].source_id.as_str(), entity_edges[0].target_id.as_str()), ("a", "b"));

        let common: Vec<_> = (0..6)
            .map(|i| with_entities(chunk(&format!("x{i}"), "S", Topic::Umum, ContentType::Faq), &["UNSIQ"]))
            .collect();
        let mut graph = ChunkGraph::new(GraphConfig::default());
        graph.build_graph(&common);
        assert!(graph.relations().iter().all(|r| r.strength != 0.9));
    }

    #[test]
    fn test_table_rows_compare_to_next_two() {
        let chunks: Vec<_> = (0..4)
            .map(|i| chunk(&format!("t{i}"), "Tabel", Topic::Umum, ContentType::TableRow))
            .chain(std::iter::once(chunk("n", "Intro", Topic::Biaya, ContentType::Narrative)))
            .collect();
        let mut graph = ChunkGraph::new(GraphConfig::default());
        graph.build_graph(&chunks);

        // t0->t1, t0->t2, t1->t2, t1->t3, t2->t3
        assert_eq!(count(&graph, RelationType::ComparesTo), 5);
        assert_eq!(graph.layout().get("t3").unwrap().position, Position::End);
    }

    #[test]
    fn test_entity_fanout_limit_is_inclusive() {
        let shared: Vec<_> = (0..5)
            .map(|i| with_entities(chunk(&format!("x{i}"), "S", Topic::Umum, ContentType::Faq), &["UNSIQ"]))
            .collect();
        let mut graph = ChunkGraph::new(GraphConfig::default());
        graph.build_graph(&shared);

        let entity_edges = graph.relations().iter().filter(|r| r.strength == 0.9).count();
        assert_eq!(entity_edges, 10);
    }

    #[test]
    fn test_table_relations_capped() {
        let rows: Vec<_> = (0..12)
            .map(|i| chunk(&format!("t{i:02}"), "Tabel", Topic::Umum, ContentType::TableRow))
            .collect();
        let mut graph = ChunkGraph::new(GraphConfig::default());
        graph.build_graph(&rows);

        let compares: Vec<_> = graph
            .relations()
            .iter()
            .filter(|r| r.relation_type == RelationType::ComparesTo)
            .collect();
        assert_eq!(compares.len(), 10);
        assert!(compares.iter().all(|r| r.strength == 0.8));
        assert_eq!(compares[9].source_id, "t04");
    }

    struct Fixed;

    #[async_trait]
    impl EmbeddingService for Fixed {
        async fn encode_passages(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        async fn encode_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[test]
    fn test_semantic_relations_and_pruning() {
        let mut chunks: Vec<_> = (0..3)
            .map(|i| chunk(&format!("s{i}"), &format!("S{i}"), Topic::Umum, ContentType::Faq))
            .collect();
        chunks[0].embedding = Some(vec![1.0, 0.0]);
        chunks[1].embedding = Some(vec![0.8, 0.6]);
        chunks[2].embedding = Some(vec![0.6, 0.8]);

        let mut graph = ChunkGraph::new(GraphConfig::default());
        let added = graph.build_semantic_relations(&chunks, &Fixed);
        assert_eq!(added, 2);
        assert_eq!(count(&graph, RelationType::SemanticSimilarity), 2);
        assert!((graph.relations()[0].strength - 0.96).abs() < 1e-6);

        let dropped = graph.retain_chunks(&chunks[..2]);
        assert_eq!(dropped, 1);
        assert_eq!(graph.relations().len(), 1);
    }
}
