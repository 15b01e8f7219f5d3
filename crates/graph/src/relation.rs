use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    RelatesTo,
    ComparesTo,
    SemanticSimilarity,
}

/// Directed edge between two chunk ids. Edges are stored once, never mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRelation {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
    pub strength: f32,
}

impl ChunkRelation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation_type: RelationType,
        strength: f32,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type,
            strength,
        }
    }
}
