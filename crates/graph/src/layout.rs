use indexmap::IndexMap;
use ingest::{Position, SemanticChunk};
use std::collections::HashMap;

/// Where one chunk sits in its section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub position: Position,
    /// Ids of the immediately adjacent chunks in the same section.
    pub siblings: Vec<String>,
}

/// Sibling and position lookup for a chunk set, kept apart from the chunks
/// themselves. Placements live in an arena indexed by chunk id.
#[derive(Debug, Clone, Default)]
pub struct ChunkLayout {
    placements: Vec<Placement>,
    chunk_to_idx: HashMap<String, usize>,
}

impl ChunkLayout {
    /// Group chunks by the first element of their section path, in order.
    /// Chunks without a section path keep the default placement.
    pub fn from_chunks(chunks: &[SemanticChunk]) -> Self {
        let mut layout = Self {
            placements: vec![Placement::default(); chunks.len()],
            chunk_to_idx: chunks
                .iter()
                .enumerate()
                .map(|(idx, c)| (c.id.clone(), idx))
                .collect(),
        };

        let mut by_section: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            if let Some(section) = chunk.section() {
                by_section.entry(section).or_default().push(idx);
            }
        }

        for members in by_section.values() {
            let last = members.len() - 1;
            for (i, &idx) in members.iter().enumerate() {
                let placement = &mut layout.placements[idx];
                placement.position = if i == 0 {
                    Position::Start
                } else if i == last {
                    Position::End
                } else {
                    Position::Middle
                };
                if i > 0 {
                    placement.siblings.push(chunks[members[i - 1]].id.clone());
                }
                if i < last {
                    placement.siblings.push(chunks[members[i + 1]].id.clone());
                }
            }
        }

        layout
    }

    pub fn get(&self, chunk_id: &str) -> Option<&Placement> {
        self.chunk_to_idx
            .get(chunk_id)
            .map(|&idx| &self.placements[idx])
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// New chunk values carrying their placement; unknown ids pass through.
    pub fn apply(&self, chunks: Vec<SemanticChunk>) -> Vec<SemanticChunk> {
        chunks
            .into_iter()
            .map(|chunk| match self.get(&chunk.id) {
                Some(placement) => SemanticChunk {
                    position: placement.position,
                    sibling_chunks: placement.siblings.clone(),
                    ..chunk
                },
                None => chunk,
            })
            .collect()
    }
}
