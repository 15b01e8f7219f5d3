use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Faq,
    TableRow,
    Description,
    Narrative,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Faq => "faq",
            ContentType::TableRow => "table_row",
            ContentType::Description => "description",
            ContentType::Narrative => "narrative",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed topic vocabulary. `Umum` is the "no signal" fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Biaya,
    Beasiswa,
    ProgramStudi,
    Pendaftaran,
    Persyaratan,
    Jadwal,
    Kontak,
    Orientasi,
    Institusi,
    Umum,
}

impl Topic {
    /// Topics with a keyword score, in tie-break order.
    pub const SCORED: [Topic; 9] = [
        Topic::Biaya,
        Topic::Beasiswa,
        Topic::ProgramStudi,
        Topic::Pendaftaran,
        Topic::Persyaratan,
        Topic::Jadwal,
        Topic::Kontak,
        Topic::Orientasi,
        Topic::Institusi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Biaya => "biaya",
            Topic::Beasiswa => "beasiswa",
            Topic::ProgramStudi => "program_studi",
            Topic::Pendaftaran => "pendaftaran",
            Topic::Persyaratan => "persyaratan",
            Topic::Jadwal => "jadwal",
            Topic::Kontak => "kontak",
            Topic::Orientasi => "orientasi",
            Topic::Institusi => "institusi",
            Topic::Umum => "umum",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Factual,
    Procedural,
    Comparative,
    Conditional,
}

/// Where a chunk sits among the chunks of its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Start,
    #[default]
    Middle,
    End,
}

/// Strategy-specific extras carried alongside a chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Last sentence of the preceding narrative chunk; never copied into content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticChunk {
    pub id: String,
    pub content: String,
    pub content_type: ContentType,

    // Structural
    pub source_file: String,
    pub section_path: Vec<String>,
    pub position: Position,
    pub sibling_chunks: Vec<String>,
    pub parent_chunk: Option<String>,

    // Semantic
    pub primary_topic: Topic,
    pub secondary_topics: Vec<Topic>,
    pub entities_mentioned: Vec<String>,
    pub question_types_answerable: Vec<QuestionType>,
    pub requires_other_chunks: bool,

    // Retrieval
    pub summary: String,
    pub hypothetical_questions: Vec<String>,
    pub search_keywords: Vec<String>,

    // Quality
    pub token_count: usize,
    pub char_count: usize,
    pub quality_score: f64,

    #[serde(default)]
    pub metadata: ChunkMetadata,

    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl SemanticChunk {
    /// First element of the section path, the key used for sibling grouping.
    pub fn section(&self) -> Option<&str> {
        self.section_path.first().map(String::as_str)
    }

    pub fn with_embedding(self, embedding: Vec<f32>) -> Self {
        Self {
            embedding: Some(embedding),
            ..self
        }
    }

    /// Id prefix before the running counter, e.g. `biaya` for `biaya_0007`.
    pub fn category(&self) -> &str {
        self.id
            .rsplit_once('_')
            .map(|(prefix, _)| prefix)
            .unwrap_or(&self.id)
    }
}
