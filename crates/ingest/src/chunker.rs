use crate::chunk::{ContentType, Position, SemanticChunk};
use crate::enrich;
use crate::profile::DocumentProfile;
use crate::strategies::{self, ChunkDraft};
use crate::text::count_tokens;
use extract::EntityExtractor;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Sections up to this many tokens stay whole.
    pub section_max_tokens: usize,
    pub narrative_max_tokens: usize,
    pub min_section_chars: usize,
    pub fallback_max_chars: usize,
    pub fallback_min_chars: usize,
    /// Leading characters hashed when unioning strategy output.
    pub content_hash_prefix_chars: usize,
    pub max_hypothetical_questions: usize,
    pub max_keywords: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            section_max_tokens: 400,
            narrative_max_tokens: 350,
            min_section_chars: 50,
            fallback_max_chars: 1500,
            fallback_min_chars: 100,
            content_hash_prefix_chars: 100,
            max_hypothetical_questions: 5,
            max_keywords: 20,
        }
    }
}

/// Mutable state threaded through one chunking run: the entity registry and the
/// running chunk-id counter.
#[derive(Debug, Default)]
pub struct ChunkingContext {
    pub extractor: EntityExtractor,
    counter: usize,
}

impl ChunkingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&mut self, category: &str) -> String {
        self.counter += 1;
        format!("{category}_{:04}", self.counter)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> usize {
        self.counter
    }
}

const CATEGORY_MAP: [(&str, &str); 10] = [
    ("profil", "profil"),
    ("alur", "alur"),
    ("beasiswa", "beasiswa"),
    ("fasilitas", "fasilitas"),
    ("syarat", "syarat"),
    ("singkatan", "singkatan"),
    ("biaya", "biaya"),
    ("jadwal", "jadwal"),
    ("kontak", "kontak"),
    ("program", "prodi"),
];

/// Chunk-id prefix for a source file name, e.g. `pmb_program_studi.csv` -> `prodi`.
pub fn category_for(source_file: &str) -> String {
    let stem = source_file
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(source_file);
    let lower = stem.to_lowercase();

    let category = CATEGORY_MAP
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, cat)| {
            if lower.contains("faq") {
                format!("{cat}_faq")
            } else {
                cat.to_string()
            }
        })
        .unwrap_or_else(|| match lower.split('_').next() {
            Some(word) if !word.is_empty() => word.to_string(),
            _ => "unknown".to_string(),
        });

    category.replace([' ', '-'], "_")
}

pub struct SemanticChunker {
    config: ChunkerConfig,
}

impl SemanticChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk one Markdown document with the hybrid strategy.
    pub fn chunk_document(
        &self,
        ctx: &mut ChunkingContext,
        content: &str,
        source_file: &str,
        profile: &DocumentProfile,
    ) -> Vec<SemanticChunk> {
        let drafts = strategies::hybrid(content, &self.config);
        tracing::debug!(
            file = source_file,
            doc_type = ?profile.doc_type,
            drafts = drafts.len(),
            "Drafted chunks"
        );

        drafts
            .into_iter()
            .map(|draft| self.create_chunk(ctx, draft, source_file))
            .collect()
    }

    /// One `table_row` chunk per CSV data row.
    ///
    /// Rows are split on bare commas; quoted fields are not supported. Rows with
    /// fewer cells than the header are skipped, extra cells ignored.
    pub fn chunk_csv(
        &self,
        ctx: &mut ChunkingContext,
        content: &str,
        source_file: &str,
    ) -> Vec<SemanticChunk> {
        let mut lines = content.trim().lines();
        let Some(header_line) = lines.next() else {
            return Vec::new();
        };
        let headers: Vec<String> = header_line.split(',').map(|h| h.trim().to_string()).collect();

        let mut chunks = Vec::new();
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let cells: Vec<String> = line.split(',').map(|c| c.trim().to_string()).collect();
            if cells.len() < headers.len() {
                continue;
            }

            let rows: Vec<String> = headers
                .iter()
                .zip(&cells)
                .map(|(h, c)| format!("- {h}: {c}"))
                .collect();
            let draft = ChunkDraft {
                content: format!("Data dari {source_file}:\n{}", rows.join("\n")),
                content_type: ContentType::TableRow,
                section_path: vec!["CSV".to_string(), source_file.to_string()],
                hypothetical_questions: Some(vec![format!("Informasi tentang {}?", cells[0])]),
                metadata: Default::default(),
            };
            chunks.push(self.create_chunk(ctx, draft, source_file));
        }

        chunks
    }

    /// Turn a draft into a fully enriched chunk with a fresh id.
    ///
    /// Entities are extracted exactly once per chunk, scoped to the first
    /// element of the section path.
    pub fn create_chunk(
        &self,
        ctx: &mut ChunkingContext,
        draft: ChunkDraft,
        source_file: &str,
    ) -> SemanticChunk {
        let ChunkDraft {
            content,
            content_type,
            section_path,
            hypothetical_questions,
            metadata,
        } = draft;

        let section = section_path.first().map(String::as_str).unwrap_or("");
        let entity_names: Vec<String> = ctx
            .extractor
            .extract_all(&content, section)
            .into_iter()
            .map(|e| e.name)
            .collect();

        let primary_topic = enrich::detect_topic(&content);
        let question_types = enrich::answerable_question_types(&content);

        let mut questions = hypothetical_questions.unwrap_or_else(|| {
            enrich::hypothetical_questions(&content, primary_topic, &entity_names)
        });
        questions.truncate(self.config.max_hypothetical_questions);
        if questions.is_empty() {
            questions.push(format!("Informasi tentang {primary_topic}?"));
        }

        let quality_score =
            enrich::quality_score(&content, entity_names.len(), question_types.len());

        SemanticChunk {
            id: ctx.next_id(&category_for(source_file)),
            content_type,
            source_file: source_file.to_string(),
            section_path,
            position: Position::Middle,
            sibling_chunks: Vec::new(),
            parent_chunk: None,
            primary_topic,
            secondary_topics: enrich::secondary_topics(&content, primary_topic),
            requires_other_chunks: enrich::requires_other_chunks(&content),
            summary: enrich::summarize(&content),
            search_keywords: enrich::search_keywords(
                &content,
                &entity_names,
                self.config.max_keywords,
            ),
            hypothetical_questions: questions,
            question_types_answerable: question_types,
            entities_mentioned: entity_names,
            token_count: count_tokens(&content),
            char_count: content.chars().count(),
            quality_score,
            metadata,
            embedding: None,
            content,
        }
    }
}
