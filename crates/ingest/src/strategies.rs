//! Chunking strategies.
//!
//! Every strategy is a pure function from document text to [`ChunkDraft`]s.
//! [`hybrid`] folds the ordered [`HYBRID_STRATEGIES`] list, dropping drafts whose
//! leading text was already produced by an earlier strategy, and falls back to
//! [`paragraphs`] when nothing matched at all.

use crate::chunk::{ChunkMetadata, ContentType};
use crate::chunker::ChunkerConfig;
use crate::enrich::{section_questions, strip_numbering, table_questions};
use crate::text::{count_tokens, prefix_hash, split_paragraphs, split_sentences, truncate_chars};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

const MIN_QUESTION_CHARS: usize = 10;
const MIN_ANSWER_CHARS: usize = 20;

static QA_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:^|[ \t])(?:###[ \t]*)?([QA]):").unwrap());
static BOLD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\*\*(Pertanyaan|Jawaban|Q|A)[ \t]*:?[ \t]*\*\*:?").unwrap()
});
static NUMBERED_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]*([^?\n]+\?)[ \t]*$").unwrap());
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.").unwrap());
static BLOCK_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[#|]").unwrap());
static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\|[^\n]+\|[ \t]*\n\|[-:| ]+\|[ \t]*\n(?:\|[^\n]+\|[ \t]*(?:\n|$))+").unwrap()
});
static H3_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^###\s+(.+)$").unwrap());

/// Chunk text plus the strategy-specific fields the chunker cannot recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub content: String,
    pub content_type: ContentType,
    pub section_path: Vec<String>,
    /// Questions the strategy knows the draft answers; `None` lets the
    /// enrichment heuristics generate them.
    pub hypothetical_questions: Option<Vec<String>>,
    pub metadata: ChunkMetadata,
}

impl ChunkDraft {
    fn new(content: String, content_type: ContentType, section_path: Vec<String>) -> Self {
        Self {
            content,
            content_type,
            section_path,
            hypothetical_questions: None,
            metadata: ChunkMetadata::default(),
        }
    }

    fn with_questions(mut self, questions: Vec<String>) -> Self {
        self.hypothetical_questions = Some(questions);
        self
    }
}

pub type Strategy = fn(&str, &ChunkerConfig) -> Vec<ChunkDraft>;

/// Strategies unioned by [`hybrid`], in priority order.
pub const HYBRID_STRATEGIES: [(&str, Strategy); 3] = [
    ("faq", faq_pairs),
    ("table", table_rows),
    ("section", sections),
];

pub fn hybrid(content: &str, config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let mut seen = HashSet::new();
    let drafts = HYBRID_STRATEGIES
        .iter()
        .fold(Vec::new(), |mut acc, (name, strategy)| {
            let produced = strategy(content, config);
            tracing::trace!(strategy = *name, drafts = produced.len(), "Strategy finished");
            for draft in produced {
                if seen.insert(prefix_hash(&draft.content, config.content_hash_prefix_chars)) {
                    acc.push(draft);
                }
            }
            acc
        });

    if drafts.is_empty() {
        paragraphs(content, config)
    } else {
        drafts
    }
}

/// Question/answer pairs in `Q:`/`A:`, bold `**Pertanyaan**`/`**Jawaban**`
/// and numbered `1. ...?` formats.
pub fn faq_pairs(content: &str, _config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let mut pairs = labelled_pairs(content, &QA_MARKER, |label| label == "Q");
    pairs.extend(labelled_pairs(content, &BOLD_MARKER, |label| {
        label.eq_ignore_ascii_case("pertanyaan") || label.eq_ignore_ascii_case("q")
    }));
    pairs.extend(numbered_pairs(content));

    pairs
        .into_iter()
        .filter(|(q, a)| q.chars().count() >= MIN_QUESTION_CHARS && a.chars().count() >= MIN_ANSWER_CHARS)
        .map(|(question, answer)| {
            let body = format!("Pertanyaan: {question}\n\nJawaban: {answer}");
            ChunkDraft::new(body, ContentType::Faq, vec!["FAQ".to_string()])
                .with_questions(vec![question])
        })
        .collect()
}

/// Pair each question marker with an immediately following answer marker.
///
/// The question is the text between the two markers; the answer runs until the
/// next question marker, a heading or table line, or the end of the text.
fn labelled_pairs(
    content: &str,
    marker: &Regex,
    is_question: impl Fn(&str) -> bool,
) -> Vec<(String, String)> {
    // (marker start, text start, is question)
    let markers: Vec<(usize, usize, bool)> = marker
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?.as_str();
            Some((whole.start(), whole.end(), is_question(label)))
        })
        .collect();

    let mut pairs = Vec::new();
    for (idx, window) in markers.windows(2).enumerate() {
        let &[(_, q_text, q_is_question), (a_start, a_text, a_is_question)] = window else {
            continue;
        };
        if !q_is_question || a_is_question {
            continue;
        }

        let next_question = markers[idx + 2..]
            .iter()
            .find(|(_, _, question)| *question)
            .map(|(start, _, _)| *start)
            .unwrap_or(content.len());
        let end = block_end(content, a_text).min(next_question);

        let question = content[q_text..a_start].trim().to_string();
        let answer = content[a_text..end].trim().to_string();
        pairs.push((question, answer));
    }
    pairs
}

fn numbered_pairs(content: &str) -> Vec<(String, String)> {
    NUMBERED_QUESTION
        .captures_iter(content)
        .filter_map(|caps| {
            let line = caps.get(0)?;
            let question = caps.get(1)?.as_str().trim().to_string();
            let start = line.end();
            let next_item = NUMBERED_LINE
                .find_at(content, start)
                .map(|m| m.start())
                .unwrap_or(content.len());
            let end = block_end(content, start).min(next_item);
            Some((question, content[start..end].trim().to_string()))
        })
        .collect()
}

/// Offset of the first heading or table line at or after `from`.
fn block_end(content: &str, from: usize) -> usize {
    BLOCK_BOUNDARY
        .find_at(content, from)
        .map(|m| m.start())
        .unwrap_or(content.len())
}

/// One draft per Markdown table body row, rendered as `- Header: Value` lines.
///
/// Rows whose cell count differs from the header are skipped.
pub fn table_rows(content: &str, _config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();

    for (table_index, table) in TABLE.find_iter(content).enumerate() {
        let lines: Vec<&str> = table.as_str().trim().lines().collect();
        if lines.len() < 3 {
            continue;
        }
        let headers = split_cells(lines[0]);

        for (row_index, line) in lines[2..].iter().enumerate() {
            let cells = split_cells(line);
            if cells.len() != headers.len() {
                continue;
            }
            let mut draft = ChunkDraft::new(
                format_row(&headers, &cells),
                ContentType::TableRow,
                vec!["Tabel".to_string(), format!("Row {}", row_index + 1)],
            )
            .with_questions(table_questions(&headers, &cells));
            draft.metadata = ChunkMetadata {
                table_index: Some(table_index),
                row_index: Some(row_index),
                headers: headers.clone(),
                ..Default::default()
            };
            drafts.push(draft);
        }
    }

    drafts
}

pub fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_row(headers: &[String], cells: &[String]) -> String {
    headers
        .iter()
        .zip(cells)
        .map(|(h, c)| format!("- {h}: {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Level-3 sections: short ones become a single description, long ones are
/// split into narrative pieces.
pub fn sections(content: &str, config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();

    for (title, body) in split_h3_sections(content) {
        if body.trim().chars().count() < config.min_section_chars {
            continue;
        }

        if count_tokens(&body) <= config.section_max_tokens {
            drafts.push(
                ChunkDraft::new(
                    format!("### {title}\n\n{body}"),
                    ContentType::Description,
                    vec![strip_numbering(&title)],
                )
                .with_questions(section_questions(&title)),
            );
        } else {
            drafts.extend(narrative(&body, &title, config.narrative_max_tokens));
        }
    }

    drafts
}

/// Split on `### ` headings, keeping every section in document order.
fn split_h3_sections(content: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut title = "Intro".to_string();
    let mut body: Vec<&str> = Vec::new();

    for line in content.split('\n') {
        if let Some(caps) = H3_TITLE.captures(line) {
            if !body.is_empty() {
                sections.push((title, body.join("\n")));
            }
            title = caps[1].trim().to_string();
            body = Vec::new();
        } else {
            body.push(line);
        }
    }
    if !body.is_empty() {
        sections.push((title, body.join("\n")));
    }

    sections
}

/// Greedy paragraph accumulation up to `max_tokens` per piece.
///
/// Each piece after the first carries the last sentence of its predecessor as
/// `previous_context` metadata; the content itself never overlaps.
fn narrative(body: &str, title: &str, max_tokens: usize) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0;
    let mut previous_context: Option<String> = None;

    let mut flush = |current: &[&str], previous_context: &Option<String>| {
        let mut draft = ChunkDraft::new(
            current.join("\n\n"),
            ContentType::Narrative,
            vec![title.to_string()],
        );
        draft.metadata.previous_context = previous_context.clone();
        drafts.push(draft);
    };

    for para in split_paragraphs(body) {
        let para_tokens = count_tokens(para);
        if current_tokens + para_tokens <= max_tokens {
            current.push(para);
            current_tokens += para_tokens;
            continue;
        }

        if let Some(last) = current.last() {
            flush(&current, &previous_context);
            let tail = split_sentences(last)
                .last()
                .map(|s| s.to_string())
                .unwrap_or_else(|| truncate_chars(last, 100).to_string());
            previous_context = Some(tail);
        }
        current = vec![para];
        current_tokens = para_tokens;
    }
    if !current.is_empty() {
        flush(&current, &previous_context);
    }

    drafts
}

/// Fallback for text no other strategy recognised: blank-line paragraphs,
/// headings dropped, packed up to `fallback_max_chars` characters.
pub fn paragraphs(content: &str, config: &ChunkerConfig) -> Vec<ChunkDraft> {
    let mut drafts = Vec::new();
    let mut current = String::new();

    let mut emit = |text: &str| {
        if text.chars().count() > config.fallback_min_chars {
            drafts.push(ChunkDraft::new(
                text.trim().to_string(),
                ContentType::Description,
                vec!["Content".to_string()],
            ));
        }
    };

    for para in split_paragraphs(content) {
        if para.starts_with('#') {
            continue;
        }
        if current.chars().count() + para.chars().count() < config.fallback_max_chars {
            current.push_str(para);
            current.push_str("\n\n");
        } else {
            emit(&current);
            current = format!("{para}\n\n");
        }
    }
    emit(&current);

    drafts
}
