//! Final validation pass over finished chunks.
//!
//! Checks never repair anything: rejected chunks are dropped and reported with
//! the action a follow-up pass should take.

use anyhow::{Context, Result};
use ingest::text::prefix_hash;
use ingest::{ContentType, SemanticChunk, Topic};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_tokens: usize,
    /// Lower minimum for `faq` and `table_row` chunks.
    pub min_tokens_short_types: usize,
    pub max_tokens: usize,
    pub hash_prefix_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_tokens: 20,
            min_tokens_short_types: 10,
            max_tokens: 600,
            hash_prefix_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    TooShort,
    TooLong,
    NoClearTopic,
    Orphan,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    MergeWithAdjacent,
    Resplit,
    ManualReview,
    CheckStandalone,
    Deduplicate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueValue {
    Count(usize),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub check: QualityCheck,
    pub value: IssueValue,
    pub action: RepairAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkIssues {
    pub chunk_id: String,
    pub issues: Vec<Issue>,
}

#[derive(Debug, Default)]
pub struct QualityGates {
    config: QualityConfig,
}

impl QualityGates {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Split chunks into accepted ones and rejection records.
    ///
    /// A chunk passes with no issues or with `orphan` as its only issue.
    pub fn validate_chunks(
        &self,
        chunks: Vec<SemanticChunk>,
    ) -> (Vec<SemanticChunk>, Vec<ChunkIssues>) {
        let mut seen_content: HashMap<String, String> = HashMap::new();
        let mut valid = Vec::new();
        let mut rejected = Vec::new();

        for chunk in chunks {
            let mut issues = self.check(&chunk);

            let hash = prefix_hash(&chunk.content, self.config.hash_prefix_chars);
            match seen_content.get(&hash) {
                Some(first_id) => issues.push(Issue {
                    check: QualityCheck::Duplicate,
                    value: IssueValue::Text(first_id.clone()),
                    action: RepairAction::Deduplicate,
                }),
                None => {
                    seen_content.insert(hash, chunk.id.clone());
                }
            }

            if issues.iter().all(|i| i.check == QualityCheck::Orphan) {
                valid.push(chunk);
            } else {
                rejected.push(ChunkIssues {
                    chunk_id: chunk.id,
                    issues,
                });
            }
        }

        tracing::info!(valid = valid.len(), rejected = rejected.len(), "Quality gates finished");
        (valid, rejected)
    }

    /// Per-chunk checks that need no other chunk.
    fn check(&self, chunk: &SemanticChunk) -> Vec<Issue> {
        let mut issues = Vec::new();

        let min_tokens = match chunk.content_type {
            ContentType::Faq | ContentType::TableRow => self.config.min_tokens_short_types,
            _ => self.config.min_tokens,
        };
        if chunk.token_count < min_tokens {
            issues.push(Issue {
                check: QualityCheck::TooShort,
                value: IssueValue::Count(chunk.token_count),
                action: RepairAction::MergeWithAdjacent,
            });
        }
        if chunk.token_count > self.config.max_tokens {
            issues.push(Issue {
                check: QualityCheck::TooLong,
                value: IssueValue::Count(chunk.token_count),
                action: RepairAction::Resplit,
            });
        }
        if chunk.primary_topic == Topic::Umum && chunk.entities_mentioned.is_empty() {
            issues.push(Issue {
                check: QualityCheck::NoClearTopic,
                value: IssueValue::Text(chunk.primary_topic.to_string()),
                action: RepairAction::ManualReview,
            });
        }
        if chunk.content_type == ContentType::Narrative && chunk.sibling_chunks.is_empty() {
            issues.push(Issue {
                check: QualityCheck::Orphan,
                value: IssueValue::Text("no_siblings".to_string()),
                action: RepairAction::CheckStandalone,
            });
        }

        issues
    }
}

pub fn save_issues(issues: &[ChunkIssues], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(issues).context("Failed to serialize quality issues")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write quality issues: {}", path.display()))?;
    Ok(())
}
