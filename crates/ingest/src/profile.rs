use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#\s").unwrap());
static H2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^##\s").unwrap());
static H3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^###\s").unwrap());
static H4: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^####\s").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]").unwrap());

const TABLE_SEPARATOR: &str = "|---|";
const DENSE_CHARS: usize = 500;
const SPARSE_CHARS: usize = 100;
const MAX_LISTED_SECTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Faq,
    Table,
    Procedure,
    Mixed,
    Narrative,
}

/// Raw structural counts a document type is decided from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCounts {
    pub headings: [usize; 4],
    pub table_rows: usize,
    pub bullets: usize,
    pub has_faq_markers: bool,
}

impl StructureCounts {
    pub fn from_content(content: &str) -> Self {
        Self {
            headings: [
                H1.find_iter(content).count(),
                H2.find_iter(content).count(),
                H3.find_iter(content).count(),
                H4.find_iter(content).count(),
            ],
            table_rows: content.matches(TABLE_SEPARATOR).count(),
            bullets: BULLET.find_iter(content).count(),
            has_faq_markers: content.contains('?') && content.contains("A:"),
        }
    }
}

/// Thresholds for [`classify`]; the first matching rule wins.
#[derive(Debug, Clone, Copy)]
pub struct ProfileThresholds {
    pub table_rows: usize,
    pub bullets: usize,
    pub h3_headings: usize,
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            table_rows: 3,
            bullets: 20,
            h3_headings: 10,
        }
    }
}

pub fn classify(counts: &StructureCounts, thresholds: &ProfileThresholds) -> DocType {
    if counts.has_faq_markers {
        DocType::Faq
    } else if counts.table_rows > thresholds.table_rows {
        DocType::Table
    } else if counts.bullets > thresholds.bullets {
        DocType::Procedure
    } else if counts.headings[2] > thresholds.h3_headings {
        DocType::Mixed
    } else {
        DocType::Narrative
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub filename: String,
    pub doc_type: DocType,
    pub hierarchy_levels: usize,
    pub section_count: usize,
    pub table_count: usize,
    pub list_count: usize,
    pub dense_sections: Vec<String>,
    pub sparse_sections: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DocumentProfiler {
    thresholds: ProfileThresholds,
}

impl DocumentProfiler {
    pub fn new(thresholds: ProfileThresholds) -> Self {
        Self { thresholds }
    }

    pub fn profile(&self, content: &str, filename: &str) -> DocumentProfile {
        let counts = StructureCounts::from_content(content);
        let sections = split_level2_sections(content);

        let dense_sections = sections
            .iter()
            .filter(|(_, body)| body.chars().count() > DENSE_CHARS)
            .map(|(title, _)| title.clone())
            .take(MAX_LISTED_SECTIONS)
            .collect();
        let sparse_sections = sections
            .iter()
            .filter(|(_, body)| body.chars().count() < SPARSE_CHARS)
            .map(|(title, _)| title.clone())
            .take(MAX_LISTED_SECTIONS)
            .collect();

        DocumentProfile {
            filename: filename.to_string(),
            doc_type: classify(&counts, &self.thresholds),
            hierarchy_levels: counts.headings.iter().filter(|&&c| c > 0).count(),
            section_count: counts.headings[1] + counts.headings[2],
            table_count: counts.table_rows,
            list_count: counts.bullets,
            dense_sections,
            sparse_sections,
        }
    }
}

/// Split on `## ` headings; text before the first heading is titled `Intro`.
fn split_level2_sections(content: &str) -> Vec<(String, String)> {
    let mut sections = Vec::new();
    let mut title = "Intro".to_string();
    let mut body: Vec<&str> = Vec::new();

    for line in content.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if !body.is_empty() {
                sections.push((title, body.join("\n")));
            }
            title = heading.trim().to_string();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faq_wins_first() {
        let content = "Q: Apa itu PMB?\nA: Penerimaan mahasiswa baru.\n|---|---|\n|---|\n|---|\n|---|";
        let profile = DocumentProfiler::default().profile(content, "faq.md");
        assert_eq!(profile.doc_type, DocType::Faq);
    }

    #[test]
    fn test_classify_thresholds() {
        let thresholds = ProfileThresholds::default();
        let mut counts = StructureCounts {
            table_rows: 4,
            ..Default::default()
        };
        assert_eq!(classify(&counts, &thresholds), DocType::Table);

        counts.table_rows = 3;
        counts.bullets = 21;
        assert_eq!(classify(&counts, &thresholds), DocType::Procedure);

        counts.bullets = 20;
        counts.headings[2] = 11;
        assert_eq!(classify(&counts, &thresholds), DocType::Mixed);

        counts.headings[2] = 10;
        assert_eq!(classify(&counts, &thresholds), DocType::Narrative);
    }

    #[test]
    fn test_unstructured_text_is_narrative() {
        let profile = DocumentProfiler::default().profile("Sekadar teks biasa.", "x.md");
        assert_eq!(profile.doc_type, DocType::Narrative);
        assert_eq!(profile.hierarchy_levels, 0);
        assert_eq!(profile.sparse_sections, vec!["Intro".to_string()]);
    }

    #[test]
    fn test_heading_levels_and_density() {
        let long_body = "isi ".repeat(200);
        let content = format!("# Judul\n\n## Panjang\n{long_body}\n## Pendek\nsingkat\n### Sub\nx");
        let profile = DocumentProfiler::default().profile(&content, "doc.md");

        assert_eq!(profile.hierarchy_levels, 3);
        assert_eq!(profile.section_count, 3);
        assert_eq!(profile.dense_sections, vec!["Panjang".to_string()]);
        assert!(profile.sparse_sections.contains(&"Pendek".to_string()));
    }
}
