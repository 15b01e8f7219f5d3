use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Markdown,
    Csv,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") => Some(SourceKind::Markdown),
            Some("csv") => Some(SourceKind::Csv),
            _ => None,
        }
    }
}

pub struct FileReader;

impl FileReader {
    /// Read a Markdown or CSV file with line endings normalised to `\n`.
    pub async fn read_file(path: &Path) -> Result<String> {
        if SourceKind::from_path(path).is_none() {
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            anyhow::bail!("Unsupported file format: {}", extension);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        Ok(content.replace("\r\n", "\n"))
    }

    /// Markdown and CSV files directly under `dir`, each list sorted by name.
    pub fn discover(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut markdown = Vec::new();
        let mut csv = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to list directory: {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            match SourceKind::from_path(&path) {
                Some(SourceKind::Markdown) => markdown.push(path),
                Some(SourceKind::Csv) => csv.push(path),
                _ => {}
            }
        }

        Ok((markdown, csv))
    }
}
