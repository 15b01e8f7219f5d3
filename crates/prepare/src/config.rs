use anyhow::{Context, Result};
use graph::GraphConfig;
use index::{DedupConfig, EmbeddingConfig};
use ingest::ChunkerConfig;
use quality::QualityConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrepConfig {
    pub preparation: PreparationConfig,
    #[serde(default)]
    pub chunking: ChunkerConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    pub docs_dir: PathBuf,
    pub markdown_files: Vec<String>,
    pub csv_files: Vec<String>,
    pub output_dir: PathBuf,
    pub parallel: bool,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("./new_dokument_rag"),
            markdown_files: Vec::new(),
            csv_files: Vec::new(),
            output_dir: PathBuf::from("data/chunks"),
            parallel: false,
        }
    }
}

impl PrepConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Config file not found: {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}
