use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "prepare",
    version,
    about = "Chunk admissions documents into a retrieval-ready corpus"
)]
pub struct Cli {
    /// Emit logs as JSON lines instead of human-readable text.
    #[arg(long, global = true, default_value_t = false)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, enrich, deduplicate, link and validate the configured documents.
    Run(RunArgs),
    /// Look up the chunks closest to a question in a prepared corpus.
    Retrieve(RetrieveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "config/config.yaml")]
    pub config: PathBuf,

    /// Directory that relative `docs_dir` and `output_dir` are resolved against.
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_embeddings: bool,

    #[arg(long, default_value_t = false)]
    pub parallel: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RetrieveArgs {
    #[arg(long, default_value = "config/config.yaml")]
    pub config: PathBuf,

    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub question: String,

    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[arg(long, default_value_t = 0.3)]
    pub threshold: f32,

    /// Chunk-id category used when no embedding service is reachable.
    #[arg(long)]
    pub category: Option<String>,
}
