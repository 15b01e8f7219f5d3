mod cli;
mod config;
mod output;
mod pipeline;
mod retrieve;

use anyhow::Result;
use clap::Parser;
use index::{EmbeddingService, OllamaEmbedder};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, RetrieveArgs, RunArgs};
use crate::config::PrepConfig;
use crate::pipeline::RunOptions;
use crate::retrieve::RetrieveQuery;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(err) = run(cli.command).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Run(args) => run_preparation(args).await,
        Commands::Retrieve(args) => run_retrieve(args).await,
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_preparation(args: RunArgs) -> Result<()> {
    let config = PrepConfig::load(&args.config)?;
    let options = RunOptions {
        docs_dir: resolve(&args.base_dir, &config.preparation.docs_dir),
        output_dir: output_dir(&args.base_dir, args.output_dir.as_deref(), &config),
        parallel: args.parallel || config.preparation.parallel,
    };
    tracing::info!(
        docs_dir = %options.docs_dir.display(),
        output_dir = %options.output_dir.display(),
        parallel = options.parallel,
        "Starting preparation"
    );

    let embedder = if args.no_embeddings || !config.embedding.enabled {
        tracing::info!("Embeddings disabled");
        None
    } else {
        connect_embedder(&config)
    };

    pipeline::run(
        &config,
        &options,
        embedder.as_ref().map(|e| e as &dyn EmbeddingService),
    )
    .await?;
    Ok(())
}

async fn run_retrieve(args: RetrieveArgs) -> Result<()> {
    let config = PrepConfig::load(&args.config)?;
    let dir = output_dir(&args.base_dir, args.output_dir.as_deref(), &config);
    let chunks = output::read_chunks(&dir.join(output::CHUNKS_FILE))?;

    let embedder = if config.embedding.enabled {
        connect_embedder(&config)
    } else {
        None
    };
    let query = RetrieveQuery {
        question: &args.question,
        top_k: args.top_k,
        threshold: args.threshold,
        category: args.category.as_deref(),
        batch_size: config.embedding.batch_size,
    };
    let found = retrieve::retrieve(
        &chunks,
        &query,
        embedder.as_ref().map(|e| e as &dyn EmbeddingService),
    )
    .await;

    tracing::info!(results = found.len(), "Retrieved chunks");
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}

fn connect_embedder(config: &PrepConfig) -> Option<OllamaEmbedder> {
    match OllamaEmbedder::new(&config.embedding) {
        Ok(embedder) => Some(embedder),
        Err(err) => {
            tracing::warn!(error = %err, "Embedding service unavailable, continuing without it");
            None
        }
    }
}

fn output_dir(base_dir: &Path, flag: Option<&Path>, config: &PrepConfig) -> PathBuf {
    match flag {
        Some(dir) => dir.to_path_buf(),
        None => resolve(base_dir, &config.preparation.output_dir),
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
