use crate::config::PrepConfig;
use crate::output::{RunMetadata, RunOutputs};
use anyhow::Result;
use graph::{ChunkGraph, RelationType};
use index::{EmbeddingService, SemanticDeduplicator};
use ingest::{
    DocumentProfiler, FileReader, SemanticChunker, SourceDocument, SourceKind, chunk_documents,
};
use quality::QualityGates;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Resolved locations and switches for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub docs_dir: PathBuf,
    pub output_dir: PathBuf,
    pub parallel: bool,
}

/// Chunk, enrich, deduplicate, link, validate and persist the configured
/// documents. Without an embedding service (or when it fails) deduplication
/// and semantic relations are skipped and the structural run still completes.
pub async fn run(
    config: &PrepConfig,
    options: &RunOptions,
    embedder: Option<&dyn EmbeddingService>,
) -> Result<RunMetadata> {
    let started = Instant::now();

    let paths = input_paths(config, &options.docs_dir)?;
    let docs = load_documents(&paths).await;
    let names_of = |kind: SourceKind| -> Vec<String> {
        docs.iter()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.clone())
            .collect()
    };
    let docs_processed = names_of(SourceKind::Markdown);
    let csv_processed = names_of(SourceKind::Csv);

    let chunker = SemanticChunker::new(config.chunking.clone());
    let profiler = DocumentProfiler::default();
    let run = chunk_documents(&docs, &chunker, &profiler, options.parallel);
    tracing::info!(
        documents = docs.len(),
        chunks = run.chunks.len(),
        entities = run.extractor.len(),
        parallel = options.parallel,
        "Chunking finished"
    );

    let mut chunks = run.chunks;
    let mut duplicates = Vec::new();
    let mut semantic_service: Option<&dyn EmbeddingService> = None;

    if let Some(service) = embedder {
        let dedup = SemanticDeduplicator::new(service, config.dedup.clone());
        match dedup
            .compute_embeddings(chunks.clone(), config.embedding.batch_size)
            .await
        {
            Ok(embedded) => {
                semantic_service = Some(service);
                let (unique, removed) = dedup.deduplicate(embedded);
                chunks = unique;
                duplicates = removed;
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "Embedding failed; skipping deduplication and semantic relations"
                );
            }
        }
    }

    let mut graph = ChunkGraph::new(config.graph.clone());
    graph.build_graph(&chunks);
    let chunks = graph.layout().apply(chunks);
    if let Some(service) = semantic_service {
        graph.build_semantic_relations(&chunks, service);
    }

    let gates = QualityGates::new(config.quality.clone());
    let (valid, issues) = gates.validate_chunks(chunks);
    let pruned = graph.retain_chunks(&valid);
    if pruned > 0 {
        tracing::debug!(pruned, "Dropped relations to rejected chunks");
    }

    let semantic_relations = graph
        .relations()
        .iter()
        .filter(|r| r.relation_type == RelationType::SemanticSimilarity)
        .count();
    let metadata = RunMetadata {
        created_at: chrono::Utc::now().to_rfc3339(),
        docs_processed,
        csv_processed,
        total_chunks: valid.len(),
        total_entities: run.extractor.len(),
        total_relations: graph.relations().len(),
        basic_relations: graph.relations().len() - semantic_relations,
        semantic_relations,
        semantic_duplicates_removed: duplicates.len(),
        quality_issues: issues.len(),
        embeddings_enabled: semantic_service.is_some(),
        duration_seconds: started.elapsed().as_secs_f64(),
    };

    RunOutputs {
        chunks: &valid,
        extractor: &run.extractor,
        graph: &graph,
        duplicates: &duplicates,
        issues: &issues,
        metadata: &metadata,
    }
    .write(&options.output_dir)?;

    tracing::info!(
        chunks = metadata.total_chunks,
        entities = metadata.total_entities,
        relations = metadata.total_relations,
        semantic = metadata.semantic_relations,
        duplicates = metadata.semantic_duplicates_removed,
        issues = metadata.quality_issues,
        duration_secs = metadata.duration_seconds,
        "Preparation complete"
    );
    Ok(metadata)
}

/// Markdown paths first, then CSV paths. Empty lists mean every supported
/// file directly under `docs_dir`.
fn input_paths(config: &PrepConfig, docs_dir: &Path) -> Result<Vec<PathBuf>> {
    let prep = &config.preparation;
    if prep.markdown_files.is_empty() && prep.csv_files.is_empty() {
        let (markdown, csv) = FileReader::discover(docs_dir)?;
        tracing::info!(
            dir = %docs_dir.display(),
            markdown = markdown.len(),
            csv = csv.len(),
            "Discovered input files"
        );
        return Ok(markdown.into_iter().chain(csv).collect());
    }

    Ok(prep
        .markdown_files
        .iter()
        .chain(&prep.csv_files)
        .map(|name| docs_dir.join(name))
        .collect())
}

async fn load_documents(paths: &[PathBuf]) -> Vec<SourceDocument> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Input file not found, skipping");
            continue;
        }
        match SourceDocument::load(path).await {
            Ok(doc) => docs.push(doc),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "Failed to load, skipping"),
        }
    }
    docs
}
