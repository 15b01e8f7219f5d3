pub mod chunk;
pub mod chunker;
pub mod enrich;
pub mod profile;
pub mod reader;
pub mod strategies;
pub mod text;

pub use chunk::{ChunkMetadata, ContentType, Position, QuestionType, SemanticChunk, Topic};
pub use chunker::{ChunkerConfig, ChunkingContext, SemanticChunker};
pub use profile::{DocType, DocumentProfile, DocumentProfiler};
pub use reader::{FileReader, SourceKind};

use anyhow::Result;
use extract::EntityExtractor;
use rayon::prelude::*;
use std::path::Path;

/// A loaded input file, named by its file name.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub kind: SourceKind,
    pub content: String,
}

impl SourceDocument {
    pub async fn load(path: &Path) -> Result<Self> {
        let kind = SourceKind::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Unsupported file: {}", path.display()))?;
        let content = FileReader::read_file(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self {
            name,
            kind,
            content,
        })
    }
}

/// Output of chunking a batch of documents.
#[derive(Debug, Default)]
pub struct ChunkingRun {
    pub chunks: Vec<SemanticChunk>,
    pub profiles: Vec<DocumentProfile>,
    pub extractor: EntityExtractor,
}

/// Chunk every document in order.
///
/// With `parallel` each document is chunked on the rayon pool with its own
/// [`ChunkingContext`]; the per-document results are then merged in input order,
/// renumbering chunk ids and folding entity registries so the output matches a
/// sequential run.
pub fn chunk_documents(
    docs: &[SourceDocument],
    chunker: &SemanticChunker,
    profiler: &DocumentProfiler,
    parallel: bool,
) -> ChunkingRun {
    if !parallel {
        let mut ctx = ChunkingContext::new();
        let mut run = ChunkingRun::default();
        for doc in docs {
            let (chunks, profile) = chunk_one(doc, chunker, profiler, &mut ctx);
            run.chunks.extend(chunks);
            run.profiles.extend(profile);
        }
        run.extractor = ctx.extractor;
        return run;
    }

    let partials: Vec<_> = docs
        .par_iter()
        .map(|doc| {
            let mut ctx = ChunkingContext::new();
            let (chunks, profile) = chunk_one(doc, chunker, profiler, &mut ctx);
            (chunks, profile, ctx.extractor)
        })
        .collect();

    let mut merged = ChunkingContext::new();
    let mut run = ChunkingRun::default();
    for (chunks, profile, extractor) in partials {
        merged.extractor.merge(extractor);
        run.chunks.extend(chunks.into_iter().map(|chunk| {
            let id = merged.next_id(chunk.category());
            SemanticChunk { id, ..chunk }
        }));
        run.profiles.extend(profile);
    }
    run.extractor = merged.extractor;
    run
}

fn chunk_one(
    doc: &SourceDocument,
    chunker: &SemanticChunker,
    profiler: &DocumentProfiler,
    ctx: &mut ChunkingContext,
) -> (Vec<SemanticChunk>, Option<DocumentProfile>) {
    match doc.kind {
        SourceKind::Markdown => {
            let profile = profiler.profile(&doc.content, &doc.name);
            let chunks = chunker.chunk_document(ctx, &doc.content, &doc.name, &profile);
            tracing::info!(
                file = %doc.name,
                doc_type = ?profile.doc_type,
                tables = profile.table_count,
                chunks = chunks.len(),
                "Chunked document"
            );
            (chunks, Some(profile))
        }
        SourceKind::Csv => {
            let chunks = chunker.chunk_csv(ctx, &doc.content, &doc.name);
            tracing::info!(file = %doc.name, chunks = chunks.len(), "Chunked CSV rows");
            (chunks, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<SourceDocument> {
        let md = |name: &str, content: &str| SourceDocument {
            name: name.to_string(),
            kind: SourceKind::Markdown,
            content: content.to_string(),
        };
        vec![
            md(
                "biaya.md",
                "Q: Berapa biaya S1 reguler? A: Rp 250.000 untuk gelombang 2 di Prodi Manajemen.\n\n\
                 ### Cicilan\nPembayaran SPP dapat dicicil dua kali per semester untuk Prodi Manajemen.",
            ),
            md(
                "profil_kampus.md",
                "### Sejarah\nKampus didirikan di Wonosobo dan kini memiliki Prodi Manajemen serta Akuntansi.",
            ),
            SourceDocument {
                name: "jadwal.csv".to_string(),
                kind: SourceKind::Csv,
                content: "Gelombang,Tanggal\nGelombang 1,01/02/2025\nGelombang 2,01/05/2025".to_string(),
            },
        ]
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let chunker = SemanticChunker::new(ChunkerConfig::default());
        let profiler = DocumentProfiler::default();
        let docs = docs();

        let sequential = chunk_documents(&docs, &chunker, &profiler, false);
        let parallel = chunk_documents(&docs, &chunker, &profiler, true);

        let to_json = |run: &ChunkingRun| {
            (
                serde_json::to_string(&run.chunks).unwrap(),
                serde_json::to_string(run.extractor.get_all_entities()).unwrap(),
            )
        };
        assert_eq!(to_json(&sequential), to_json(&parallel));
        assert_eq!(sequential.profiles.len(), 2);

        let ids: Vec<_> = parallel.chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"biaya_0001"));
        assert!(ids.last().unwrap().starts_with("jadwal_"));
    }

    #[tokio::test]
    async fn test_load_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alur_pendaftaran.md");
        std::fs::write(&path, "isi").unwrap();

        let doc = SourceDocument::load(&path).await.unwrap();
        assert_eq!(doc.name, "alur_pendaftaran.md");
        assert_eq!(doc.kind, SourceKind::Markdown);
    }
}
