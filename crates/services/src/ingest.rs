// Path: crates/services/src/ingest.rs

//! The ingest pipeline: a fetched document becomes stored, indexed chunks.
//!
//! Chunking is deterministic, storage is idempotent by content hash, and
//! index writes are upserts by chunk uid, so ingesting the same bytes twice
//! changes nothing. Embeddings are best-effort: a chunk whose embedding
//! call fails is indexed lexical-only rather than dropped.

use scopegate_api::index::{ChunkMeta, CorpusIndex};
use scopegate_api::inference::InferenceRuntime;
use scopegate_api::store::{DocumentStore, IngestOutcome};
use scopegate_index::chunk_text;
use scopegate_telemetry::pipeline_metrics;
use scopegate_types::document::{Document, DocumentId};
use scopegate_types::error::ResolveError;
use scopegate_types::program::ProgramId;
use std::sync::Arc;
use std::time::Duration;

/// Deadline for one chunk-embedding call when none is configured.
const DEFAULT_EMBED_DEADLINE: Duration = Duration::from_secs(60);

/// What one ingest did.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// The stored document id.
    pub document_id: DocumentId,
    /// Whether this ingest inserted the document (false = already present).
    pub newly_inserted: bool,
    /// Chunks written to the index.
    pub chunks_indexed: usize,
}

/// The fetch-to-index pipeline.
pub struct IngestPipeline {
    documents: Arc<dyn DocumentStore>,
    index: Arc<dyn CorpusIndex>,
    /// Embedding source; `None` runs the corpus lexical-only.
    inference: Option<Arc<dyn InferenceRuntime>>,
    embed_deadline: Duration,
}

impl IngestPipeline {
    /// Builds the pipeline.
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        index: Arc<dyn CorpusIndex>,
        inference: Option<Arc<dyn InferenceRuntime>>,
    ) -> Self {
        Self {
            documents,
            index,
            inference,
            embed_deadline: DEFAULT_EMBED_DEADLINE,
        }
    }

    /// Overrides the per-chunk embedding deadline (the configured per-call
    /// agent deadline, normally).
    pub fn with_embed_deadline(mut self, deadline: Duration) -> Self {
        self.embed_deadline = deadline;
        self
    }

    /// Stores and indexes one fetched document.
    pub async fn ingest(
        &self,
        document: Document,
        program_hint: Option<ProgramId>,
    ) -> Result<IngestReport, ResolveError> {
        let chunks = chunk_text(document.id, &document.text);
        let source_kind = document.source_kind;
        let tier = document.tier;
        let published_at = document.published_at;
        let effective_start = document.effective_start;
        let document_id = document.id;

        let outcome = self.documents.put_if_new(document, chunks.clone()).await?;
        let newly_inserted = matches!(outcome, IngestOutcome::Inserted(_));
        if newly_inserted {
            pipeline_metrics().inc_documents_ingested(source_kind.as_str());
        }

        // Index refresh runs even for already-present documents: the index
        // is a derived view and may be behind the store (fresh process,
        // lost index, changed embedding runtime).
        let mut indexed = 0usize;
        for chunk in &chunks {
            let embedding = match &self.inference {
                Some(runtime) => match runtime.embed_text(&chunk.text, self.embed_deadline).await {
                    Ok(vector) => Some(vector),
                    Err(e) => {
                        tracing::warn!(
                            chunk = %chunk.uid(),
                            error = %e,
                            "embedding failed; indexing chunk lexical-only"
                        );
                        None
                    }
                },
                None => None,
            };
            let meta = ChunkMeta {
                tier,
                source_kind,
                document_id,
                chunk_index: chunk.chunk_index,
                published_at,
                effective_start,
                program_hint: program_hint.clone(),
            };
            self.index.upsert_chunk(meta, &chunk.text, embedding).await?;
            indexed += 1;
        }
        pipeline_metrics().inc_chunks_indexed(indexed as u64);

        tracing::info!(
            document_id = %document_id,
            newly_inserted,
            chunks = indexed,
            "document ingested"
        );
        Ok(IngestReport {
            document_id,
            newly_inserted,
            chunks_indexed: indexed,
        })
    }
}
