// Path: crates/cli/src/engine.rs

//! Shared engine wiring for the CLI commands: open the database, rebuild
//! the corpus index from the store, and construct the pipeline.

use crate::Outcome;
use scopegate_agents::{DiscoveryAgent, ReaderAgent, ValidatorAgent};
use scopegate_api::connector::TrustedConnector;
use scopegate_api::index::{ChunkMeta, CorpusIndex};
use scopegate_api::inference::{HttpInferenceRuntime, InferenceRuntime};
use scopegate_api::store::DocumentStore;
use scopegate_connectors::{CsmsConnector, FederalRegisterConnector, UsitcHtsConnector};
use scopegate_index::HybridIndex;
use scopegate_services::{
    DiscoveryOrchestrator, IngestPipeline, ResolutionOrchestrator, WriteGate,
};
use scopegate_storage::ScopeDb;
use scopegate_types::config::EngineConfig;
use scopegate_types::document::Tier;
use std::sync::Arc;
use std::time::Duration;

pub struct Engine {
    pub db: Arc<ScopeDb>,
    pub index: Arc<HybridIndex>,
    pub ingest: Arc<IngestPipeline>,
    pub resolver: Option<ResolutionOrchestrator>,
    pub connectors: Vec<Arc<dyn TrustedConnector>>,
}

/// Loads config from the optional TOML path, validated.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Outcome> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| Outcome::Operational(format!("read {}: {}", path, e)))?;
            toml::from_str(&raw)
                .map_err(|e| Outcome::InvalidInput(format!("parse {}: {}", path, e)))?
        }
        None => EngineConfig::default(),
    };
    config
        .validate()
        .map_err(|e| Outcome::InvalidInput(e.to_string()))?;
    Ok(config)
}

/// Builds the inference runtime from the environment, when configured.
/// `SCOPEGATE_API_URL` + `SCOPEGATE_API_KEY` select an OpenAI-compatible
/// endpoint; without them the agents cannot run (ingest still can).
fn runtime_from_env() -> Option<Arc<dyn InferenceRuntime>> {
    let url = std::env::var("SCOPEGATE_API_URL").ok()?;
    let key = std::env::var("SCOPEGATE_API_KEY").unwrap_or_default();
    match HttpInferenceRuntime::new(url, key) {
        Ok(runtime) => Some(Arc::new(runtime)),
        Err(e) => {
            tracing::error!(error = %e, "failed to build inference runtime");
            None
        }
    }
}

/// Opens the database and wires the pipeline.
pub async fn build(db_path: &str, config_path: Option<&str>) -> Result<Engine, Outcome> {
    let config = load_config(config_path)?;
    let db = Arc::new(
        ScopeDb::open(db_path).map_err(|e| Outcome::Operational(format!("open db: {}", e)))?,
    );
    let index = Arc::new(HybridIndex::new(config.retrieval.alpha_ten_thousandths));
    let runtime = runtime_from_env();

    // The index is a derived view; rebuild it from the store on startup.
    rebuild_index(&db, index.as_ref()).await?;

    let ingest = Arc::new(
        IngestPipeline::new(db.clone(), index.clone(), runtime.clone())
            .with_embed_deadline(Duration::from_secs(config.agents.call_deadline_secs)),
    );

    let mut connectors: Vec<Arc<dyn TrustedConnector>> = Vec::new();
    match CsmsConnector::new(&config.connectors, Tier::A) {
        Ok(connector) => connectors.push(Arc::new(connector)),
        Err(e) => tracing::warn!(error = %e, "csms connector unavailable"),
    }
    match FederalRegisterConnector::new(&config.connectors, Tier::A) {
        Ok(connector) => connectors.push(Arc::new(connector)),
        Err(e) => tracing::warn!(error = %e, "federal register connector unavailable"),
    }
    match UsitcHtsConnector::new(&config.connectors, Tier::A) {
        Ok(connector) => connectors.push(Arc::new(connector)),
        Err(e) => tracing::warn!(error = %e, "usitc connector unavailable"),
    }

    let resolver = runtime.map(|runtime| {
        let discovery = Arc::new(DiscoveryOrchestrator::new(
            DiscoveryAgent::new(runtime.clone(), config.agents.clone()),
            connectors.clone(),
            ingest.clone(),
            config.discovery.clone(),
        ));
        let gate = WriteGate::new(
            db.clone(),
            db.clone(),
            db.clone(),
            config.retrieval.hts_window_chars,
        );
        ResolutionOrchestrator::new(
            db.clone(),
            index.clone(),
            runtime.clone(),
            ReaderAgent::new(runtime.clone(), config.agents.clone()),
            ValidatorAgent::new(runtime.clone(), config.agents.clone()),
            gate,
            Some(discovery),
            db.clone(),
            db.clone(),
            config.clone(),
        )
    });

    Ok(Engine {
        db,
        index,
        ingest,
        resolver,
        connectors,
    })
}

/// Re-indexes every stored document's chunks (lexical-only; embeddings are
/// repopulated on the next embedded ingest).
async fn rebuild_index(db: &Arc<ScopeDb>, index: &HybridIndex) -> Result<(), Outcome> {
    let documents = db
        .all_documents()
        .map_err(|e| Outcome::Operational(format!("list documents: {}", e)))?;
    for document in documents {
        let chunks = db
            .chunks(document.id)
            .await
            .map_err(|e| Outcome::Operational(format!("load chunks: {}", e)))?;
        for chunk in chunks {
            let meta = ChunkMeta {
                tier: document.tier,
                source_kind: document.source_kind,
                document_id: document.id,
                chunk_index: chunk.chunk_index,
                published_at: document.published_at,
                effective_start: document.effective_start,
                program_hint: None,
            };
            index
                .upsert_chunk(meta, &chunk.text, None)
                .await
                .map_err(|e| Outcome::Operational(format!("index chunk: {}", e)))?;
        }
    }
    Ok(())
}
