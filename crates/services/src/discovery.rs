// Path: crates/services/src/discovery.rs

//! The discovery orchestrator: when the corpus has no coverage, ask the
//! discovery agent for candidate Tier-A sources, dispatch each to the one
//! connector matching its kind, and ingest what survives.
//!
//! Discovery is capped per query and per hour, and carries its own
//! deadline. A deadline that fires mid-run keeps every fully-ingested
//! document (they are valuable independent of the triggering query) and
//! simply stops fetching more.

use crate::ingest::IngestPipeline;
use scopegate_agents::DiscoveryAgent;
use scopegate_api::connector::TrustedConnector;
use scopegate_telemetry::pipeline_metrics;
use scopegate_types::audit::UsageRecord;
use scopegate_types::config::DiscoveryConfig;
use scopegate_types::document::SourceKind;
use scopegate_types::error::{ConnectorError, ResolveError};
use scopegate_types::program::ProgramId;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// What one discovery run accomplished.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    /// Documents newly ingested into the corpus.
    pub ingested: usize,
    /// Whether the hourly cap suppressed the run entirely.
    pub capped: bool,
    /// Token and cost accounting for the discovery agent call.
    pub usage: UsageRecord,
}

struct HourWindow {
    window_start: Instant,
    runs: u32,
}

/// The discovery orchestrator.
pub struct DiscoveryOrchestrator {
    agent: DiscoveryAgent,
    connectors: Vec<Arc<dyn TrustedConnector>>,
    ingest: Arc<IngestPipeline>,
    config: DiscoveryConfig,
    window: Mutex<HourWindow>,
}

impl DiscoveryOrchestrator {
    /// Builds the orchestrator over the configured connectors.
    pub fn new(
        agent: DiscoveryAgent,
        connectors: Vec<Arc<dyn TrustedConnector>>,
        ingest: Arc<IngestPipeline>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            agent,
            connectors,
            ingest,
            config,
            window: Mutex::new(HourWindow {
                window_start: Instant::now(),
                runs: 0,
            }),
        }
    }

    fn try_take_run(&self) -> bool {
        let Ok(mut window) = self.window.lock() else {
            return false;
        };
        if window.window_start.elapsed() >= Duration::from_secs(3_600) {
            window.window_start = Instant::now();
            window.runs = 0;
        }
        if window.runs >= self.config.per_hour_cap {
            return false;
        }
        window.runs += 1;
        true
    }

    fn connector_for(&self, kind: SourceKind) -> Option<&Arc<dyn TrustedConnector>> {
        self.connectors.iter().find(|c| c.source_kind() == kind)
    }

    /// Runs discovery for one unserved query.
    pub async fn run(
        &self,
        query: &str,
        program_hint: Option<ProgramId>,
    ) -> Result<DiscoveryOutcome, ResolveError> {
        if !self.try_take_run() {
            tracing::warn!(query, "discovery suppressed by hourly cap");
            return Ok(DiscoveryOutcome {
                capped: true,
                ..DiscoveryOutcome::default()
            });
        }

        let deadline = Instant::now() + Duration::from_secs(self.config.deadline_secs);
        let run = self.agent.discover(query).await?;
        let mut outcome = DiscoveryOutcome {
            usage: run.usage,
            ..DiscoveryOutcome::default()
        };

        for candidate in run.candidates.into_iter().take(self.config.per_query_cap) {
            if Instant::now() >= deadline {
                tracing::warn!(query, "discovery deadline reached; keeping what was ingested");
                break;
            }
            // The agent layer already dropped unknown kinds; dispatch is by
            // exact kind to exactly one connector.
            let Some(kind) = SourceKind::from_str_opt(&candidate.source_kind) else {
                continue;
            };
            let Some(connector) = self.connector_for(kind) else {
                tracing::warn!(kind = %kind, "no connector configured for source kind");
                continue;
            };

            let document = match connector.fetch(&candidate.locator).await {
                Ok(document) => document,
                Err(ConnectorError::UntrustedHost(host)) => {
                    // Discard silently (nothing is promoted), log the warning.
                    tracing::warn!(%host, locator = %candidate.locator, "untrusted host; candidate discarded");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, locator = %candidate.locator, "candidate fetch failed");
                    continue;
                }
            };

            match self.ingest.ingest(document, program_hint.clone()).await {
                Ok(report) if report.newly_inserted => outcome.ingested += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "candidate ingest failed"),
            }
        }

        pipeline_metrics().inc_discovery_run(outcome.ingested > 0);
        Ok(outcome)
    }
}
