// Path: crates/cli/src/commands/ingest.rs

use crate::engine;
use crate::Outcome;
use clap::Args;
use scopegate_api::connector::TrustedConnector;
use scopegate_types::document::SourceKind;
use scopegate_types::error::ConnectorError;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Source-specific locator: a URL, CSMS number, or FR citation.
    pub locator: String,

    /// Source kind: federal_register, csms_bulletin, or usitc_hts.
    #[clap(long, default_value = "csms_bulletin")]
    pub source: String,
}

pub async fn run(db_path: &str, config_path: Option<&str>, args: &IngestArgs) -> Outcome {
    let Some(kind) = SourceKind::from_str_opt(&args.source) else {
        return Outcome::InvalidInput(format!("unknown source kind {:?}", args.source));
    };
    let engine = match engine::build(db_path, config_path).await {
        Ok(engine) => engine,
        Err(outcome) => return outcome,
    };
    let Some(connector) = engine
        .connectors
        .iter()
        .find(|c| c.source_kind() == kind)
    else {
        return Outcome::Operational(format!("no connector for {}", kind));
    };

    let document = match connector.fetch(&args.locator).await {
        Ok(document) => document,
        Err(e @ (ConnectorError::UnsupportedLocator(_) | ConnectorError::UntrustedHost(_))) => {
            return Outcome::InvalidInput(e.to_string());
        }
        Err(e) => return Outcome::Operational(e.to_string()),
    };

    match engine.ingest.ingest(document, None).await {
        Ok(report) => {
            println!(
                "{} document {} ({} chunks indexed)",
                if report.newly_inserted {
                    "ingested"
                } else {
                    "already present:"
                },
                report.document_id,
                report.chunks_indexed
            );
            Outcome::Success
        }
        Err(e) => Outcome::Operational(e.to_string()),
    }
}
