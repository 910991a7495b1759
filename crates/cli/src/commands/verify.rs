// Path: crates/cli/src/commands/verify.rs

use crate::engine;
use crate::Outcome;
use clap::Args;
use scopegate_api::resolution::{ResolveRequest, Resolution, ScopeResolver};
use scopegate_types::assertion::Material;
use scopegate_types::error::{ErrorCode, ResolveError};
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// The HTS code to verify, dotted or undotted.
    pub hts: String,

    /// The program to verify against.
    #[clap(long, default_value = "section_232_steel")]
    pub program: String,

    /// Material for Section-232 questions: copper, steel, or aluminum.
    #[clap(long)]
    pub material: Option<String>,

    /// Date the answer should hold on (YYYY-MM-DD); today when omitted.
    #[clap(long)]
    pub as_of: Option<String>,

    /// Skip L1 and re-run L2 against the current corpus.
    #[clap(long)]
    pub force: bool,

    /// Operator id, required with --force (force is rate-limited).
    #[clap(long)]
    pub operator: Option<String>,
}

pub async fn run(db_path: &str, config_path: Option<&str>, args: &VerifyArgs) -> Outcome {
    let hts = match HtsCode::parse(&args.hts) {
        Ok(hts) => hts,
        Err(e) => return Outcome::InvalidInput(e.to_string()),
    };
    let material = match &args.material {
        Some(raw) => match Material::from_str_opt(raw) {
            Some(material) => Some(material),
            None => return Outcome::InvalidInput(format!("unknown material {:?}", raw)),
        },
        None => None,
    };
    let as_of = match &args.as_of {
        Some(raw) => match raw.parse() {
            Ok(date) => Some(date),
            Err(e) => return Outcome::InvalidInput(format!("bad --as-of: {}", e)),
        },
        None => None,
    };

    let engine = match engine::build(db_path, config_path).await {
        Ok(engine) => engine,
        Err(outcome) => return outcome,
    };
    let Some(resolver) = engine.resolver else {
        return Outcome::Operational(
            "no inference runtime configured (set SCOPEGATE_API_URL / SCOPEGATE_API_KEY)".into(),
        );
    };

    let request = ResolveRequest {
        program: ProgramId(args.program.clone()),
        hts,
        material,
        as_of,
        force: args.force,
        operator: args.operator.clone(),
    };

    match resolver.resolve(&request).await {
        Ok(Resolution::Known { assertion, layer }) => {
            println!(
                "{} [{}] {} effective {} (doc {}, quote {:?})",
                assertion.key,
                layer,
                assertion
                    .claim_code
                    .as_ref()
                    .map(|c| c.as_str())
                    .unwrap_or("-"),
                assertion.effective_start,
                assertion.document_id,
                assertion.evidence.quote_text
            );
            Outcome::Success
        }
        Ok(Resolution::Unknown { reason }) => {
            Outcome::ValidationRejected(format!("{} -> {}", request.query_string(), reason))
        }
        Err(e @ ResolveError::Input(_)) => Outcome::InvalidInput(e.to_string()),
        Err(e) => Outcome::Operational(format!("{} ({})", e, e.code())),
    }
}
