// Path: crates/cli/src/commands/seed.rs

use crate::Outcome;
use clap::Args;
use scopegate_stacking::seed_catalog;
use scopegate_types::program::ProgramId;

#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Program id to emit, or `all` for the full catalogue.
    pub program: String,

    /// Output path; stdout when omitted.
    #[clap(long)]
    pub out: Option<String>,
}

pub async fn run(args: &SeedArgs) -> Outcome {
    let catalog = seed_catalog();

    let payload = if args.program == "all" {
        match serde_json::to_string_pretty(&catalog) {
            Ok(json) => json,
            Err(e) => return Outcome::Operational(format!("serialize catalogue: {}", e)),
        }
    } else {
        let id = ProgramId(args.program.clone());
        let Some(program) = catalog.get(&id) else {
            return Outcome::InvalidInput(format!("unknown program {:?}", args.program));
        };
        match serde_json::to_string_pretty(program) {
            Ok(json) => json,
            Err(e) => return Outcome::Operational(format!("serialize program: {}", e)),
        }
    };

    match &args.out {
        Some(path) => {
            if let Err(e) = std::fs::write(path, payload) {
                return Outcome::Operational(format!("write {}: {}", path, e));
            }
            println!("wrote {}", path);
        }
        None => println!("{}", payload),
    }
    Outcome::Success
}
