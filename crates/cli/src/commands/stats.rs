// Path: crates/cli/src/commands/stats.rs

use crate::Outcome;
use chrono::{Duration, Utc};
use clap::Args;
use scopegate_api::store::ReviewQueue;
use scopegate_services::stats;
use scopegate_storage::ScopeDb;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Window size, hours back from now.
    #[clap(long, default_value_t = 24)]
    pub hours: i64,

    /// Also list pending review entries.
    #[clap(long)]
    pub reviews: bool,
}

pub async fn run(db_path: &str, args: &StatsArgs) -> Outcome {
    if args.hours <= 0 {
        return Outcome::InvalidInput("--hours must be positive".into());
    }
    let db = match ScopeDb::open(db_path) {
        Ok(db) => Arc::new(db),
        Err(e) => return Outcome::Operational(format!("open db: {}", e)),
    };

    let to = Utc::now();
    let from = to - Duration::hours(args.hours);
    let summary = match stats::collect(db.clone(), db.clone(), from, to).await {
        Ok(summary) => summary,
        Err(e) => return Outcome::Operational(e.to_string()),
    };

    println!("window: last {}h", args.hours);
    println!("resolutions: {}", summary.total);
    println!(
        "  l1 hits: {} ({}.{:02}% cache hit)",
        summary.l1_hits,
        summary.cache_hit_rate_bps / 100,
        summary.cache_hit_rate_bps % 100
    );
    println!("  l2 promotions: {}", summary.l2_promotions);
    println!("  l3 promotions: {}", summary.l3_promotions);
    println!("  unknown: {}", summary.unknowns);
    println!("  errors: {}", summary.errors);
    println!(
        "tokens: {} in / {} out, est cost {}.{:06} USD",
        summary.tokens_in,
        summary.tokens_out,
        summary.cost_micro_usd / 1_000_000,
        summary.cost_micro_usd % 1_000_000
    );
    println!(
        "reviews: {} pending, {} validator failures",
        summary.pending_reviews, summary.validator_failures
    );

    if args.reviews {
        let pending = match db.list(true).await {
            Ok(pending) => pending,
            Err(e) => return Outcome::Operational(e.to_string()),
        };
        for entry in pending {
            let codes: Vec<&str> = entry.reasons.iter().map(|r| r.code()).collect();
            println!("  {} {} [{}]", entry.id, entry.key, codes.join(","));
        }
    }

    Outcome::Success
}
