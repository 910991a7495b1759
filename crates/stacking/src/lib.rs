// Path: crates/stacking/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing
    )
)]

//! # ScopeGate Stacking Engine
//!
//! The end consumer of verified assertions: given a line item and its
//! material value breakdown, plan entry slices, build each slice's
//! chapter-99 stack in filing sequence, and compute duties. All money is
//! integer cents; rates are four-decimal fixed point applied by integer
//! multiplication. Floats never touch the duty path.

/// The seeded program catalogue.
pub mod catalog;
/// The stacking engine itself.
pub mod engine;
/// Entry-slice planning.
pub mod planner;
/// Input and result types for the public stacking API.
pub mod types;

pub use catalog::seed_catalog;
pub use engine::StackingEngine;
pub use types::{EntrySlice, FilingLine, ProgramDuty, StackingInput, StackingResult};
