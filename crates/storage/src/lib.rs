// Path: crates/storage/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! Pure-Rust persistent storage (redb) for the ScopeGate stores.
//!
//! One `redb` database file carries every table: documents and chunks, the
//! temporally-versioned assertion rows plus their compiled "current"
//! projection, the review queue, and the audit log. A single
//! [`ScopeDb`] handle implements all four store traits; multi-table
//! commits (the supersession close-and-insert, with its audit row) are one
//! write transaction, so partial states are never observable.

pub mod audit_log;
pub mod document_store;
pub mod review_queue;
pub mod tables;
pub mod truth_store;

use redb::Database;
use scopegate_types::error::StoreError;
use std::path::Path;
use std::sync::Arc;

/// The shared handle over the single ScopeGate database.
#[derive(Clone)]
pub struct ScopeDb {
    pub(crate) db: Arc<Database>,
}

impl ScopeDb {
    /// Opens (or creates) the database file and ensures every table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Backend(e.to_string()))?;

        // Ensure tables exist so first readers never race table creation.
        {
            let w = db
                .begin_write()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            {
                w.open_table(tables::DOCUMENTS)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::DOC_BY_HASH)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::CHUNKS)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::ASSERTIONS)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::CURRENT)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::REVIEW)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                w.open_table(tables::AUDIT)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
            w.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}
