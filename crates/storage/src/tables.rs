// Path: crates/storage/src/tables.rs

//! Table definitions and key encodings (single DB, prefix-encoded keys).
//!
//! Assertion keys are built from ASCII components joined by a 0x1F unit
//! separator, with the big-endian encoded effective-start date as the final
//! fixed-width component. Prefix scans over a logical key therefore see its
//! temporal versions in date order.

use chrono::NaiveDate;
use redb::TableDefinition;
use scopegate_types::assertion::{AssertionKey, AssertionKind, Material};
use scopegate_types::document::DocumentId;
use scopegate_types::error::StoreError;
use scopegate_types::hts::HtsCode;
use scopegate_types::program::ProgramId;

/// Documents by id. Value = bincode `Document`.
pub const DOCUMENTS: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("DOCUMENTS");
/// Content-hash index. Key = sha256_raw, value = document id.
pub const DOC_BY_HASH: TableDefinition<&[u8; 32], &[u8; 16]> = TableDefinition::new("DOC_BY_HASH");
/// Chunks by `(document_id, chunk_index)`. Value = bincode `DocumentChunk`.
pub const CHUNKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("CHUNKS");
/// Temporal assertion rows. Key = logical key ‖ effective-start.
pub const ASSERTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ASSERTIONS");
/// Compiled currently-in-force projection. Key = logical key (no date).
pub const CURRENT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("CURRENT");
/// Review queue entries by uuid.
pub const REVIEW: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("REVIEW");
/// Audit rows. Key = created_at millis (be64) ‖ uuid, so scans are in time
/// order.
pub const AUDIT: TableDefinition<&[u8], &[u8]> = TableDefinition::new("AUDIT");

/// ASCII unit separator between logical key components.
pub const KEY_SEP: u8 = 0x1F;

fn be32(x: u32) -> [u8; 4] {
    x.to_be_bytes()
}

/// Encodes a chunk key: document id then big-endian index.
pub fn k_chunk(doc: DocumentId, index: u32) -> Vec<u8> {
    [doc.0.as_slice(), be32(index).as_slice()].concat()
}

/// Order-preserving date encoding: days-from-CE shifted into u32 space.
pub fn enc_date(date: NaiveDate) -> [u8; 4] {
    let days = chrono::Datelike::num_days_from_ce(&date);
    ((days as i64 + (1i64 << 31)) as u32).to_be_bytes()
}

/// Inverse of [`enc_date`].
pub fn dec_date(bytes: [u8; 4]) -> Result<NaiveDate, StoreError> {
    let days = u32::from_be_bytes(bytes) as i64 - (1i64 << 31);
    NaiveDate::from_num_days_from_ce_opt(days as i32)
        .ok_or_else(|| StoreError::Decode(format!("invalid date key: {} days", days)))
}

/// The logical (undated) key for an assertion group.
pub fn k_logical(
    program: &ProgramId,
    hts: &HtsCode,
    material: Option<Material>,
    kind: AssertionKind,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(48);
    key.extend_from_slice(program.as_str().as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(hts.digits().as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(material.map(|m| m.as_str()).unwrap_or("-").as_bytes());
    key.push(KEY_SEP);
    key.extend_from_slice(kind.as_str().as_bytes());
    key
}

/// The logical key of an [`AssertionKey`].
pub fn k_logical_of(key: &AssertionKey) -> Vec<u8> {
    k_logical(&key.program, &key.hts, key.material, key.kind)
}

/// The full temporal row key: logical key ‖ separator ‖ date.
pub fn k_assertion(key: &AssertionKey, effective_start: NaiveDate) -> Vec<u8> {
    let mut k = k_logical_of(key);
    k.push(KEY_SEP);
    k.extend_from_slice(&enc_date(effective_start));
    k
}

/// The audit row key: timestamp millis then uuid for uniqueness.
pub fn k_audit(created_at_millis: i64, id: uuid::Uuid) -> Vec<u8> {
    let mut k = Vec::with_capacity(24);
    k.extend_from_slice(&(created_at_millis as u64).to_be_bytes());
    k.extend_from_slice(id.as_bytes());
    k
}

/// An inclusive-prefix scan range: `[prefix, prefix ‖ 0xFF)`.
///
/// Key components are ASCII and dates never encode to 0xFF in their first
/// byte, so the bound is safe.
pub fn prefix_range(prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut end = prefix.to_vec();
    end.push(0xFF);
    (prefix.to_vec(), end)
}
