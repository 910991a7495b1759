// Path: crates/types/src/codec.rs

//! The canonical binary codec for persisted rows.
//!
//! All redb values are encoded with `bincode` through these two helpers so
//! every store uses the exact same representation. Decoding fails fast with
//! a descriptive error; a malformed row is a `StoreError::Decode`, never a
//! partially-populated struct.

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a row value into its canonical byte representation.
pub fn to_row<T: Serialize>(v: &T) -> Result<Vec<u8>, StoreError> {
    bincode::serialize(v).map_err(|e| StoreError::Backend(format!("row encode failed: {}", e)))
}

/// Decodes a row value from its canonical byte representation.
pub fn from_row<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Decode(format!("row decode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
    struct TestRow {
        id: u32,
        name: String,
        tags: Vec<u8>,
    }

    #[test]
    fn row_codec_round_trips() {
        let row = TestRow {
            id: 7,
            name: "csms-65936570".into(),
            tags: vec![1, 2, 3],
        };
        let bytes = to_row(&row).unwrap();
        let back: TestRow = from_row(&bytes).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn truncated_row_is_a_decode_error() {
        let bytes = to_row(&TestRow {
            id: 7,
            name: "x".into(),
            tags: vec![],
        })
        .unwrap();
        let err = from_row::<TestRow>(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
