// Path: crates/agents/src/json.rs

//! Robust JSON extraction and canonical transcript hashing.

use sha2::{Digest, Sha256};

/// Extracts the first complete JSON object from a string, ignoring
/// surrounding prose. Handles nested braces and string escaping; models
/// that wrap output in markdown fences or add commentary still parse.
pub fn extract_json(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let tail = raw.get(start..)?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for (offset, c) in tail.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return tail.get(..offset + 1).map(str::to_string);
                }
            }
            _ => {}
        }
    }
    None
}

/// Canonicalizes a JSON transcript (RFC 8785) and hashes it, so stored
/// transcripts have a stable fingerprint independent of key order and
/// whitespace.
pub fn transcript_fingerprint(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let canonical = serde_jcs::to_vec(&value).ok()?;
    Some(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_fenced_output() {
        let raw = "Here is the answer:\n```json\n{\"verified\": true, \"note\": \"a {brace} in text\"}\n```\nDone.";
        let json = extract_json(raw).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["verified"], true);
    }

    #[test]
    fn nested_objects_and_escapes_survive() {
        let raw = r#"prefix {"a": {"b": "quote \" and } brace"}, "c": [1, 2]} suffix"#;
        let json = extract_json(raw).unwrap();
        assert!(json.ends_with("]}"));
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());
    }

    #[test]
    fn no_object_is_none() {
        assert!(extract_json("the chunks do not answer this").is_none());
        assert!(extract_json("{unterminated").is_none());
    }

    #[test]
    fn fingerprint_ignores_key_order_and_whitespace() {
        let a = transcript_fingerprint(r#"{"b": 1, "a": [2, 1]}"#).unwrap();
        let b = transcript_fingerprint(r#"{  "a": [2, 1], "b": 1}"#).unwrap();
        assert_eq!(a, b);
        let c = transcript_fingerprint(r#"{"a": [1, 2], "b": 1}"#).unwrap();
        assert_ne!(a, c);
    }
}
