// Path: crates/types/src/country.rs

//! Country canonicalization through a configured alias table.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A canonical ISO-2 country code, uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Builds a country code from a two-letter string. Case-insensitive.
    pub fn new(raw: &str) -> Result<Self, InputError> {
        let bytes = raw.as_bytes();
        if bytes.len() != 2 || !bytes.iter().all(|b| b.is_ascii_alphabetic()) {
            return Err(InputError::UnknownCountry(raw.to_string()));
        }
        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
        ]))
    }

    /// The two-letter uppercase code.
    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII by construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CountryCode {
    type Error = InputError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.as_str().to_string()
    }
}

/// Resolves country names, aliases, ISO-2 and ISO-3 strings to ISO-2 codes.
///
/// The table ships with the origins the tariff programs reference and is
/// extensible from configuration. Lookups are case- and whitespace-
/// insensitive. Unknown inputs fail with `InputError::UnknownCountry`.
#[derive(Debug, Clone)]
pub struct CountryNormalizer {
    aliases: HashMap<String, CountryCode>,
}

impl CountryNormalizer {
    /// Builds the normalizer with the built-in alias table.
    pub fn new() -> Self {
        let mut n = Self {
            aliases: HashMap::new(),
        };
        for (iso2, iso3, names) in BUILTIN_ALIASES {
            // ISO-2 rows are validated at construction; the table is static.
            if let Ok(code) = CountryCode::new(iso2) {
                n.insert_alias(iso2, code);
                n.insert_alias(iso3, code);
                for name in *names {
                    n.insert_alias(name, code);
                }
            }
        }
        n
    }

    /// Adds one alias to the table, canonicalizing the key.
    pub fn insert_alias(&mut self, alias: &str, code: CountryCode) {
        self.aliases.insert(Self::key(alias), code);
    }

    /// Resolves an input string to an ISO-2 code.
    pub fn resolve(&self, raw: &str) -> Result<CountryCode, InputError> {
        self.aliases
            .get(&Self::key(raw))
            .copied()
            .ok_or_else(|| InputError::UnknownCountry(raw.to_string()))
    }

    fn key(raw: &str) -> String {
        raw.trim().to_ascii_lowercase()
    }
}

impl Default for CountryNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// (ISO-2, ISO-3, other accepted spellings).
const BUILTIN_ALIASES: &[(&str, &str, &[&str])] = &[
    ("CN", "CHN", &["china", "people's republic of china", "prc"]),
    ("US", "USA", &["united states", "united states of america"]),
    ("MX", "MEX", &["mexico"]),
    ("CA", "CAN", &["canada"]),
    ("VN", "VNM", &["vietnam", "viet nam"]),
    ("JP", "JPN", &["japan"]),
    ("KR", "KOR", &["south korea", "korea, republic of", "republic of korea"]),
    ("DE", "DEU", &["germany"]),
    ("IN", "IND", &["india"]),
    ("TW", "TWN", &["taiwan", "chinese taipei"]),
    ("TH", "THA", &["thailand"]),
    ("MY", "MYS", &["malaysia"]),
    ("GB", "GBR", &["united kingdom", "great britain", "uk"]),
    ("IT", "ITA", &["italy"]),
    ("FR", "FRA", &["france"]),
    ("BR", "BRA", &["brazil"]),
    ("TR", "TUR", &["turkey", "turkiye", "türkiye"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_iso2_and_iso3() {
        let n = CountryNormalizer::new();
        let cn = CountryCode::new("CN").unwrap();
        assert_eq!(n.resolve("CN").unwrap(), cn);
        assert_eq!(n.resolve("chn").unwrap(), cn);
        assert_eq!(n.resolve("China").unwrap(), cn);
        assert_eq!(n.resolve("  people's republic of china ").unwrap(), cn);
    }

    #[test]
    fn unknown_country_is_an_input_error() {
        let n = CountryNormalizer::new();
        assert!(matches!(
            n.resolve("atlantis"),
            Err(InputError::UnknownCountry(_))
        ));
    }

    #[test]
    fn configured_alias_wins() {
        let mut n = CountryNormalizer::new();
        let mx = CountryCode::new("MX").unwrap();
        n.insert_alias("estados unidos mexicanos", mx);
        assert_eq!(n.resolve("Estados Unidos Mexicanos").unwrap(), mx);
    }
}
