// Path: crates/index/src/lexical.rs

//! Tokenization and the IDF-weighted lexical score.
//!
//! Tokens are lowercased alphanumeric runs. Runs of digits and dots (HTS
//! codes in either spelling) additionally emit their digits-only form, so
//! `8544.42.9090` and `8544429090` land on the same token and the two
//! spellings are equivalent search terms.

use ahash::{AHashMap, AHashSet};

/// Tokenizes text for lexical scoring.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut digit_run = String::new();
    let mut digit_run_has_dot = false;

    let flush_word = |word: &mut String, tokens: &mut Vec<String>| {
        if !word.is_empty() {
            tokens.push(std::mem::take(word));
        }
    };
    let flush_digits =
        |run: &mut String, has_dot: &mut bool, tokens: &mut Vec<String>| {
            if run.is_empty() {
                return;
            }
            let digits: String = run.chars().filter(|c| c.is_ascii_digit()).collect();
            // Dotted runs also emit the joined digits so both spellings match.
            if *has_dot && digits.len() >= 4 {
                tokens.push(digits);
            }
            for part in run.split('.') {
                if !part.is_empty() {
                    tokens.push(part.to_string());
                }
            }
            run.clear();
            *has_dot = false;
        };

    for c in text.chars() {
        if c.is_ascii_digit() {
            flush_word(&mut word, &mut tokens);
            digit_run.push(c);
        } else if c == '.' && !digit_run.is_empty() {
            digit_run.push(c);
            digit_run_has_dot = true;
        } else if c.is_alphanumeric() {
            flush_digits(&mut digit_run, &mut digit_run_has_dot, &mut tokens);
            for lc in c.to_lowercase() {
                word.push(lc);
            }
        } else {
            flush_digits(&mut digit_run, &mut digit_run_has_dot, &mut tokens);
            flush_word(&mut word, &mut tokens);
        }
    }
    flush_digits(&mut digit_run, &mut digit_run_has_dot, &mut tokens);
    flush_word(&mut word, &mut tokens);
    tokens
}

/// Document-frequency table over the indexed chunks, maintained by the
/// index writer on every upsert.
#[derive(Debug, Default)]
pub struct DocFrequencies {
    df: AHashMap<String, u64>,
    chunk_count: u64,
}

impl DocFrequencies {
    /// Registers a chunk's unique tokens.
    pub fn add_chunk(&mut self, tokens: &AHashSet<String>) {
        self.chunk_count += 1;
        for t in tokens {
            *self.df.entry(t.clone()).or_insert(0) += 1;
        }
    }

    /// Unregisters a replaced chunk's unique tokens.
    pub fn remove_chunk(&mut self, tokens: &AHashSet<String>) {
        self.chunk_count = self.chunk_count.saturating_sub(1);
        for t in tokens {
            if let Some(count) = self.df.get_mut(t) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.df.remove(t);
                }
            }
        }
    }

    /// Inverse document frequency of one token.
    pub fn idf(&self, token: &str) -> f32 {
        let df = self.df.get(token).copied().unwrap_or(0);
        ((1.0 + self.chunk_count as f32) / (1.0 + df as f32)).ln() + 1.0
    }

    /// IDF-weighted overlap of unique query tokens against a chunk's token
    /// set, squashed into [0, 1).
    pub fn overlap_score(
        &self,
        query_tokens: &AHashSet<String>,
        chunk_tokens: &AHashSet<String>,
    ) -> f32 {
        let raw: f32 = query_tokens
            .iter()
            .filter(|t| chunk_tokens.contains(*t))
            .map(|t| self.idf(t))
            .sum();
        raw / (1.0 + raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: Vec<String>) -> AHashSet<String> {
        tokens.into_iter().collect()
    }

    #[test]
    fn dotted_and_undotted_hts_share_a_token() {
        let dotted = set(tokenize("subheading 8544.42.9090, HTSUS"));
        let undotted = set(tokenize("subheading 8544429090 HTSUS"));
        assert!(dotted.contains("8544429090"));
        assert!(undotted.contains("8544429090"));
        assert!(dotted.contains("subheading"));
        assert!(dotted.contains("htsus"));
    }

    #[test]
    fn rare_token_outweighs_common_one() {
        let mut df = DocFrequencies::default();
        let common = set(tokenize("steel articles"));
        for _ in 0..9 {
            df.add_chunk(&common);
        }
        let rare = set(tokenize("steel derivative 9403994045 articles"));
        df.add_chunk(&rare);

        let q_rare = set(tokenize("9403994045"));
        let q_common = set(tokenize("steel"));
        assert!(df.overlap_score(&q_rare, &rare) > df.overlap_score(&q_common, &rare));
    }

    #[test]
    fn remove_chunk_rolls_back_frequencies() {
        let mut df = DocFrequencies::default();
        let tokens = set(tokenize("copper cathode"));
        df.add_chunk(&tokens);
        let before = df.idf("copper");
        df.remove_chunk(&tokens);
        df.add_chunk(&tokens);
        assert_eq!(df.idf("copper"), before);
    }

    #[test]
    fn no_overlap_scores_zero() {
        let df = DocFrequencies::default();
        assert_eq!(
            df.overlap_score(&set(tokenize("aluminum")), &set(tokenize("copper"))),
            0.0
        );
    }
}
