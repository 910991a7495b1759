// Path: crates/index/src/hybrid.rs

//! The in-memory hybrid index.
//!
//! The ingestion pipeline is the only writer and upserts by chunk uid, so
//! re-ingesting a document is idempotent. The index is rebuilt from the
//! document store at startup; it is a derived view, never the source of
//! truth.

use crate::lexical::{tokenize, DocFrequencies};
use crate::metric::{cosine_similarity, Vector};
use ahash::AHashSet;
use async_trait::async_trait;
use scopegate_api::index::{ChunkMeta, CorpusIndex, IndexedChunk, RetrievalQuery};
use scopegate_types::document::{ChunkUid, Tier};
use scopegate_types::error::IndexError;
use scopegate_types::EMBEDDING_DIM;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;

struct StoredChunk {
    meta: ChunkMeta,
    text: String,
    tokens: AHashSet<String>,
    embedding: Option<Vector>,
}

#[derive(Default)]
struct Inner {
    chunks: BTreeMap<ChunkUid, StoredChunk>,
    frequencies: DocFrequencies,
}

/// The hybrid dense + lexical retriever.
pub struct HybridIndex {
    inner: RwLock<Inner>,
    /// Dense weight of the convex combination.
    alpha: f32,
    dimension: usize,
    generation: AtomicU64,
}

impl HybridIndex {
    /// Builds an index with the dense weight expressed in ten-thousandths
    /// (mirroring the engine config) and the standard embedding dimension.
    pub fn new(alpha_ten_thousandths: u32) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            alpha: (alpha_ten_thousandths.min(10_000) as f32) / 10_000.0,
            dimension: EMBEDDING_DIM,
            generation: AtomicU64::new(0),
        }
    }

    /// Overrides the expected embedding dimension. Test corpora use small
    /// vectors.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    fn lock_err() -> IndexError {
        IndexError::Backend("index lock poisoned".into())
    }
}

#[async_trait]
impl CorpusIndex for HybridIndex {
    async fn upsert_chunk(
        &self,
        meta: ChunkMeta,
        text: &str,
        embedding: Option<Vec<f32>>,
    ) -> Result<(), IndexError> {
        let embedding = match embedding {
            Some(v) if v.len() != self.dimension => {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    got: v.len(),
                });
            }
            Some(v) => Some(Vector(v)),
            None => None,
        };

        let tokens: AHashSet<String> = tokenize(text).into_iter().collect();
        let uid = meta.uid();

        let mut inner = self.inner.write().map_err(|_| Self::lock_err())?;
        if let Some(old) = inner.chunks.remove(&uid) {
            inner.frequencies.remove_chunk(&old.tokens);
        }
        inner.frequencies.add_chunk(&tokens);
        inner.chunks.insert(
            uid,
            StoredChunk {
                meta,
                text: text.to_string(),
                tokens,
                embedding,
            },
        );
        drop(inner);

        self.generation.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<IndexedChunk>, IndexError> {
        let query_tokens: AHashSet<String> = tokenize(&query.text).into_iter().collect();
        let query_embedding = match &query.embedding {
            Some(v) if v.len() != self.dimension => {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    got: v.len(),
                });
            }
            Some(v) => Some(Vector(v.clone())),
            None => None,
        };

        // Both spellings of the 8-digit stem cover the dotted and undotted
        // 10-digit forms by prefix.
        let hts_terms: Option<[String; 2]> = query.filter.hts.as_ref().map(|hts| {
            let stem = hts.prefix(8);
            let dotted = format!(
                "{}.{}.{}",
                stem.get(..4).unwrap_or(stem),
                stem.get(4..6).unwrap_or(""),
                stem.get(6..8).unwrap_or("")
            );
            [stem.to_string(), dotted]
        });

        let inner = self.inner.read().map_err(|_| Self::lock_err())?;
        let mut scored: Vec<IndexedChunk> = Vec::new();
        for stored in inner.chunks.values() {
            // Hard filters first; none of these are ranking signals.
            if stored.meta.tier != Tier::A {
                continue;
            }
            if let Some(want) = &query.filter.program_hint {
                // Chunks without a hint always pass; a present hint must match.
                if stored
                    .meta
                    .program_hint
                    .as_ref()
                    .is_some_and(|have| have != want)
                {
                    continue;
                }
            }
            if let Some(terms) = &hts_terms {
                if !terms.iter().any(|t| stored.text.contains(t.as_str())) {
                    continue;
                }
            }

            let lexical = inner
                .frequencies
                .overlap_score(&query_tokens, &stored.tokens);
            let dense = match (&query_embedding, &stored.embedding) {
                (Some(q), Some(c)) => cosine_similarity(q, c).max(0.0),
                _ => 0.0,
            };
            let score = self.alpha * dense + (1.0 - self.alpha) * lexical;
            if score <= 0.0 {
                continue;
            }
            scored.push(IndexedChunk {
                meta: stored.meta.clone(),
                text: stored.text.clone(),
                score,
                lexical_score: lexical,
            });
        }
        drop(inner);

        // Deterministic order: score, newer effective_start, larger lexical
        // score, stable chunk uid.
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.meta.effective_start.cmp(&a.meta.effective_start))
                .then_with(|| b.lexical_score.total_cmp(&a.lexical_score))
                .then_with(|| a.meta.uid().cmp(&b.meta.uid()))
        });
        scored.truncate(query.k);
        Ok(scored)
    }

    async fn generation(&self) -> u64 {
        self.generation.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use scopegate_api::index::RetrievalFilter;
    use scopegate_types::document::{DocumentId, SourceKind};
    use scopegate_types::hts::HtsCode;
    use scopegate_types::program::ProgramId;

    fn meta(doc: u8, chunk: u32, tier: Tier, effective: NaiveDate) -> ChunkMeta {
        ChunkMeta {
            tier,
            source_kind: SourceKind::FederalRegister,
            document_id: DocumentId([doc; 16]),
            chunk_index: chunk,
            published_at: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
            effective_start: effective,
            program_hint: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn query(text: &str, hts: Option<&str>, k: usize) -> RetrievalQuery {
        RetrievalQuery {
            text: text.into(),
            embedding: None,
            filter: RetrievalFilter {
                program_hint: None,
                hts: hts.map(|h| HtsCode::parse(h).unwrap()),
            },
            k,
        }
    }

    #[tokio::test]
    async fn tier_filter_is_hard() {
        let index = HybridIndex::new(6_500).with_dimension(3);
        index
            .upsert_chunk(
                meta(1, 0, Tier::A, date(2025, 6, 1)),
                "copper derivative articles under 8544.42.9090 are covered",
                None,
            )
            .await
            .unwrap();
        index
            .upsert_chunk(
                meta(2, 0, Tier::B, date(2025, 7, 1)),
                "copper derivative articles under 8544.42.9090 are covered",
                None,
            )
            .await
            .unwrap();

        let hits = index
            .retrieve(&query("copper 8544.42.9090", None, 8))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].meta.tier, Tier::A);
    }

    #[tokio::test]
    async fn hts_filter_accepts_both_spellings() {
        let index = HybridIndex::new(6_500).with_dimension(3);
        index
            .upsert_chunk(
                meta(1, 0, Tier::A, date(2025, 6, 1)),
                "subheading 8544429090 of the HTSUS",
                None,
            )
            .await
            .unwrap();
        index
            .upsert_chunk(
                meta(2, 0, Tier::A, date(2025, 6, 1)),
                "subheading 8544.42.9090 of the HTSUS",
                None,
            )
            .await
            .unwrap();
        index
            .upsert_chunk(
                meta(3, 0, Tier::A, date(2025, 6, 1)),
                "subheading 9403.99.9045 of the HTSUS",
                None,
            )
            .await
            .unwrap();

        let hits = index
            .retrieve(&query("subheading", Some("8544.42.9090"), 8))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn newer_effective_start_breaks_ties() {
        let index = HybridIndex::new(0).with_dimension(3);
        let text = "steel derivative articles are covered by the proclamation";
        index
            .upsert_chunk(meta(1, 0, Tier::A, date(2025, 3, 12)), text, None)
            .await
            .unwrap();
        index
            .upsert_chunk(meta(2, 0, Tier::A, date(2025, 6, 4)), text, None)
            .await
            .unwrap();

        let hits = index.retrieve(&query("steel derivative", None, 8)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].meta.effective_start, date(2025, 6, 4));
    }

    #[tokio::test]
    async fn retrieval_is_deterministic_and_truncates_to_k() {
        let index = HybridIndex::new(6_500).with_dimension(3);
        for doc in 0..10u8 {
            index
                .upsert_chunk(
                    meta(doc, 0, Tier::A, date(2025, 6, 1)),
                    &format!("aluminum smelt and cast notice number {doc}"),
                    Some(vec![1.0, doc as f32 / 10.0, 0.0]),
                )
                .await
                .unwrap();
        }
        let mut q = query("aluminum smelt", None, 4);
        q.embedding = Some(vec![1.0, 0.9, 0.0]);

        let first = index.retrieve(&q).await.unwrap();
        let second = index.retrieve(&q).await.unwrap();
        assert_eq!(first.len(), 4);
        let ids: Vec<_> = first.iter().map(|c| c.meta.uid()).collect();
        let ids2: Vec<_> = second.iter().map(|c| c.meta.uid()).collect();
        assert_eq!(ids, ids2);
    }

    #[tokio::test]
    async fn upsert_replaces_and_bumps_generation() {
        let index = HybridIndex::new(6_500).with_dimension(3);
        let m = meta(1, 0, Tier::A, date(2025, 6, 1));
        index.upsert_chunk(m.clone(), "old text", None).await.unwrap();
        let g1 = index.generation().await;
        index.upsert_chunk(m, "new copper text", None).await.unwrap();
        let g2 = index.generation().await;
        assert!(g2 > g1);

        let hits = index.retrieve(&query("copper", None, 8)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "new copper text");
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let index = HybridIndex::new(6_500).with_dimension(3);
        let err = index
            .upsert_chunk(
                meta(1, 0, Tier::A, date(2025, 6, 1)),
                "text",
                Some(vec![0.1; 5]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { expected: 3, got: 5 }));
    }
}
