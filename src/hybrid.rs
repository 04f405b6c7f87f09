//! Hybrid lexical + dense search (C10): a BM25 index over arbitrary items,
//! with an optional async `Embedder` capability fused in for semantic
//! ranking. Backs `search.symbols` and `search.references`.

use crate::semantic;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;

const BM25_K1: f32 = 1.5;
const BM25_B: f32 = 0.75;
const DEFAULT_WEIGHT_BM25: f32 = 0.4;
const DEFAULT_WEIGHT_SEMANTIC: f32 = 0.6;
const EMBEDDING_DIM: usize = 384;

/// An opaque dense-embedding capability. Never implemented in-process; the
/// reference deployment leaves this unset and runs BM25-only.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Bm25Hit<T: Clone> {
    pub item: T,
    pub bm25_score: f32,
    pub matched_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridHit<T: Clone> {
    pub item: T,
    pub bm25_score: f32,
    pub semantic_score: f32,
    pub score: f32,
    pub matched_terms: Vec<String>,
}

struct Doc {
    term_freq: HashMap<String, u32>,
    length: u32,
    text: String,
}

/// BM25 index plus lazily-computed embeddings over a fixed item set.
pub struct HybridIndex<T: Clone + Send + Sync> {
    items: Vec<T>,
    docs: Vec<Doc>,
    df: HashMap<String, u32>,
    avg_doc_len: f32,
    embeddings: RwLock<Vec<Option<Vec<f32>>>>,
    embedder: Option<Box<dyn Embedder>>,
    weight_bm25: f32,
    weight_semantic: f32,
}

impl<T: Clone + Send + Sync> HybridIndex<T> {
    /// Build a BM25 index over `items`, using `searchable_text` to derive
    /// each item's indexed text.
    #[must_use]
    pub fn new(items: Vec<T>, searchable_text: impl Fn(&T) -> String) -> Self {
        let mut docs = Vec::with_capacity(items.len());
        let mut df: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0u32;

        for item in &items {
            let text = searchable_text(item);
            let tokens = semantic::tokenize(&text);
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            for t in &tokens {
                *term_freq.entry(t.clone()).or_insert(0) += 1;
            }
            for term in term_freq.keys() {
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += tokens.len() as u32;
            docs.push(Doc {
                term_freq,
                length: tokens.len() as u32,
                text,
            });
        }

        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };
        let embeddings_len = items.len();

        Self {
            items,
            docs,
            df,
            avg_doc_len,
            embeddings: RwLock::new(vec![None; embeddings_len]),
            embedder: None,
            weight_bm25: DEFAULT_WEIGHT_BM25,
            weight_semantic: DEFAULT_WEIGHT_SEMANTIC,
        }
    }

    #[must_use]
    pub fn with_embedder(mut self, embedder: Box<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn with_weights(mut self, bm25: f32, semantic: f32) -> Self {
        self.weight_bm25 = bm25;
        self.weight_semantic = semantic;
        self
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = *self.df.get(term).unwrap_or(&0) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    fn bm25_score(&self, doc_idx: usize, query_terms: &[String]) -> (f32, Vec<String>) {
        let doc = &self.docs[doc_idx];
        let mut score = 0.0;
        let mut matched = Vec::new();
        for term in query_terms {
            let Some(&tf) = doc.term_freq.get(term) else {
                continue;
            };
            matched.push(term.clone());
            let tf = tf as f32;
            let idf = self.idf(term);
            let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (doc.length as f32 / self.avg_doc_len.max(1.0)));
            score += idf * (tf * (BM25_K1 + 1.0)) / denom.max(f32::EPSILON);
        }
        (score, matched)
    }

    /// Synchronous BM25-only search. Empty query returns no hits.
    #[must_use]
    pub fn search_bm25_only(&self, query: &str) -> Vec<Bm25Hit<T>> {
        let terms = semantic::tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<Bm25Hit<T>> = (0..self.items.len())
            .filter_map(|idx| {
                let (score, matched) = self.bm25_score(idx, &terms);
                if score > 0.0 {
                    Some(Bm25Hit {
                        item: self.items[idx].clone(),
                        bm25_score: score,
                        matched_terms: matched,
                    })
                } else {
                    None
                }
            })
            .collect();
        hits.sort_by(|a, b| b.bm25_score.partial_cmp(&a.bm25_score).unwrap());
        hits
    }

    /// Idempotent: repeated calls skip items that already have an embedding.
    pub async fn precompute_embeddings(&self) {
        let Some(embedder) = &self.embedder else {
            return;
        };
        for idx in 0..self.items.len() {
            let already = self.embeddings.read().unwrap()[idx].is_some();
            if already {
                continue;
            }
            let vector = embedder.embed(&self.docs[idx].text).await;
            self.embeddings.write().unwrap()[idx] = Some(vector);
        }
    }

    /// Fused BM25 + semantic search. Falls back to BM25-only scoring (with
    /// `semantic_score = 0`) for any item with no precomputed embedding.
    pub async fn search(&self, query: &str) -> Vec<HybridHit<T>> {
        let terms = semantic::tokenize(query);
        let bm25_scores: Vec<(f32, Vec<String>)> = (0..self.items.len())
            .map(|idx| self.bm25_score(idx, &terms))
            .collect();
        let max_bm25 = bm25_scores
            .iter()
            .map(|(s, _)| *s)
            .fold(0.0f32, f32::max)
            .max(f32::EPSILON);

        let query_vec = match &self.embedder {
            Some(embedder) => Some(embedder.embed(query).await),
            None => None,
        };

        let mut hits = Vec::with_capacity(self.items.len());
        for (idx, item) in self.items.iter().enumerate() {
            let (bm25_raw, matched) = &bm25_scores[idx];
            let normalized_bm25 = bm25_raw / max_bm25;

            let semantic_score = match (&query_vec, self.embeddings.read().unwrap()[idx].as_ref()) {
                (Some(q), Some(v)) => cosine(q, v),
                _ => 0.0,
            };

            let score = self.weight_bm25 * normalized_bm25 + self.weight_semantic * semantic_score;
            hits.push(HybridHit {
                item: item.clone(),
                bm25_score: *bm25_raw,
                semantic_score,
                score,
                matched_terms: matched.clone(),
            });
        }
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Reference embedding dimension, documented for implementers of `Embedder`.
#[must_use]
pub const fn embedding_dim() -> usize {
    EMBEDDING_DIM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        name: String,
        text: String,
    }

    fn sample_index() -> HybridIndex<Item> {
        let items = vec![
            Item {
                name: "parse_rust".into(),
                text: "fn parse_rust source grammar tree sitter".into(),
            },
            Item {
                name: "quick_scan".into(),
                text: "fn quick_scan regex fallback language".into(),
            },
            Item {
                name: "unrelated".into(),
                text: "completely different subject matter".into(),
            },
        ];
        HybridIndex::new(items, |i| i.text.clone())
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let index = sample_index();
        assert!(index.search_bm25_only("").is_empty());
    }

    #[test]
    fn bm25_ranks_matching_item_first() {
        let index = sample_index();
        let hits = index.search_bm25_only("grammar tree sitter");
        assert_eq!(hits[0].item.name, "parse_rust");
    }

    #[tokio::test]
    async fn hybrid_search_without_embedder_behaves_like_bm25() {
        let index = sample_index();
        let hits = index.search("regex fallback").await;
        assert_eq!(hits[0].item.name, "quick_scan");
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Vec<f32> {
            vec![text.len() as f32, 1.0]
        }
    }

    #[tokio::test]
    async fn precompute_embeddings_is_idempotent() {
        let index = sample_index().with_embedder(Box::new(StubEmbedder));
        index.precompute_embeddings().await;
        let first: Vec<_> = index.embeddings.read().unwrap().clone();
        index.precompute_embeddings().await;
        let second: Vec<_> = index.embeddings.read().unwrap().clone();
        assert_eq!(first.len(), second.len());
    }
}
