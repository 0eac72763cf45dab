//! Vector-store capability for curriculum-context retrieval.
//!
//! Retrieval is an injected capability: the workflow asks for the `top_k`
//! documents most relevant to a query and receives ranked
//! [`VectorRetrievalResult`]s. Any failure here degrades to "no context
//! available" and never touches the circuit breaker.
//!
//! [`SimulatedVectorStore`] is a deterministic in-memory implementation used
//! by the demo binary and tests; real deployments inject their own store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VectorStoreError;

/// One ranked document from a vector query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRetrievalResult {
    pub document_id: String,
    /// Relevance in [0, 1].
    pub relevance_score: f64,
    /// Label of the corpus the document came from.
    pub source: String,
}

/// Capability for retrieving curriculum context.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Retrieve up to `top_k` documents relevant to `query`, ranked by
    /// descending relevance. `threshold` is advisory; implementations may
    /// return results below it and the caller counts how many clear it.
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        threshold: f64,
    ) -> Result<Vec<VectorRetrievalResult>, VectorStoreError>;
}

/// A document in the simulated corpus.
#[derive(Debug, Clone)]
struct CorpusEntry {
    document_id: String,
    keywords: Vec<String>,
    source: String,
    base_relevance: f64,
}

/// Deterministic in-memory vector store.
///
/// Scores documents by keyword overlap with the query, scaled by a per-entry
/// base relevance. Deterministic so test fixtures stay stable.
#[derive(Debug, Default)]
pub struct SimulatedVectorStore {
    corpus: Vec<CorpusEntry>,
}

impl SimulatedVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small corpus of elementary/middle-school math snippets, enough for
    /// the demo binary to produce plausible retrieval metrics.
    pub fn with_default_corpus() -> Self {
        let mut store = Self::new();
        let entries = [
            ("curr-frac-001", "fractions equivalent denominator", "curriculum", 0.95),
            ("curr-frac-002", "fractions comparing ordering", "curriculum", 0.88),
            ("curr-add-001", "addition carrying multi-digit", "curriculum", 0.92),
            ("curr-mul-001", "multiplication arrays groups", "curriculum", 0.90),
            ("curr-geo-001", "geometry angles triangles", "curriculum", 0.91),
            ("curr-alg-001", "algebra equations variables", "curriculum", 0.93),
            ("bank-frac-010", "fractions word problem pizza", "question-bank", 0.82),
            ("bank-add-011", "addition word problem shopping", "question-bank", 0.78),
            ("bank-geo-012", "geometry perimeter rectangle", "question-bank", 0.75),
            ("bank-alg-013", "algebra balance scale", "question-bank", 0.72),
        ];
        for (id, keywords, source, relevance) in entries {
            store.add_document(id, keywords.split(' '), source, relevance);
        }
        store
    }

    /// Add a document with its keyword set.
    pub fn add_document<'a>(
        &mut self,
        document_id: &str,
        keywords: impl IntoIterator<Item = &'a str>,
        source: &str,
        base_relevance: f64,
    ) {
        self.corpus.push(CorpusEntry {
            document_id: document_id.to_string(),
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            source: source.to_string(),
            base_relevance: base_relevance.clamp(0.0, 1.0),
        });
    }

    fn score(&self, entry: &CorpusEntry, query_terms: &[String]) -> f64 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let matched = query_terms
            .iter()
            .filter(|term| entry.keywords.iter().any(|kw| kw.contains(term.as_str())))
            .count();
        let overlap = matched as f64 / query_terms.len() as f64;
        (overlap * entry.base_relevance).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl VectorStore for SimulatedVectorStore {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        _threshold: f64,
    ) -> Result<Vec<VectorRetrievalResult>, VectorStoreError> {
        let query_terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|t| t.to_string())
            .collect();

        let mut results: Vec<VectorRetrievalResult> = self
            .corpus
            .iter()
            .map(|entry| VectorRetrievalResult {
                document_id: entry.document_id.clone(),
                relevance_score: self.score(entry, &query_terms),
                source: entry.source.clone(),
            })
            .filter(|r| r.relevance_score > 0.0)
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }
}
