//! Reduction of a batch of generated questions into summary metadata.
//!
//! [`aggregate`] is pure and deterministic. Mean-based aggregates are
//! order-independent in value, but summation happens in list order so test
//! fixtures reproduce exactly. [`AggregateCache`] adds an optional
//! single-entry memo for repeated identical inputs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::question::{round3, GeneratedQuestion};

/// Counts of scores per bucket. Buckets are closed-open:
/// high >= 0.8, 0.6 <= medium < 0.8, low < 0.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ScoreDistribution {
    fn add(&mut self, score: f64) {
        if score >= 0.8 {
            self.high += 1;
        } else if score >= 0.6 {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

/// Aggregate metadata over one batch of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchMetadata {
    /// Mean quality score, 0 for an empty batch.
    pub average_quality_score: f64,
    /// Mean relevance over questions that carry one; absent when none do.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_relevance_score: Option<f64>,
    /// Mean generation time in ms, 0 for an empty batch.
    pub average_generation_time_ms: f64,
    /// Question count per service tag.
    pub service_distribution: BTreeMap<String, usize>,
    pub quality_distribution: ScoreDistribution,
    pub relevance_distribution: ScoreDistribution,
    /// Max of per-question top relevance scores; absent when no question
    /// carries vector context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_relevance_score: Option<f64>,
    /// Deduplicated union of context sources, sorted for stability.
    pub context_sources: Vec<String>,
}

impl BatchMetadata {
    /// The all-zero/absent aggregate for an empty batch.
    pub fn empty() -> Self {
        Self {
            average_quality_score: 0.0,
            average_relevance_score: None,
            average_generation_time_ms: 0.0,
            service_distribution: BTreeMap::new(),
            quality_distribution: ScoreDistribution::default(),
            relevance_distribution: ScoreDistribution::default(),
            top_relevance_score: None,
            context_sources: Vec::new(),
        }
    }
}

/// Reduce a batch of questions into aggregate metadata.
pub fn aggregate(questions: &[GeneratedQuestion]) -> BatchMetadata {
    if questions.is_empty() {
        return BatchMetadata::empty();
    }

    let mut quality_sum = 0.0_f64;
    let mut time_sum = 0.0_f64;
    let mut relevance_sum = 0.0_f64;
    let mut relevance_count = 0_usize;
    let mut top_relevance: Option<f64> = None;
    let mut service_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut quality_distribution = ScoreDistribution::default();
    let mut relevance_distribution = ScoreDistribution::default();
    let mut sources: Vec<String> = Vec::new();

    // Sum in list order; mean values are order-independent regardless.
    for question in questions {
        let meta = &question.metadata;

        quality_sum += meta.quality_score;
        time_sum += meta.generation_time_ms as f64;
        quality_distribution.add(meta.quality_score);

        *service_distribution
            .entry(meta.service_used.clone())
            .or_insert(0) += 1;

        if let Some(relevance) = meta.relevance_score {
            relevance_sum += relevance;
            relevance_count += 1;
            relevance_distribution.add(relevance);
        }

        if let Some(ctx) = &meta.vector_context {
            let candidate = ctx.top_relevance_score;
            top_relevance = Some(top_relevance.map_or(candidate, |t: f64| t.max(candidate)));
            for source in &ctx.retrieval_metrics.context_sources {
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
        }
    }

    sources.sort_unstable();
    let count = questions.len() as f64;

    BatchMetadata {
        average_quality_score: round3(quality_sum / count),
        average_relevance_score: (relevance_count > 0)
            .then(|| round3(relevance_sum / relevance_count as f64)),
        average_generation_time_ms: round3(time_sum / count),
        service_distribution,
        quality_distribution,
        relevance_distribution,
        top_relevance_score: top_relevance.map(round3),
        context_sources: sources,
    }
}

/// Single-entry memo for [`aggregate`].
///
/// Keyed by the bit patterns of the sorted, rounded quality scores; safe for
/// concurrent use. Correctness is checked in tests by recomputation without
/// the cache.
#[derive(Debug, Default)]
pub struct AggregateCache {
    entry: Mutex<Option<(Vec<u64>, BatchMetadata)>>,
}

impl AggregateCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(questions: &[GeneratedQuestion]) -> Vec<u64> {
        let mut scores: Vec<f64> = questions
            .iter()
            .map(|q| round3(q.metadata.quality_score))
            .collect();
        scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        scores.into_iter().map(f64::to_bits).collect()
    }

    /// Aggregate with memoization of the most recent input.
    pub fn aggregate(&self, questions: &[GeneratedQuestion]) -> BatchMetadata {
        let key = Self::key(questions);

        {
            let entry = self.entry.lock().expect("aggregate cache lock poisoned");
            if let Some((cached_key, cached)) = entry.as_ref() {
                if *cached_key == key {
                    tracing::trace!("Aggregate cache hit");
                    return cached.clone();
                }
            }
        }

        let computed = aggregate(questions);
        let mut entry = self.entry.lock().expect("aggregate cache lock poisoned");
        *entry = Some((key, computed.clone()));
        computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{
        Difficulty, QuestionFormat, QuestionMetadata, RetrievalMetrics, VectorContext,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn question(
        service: &str,
        quality: f64,
        time_ms: u64,
        relevance: Option<f64>,
    ) -> GeneratedQuestion {
        let vector_context = relevance.map(|r| VectorContext {
            used: true,
            similar_questions_found: 3,
            average_relevance_score: r,
            top_relevance_score: round3(r + 0.05),
            retrieval_metrics: RetrievalMetrics {
                total_retrieved: 3,
                above_threshold: 2,
                relevance_threshold: 0.7,
                retrieval_time_ms: 8,
                context_sources: vec!["curriculum".to_string()],
            },
        });

        GeneratedQuestion {
            id: Uuid::new_v4(),
            subject: "math".into(),
            topic: "fractions".into(),
            difficulty: Difficulty::Medium,
            question: "What is 1/2 + 1/4?".into(),
            answer: "3/4".into(),
            explanation: "Common denominators.".into(),
            format: QuestionFormat::MultipleChoice,
            created_at: Utc::now(),
            metadata: QuestionMetadata {
                service_used: service.into(),
                quality_score: quality,
                generation_time_ms: time_ms,
                relevance_score: relevance,
                vector_context,
                stage_timings: Vec::new(),
                warnings: Vec::new(),
            },
        }
    }

    #[test]
    fn test_empty_batch_yields_zero_defaults() {
        let meta = aggregate(&[]);
        assert_eq!(meta, BatchMetadata::empty());
        assert_eq!(meta.average_quality_score, 0.0);
        assert!(meta.average_relevance_score.is_none());
        assert!(meta.top_relevance_score.is_none());
    }

    #[test]
    fn test_means_over_defined_fields_only() {
        let questions = vec![
            question("fast", 0.9, 100, Some(0.8)),
            question("fast", 0.7, 300, None),
        ];
        let meta = aggregate(&questions);

        assert_eq!(meta.average_quality_score, 0.8);
        assert_eq!(meta.average_generation_time_ms, 200.0);
        // Only one question defines relevance; the mean is over that one.
        assert_eq!(meta.average_relevance_score, Some(0.8));
    }

    #[test]
    fn test_no_relevance_means_absent() {
        let questions = vec![question("fallback", 1.0, 5, None)];
        let meta = aggregate(&questions);
        assert!(meta.average_relevance_score.is_none());
        assert!(meta.top_relevance_score.is_none());
        assert!(meta.context_sources.is_empty());
    }

    #[test]
    fn test_top_relevance_is_max_of_tops() {
        let questions = vec![
            question("fast", 0.9, 100, Some(0.6)),
            question("fast", 0.9, 100, Some(0.9)),
        ];
        let meta = aggregate(&questions);
        // Per-question top is relevance + 0.05 in the fixture.
        assert_eq!(meta.top_relevance_score, Some(0.95));
    }

    #[test]
    fn test_service_distribution_counts() {
        let questions = vec![
            question("fast", 0.9, 10, None),
            question("fallback", 0.8, 10, None),
            question("fast", 0.7, 10, None),
        ];
        let meta = aggregate(&questions);
        assert_eq!(meta.service_distribution.get("fast"), Some(&2));
        assert_eq!(meta.service_distribution.get("fallback"), Some(&1));
    }

    #[test]
    fn test_distribution_buckets_closed_open() {
        let questions = vec![
            question("fast", 0.8, 10, None),  // high (boundary)
            question("fast", 0.79, 10, None), // medium
            question("fast", 0.6, 10, None),  // medium (boundary)
            question("fast", 0.59, 10, None), // low
        ];
        let meta = aggregate(&questions);
        assert_eq!(meta.quality_distribution.high, 1);
        assert_eq!(meta.quality_distribution.medium, 2);
        assert_eq!(meta.quality_distribution.low, 1);
    }

    #[test]
    fn test_permutation_invariant_means() {
        let a = question("fast", 0.91, 120, Some(0.8));
        let b = question("fallback", 0.62, 40, None);
        let c = question("advanced", 0.77, 310, Some(0.66));

        let forward = aggregate(&[a.clone(), b.clone(), c.clone()]);
        let reversed = aggregate(&[c, b, a]);

        assert_eq!(
            forward.average_quality_score,
            reversed.average_quality_score
        );
        assert_eq!(
            forward.average_relevance_score,
            reversed.average_relevance_score
        );
        assert_eq!(
            forward.average_generation_time_ms,
            reversed.average_generation_time_ms
        );
        assert_eq!(forward.top_relevance_score, reversed.top_relevance_score);
        assert_eq!(forward.context_sources, reversed.context_sources);
    }

    #[test]
    fn test_singleton_batch_is_undistorted() {
        let q = question("fast", 0.874, 230, Some(0.712));
        let meta = aggregate(std::slice::from_ref(&q));

        assert_eq!(meta.average_quality_score, q.metadata.quality_score);
        assert_eq!(meta.average_relevance_score, q.metadata.relevance_score);
        assert_eq!(meta.average_generation_time_ms, 230.0);
        assert_eq!(
            meta.top_relevance_score,
            q.metadata
                .vector_context
                .as_ref()
                .map(|c| c.top_relevance_score)
        );
    }

    #[test]
    fn test_cache_matches_uncached_recomputation() {
        let cache = AggregateCache::new();
        let questions = vec![
            question("fast", 0.9, 100, Some(0.8)),
            question("fallback", 0.6, 10, None),
        ];

        let first = cache.aggregate(&questions);
        let second = cache.aggregate(&questions);
        let uncached = aggregate(&questions);

        assert_eq!(first, uncached);
        assert_eq!(second, uncached);
    }

    #[test]
    fn test_cache_replaced_on_different_input() {
        let cache = AggregateCache::new();
        let batch_a = vec![question("fast", 0.9, 100, None)];
        let batch_b = vec![question("fast", 0.5, 100, None)];

        let a = cache.aggregate(&batch_a);
        let b = cache.aggregate(&batch_b);

        assert_eq!(a.average_quality_score, 0.9);
        assert_eq!(b.average_quality_score, 0.5);
        assert_eq!(cache.aggregate(&batch_b), aggregate(&batch_b));
    }
}
