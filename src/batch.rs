//! Batch coordination: fan out N orchestrator runs and aggregate the
//! results.
//!
//! The coordinator is the sole entry point consumed by the HTTP layer. A
//! per-question failure never aborts the batch; it is recorded and the batch
//! is delivered short, with the shortfall visible in the
//! requested/delivered counts.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::WorkflowResult;
use crate::metadata::{AggregateCache, BatchMetadata};
use crate::question::{GeneratedQuestion, GenerationRequest};
use crate::workflow::WorkflowOrchestrator;

/// One recorded per-question failure inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    /// Slot index of the failed question within the batch.
    pub index: usize,
    pub error: String,
}

/// The response shape for one batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub requested: usize,
    pub delivered: usize,
    pub questions: Vec<GeneratedQuestion>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<BatchFailure>,
    pub metadata: BatchMetadata,
}

/// Runs `count` independent orchestrator invocations and aggregates them.
pub struct BatchCoordinator {
    orchestrator: Arc<WorkflowOrchestrator>,
    cache: AggregateCache,
    max_batch_size: usize,
    max_concurrent: usize,
    min_grade: u8,
    max_grade: u8,
}

impl BatchCoordinator {
    /// Create a coordinator over an orchestrator.
    ///
    /// `max_concurrent` bounds the worker pool so a large batch cannot
    /// overwhelm the backend.
    pub fn new(
        orchestrator: Arc<WorkflowOrchestrator>,
        min_grade: u8,
        max_grade: u8,
        max_batch_size: usize,
        max_concurrent: usize,
    ) -> Self {
        Self {
            orchestrator,
            cache: AggregateCache::new(),
            max_batch_size,
            max_concurrent: max_concurrent.max(1),
            min_grade,
            max_grade,
        }
    }

    /// Generate `request.count` questions.
    ///
    /// Returns `Err` only for a malformed request; individual generation
    /// failures are recorded in the result and the batch proceeds.
    pub async fn generate_batch(&self, request: &GenerationRequest) -> WorkflowResult<BatchResult> {
        request.validate(self.min_grade, self.max_grade, self.max_batch_size)?;

        let requested = request.count;
        tracing::info!(
            subject = %request.subject,
            topic = %request.topic,
            count = requested,
            "Starting batch generation"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        let runs = (0..requested).map(|index| {
            let semaphore = Arc::clone(&semaphore);
            let single = request.clone().with_count(1);
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("batch semaphore never closed");
                (index, self.orchestrator.run(&single).await)
            }
        });

        let mut questions = Vec::with_capacity(requested);
        let mut failures = Vec::new();

        // join_all preserves slot order, so delivered questions stay in
        // request order regardless of completion order.
        for (index, outcome) in join_all(runs).await {
            match outcome {
                Ok(question) => questions.push(question),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Batch item failed");
                    failures.push(BatchFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        let metadata = self.cache.aggregate(&questions);
        let delivered = questions.len();

        tracing::info!(requested, delivered, "Batch generation finished");

        Ok(BatchResult {
            requested,
            delivered,
            questions,
            failures,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::error::{LlmError, VectorStoreError};
    use crate::llm::{LanguageModel, ModelTier};
    use crate::question::Difficulty;
    use crate::vector::{VectorRetrievalResult, VectorStore};
    use crate::workflow::CircuitBreaker;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AlwaysGoodModel;

    #[async_trait]
    impl LanguageModel for AlwaysGoodModel {
        async fn generate(&self, _prompt: &str, _tier: ModelTier) -> Result<String, LlmError> {
            Ok(
                r#"{"question": "What is 3/4 of 20?", "answer": "15", "explanation": "Scale."}"#
                    .to_string(),
            )
        }
    }

    struct CountingModel {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LanguageModel for CountingModel {
        async fn generate(&self, _prompt: &str, _tier: ModelTier) -> Result<String, LlmError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(r#"{"question": "What is 2 + 2 in total?", "answer": "4"}"#.to_string())
        }
    }

    struct EmptyStore;

    #[async_trait]
    impl VectorStore for EmptyStore {
        async fn retrieve(
            &self,
            _query: &str,
            _top_k: usize,
            _threshold: f64,
        ) -> Result<Vec<VectorRetrievalResult>, VectorStoreError> {
            Ok(Vec::new())
        }
    }

    fn coordinator(model: Arc<dyn LanguageModel>, max_concurrent: usize) -> BatchCoordinator {
        let config = WorkflowConfig::default();
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
        let orchestrator = Arc::new(WorkflowOrchestrator::new(
            model,
            Arc::new(EmptyStore),
            breaker,
            config.clone(),
        ));
        BatchCoordinator::new(
            orchestrator,
            config.min_grade,
            config.max_grade,
            config.max_batch_size,
            max_concurrent,
        )
    }

    fn request(count: usize) -> GenerationRequest {
        GenerationRequest::new("math", "fractions", 5, Difficulty::Medium).with_count(count)
    }

    #[tokio::test]
    async fn test_batch_delivers_requested_count() {
        let coordinator = coordinator(Arc::new(AlwaysGoodModel), 4);
        let result = coordinator
            .generate_batch(&request(5))
            .await
            .expect("batch should succeed");

        assert_eq!(result.requested, 5);
        assert_eq!(result.delivered, 5);
        assert_eq!(result.questions.len(), 5);
        assert!(result.failures.is_empty());
        assert_eq!(result.metadata.service_distribution.get("fast"), Some(&5));
    }

    #[tokio::test]
    async fn test_oversized_count_is_configuration_error() {
        let coordinator = coordinator(Arc::new(AlwaysGoodModel), 4);
        let err = coordinator.generate_batch(&request(1000)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::WorkflowError::Configuration(_)
        ));
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let model = Arc::new(CountingModel {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let coordinator = coordinator(Arc::clone(&model) as Arc<dyn LanguageModel>, 2);

        coordinator
            .generate_batch(&request(6))
            .await
            .expect("batch should succeed");

        assert!(model.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_singleton_batch_metadata_matches_question() {
        let coordinator = coordinator(Arc::new(AlwaysGoodModel), 4);
        let result = coordinator
            .generate_batch(&request(1))
            .await
            .expect("batch should succeed");

        let q = &result.questions[0];
        assert_eq!(
            result.metadata.average_quality_score,
            q.metadata.quality_score
        );
        assert_eq!(
            result.metadata.average_relevance_score,
            q.metadata.relevance_score
        );
    }
}
