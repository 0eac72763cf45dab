//! Configuration for the question-generation workflow.
//!
//! Groups the tunable policy of the pipeline: circuit-breaker parameters,
//! retrieval settings, request validation bounds, quality-scoring penalties
//! and model-routing thresholds. Everything has a sensible default and can be
//! overridden from the environment.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Circuit-breaker parameters.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive transient failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before permitting a trial call.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

/// Quality-scoring penalties applied by the validator.
///
/// These weights are policy, not law; the defaults match the original
/// product behavior.
#[derive(Debug, Clone)]
pub struct QualityConfig {
    /// Minimum acceptable question text length in characters.
    pub min_question_length: usize,
    /// Penalty for question text shorter than the minimum.
    pub short_text_penalty: f64,
    /// Penalty for a missing answer. Missing answers are also fatal.
    pub missing_answer_penalty: f64,
    /// Penalty for missing service-attribution metadata.
    pub missing_attribution_penalty: f64,
    /// Penalty when vector context was used but no relevance score attached.
    pub missing_relevance_penalty: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_question_length: 10,
            short_text_penalty: 0.3,
            missing_answer_penalty: 0.4,
            missing_attribution_penalty: 0.1,
            missing_relevance_penalty: 0.2,
        }
    }
}

/// Model-routing policy thresholds.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Grade at or above which a hard-difficulty request routes to the
    /// advanced tier.
    pub complex_grade_threshold: u8,
    /// Topic keywords that always route to the advanced tier.
    pub complex_topic_keywords: Vec<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            complex_grade_threshold: 7,
            complex_topic_keywords: vec![
                "algebra".to_string(),
                "geometry".to_string(),
                "proof".to_string(),
                "equation".to_string(),
            ],
        }
    }
}

/// Configuration for the workflow orchestrator and batch coordinator.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    // Request validation
    /// Lowest grade accepted by the pipeline.
    pub min_grade: u8,
    /// Highest grade accepted by the pipeline.
    pub max_grade: u8,
    /// Maximum number of questions in one batch request.
    pub max_batch_size: usize,

    // Concurrency
    /// Maximum orchestrator invocations running concurrently per batch.
    pub max_concurrent_generations: usize,

    // Retrieval
    /// Number of documents requested from the vector store per query.
    pub retrieval_top_k: usize,
    /// Relevance threshold for counting a document as usable context.
    pub relevance_threshold: f64,

    // Nested policy
    /// Circuit-breaker parameters.
    pub breaker: BreakerConfig,
    /// Quality-validator penalties.
    pub quality: QualityConfig,
    /// Model-router thresholds.
    pub router: RouterConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_grade: 3,
            max_grade: 8,
            max_batch_size: 20,
            max_concurrent_generations: 4,
            retrieval_top_k: 10,
            relevance_threshold: 0.7,
            breaker: BreakerConfig::default(),
            quality: QualityConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

impl WorkflowConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Recognized variables:
    /// - `QUIZFORGE_MAX_BATCH_SIZE`
    /// - `QUIZFORGE_MAX_CONCURRENT`
    /// - `QUIZFORGE_RETRIEVAL_TOP_K`
    /// - `QUIZFORGE_RELEVANCE_THRESHOLD`
    /// - `QUIZFORGE_BREAKER_FAILURES`
    /// - `QUIZFORGE_BREAKER_RESET_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = parse_env::<usize>("QUIZFORGE_MAX_BATCH_SIZE")? {
            config.max_batch_size = v;
        }
        if let Some(v) = parse_env::<usize>("QUIZFORGE_MAX_CONCURRENT")? {
            config.max_concurrent_generations = v;
        }
        if let Some(v) = parse_env::<usize>("QUIZFORGE_RETRIEVAL_TOP_K")? {
            config.retrieval_top_k = v;
        }
        if let Some(v) = parse_env::<f64>("QUIZFORGE_RELEVANCE_THRESHOLD")? {
            config.relevance_threshold = v;
        }
        if let Some(v) = parse_env::<u32>("QUIZFORGE_BREAKER_FAILURES")? {
            config.breaker.failure_threshold = v;
        }
        if let Some(v) = parse_env::<u64>("QUIZFORGE_BREAKER_RESET_SECS")? {
            config.breaker.reset_timeout = Duration::from_secs(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_grade > self.max_grade {
            return Err(ConfigError::ValidationFailed(format!(
                "min_grade {} exceeds max_grade {}",
                self.min_grade, self.max_grade
            )));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_generations == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_generations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(ConfigError::ValidationFailed(format!(
                "relevance_threshold {} outside [0, 1]",
                self.relevance_threshold
            )));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "breaker failure_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse an optional environment variable, reporting bad values.
fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("could not parse '{}'", raw),
            }),
        Err(_) => Ok(None),
    }
}
