//! Core value types for question generation.
//!
//! Defines the immutable [`GenerationRequest`], the produced
//! [`GeneratedQuestion`] with its metadata block, and the vector-context
//! summary structures that flow into batch aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::persona::Persona;

/// Question difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Stable lowercase name, matching the wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the question being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionFormat {
    #[default]
    MultipleChoice,
    OpenEnded,
    FillInBlank,
    WordProblem,
    /// Cross-domain mastery check; always routes to the advanced model tier.
    Mastery,
}

impl QuestionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionFormat::MultipleChoice => "multiple_choice",
            QuestionFormat::OpenEnded => "open_ended",
            QuestionFormat::FillInBlank => "fill_in_blank",
            QuestionFormat::WordProblem => "word_problem",
            QuestionFormat::Mastery => "mastery",
        }
    }
}

/// An immutable question-generation request.
///
/// Created once per API call and never mutated; the batch coordinator clones
/// it per orchestrator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub subject: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtopic: Option<String>,
    pub grade: u8,
    pub difficulty: Difficulty,
    pub format: QuestionFormat,
    /// Number of questions requested; validated against the batch limit.
    pub count: usize,
    pub persona: Persona,
}

impl GenerationRequest {
    /// Create a single-question request with a default persona.
    pub fn new(
        subject: impl Into<String>,
        topic: impl Into<String>,
        grade: u8,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            subtopic: None,
            grade,
            difficulty,
            format: QuestionFormat::default(),
            count: 1,
            persona: Persona::default(),
        }
    }

    /// Set the subtopic.
    pub fn with_subtopic(mut self, subtopic: impl Into<String>) -> Self {
        self.subtopic = Some(subtopic.into());
        self
    }

    /// Set the question format.
    pub fn with_format(mut self, format: QuestionFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the requested count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the persona snapshot.
    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona.normalized();
        self
    }

    /// Validate request fields against configured bounds.
    ///
    /// This is the only place `ConfigurationError`s originate for a request;
    /// everything downstream assumes the request is well-formed.
    pub fn validate(&self, min_grade: u8, max_grade: u8, max_count: usize) -> Result<(), WorkflowError> {
        if self.subject.trim().is_empty() {
            return Err(WorkflowError::Configuration("subject is empty".to_string()));
        }
        if self.topic.trim().is_empty() {
            return Err(WorkflowError::Configuration("topic is empty".to_string()));
        }
        if self.grade < min_grade || self.grade > max_grade {
            return Err(WorkflowError::Configuration(format!(
                "grade {} outside supported range {}-{}",
                self.grade, min_grade, max_grade
            )));
        }
        if self.count == 0 {
            return Err(WorkflowError::Configuration(
                "count must be at least 1".to_string(),
            ));
        }
        if self.count > max_count {
            return Err(WorkflowError::Configuration(format!(
                "count {} exceeds maximum batch size {}",
                self.count, max_count
            )));
        }
        Ok(())
    }
}

/// Retrieval statistics for one vector-store query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub total_retrieved: usize,
    pub above_threshold: usize,
    pub relevance_threshold: f64,
    pub retrieval_time_ms: u64,
    pub context_sources: Vec<String>,
}

/// Summary of the vector context attached to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorContext {
    /// Whether retrieved context actually informed generation.
    pub used: bool,
    pub similar_questions_found: usize,
    pub average_relevance_score: f64,
    pub top_relevance_score: f64,
    pub retrieval_metrics: RetrievalMetrics,
}

/// Elapsed time for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u64,
}

/// Metadata block attached to every generated question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionMetadata {
    /// Which model/path produced the question ("fast", "advanced",
    /// "fallback", "fallback-circuit-open").
    pub service_used: String,
    /// Quality score in [0, 1], rounded to 3 decimals.
    pub quality_score: f64,
    pub generation_time_ms: u64,
    /// Average relevance of the context used, in [0, 1], rounded to
    /// 3 decimals. Absent when no vector context informed generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_context: Option<VectorContext>,
    /// Per-stage elapsed times, in pipeline order.
    pub stage_timings: Vec<StageTiming>,
    /// Non-fatal issues surfaced by the pipeline.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
}

/// A generated educational question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: Uuid,
    pub subject: String,
    pub topic: String,
    pub difficulty: Difficulty,
    pub question: String,
    pub answer: String,
    pub explanation: String,
    pub format: QuestionFormat,
    pub created_at: DateTime<Utc>,
    pub metadata: QuestionMetadata,
}

/// Round a score to 3 decimals for stable comparison.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
