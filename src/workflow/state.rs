//! Per-invocation workflow state.
//!
//! One [`WorkflowState`] exists per single-question generation, owned
//! exclusively by its orchestrator invocation and dropped when `run`
//! returns. Stages communicate only through this accumulator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::question::StageTiming;
use crate::vector::VectorRetrievalResult;

/// The five pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CurriculumContext,
    DifficultyCalibration,
    Generation,
    QualityValidation,
    ContextEnhancement,
}

impl Stage {
    /// Stable snake_case name used in timings and log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CurriculumContext => "curriculum_context",
            Stage::DifficultyCalibration => "difficulty_calibration",
            Stage::Generation => "generation",
            Stage::QualityValidation => "quality_validation",
            Stage::ContextEnhancement => "context_enhancement",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw retrieval output captured by the curriculum-context stage.
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub results: Vec<VectorRetrievalResult>,
    pub retrieval_time_ms: u64,
}

/// Difficulty parameters produced by the calibration stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// How many reasoning steps the question should demand.
    pub target_steps: u8,
    /// Grade level the wording should be pitched at.
    pub vocabulary_grade: u8,
    /// Whether to ask the model to embed a hint.
    pub include_hint: bool,
    /// Scale in [0.5, 1.5] nudging numeric magnitude up or down.
    pub challenge_scale: f64,
}

/// A question draft as produced by the generation stage, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftQuestion {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    /// Which model/path produced this draft.
    #[serde(default)]
    pub service_used: String,
    /// Whether retrieved context informed the draft.
    #[serde(default)]
    pub vector_context_used: bool,
    /// Average relevance of the context used, when any.
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

/// Mutable accumulator threaded through the five stages.
#[derive(Debug, Default)]
pub struct WorkflowState {
    pub current_stage: Option<Stage>,
    pub timings: Vec<StageTiming>,
    pub warnings: Vec<String>,
    pub context: Option<RetrievedContext>,
    pub calibration: Option<CalibrationParams>,
    pub draft: Option<DraftQuestion>,
    pub quality_score: Option<f64>,
    pub enhanced_explanation: Option<String>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a stage as current.
    pub fn enter_stage(&mut self, stage: Stage) {
        self.current_stage = Some(stage);
        tracing::debug!(stage = %stage, "Entering workflow stage");
    }

    /// Record elapsed time for a completed stage.
    pub fn record_timing(&mut self, stage: Stage, elapsed: Duration) {
        self.timings.push(StageTiming {
            stage: stage.as_str().to_string(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }

    /// Record a non-fatal warning from a stage.
    pub fn record_warning(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %stage, message = %message, "Workflow stage warning");
        self.warnings.push(format!("{}: {}", stage, message));
    }
}
