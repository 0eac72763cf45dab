//! The individual pipeline stages.
//!
//! Each stage is a function over the explicit [`WorkflowState`] accumulator,
//! with no hidden shared state, so every stage is independently testable.
//! Sequencing, circuit-breaker consultation and fallback substitution live
//! in the orchestrator.

use std::time::Instant;

use crate::error::LlmError;
use crate::persona::{LearningStyle, PerformanceLevel};
use crate::question::{Difficulty, GenerationRequest};
use crate::vector::VectorStore;

use super::state::{CalibrationParams, DraftQuestion, RetrievedContext, Stage, WorkflowState};

/// Stage 1: retrieve curriculum context from the vector store.
///
/// Non-fatal: any retrieval failure or empty result leaves the context
/// absent and records a warning.
pub async fn curriculum_context(
    state: &mut WorkflowState,
    request: &GenerationRequest,
    store: &dyn VectorStore,
    top_k: usize,
    threshold: f64,
) {
    state.enter_stage(Stage::CurriculumContext);
    let started = Instant::now();

    let query = match &request.subtopic {
        Some(subtopic) => format!("{} {} {}", request.subject, request.topic, subtopic),
        None => format!("{} {}", request.subject, request.topic),
    };

    match store.retrieve(&query, top_k, threshold).await {
        Ok(results) if !results.is_empty() => {
            state.context = Some(RetrievedContext {
                results,
                retrieval_time_ms: started.elapsed().as_millis() as u64,
            });
        }
        Ok(_) => {
            state.record_warning(Stage::CurriculumContext, "no relevant context found");
        }
        Err(e) => {
            state.record_warning(
                Stage::CurriculumContext,
                format!("retrieval failed: {}", e),
            );
        }
    }

    state.record_timing(Stage::CurriculumContext, started.elapsed());
}

/// Stage 2: derive difficulty parameters from the request and persona.
///
/// Pure and deterministic: the requested difficulty sets the baseline and
/// the persona's performance level nudges it.
pub fn difficulty_calibration(state: &mut WorkflowState, request: &GenerationRequest) {
    state.enter_stage(Stage::DifficultyCalibration);
    let started = Instant::now();

    // A persona with a stated preference shifts the reasoning-step baseline;
    // the requested difficulty still labels the question downstream.
    let effective_difficulty = request
        .persona
        .preferred_difficulty
        .unwrap_or(request.difficulty);

    let base_steps: u8 = match effective_difficulty {
        Difficulty::Easy => 1,
        Difficulty::Medium => 2,
        Difficulty::Hard => 3,
    };

    let (steps, scale, hint) = match request.persona.performance_level {
        PerformanceLevel::Struggling => (base_steps.saturating_sub(1).max(1), 0.8, true),
        PerformanceLevel::OnTrack => (base_steps, 1.0, effective_difficulty == Difficulty::Hard),
        PerformanceLevel::Advanced => (base_steps + 1, 1.2, false),
    };

    state.calibration = Some(CalibrationParams {
        target_steps: steps,
        vocabulary_grade: request.grade,
        include_hint: hint,
        challenge_scale: scale,
    });

    state.record_timing(Stage::DifficultyCalibration, started.elapsed());
}

/// Build the generation prompt from the request and accumulated state.
pub fn build_prompt(request: &GenerationRequest, state: &WorkflowState) -> String {
    let mut prompt = format!(
        "Write one {} {} question about {} ({}) for grade {}.",
        request.difficulty,
        request.format.as_str().replace('_', " "),
        request.topic,
        request.subject,
        request.grade,
    );

    if let Some(calibration) = &state.calibration {
        prompt.push_str(&format!(
            " It should require about {} reasoning step(s), worded at a grade-{} level.",
            calibration.target_steps, calibration.vocabulary_grade
        ));
        if calibration.include_hint {
            prompt.push_str(" Include a short hint.");
        }
    }

    if let Some(context) = &state.context {
        let snippets: Vec<&str> = context
            .results
            .iter()
            .take(3)
            .map(|r| r.document_id.as_str())
            .collect();
        prompt.push_str(&format!(
            " Ground the question in these curriculum references: {}.",
            snippets.join(", ")
        ));
    }

    let persona = &request.persona;
    if !persona.interests.is_empty() {
        prompt.push_str(&format!(
            " Theme it around: {}.",
            persona.interests.join(", ")
        ));
    }
    if matches!(persona.learning_style, LearningStyle::Visual) {
        prompt.push_str(" Prefer phrasing that evokes a picture or diagram.");
    }
    if !persona.cultural_context.trim().is_empty() {
        prompt.push_str(&format!(
            " Use culturally familiar framing: {}.",
            persona.cultural_context
        ));
    }

    prompt
}

/// Parse the model's raw text into a draft question.
///
/// Accepts a bare JSON object or one wrapped in a Markdown code fence.
/// Anything else is a content error, which does not count toward the
/// circuit breaker.
pub fn parse_model_output(text: &str) -> Result<DraftQuestion, LlmError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let draft: DraftQuestion = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedOutput(format!("draft parse failed: {}", e)))?;

    if draft.question.trim().is_empty() {
        return Err(LlmError::MalformedOutput(
            "draft has empty question text".to_string(),
        ));
    }
    Ok(draft)
}

/// Stage 5: enrich the explanation with retrieved sources and persona
/// motivators.
///
/// Non-fatal by design; when there is nothing to enhance with, the
/// explanation is left as generated and a warning is recorded.
pub fn context_enhancement(state: &mut WorkflowState, request: &GenerationRequest) {
    state.enter_stage(Stage::ContextEnhancement);
    let started = Instant::now();

    let Some(draft) = &state.draft else {
        state.record_warning(Stage::ContextEnhancement, "no draft to enhance");
        state.record_timing(Stage::ContextEnhancement, started.elapsed());
        return;
    };

    let mut extras = Vec::new();

    if let Some(context) = &state.context {
        let mut sources: Vec<&str> = context.results.iter().map(|r| r.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        extras.push(format!("Related material: {}.", sources.join(", ")));
    }

    if let Some(motivator) = request.persona.motivators.first() {
        extras.push(format!("Keep going -- {}!", motivator));
    }

    if extras.is_empty() {
        state.record_warning(Stage::ContextEnhancement, "nothing to enhance with");
    } else {
        let mut explanation = draft.explanation.clone();
        if !explanation.is_empty() {
            explanation.push(' ');
        }
        explanation.push_str(&extras.join(" "));
        state.enhanced_explanation = Some(explanation);
    }

    state.record_timing(Stage::ContextEnhancement, started.elapsed());
}
