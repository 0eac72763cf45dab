//! The workflow orchestrator: sequences the five pipeline stages for one
//! question.
//!
//! Stage order is fixed: curriculum context, difficulty calibration,
//! generation, quality validation, context enhancement. The context stages
//! are non-fatal; generation and validation failures are absorbed by the
//! deterministic fallback generator. The only error a caller ever sees is a
//! malformed request.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::llm::{LanguageModel, ModelRouter};
use crate::quality::QualityValidator;
use crate::question::{
    round3, GeneratedQuestion, GenerationRequest, QuestionMetadata, RetrievalMetrics,
    VectorContext,
};
use crate::vector::VectorStore;

use super::circuit::CircuitBreaker;
use super::fallback::FallbackGenerator;
use super::stages;
use super::state::{DraftQuestion, Stage, WorkflowState};

/// Service tag for the deterministic fallback path.
pub const SERVICE_FALLBACK: &str = "fallback";
/// Service tag used when the circuit breaker denied the model call.
pub const SERVICE_FALLBACK_CIRCUIT_OPEN: &str = "fallback-circuit-open";

/// Sequences the five stages for a single generation request.
pub struct WorkflowOrchestrator {
    llm: Arc<dyn LanguageModel>,
    vector_store: Arc<dyn VectorStore>,
    breaker: Arc<CircuitBreaker>,
    router: ModelRouter,
    validator: QualityValidator,
    fallback: FallbackGenerator,
    config: WorkflowConfig,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator over the injected capabilities.
    ///
    /// The breaker is shared: pass the same `Arc` to every orchestrator that
    /// talks to the same backend.
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        vector_store: Arc<dyn VectorStore>,
        breaker: Arc<CircuitBreaker>,
        config: WorkflowConfig,
    ) -> Self {
        let router = ModelRouter::new(config.router.clone());
        let validator = QualityValidator::new(config.quality.clone());
        Self {
            llm,
            vector_store,
            breaker,
            router,
            validator,
            fallback: FallbackGenerator::new(),
            config,
        }
    }

    /// Run the full pipeline for one question.
    pub async fn run(&self, request: &GenerationRequest) -> WorkflowResult<GeneratedQuestion> {
        request.validate(
            self.config.min_grade,
            self.config.max_grade,
            self.config.max_batch_size,
        )?;

        let started = Instant::now();
        let mut state = WorkflowState::new();

        stages::curriculum_context(
            &mut state,
            request,
            self.vector_store.as_ref(),
            self.config.retrieval_top_k,
            self.config.relevance_threshold,
        )
        .await;

        stages::difficulty_calibration(&mut state, request);

        self.run_generation_stage(&mut state, request).await;
        self.run_validation_stage(&mut state, request)?;

        stages::context_enhancement(&mut state, request);

        self.assemble(state, request, started)
    }

    /// Stage 3: produce a draft, via the routed model or the fallback.
    async fn run_generation_stage(&self, state: &mut WorkflowState, request: &GenerationRequest) {
        state.enter_stage(Stage::Generation);
        let started = Instant::now();

        let tier = self.router.route(
            &request.topic,
            request.format,
            request.grade,
            request.difficulty,
        );

        let draft = if !self.breaker.allow() {
            tracing::info!(topic = %request.topic, "Circuit open, using fallback generator");
            state.record_warning(Stage::Generation, "circuit open, model call skipped");
            self.fallback.generate(request, SERVICE_FALLBACK_CIRCUIT_OPEN)
        } else {
            let prompt = stages::build_prompt(request, state);
            match self.llm.generate(&prompt, tier).await {
                Ok(text) => {
                    self.breaker.record_success();
                    match stages::parse_model_output(&text) {
                        Ok(mut draft) => {
                            draft.service_used = tier.as_str().to_string();
                            if let Some(context) = &state.context {
                                draft.vector_context_used = true;
                                let scores: Vec<f64> = context
                                    .results
                                    .iter()
                                    .map(|r| r.relevance_score)
                                    .collect();
                                draft.relevance_score =
                                    Some(round3(scores.iter().sum::<f64>() / scores.len() as f64));
                            }
                            draft
                        }
                        Err(e) => {
                            state.record_warning(
                                Stage::Generation,
                                format!("unusable model output: {}", e),
                            );
                            self.fallback.generate(request, SERVICE_FALLBACK)
                        }
                    }
                }
                Err(e) => {
                    if e.is_transient() {
                        self.breaker.record_failure();
                    } else {
                        // The backend answered; a half-open probe must still
                        // resolve or the circuit would stay wedged.
                        self.breaker.record_content_error();
                    }
                    state.record_warning(Stage::Generation, format!("model call failed: {}", e));
                    self.fallback.generate(request, SERVICE_FALLBACK)
                }
            }
        };

        state.draft = Some(draft);
        state.record_timing(Stage::Generation, started.elapsed());
    }

    /// Stage 4: score the draft; a fatal verdict swaps in the fallback.
    fn run_validation_stage(
        &self,
        state: &mut WorkflowState,
        request: &GenerationRequest,
    ) -> WorkflowResult<()> {
        state.enter_stage(Stage::QualityValidation);
        let started = Instant::now();

        let draft = state.draft.as_ref().ok_or_else(|| WorkflowError::StageFailed {
            stage: Stage::QualityValidation.as_str().to_string(),
            reason: "no draft produced by generation stage".to_string(),
        })?;

        let mut verdict = self.validator.validate(draft);

        if verdict.fatal {
            state.record_warning(
                Stage::QualityValidation,
                format!("fatal quality issue, using fallback: {}", verdict.issues.join("; ")),
            );
            let replacement = self.fallback.generate(request, SERVICE_FALLBACK);
            verdict = self.validator.validate(&replacement);
            state.draft = Some(replacement);

            if verdict.fatal {
                // Fallback drafts pass validation by construction.
                state.record_timing(Stage::QualityValidation, started.elapsed());
                return Err(WorkflowError::StageFailed {
                    stage: Stage::QualityValidation.as_str().to_string(),
                    reason: "fallback draft failed validation".to_string(),
                });
            }
        } else if !verdict.is_valid {
            for issue in &verdict.issues {
                state.record_warning(Stage::QualityValidation, issue.clone());
            }
        }

        state.quality_score = Some(verdict.quality_score);
        state.record_timing(Stage::QualityValidation, started.elapsed());
        Ok(())
    }

    /// Assemble the final question and its metadata block.
    fn assemble(
        &self,
        state: WorkflowState,
        request: &GenerationRequest,
        started: Instant,
    ) -> WorkflowResult<GeneratedQuestion> {
        let WorkflowState {
            timings,
            warnings,
            context,
            draft,
            quality_score,
            enhanced_explanation,
            ..
        } = state;

        let draft: DraftQuestion = draft.ok_or_else(|| WorkflowError::StageFailed {
            stage: Stage::Generation.as_str().to_string(),
            reason: "pipeline finished without a draft".to_string(),
        })?;

        let vector_context = context.map(|ctx| {
            let scores: Vec<f64> = ctx.results.iter().map(|r| r.relevance_score).collect();
            let average = scores.iter().sum::<f64>() / scores.len() as f64;
            let top = scores.iter().cloned().fold(0.0_f64, f64::max);
            let above_threshold = scores
                .iter()
                .filter(|s| **s >= self.config.relevance_threshold)
                .count();
            let mut sources: Vec<String> =
                ctx.results.iter().map(|r| r.source.clone()).collect();
            sources.sort_unstable();
            sources.dedup();

            VectorContext {
                used: draft.vector_context_used,
                similar_questions_found: ctx.results.len(),
                average_relevance_score: round3(average),
                top_relevance_score: round3(top),
                retrieval_metrics: RetrievalMetrics {
                    total_retrieved: ctx.results.len(),
                    above_threshold,
                    relevance_threshold: self.config.relevance_threshold,
                    retrieval_time_ms: ctx.retrieval_time_ms,
                    context_sources: sources,
                },
            }
        });

        let metadata = QuestionMetadata {
            service_used: draft.service_used.clone(),
            quality_score: quality_score.unwrap_or(0.0),
            generation_time_ms: started.elapsed().as_millis() as u64,
            relevance_score: draft.relevance_score,
            vector_context,
            stage_timings: timings,
            warnings,
        };

        Ok(GeneratedQuestion {
            id: Uuid::new_v4(),
            subject: request.subject.clone(),
            topic: request.topic.clone(),
            difficulty: request.difficulty,
            question: draft.question,
            answer: draft.answer,
            explanation: enhanced_explanation.unwrap_or(draft.explanation),
            format: request.format,
            created_at: Utc::now(),
            metadata,
        })
    }
}
