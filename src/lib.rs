//! quizforge: multi-stage AI question-generation workflow.
//!
//! This library provides the orchestration core for generating validated
//! educational questions: a five-stage pipeline per question, a circuit
//! breaker with deterministic fallback around the language-model backend,
//! quality scoring, and batch-level relevance/metadata aggregation.
//!
//! The language model, vector store and persona store are injected
//! capabilities; see [`llm::LanguageModel`], [`vector::VectorStore`] and
//! [`persona::PersonaStore`].

pub mod batch;
pub mod config;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod persona;
pub mod quality;
pub mod question;
pub mod vector;
pub mod workflow;

pub use batch::{BatchCoordinator, BatchResult};
pub use config::WorkflowConfig;
pub use error::{ConfigError, LlmError, VectorStoreError, WorkflowError};
pub use question::{Difficulty, GeneratedQuestion, GenerationRequest, QuestionFormat};
pub use workflow::{CircuitBreaker, WorkflowOrchestrator};
