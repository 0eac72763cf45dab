//! The question-generation workflow: stages, state, resilience and fallback.

pub mod circuit;
pub mod fallback;
pub mod orchestrator;
pub mod stages;
pub mod state;

pub use circuit::{CircuitBreaker, CircuitState};
pub use fallback::FallbackGenerator;
pub use orchestrator::{
    WorkflowOrchestrator, SERVICE_FALLBACK, SERVICE_FALLBACK_CIRCUIT_OPEN,
};
pub use state::{DraftQuestion, Stage, WorkflowState};
