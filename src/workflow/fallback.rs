//! Deterministic fallback question generator.
//!
//! Used when the AI path is unavailable (open circuit) or produced an
//! unusable draft. No external dependencies, no randomness: the same
//! request always yields the same question. By construction every fallback
//! draft passes the quality validator.

use crate::question::{Difficulty, GenerationRequest};

use super::state::DraftQuestion;

/// Deterministic, dependency-free question builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Build a fallback question for the request, attributed to
    /// `service_used`.
    ///
    /// Operands are derived from the grade and a topic digest so different
    /// requests vary while staying reproducible. The operation scales with
    /// difficulty: addition, multiplication, or a two-step expression.
    pub fn generate(&self, request: &GenerationRequest, service_used: &str) -> DraftQuestion {
        let seed = topic_digest(&request.topic);
        let a = (request.grade as u64 * 3 + seed % 7 + 2) as i64;
        let b = (request.grade as u64 + seed % 5 + 1) as i64;

        let (question, answer, explanation) = match request.difficulty {
            Difficulty::Easy => (
                format!(
                    "In a {} exercise, what is {} + {}?",
                    request.topic, a, b
                ),
                (a + b).to_string(),
                format!("Add the two numbers: {} + {} = {}.", a, b, a + b),
            ),
            Difficulty::Medium => (
                format!(
                    "In a {} exercise, what is {} x {}?",
                    request.topic, a, b
                ),
                (a * b).to_string(),
                format!("Multiply the two numbers: {} x {} = {}.", a, b, a * b),
            ),
            Difficulty::Hard => {
                let c = b + 2;
                (
                    format!(
                        "In a {} exercise, what is {} x {} - {}?",
                        request.topic, a, b, c
                    ),
                    (a * b - c).to_string(),
                    format!(
                        "First multiply {} x {} = {}, then subtract {} to get {}.",
                        a,
                        b,
                        a * b,
                        c,
                        a * b - c
                    ),
                )
            }
        };

        DraftQuestion {
            question,
            answer,
            explanation,
            service_used: service_used.to_string(),
            vector_context_used: false,
            relevance_score: None,
        }
    }
}

/// Stable digest of the topic string.
fn topic_digest(topic: &str) -> u64 {
    topic.bytes().fold(0_u64, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(b as u64)
    })
}
