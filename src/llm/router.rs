//! Model-routing policy for question generation.
//!
//! A pure complexity classifier maps request attributes onto
//! [`ComplexityClass`], and the router maps that class onto a
//! [`ModelTier`]. The router never calls a model itself.

use crate::config::RouterConfig;
use crate::question::{Difficulty, QuestionFormat};

use super::ModelTier;

/// Classification of how demanding a generation request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityClass {
    Simple,
    Complex,
}

/// Stateless, side-effect-free model router.
#[derive(Debug, Clone, Default)]
pub struct ModelRouter {
    config: RouterConfig,
}

impl ModelRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Classify a request's complexity.
    ///
    /// Complex: topics matching the configured keyword list (multi-step
    /// algebra, geometry proofs, equations), mastery formats, or high grade
    /// combined with hard difficulty. Everything else is simple.
    pub fn classify(
        &self,
        topic: &str,
        format: QuestionFormat,
        grade: u8,
        difficulty: Difficulty,
    ) -> ComplexityClass {
        if format == QuestionFormat::Mastery {
            return ComplexityClass::Complex;
        }

        let topic_lower = topic.to_lowercase();
        if self
            .config
            .complex_topic_keywords
            .iter()
            .any(|kw| topic_lower.contains(kw.as_str()))
        {
            return ComplexityClass::Complex;
        }

        if grade >= self.config.complex_grade_threshold && difficulty == Difficulty::Hard {
            return ComplexityClass::Complex;
        }

        ComplexityClass::Simple
    }

    /// Select the model tier for a complexity class.
    pub fn select(&self, complexity: ComplexityClass) -> ModelTier {
        match complexity {
            ComplexityClass::Simple => ModelTier::Fast,
            ComplexityClass::Complex => ModelTier::Advanced,
        }
    }

    /// Convenience: classify and select in one step.
    pub fn route(
        &self,
        topic: &str,
        format: QuestionFormat,
        grade: u8,
        difficulty: Difficulty,
    ) -> ModelTier {
        self.select(self.classify(topic, format, grade, difficulty))
    }
}
