//! Penalty-based quality scoring for question drafts.
//!
//! The validator starts every draft at 1.0 and subtracts a fixed penalty per
//! detected issue. Issues are surfaced as warnings rather than blocking the
//! question, with one exception: a missing answer is fatal and forces the
//! fallback path.

use serde::{Deserialize, Serialize};

use crate::config::QualityConfig;
use crate::question::round3;
use crate::workflow::state::DraftQuestion;

/// Outcome of validating one draft question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityVerdict {
    /// True iff no issues were detected.
    pub is_valid: bool,
    /// Human-readable issue descriptions.
    pub issues: Vec<String>,
    /// Score in [0, 1], rounded to 3 decimals.
    pub quality_score: f64,
    /// True when an issue forces the fallback path (missing answer).
    pub fatal: bool,
}

/// Validates drafts against structural quality rules.
#[derive(Debug, Clone, Default)]
pub struct QualityValidator {
    config: QualityConfig,
}

impl QualityValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Validate a draft question.
    ///
    /// Checks, each with its configured penalty:
    /// - question text shorter than the minimum length
    /// - missing answer (fatal)
    /// - missing service attribution
    /// - vector context used but no relevance score attached
    pub fn validate(&self, draft: &DraftQuestion) -> QualityVerdict {
        let mut issues = Vec::new();
        let mut score = 1.0_f64;
        let mut fatal = false;

        if draft.question.trim().len() < self.config.min_question_length {
            issues.push(format!(
                "question text shorter than {} characters",
                self.config.min_question_length
            ));
            score -= self.config.short_text_penalty;
        }

        if draft.answer.trim().is_empty() {
            issues.push("answer is missing".to_string());
            score -= self.config.missing_answer_penalty;
            fatal = true;
        }

        if draft.service_used.trim().is_empty() {
            issues.push("service attribution is missing".to_string());
            score -= self.config.missing_attribution_penalty;
        }

        if draft.vector_context_used && draft.relevance_score.is_none() {
            issues.push("vector context used but no relevance score attached".to_string());
            score -= self.config.missing_relevance_penalty;
        }

        QualityVerdict {
            is_valid: issues.is_empty(),
            quality_score: round3(score.max(0.0)),
            issues,
            fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> QualityValidator {
        QualityValidator::new(QualityConfig::default())
    }

    fn good_draft() -> DraftQuestion {
        DraftQuestion {
            question: "What is 3/4 expressed as a decimal?".to_string(),
            answer: "0.75".to_string(),
            explanation: "Divide 3 by 4.".to_string(),
            service_used: "fast".to_string(),
            vector_context_used: false,
            relevance_score: None,
        }
    }

    #[test]
    fn test_clean_draft_scores_one() {
        let verdict = validator().validate(&good_draft());
        assert!(verdict.is_valid);
        assert!(verdict.issues.is_empty());
        assert!(!verdict.fatal);
        assert_eq!(verdict.quality_score, 1.0);
    }

    #[test]
    fn test_short_question_penalized() {
        let mut draft = good_draft();
        draft.question = "2+2?".to_string();
        let verdict = validator().validate(&draft);

        assert!(!verdict.is_valid);
        assert!(!verdict.fatal);
        assert_eq!(verdict.quality_score, 0.7);
    }

    #[test]
    fn test_missing_answer_is_fatal() {
        let mut draft = good_draft();
        draft.answer = "  ".to_string();
        let verdict = validator().validate(&draft);

        assert!(verdict.fatal);
        assert!(!verdict.is_valid);
        assert_eq!(verdict.quality_score, 0.6);
    }

    #[test]
    fn test_missing_attribution_penalized() {
        let mut draft = good_draft();
        draft.service_used = String::new();
        let verdict = validator().validate(&draft);

        assert!(!verdict.is_valid);
        assert!(!verdict.fatal);
        assert_eq!(verdict.quality_score, 0.9);
    }

    #[test]
    fn test_context_without_relevance_penalized() {
        let mut draft = good_draft();
        draft.vector_context_used = true;
        draft.relevance_score = None;
        let verdict = validator().validate(&draft);

        assert!(!verdict.is_valid);
        assert_eq!(verdict.quality_score, 0.8);
    }

    #[test]
    fn test_context_with_relevance_passes() {
        let mut draft = good_draft();
        draft.vector_context_used = true;
        draft.relevance_score = Some(0.82);
        let verdict = validator().validate(&draft);

        assert!(verdict.is_valid);
        assert_eq!(verdict.quality_score, 1.0);
    }

    #[test]
    fn test_score_floored_at_zero() {
        let config = QualityConfig {
            short_text_penalty: 0.6,
            missing_answer_penalty: 0.6,
            ..QualityConfig::default()
        };
        let validator = QualityValidator::new(config);

        let draft = DraftQuestion {
            question: "?".to_string(),
            answer: String::new(),
            explanation: String::new(),
            service_used: String::new(),
            vector_context_used: true,
            relevance_score: None,
        };
        let verdict = validator.validate(&draft);

        assert_eq!(verdict.quality_score, 0.0);
        assert_eq!(verdict.issues.len(), 4);
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        let cases = [
            good_draft(),
            DraftQuestion {
                question: String::new(),
                answer: String::new(),
                explanation: String::new(),
                service_used: String::new(),
                vector_context_used: true,
                relevance_score: None,
            },
        ];
        for draft in &cases {
            let verdict = validator().validate(draft);
            assert!((0.0..=1.0).contains(&verdict.quality_score));
        }
    }
}
