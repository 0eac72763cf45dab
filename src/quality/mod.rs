//! Quality validation for generated questions.

mod validator;

pub use validator::{QualityValidator, QualityVerdict};
