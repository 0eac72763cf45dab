//! Learner personas and the persona store capability.
//!
//! The workflow receives a read-only persona snapshot with each request;
//! ownership of personas lives outside the core behind the get/put
//! [`PersonaStore`] capability.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::question::Difficulty;

/// How a learner prefers to absorb material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    /// Diagrams, charts, spatial framing.
    #[default]
    Visual,
    /// Spoken or narrative framing.
    Auditory,
    /// Hands-on, manipulable framing.
    Kinesthetic,
    /// Text-first framing.
    ReadingWriting,
}

/// Self-reported performance band used for difficulty calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Struggling,
    #[default]
    OnTrack,
    Advanced,
}

/// A learner persona snapshot.
///
/// Interests are capped at 5 and motivators at 3 by [`Persona::normalized`];
/// downstream stages rely on those bounds when building prompts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Persona {
    pub learning_style: LearningStyle,
    pub interests: Vec<String>,
    pub motivators: Vec<String>,
    pub cultural_context: String,
    pub preferred_difficulty: Option<Difficulty>,
    pub performance_level: PerformanceLevel,
}

impl Persona {
    /// Maximum interests retained on a persona.
    pub const MAX_INTERESTS: usize = 5;
    /// Maximum motivators retained on a persona.
    pub const MAX_MOTIVATORS: usize = 3;

    /// Return a copy with interests and motivators truncated to their caps.
    pub fn normalized(mut self) -> Self {
        self.interests.truncate(Self::MAX_INTERESTS);
        self.motivators.truncate(Self::MAX_MOTIVATORS);
        self
    }
}

/// Key-value persona storage capability.
///
/// The core only needs get/put semantics; persistence is someone else's
/// problem.
pub trait PersonaStore: Send + Sync {
    /// Fetch a persona by learner id.
    fn get(&self, learner_id: &str) -> Option<Persona>;

    /// Store or replace a persona.
    fn put(&self, learner_id: &str, persona: Persona);
}

/// In-memory persona store for tests and the demo binary.
#[derive(Debug, Default)]
pub struct InMemoryPersonaStore {
    personas: RwLock<HashMap<String, Persona>>,
}

impl InMemoryPersonaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersonaStore for InMemoryPersonaStore {
    fn get(&self, learner_id: &str) -> Option<Persona> {
        self.personas
            .read()
            .expect("persona store lock poisoned")
            .get(learner_id)
            .cloned()
    }

    fn put(&self, learner_id: &str, persona: Persona) {
        self.personas
            .write()
            .expect("persona store lock poisoned")
            .insert(learner_id.to_string(), persona.normalized());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_normalized_truncates() {
        let persona = Persona {
            interests: (0..8).map(|i| format!("interest-{}", i)).collect(),
            motivators: (0..5).map(|i| format!("motivator-{}", i)).collect(),
            ..Persona::default()
        }
        .normalized();

        assert_eq!(persona.interests.len(), Persona::MAX_INTERESTS);
        assert_eq!(persona.motivators.len(), Persona::MAX_MOTIVATORS);
    }

    #[test]
    fn test_in_memory_store_get_put() {
        let store = InMemoryPersonaStore::new();
        assert!(store.get("learner-1").is_none());

        let persona = Persona {
            interests: vec!["dinosaurs".to_string()],
            ..Persona::default()
        };
        store.put("learner-1", persona);

        let fetched = store.get("learner-1").expect("persona should exist");
        assert_eq!(fetched.interests, vec!["dinosaurs"]);
    }

    #[test]
    fn test_put_replaces_existing() {
        let store = InMemoryPersonaStore::new();
        store.put(
            "learner-1",
            Persona {
                cultural_context: "first".to_string(),
                ..Persona::default()
            },
        );
        store.put(
            "learner-1",
            Persona {
                cultural_context: "second".to_string(),
                ..Persona::default()
            },
        );

        let fetched = store.get("learner-1").expect("persona should exist");
        assert_eq!(fetched.cultural_context, "second");
    }
}
