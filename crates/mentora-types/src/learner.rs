//! Learner profile types for Mentora.
//!
//! The structured profile is collected at onboarding and rendered into its
//! own prompt section, independently of extracted memories.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Self-reported experience level of a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperienceLevel::Beginner => write!(f, "beginner"),
            ExperienceLevel::Intermediate => write!(f, "intermediate"),
            ExperienceLevel::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" => Ok(ExperienceLevel::Advanced),
            other => Err(format!("invalid experience level: '{other}'")),
        }
    }
}

/// Preferred coaching pace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacePreference {
    Slow,
    Moderate,
    Fast,
}

impl fmt::Display for PacePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacePreference::Slow => write!(f, "slow"),
            PacePreference::Moderate => write!(f, "moderate"),
            PacePreference::Fast => write!(f, "fast"),
        }
    }
}

impl FromStr for PacePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "slow" => Ok(PacePreference::Slow),
            "moderate" => Ok(PacePreference::Moderate),
            "fast" => Ok(PacePreference::Fast),
            other => Err(format!("invalid pace preference: '{other}'")),
        }
    }
}

/// Structured profile of one learner.
///
/// All fields beyond the id are optional; an entirely empty profile
/// produces no prompt section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: Uuid,
    /// Current job role (e.g., "backend engineer").
    pub role: Option<String>,
    pub experience_level: Option<ExperienceLevel>,
    pub tech_stack: Vec<String>,
    pub goals: Vec<String>,
    /// Free-text learning-style preference (e.g., "hands-on examples").
    pub learning_style: Option<String>,
    pub pace_preference: Option<PacePreference>,
}

impl LearnerProfile {
    /// An empty profile for the given learner.
    pub fn empty(learner_id: Uuid) -> Self {
        Self {
            learner_id,
            role: None,
            experience_level: None,
            tech_stack: Vec::new(),
            goals: Vec::new(),
            learning_style: None,
            pace_preference: None,
        }
    }

    /// Whether no profile data has been collected.
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.experience_level.is_none()
            && self.tech_stack.is_empty()
            && self.goals.is_empty()
            && self.learning_style.is_none()
            && self.pace_preference.is_none()
    }
}
