//! User profiles and capability estimation
//!
//! A profile is a fixed-shape record: expertise, derived cognitive capacity,
//! per-concept skill levels, a bounded interaction history, and optional
//! demographics from the onboarding questionnaire. Profiles persist as JSON
//! keyed by user id and are read-modify-written under the store lock so
//! concurrent turns from one user cannot lose history appends.

use crate::error::{AssistantError, Result};
use crate::llm::complexity::SqlConcept;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Most-recent-N bound on the per-profile interaction history
const HISTORY_LIMIT: usize = 10;

/// Ordinal user level from the onboarding assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserLevel {
    Beginner,
    Novice,
    Intermediate,
    Advanced,
    Expert,
}

impl UserLevel {
    /// Capability ceiling on the canonical 0-10 load scale
    pub fn capability_threshold(&self) -> f64 {
        match self {
            UserLevel::Beginner => 3.0,
            UserLevel::Novice => 4.5,
            UserLevel::Intermediate => 6.5,
            UserLevel::Advanced => 8.5,
            UserLevel::Expert => 10.0,
        }
    }

    /// Band a 0-20 assessment total into a level
    pub fn from_total_score(total: u8) -> Self {
        match total {
            0..=4 => UserLevel::Beginner,
            5..=8 => UserLevel::Novice,
            9..=12 => UserLevel::Intermediate,
            13..=16 => UserLevel::Advanced,
            _ => UserLevel::Expert,
        }
    }

    /// Fallback mapping when only the 1-5 expertise level is known
    pub fn from_expertise(expertise: u8) -> Self {
        match expertise {
            0 | 1 => UserLevel::Beginner,
            2 => UserLevel::Novice,
            3 => UserLevel::Intermediate,
            4 => UserLevel::Advanced,
            _ => UserLevel::Expert,
        }
    }

    pub fn expertise_level(&self) -> u8 {
        match self {
            UserLevel::Beginner => 1,
            UserLevel::Novice => 2,
            UserLevel::Intermediate => 3,
            UserLevel::Advanced => 4,
            UserLevel::Expert => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Beginner => "Beginner",
            UserLevel::Novice => "Novice",
            UserLevel::Intermediate => "Intermediate",
            UserLevel::Advanced => "Advanced",
            UserLevel::Expert => "Expert",
        }
    }
}

/// Answer to a concept-familiarity question in the onboarding form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Familiarity {
    Yes,
    Somewhat,
    No,
}

/// Five domain sub-scores (0-4 each) from the onboarding questionnaire
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AssessmentScores {
    pub data_analysis_fundamentals: u8,
    pub business_analytics: u8,
    pub forecasting_statistics: u8,
    pub data_visualization: u8,
    pub domain_knowledge_retail: u8,
}

impl AssessmentScores {
    /// Score one domain from its 1-5 self-rating and two familiarity answers.
    /// Ratings of 4-5 start at 4, a rating of 3 starts at 2, lower starts
    /// at 1; full familiarity adds one, any "no" subtracts one; clamped 0-4.
    pub fn domain_score(self_rating: u8, first: Familiarity, second: Familiarity) -> u8 {
        let mut score: i8 = if self_rating >= 4 {
            4
        } else if self_rating == 3 {
            2
        } else {
            1
        };

        if first == Familiarity::Yes && second == Familiarity::Yes {
            score = (score + 1).min(4);
        } else if first == Familiarity::No || second == Familiarity::No {
            score = (score - 1).max(0);
        }

        score as u8
    }

    /// Total assessment score, 0-20
    pub fn total(&self) -> u8 {
        self.data_analysis_fundamentals
            + self.business_analytics
            + self.forecasting_statistics
            + self.data_visualization
            + self.domain_knowledge_retail
    }

    pub fn level(&self) -> UserLevel {
        UserLevel::from_total_score(self.total())
    }
}

/// One remembered interaction in the profile history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionSummary {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub concept: SqlConcept,
    pub intrinsic_load: f64,
    pub explanation_provided: bool,
    pub explanation_type: String,
}

/// Optional demographic fields captured during onboarding
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Demographics {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub profession: Option<String>,
    pub education_level: Option<String>,
}

/// User cognitive profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// 1-5 scale, novice to expert
    pub sql_expertise_level: u8,
    /// 1-5 scale working-memory capacity, derived from expertise
    pub cognitive_load_capacity: u8,
    pub sql_concept_levels: HashMap<SqlConcept, u8>,
    pub prior_query_history: Vec<InteractionSummary>,
    pub explanation_style: String,
    pub user_level_category: UserLevel,
    pub assessment: Option<AssessmentScores>,
    pub age: u32,
    pub gender: String,
    pub profession: String,
    pub education_level: String,
    pub last_updated: DateTime<Utc>,
}

fn concept_levels_for(expertise: u8) -> HashMap<SqlConcept, u8> {
    let e = expertise.max(1);
    HashMap::from([
        (SqlConcept::BasicSelect, e.min(3)),
        (SqlConcept::Aggregation, e.saturating_sub(1).max(1)),
        (SqlConcept::Joins, e.saturating_sub(2).max(1)),
        (SqlConcept::AdvancedLogic, e.saturating_sub(3).max(1)),
        (SqlConcept::WindowFunctions, e.saturating_sub(4).max(1)),
        (SqlConcept::AdvancedAnalytics, e.saturating_sub(4).max(1)),
    ])
}

impl UserProfile {
    /// Default mid-level profile used when no assessment exists yet.
    /// Capacity is kept low so new users get explanations until the
    /// questionnaire says otherwise.
    pub fn default_for(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            user_id,
            sql_expertise_level: 2,
            cognitive_load_capacity: 2,
            sql_concept_levels: concept_levels_for(2),
            prior_query_history: Vec::new(),
            explanation_style: "step_by_step".to_string(),
            user_level_category: UserLevel::Novice,
            assessment: None,
            age: 25,
            gender: "Not specified".to_string(),
            profession: "Student".to_string(),
            education_level: "Bachelor".to_string(),
            last_updated: Utc::now(),
        }
    }

    /// Build a profile from a completed onboarding assessment.
    pub fn from_assessment(
        user_id: impl Into<String>,
        scores: AssessmentScores,
        demographics: Demographics,
    ) -> Self {
        let level = scores.level();
        let expertise = level.expertise_level();

        let mut profile = Self::default_for(user_id);
        profile.sql_expertise_level = expertise;
        profile.cognitive_load_capacity = expertise.saturating_sub(1).clamp(1, 3);
        profile.sql_concept_levels = concept_levels_for(expertise);
        profile.user_level_category = level;
        profile.assessment = Some(scores);
        if let Some(age) = demographics.age {
            profile.age = age;
        }
        if let Some(gender) = demographics.gender {
            profile.gender = gender;
        }
        if let Some(profession) = demographics.profession {
            profile.profession = profession;
        }
        if let Some(education) = demographics.education_level {
            profile.education_level = education;
        }
        profile.last_updated = Utc::now();
        profile
    }

    pub fn level(&self) -> UserLevel {
        self.user_level_category
    }

    /// Capability ceiling on the canonical 0-10 load scale
    pub fn capability_threshold(&self) -> f64 {
        self.level().capability_threshold()
    }

    pub fn concept_level(&self, concept: SqlConcept) -> u8 {
        self.sql_concept_levels.get(&concept).copied().unwrap_or(1)
    }

    /// Append an interaction to the bounded history and, when the user
    /// handled a demanding query without needing help, bump the concept
    /// skill level.
    pub fn record_interaction(&mut self, summary: InteractionSummary, handled_unaided: bool) {
        if handled_unaided && summary.concept.is_skill_concept() {
            let level = self.sql_concept_levels.entry(summary.concept).or_insert(1);
            *level = (*level + 1).min(5);
            tracing::debug!(
                concept = %summary.concept,
                level = *level,
                "increased concept skill level"
            );
        }

        self.prior_query_history.push(summary);
        if self.prior_query_history.len() > HISTORY_LIMIT {
            let excess = self.prior_query_history.len() - HISTORY_LIMIT;
            self.prior_query_history.drain(..excess);
        }

        self.last_updated = Utc::now();
    }
}

/// File-backed profile store, one JSON document keyed by user id
pub struct ProfileStore {
    path: PathBuf,
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl ProfileStore {
    /// Load the store. A missing file starts empty; a corrupt file is
    /// reported and replaced rather than failing the service.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let profiles = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    tracing::error!(error = %err, path = %path.display(), "corrupt profile store, starting fresh");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no existing user profiles, starting fresh");
                HashMap::new()
            }
            Err(err) => {
                return Err(AssistantError::storage_with_path(
                    err.to_string(),
                    path.display().to_string(),
                ))
            }
        };

        Ok(Self {
            path,
            profiles: Mutex::new(profiles),
        })
    }

    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(user_id).cloned()
    }

    /// Fetch a profile, synthesizing the default mid-level profile when the
    /// user has no stored entry.
    pub fn get_or_default(&self, user_id: &str) -> UserProfile {
        self.get(user_id)
            .unwrap_or_else(|| UserProfile::default_for(user_id))
    }

    /// Insert or replace a profile and persist the store.
    pub fn upsert(&self, profile: UserProfile) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(profile.user_id.clone(), profile);
        self.persist(&profiles)
    }

    /// Atomic read-modify-write for one user's profile.
    pub fn update<F>(&self, user_id: &str, mutate: F) -> Result<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::default_for(user_id));
        mutate(profile);
        let updated = profile.clone();
        self.persist(&profiles)?;
        Ok(updated)
    }

    fn persist(&self, profiles: &HashMap<String, UserProfile>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(profiles)?;
        std::fs::write(&self.path, json).map_err(|e| {
            AssistantError::storage_with_path(e.to_string(), self.path.display().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_intermediate_scores_map_to_intermediate() {
        let scores = AssessmentScores {
            data_analysis_fundamentals: 2,
            business_analytics: 2,
            forecasting_statistics: 2,
            data_visualization: 2,
            domain_knowledge_retail: 2,
        };
        assert_eq!(scores.total(), 10);
        assert_eq!(scores.level(), UserLevel::Intermediate);
    }

    #[test]
    fn domain_score_adjusts_for_familiarity() {
        assert_eq!(
            AssessmentScores::domain_score(4, Familiarity::Yes, Familiarity::Yes),
            4
        );
        assert_eq!(
            AssessmentScores::domain_score(3, Familiarity::Yes, Familiarity::Yes),
            3
        );
        assert_eq!(
            AssessmentScores::domain_score(2, Familiarity::No, Familiarity::Somewhat),
            0
        );
    }

    #[test]
    fn capability_thresholds_follow_levels() {
        assert_eq!(UserLevel::Beginner.capability_threshold(), 3.0);
        assert_eq!(UserLevel::Expert.capability_threshold(), 10.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut profile = UserProfile::default_for("u1");
        for i in 0..15 {
            profile.record_interaction(
                InteractionSummary {
                    timestamp: Utc::now(),
                    question: format!("q{}", i),
                    concept: SqlConcept::BasicSelect,
                    intrinsic_load: 2.0,
                    explanation_provided: false,
                    explanation_type: "none".to_string(),
                },
                false,
            );
        }
        assert_eq!(profile.prior_query_history.len(), 10);
        assert_eq!(profile.prior_query_history[0].question, "q5");
    }

    #[test]
    fn store_roundtrip_and_default_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        let store = ProfileStore::load(&path).unwrap();
        assert!(store.get("anyone").is_none());
        let default = store.get_or_default("anyone");
        assert_eq!(default.sql_expertise_level, 2);

        store
            .update("anyone", |profile| {
                profile.sql_expertise_level = 4;
            })
            .unwrap();

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.get("anyone").unwrap().sql_expertise_level, 4);
    }
}
