//! Explanation Decision Engine
//!
//! Two interchangeable strategies produce a [`CognitiveAssessment`]:
//! a delegated strategy that asks the completion model to score the task
//! against the CLT/CFT framework, and a deterministic keyword fallback used
//! whenever the delegated call fails or returns unparseable output. A third,
//! simpler variant serves ongoing chat turns where the translator's
//! structural score already exists.
//!
//! All comparisons happen on one canonical 0-10 band: structural 1-5 scores
//! and 1-5 expertise levels are doubled at this boundary.

use crate::assessment::{CognitiveAssessment, ComplexityBreakdown, ExplanationTier};
use crate::dataset::QueryResult;
use crate::llm::client::{extract_json_block, TextCompletion};
use crate::llm::complexity::{classify_sql_concept, SqlConcept};
use crate::profile::UserProfile;
use serde::Deserialize;
use std::sync::Arc;

/// Double a 1-5 score onto the canonical 0-10 band
fn canonical(score: u8) -> f64 {
    f64::from(score) * 2.0
}

/// Keyword buckets for the deterministic fallback, checked in order
const HIGH_LOAD_KEYWORDS: [&str; 7] = [
    "forecast",
    "predict",
    "model",
    "regression",
    "correlation",
    "trend",
    "pattern",
];
const MEDIUM_LOAD_KEYWORDS: [&str; 6] = [
    "compare",
    "analyze",
    "segment",
    "group",
    "aggregate",
    "summarize",
];
const LOW_LOAD_KEYWORDS: [&str; 6] = ["show", "list", "find", "count", "basic", "simple"];

#[derive(Deserialize)]
struct DelegatedBreakdown {
    data_dimensionality: f64,
    analytical_complexity: f64,
    presentation_complexity: f64,
    temporal_pressure: f64,
    #[serde(default)]
    cft_misfit_penalty: f64,
}

#[derive(Deserialize)]
struct DelegatedAssessment {
    #[serde(default = "default_classification")]
    task_classification: String,
    complexity_breakdown: DelegatedBreakdown,
    #[serde(default)]
    reasoning: String,
}

fn default_classification() -> String {
    "Data Analysis".to_string()
}

#[derive(Deserialize)]
struct ChatDecision {
    explanation_needed: bool,
    explanation_type: String,
    reasoning: String,
}

/// Decides whether a user needs an explanation for a task
pub struct DecisionEngine {
    client: Arc<dyn TextCompletion>,
}

impl DecisionEngine {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    /// Full assessment of a natural-language question before any SQL exists.
    /// Delegates to the completion model; falls back to the keyword
    /// heuristic on any transport or parse failure.
    pub async fn assess_question(
        &self,
        question: &str,
        profile: &UserProfile,
    ) -> CognitiveAssessment {
        match self.delegated_assessment(question, profile).await {
            Ok(assessment) => assessment,
            Err(err) => {
                tracing::warn!(error = %err, "delegated assessment failed, using heuristic fallback");
                self.fallback_question_assessment(question, profile)
            }
        }
    }

    async fn delegated_assessment(
        &self,
        question: &str,
        profile: &UserProfile,
    ) -> anyhow::Result<CognitiveAssessment> {
        let threshold = profile.capability_threshold();
        let level = profile.level();

        let system_prompt = r#"You are an expert Task Complexity Assessment Agent evaluating data analysis tasks using Cognitive Load Theory (CLT) and Cognitive Fit Theory (CFT).

First classify the task as "Data Analysis" or "Non-Data Analysis".

Then score four sub-dimensions of intrinsic cognitive load, each on a 1-10 scale:
- data_dimensionality (variables, relationships, temporal elements)
- analytical_complexity (statistical concepts, calculation depth, interpretation depth)
- presentation_complexity (visualization and output format demands)
- temporal_pressure (decision urgency)

Finally estimate cft_misfit_penalty (0-3) for mismatches between the task
structure and the user's stated preferences and expertise.

Return ONLY a valid JSON object:
{
    "task_classification": "Data Analysis" or "Non-Data Analysis",
    "complexity_breakdown": {
        "data_dimensionality": float,
        "analytical_complexity": float,
        "presentation_complexity": float,
        "temporal_pressure": float,
        "cft_misfit_penalty": float
    },
    "reasoning": "brief justification"
}"#;

        let user_prompt = format!(
            r#"User Query: "{question}"

User Context:
- User Level: {level}
- User Capability Threshold: {threshold}
- SQL Expertise: {expertise}/5
- Cognitive Load Capacity: {capacity}/5

Assess the task."#,
            question = question,
            level = level.as_str(),
            threshold = threshold,
            expertise = profile.sql_expertise_level,
            capacity = profile.cognitive_load_capacity,
        );

        let raw = self.client.complete(system_prompt, &user_prompt).await?;
        let parsed: DelegatedAssessment = serde_json::from_str(&extract_json_block(&raw))?;

        // Weighted sum and threshold comparison are recomputed here so the
        // decision itself stays deterministic given the sub-scores.
        let breakdown = ComplexityBreakdown::weighted(
            parsed.complexity_breakdown.data_dimensionality,
            parsed.complexity_breakdown.analytical_complexity,
            parsed.complexity_breakdown.presentation_complexity,
            parsed.complexity_breakdown.temporal_pressure,
            parsed.complexity_breakdown.cft_misfit_penalty,
        );
        let final_score = breakdown.final_complexity_score;
        let explanation_needed = final_score > threshold;
        let explanation_type = ExplanationTier::for_gap(final_score - threshold);

        Ok(CognitiveAssessment {
            intrinsic_load: breakdown.intrinsic_load,
            task_concept: SqlConcept::DataAnalysis,
            explanation_needed,
            explanation_type,
            capability_threshold: threshold,
            reasoning: if parsed.reasoning.is_empty() {
                "Delegated CLT/CFT assessment".to_string()
            } else {
                parsed.reasoning
            },
            task_classification: parsed.task_classification,
            complexity_breakdown: breakdown,
            final_complexity_score: final_score,
        })
    }

    /// Deterministic keyword heuristic used when the delegated call fails.
    pub fn fallback_question_assessment(
        &self,
        question: &str,
        profile: &UserProfile,
    ) -> CognitiveAssessment {
        let load = heuristic_load(question);
        let threshold = profile.capability_threshold();
        let explanation_needed = load > threshold;

        CognitiveAssessment {
            intrinsic_load: load,
            task_concept: SqlConcept::DataAnalysis,
            explanation_needed,
            explanation_type: if explanation_needed {
                ExplanationTier::for_gap(load - threshold)
            } else {
                ExplanationTier::None
            },
            capability_threshold: threshold,
            reasoning: format!(
                "Fallback assessment: Task complexity {}, User capability {}",
                load, threshold
            ),
            task_classification: "Data Analysis".to_string(),
            complexity_breakdown: ComplexityBreakdown::proportional(load),
            final_complexity_score: load,
        }
    }

    /// Per-query assessment for ongoing chat turns: the translator's
    /// structural score is compared against the user's expertise, and the
    /// model is asked whether this user needs an explanation for this SQL.
    ///
    /// A failed execution short-circuits to a forced error-handling
    /// assessment - users are always told why a failure occurred.
    pub async fn assess_query(
        &self,
        result: &QueryResult,
        profile: &UserProfile,
    ) -> CognitiveAssessment {
        if !result.success {
            return CognitiveAssessment::execution_failure();
        }

        let concept = classify_sql_concept(&result.sql_text);
        let load = canonical(result.complexity_score);
        let threshold = canonical(profile.sql_expertise_level);

        let decision = match self
            .chat_decision(profile, result.complexity_score, concept, &result.sql_text)
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(error = %err, "explanation decision call failed, using fallback");
                fallback_chat_decision(result.complexity_score, profile.sql_expertise_level)
            }
        };

        tracing::info!(
            concept = %concept,
            load,
            expertise = profile.sql_expertise_level,
            explanation = decision.0,
            "query assessment"
        );

        CognitiveAssessment {
            intrinsic_load: load,
            task_concept: concept,
            explanation_needed: decision.0,
            explanation_type: if decision.0 {
                decision.1
            } else {
                ExplanationTier::None
            },
            capability_threshold: threshold,
            reasoning: decision.2,
            task_classification: "Data Analysis".to_string(),
            complexity_breakdown: ComplexityBreakdown::proportional(load),
            final_complexity_score: load,
        }
    }

    async fn chat_decision(
        &self,
        profile: &UserProfile,
        complexity: u8,
        concept: SqlConcept,
        sql: &str,
    ) -> anyhow::Result<(bool, ExplanationTier, String)> {
        let system_prompt = r#"You are an expert educational assessment system for SQL learning. Decide whether a user needs an explanation for a SQL query based on their expertise level and the task complexity.

EXPERTISE LEVELS:
- Level 1: Complete beginner (never used SQL)
- Level 2: Novice (basic SELECT statements)
- Level 3: Intermediate (JOINs, GROUP BY, subqueries)
- Level 4: Advanced (window functions, CTEs, optimization)
- Level 5: Expert (database design, complex analytics)

EXPLANATION TYPES:
- "basic": Simple, step-by-step explanation for beginners
- "intermediate": Moderate detail for those with some experience
- "advanced": Focused on complex concepts and optimization
- "none": No explanation needed

DECISION CRITERIA:
- Users typically need explanations when encountering concepts 1-2 levels above their expertise
- Very experienced users (level 4-5) rarely need explanations unless encountering very advanced concepts
- Consider the specific SQL concept involved and whether it is new to the user's level

Respond in this JSON format:
{
  "explanation_needed": true/false,
  "explanation_type": "basic/intermediate/advanced/none",
  "reasoning": "Brief explanation of your decision"
}"#;

        let user_prompt = format!(
            "User SQL Expertise Level: {}/5\nTask Complexity Score: {}/5\nSQL Concept Category: {}\n\nSQL Query to Assess:\n{}\n\nShould this user receive an explanation for this query? What type of explanation would be most appropriate?",
            profile.sql_expertise_level, complexity, concept, sql
        );

        let raw = self.client.complete(system_prompt, &user_prompt).await?;
        let parsed: ChatDecision = serde_json::from_str(&extract_json_block(&raw))?;

        let tier = ExplanationTier::parse(&parsed.explanation_type)
            .unwrap_or_else(|| fallback_tier(profile.sql_expertise_level));

        Ok((parsed.explanation_needed, tier, parsed.reasoning))
    }
}

/// Heuristic 1-10 load from keyword buckets in the question text
fn heuristic_load(question: &str) -> f64 {
    let lower = question.to_lowercase();

    if HIGH_LOAD_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        8.0
    } else if MEDIUM_LOAD_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        5.0
    } else if LOW_LOAD_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        2.0
    } else {
        5.0
    }
}

/// Deterministic chat-turn decision: explanation needed exactly when the
/// structural complexity exceeds the user's expertise. Equality never
/// triggers an explanation.
pub fn fallback_chat_decision(complexity: u8, expertise: u8) -> (bool, ExplanationTier, String) {
    if complexity > expertise {
        (
            true,
            fallback_tier(expertise),
            format!(
                "Fallback: Task complexity ({}) > User expertise ({})",
                complexity, expertise
            ),
        )
    } else {
        (
            false,
            ExplanationTier::None,
            format!(
                "Fallback: User can handle task complexity ({}) with expertise level ({})",
                complexity, expertise
            ),
        )
    }
}

fn fallback_tier(expertise: u8) -> ExplanationTier {
    if expertise <= 2 {
        ExplanationTier::Basic
    } else if expertise == 3 {
        ExplanationTier::Intermediate
    } else {
        ExplanationTier::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_decision_is_strict_comparison() {
        for complexity in 1..=5u8 {
            for expertise in 1..=5u8 {
                let (needed, _, _) = fallback_chat_decision(complexity, expertise);
                assert_eq!(needed, complexity > expertise);
            }
        }
    }

    #[test]
    fn fallback_tier_follows_expertise() {
        assert_eq!(fallback_chat_decision(5, 1).1, ExplanationTier::Basic);
        assert_eq!(fallback_chat_decision(5, 3).1, ExplanationTier::Intermediate);
        assert_eq!(fallback_chat_decision(5, 4).1, ExplanationTier::Advanced);
    }

    #[test]
    fn heuristic_load_buckets() {
        assert_eq!(heuristic_load("Forecast next quarter sales"), 8.0);
        assert_eq!(heuristic_load("Compare regions by profit"), 5.0);
        assert_eq!(heuristic_load("Show me the orders"), 2.0);
        // "discounts" contains "count", so the lookup bucket matches
        assert_eq!(heuristic_load("What about discounts?"), 2.0);
        assert_eq!(heuristic_load("Which products earn the most?"), 5.0);
    }
}
