//! Cognitive assessment - the pivot values the decision engine produces and
//! the synthesizer, shaper, and logger consume

pub mod decision;
pub mod shaper;
pub mod synthesizer;

use crate::llm::complexity::SqlConcept;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use decision::DecisionEngine;
pub use shaper::shape_result;
pub use synthesizer::ExplanationSynthesizer;

/// How elaborate a generated explanation should be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationTier {
    None,
    Basic,
    Intermediate,
    Advanced,
    /// Failed executions always get an explanation of what went wrong
    ErrorHandling,
}

impl ExplanationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationTier::None => "none",
            ExplanationTier::Basic => "basic",
            ExplanationTier::Intermediate => "intermediate",
            ExplanationTier::Advanced => "advanced",
            ExplanationTier::ErrorHandling => "error_handling",
        }
    }

    /// Parse a tier label from model output; anything unrecognized is `None`
    /// here and callers substitute their own fallback.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "none" => Some(ExplanationTier::None),
            "basic" => Some(ExplanationTier::Basic),
            "intermediate" => Some(ExplanationTier::Intermediate),
            "advanced" => Some(ExplanationTier::Advanced),
            "error_handling" => Some(ExplanationTier::ErrorHandling),
            _ => None,
        }
    }

    /// Tier from the load-over-threshold gap: wider gap, more elaborate
    /// explanation.
    pub fn for_gap(gap: f64) -> Self {
        if gap <= 0.0 {
            ExplanationTier::None
        } else if gap < 2.0 {
            ExplanationTier::Basic
        } else if gap < 4.0 {
            ExplanationTier::Intermediate
        } else {
            ExplanationTier::Advanced
        }
    }
}

impl fmt::Display for ExplanationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-scores behind an intrinsic-load figure.
/// Weights: data dimensionality 0.3, analytical complexity 0.4,
/// presentation complexity 0.2, temporal pressure 0.1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityBreakdown {
    pub data_dimensionality: f64,
    pub analytical_complexity: f64,
    pub presentation_complexity: f64,
    pub temporal_pressure: f64,
    pub intrinsic_load: f64,
    pub cft_misfit_penalty: f64,
    pub final_complexity_score: f64,
}

impl ComplexityBreakdown {
    /// Weighted combination of the four sub-dimensions plus the 0-3
    /// cognitive-fit misfit penalty, clamped onto the 1-10 band.
    pub fn weighted(
        data_dimensionality: f64,
        analytical_complexity: f64,
        presentation_complexity: f64,
        temporal_pressure: f64,
        cft_misfit_penalty: f64,
    ) -> Self {
        let intrinsic_load = data_dimensionality * 0.3
            + analytical_complexity * 0.4
            + presentation_complexity * 0.2
            + temporal_pressure * 0.1;
        let penalty = cft_misfit_penalty.clamp(0.0, 3.0);
        let final_complexity_score = (intrinsic_load + penalty).clamp(1.0, 10.0);

        Self {
            data_dimensionality,
            analytical_complexity,
            presentation_complexity,
            temporal_pressure,
            intrinsic_load,
            cft_misfit_penalty: penalty,
            final_complexity_score,
        }
    }

    /// Degenerate breakdown used when only a single load figure exists
    /// (fallback heuristic and per-query chat assessments).
    pub fn proportional(load: f64) -> Self {
        Self {
            data_dimensionality: load * 0.3,
            analytical_complexity: load * 0.4,
            presentation_complexity: load * 0.2,
            temporal_pressure: load * 0.1,
            intrinsic_load: load,
            cft_misfit_penalty: 0.0,
            final_complexity_score: load,
        }
    }
}

/// Result of the explanation-need decision for one query.
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveAssessment {
    /// Canonical 1-10 task load
    pub intrinsic_load: f64,
    pub task_concept: SqlConcept,
    pub explanation_needed: bool,
    pub explanation_type: ExplanationTier,
    /// Capability ceiling on the same 0-10 band
    pub capability_threshold: f64,
    pub reasoning: String,
    pub task_classification: String,
    pub complexity_breakdown: ComplexityBreakdown,
    pub final_complexity_score: f64,
}

impl CognitiveAssessment {
    /// Forced assessment for failed executions: users are always told why a
    /// failure occurred, regardless of scores.
    pub fn execution_failure() -> Self {
        Self {
            intrinsic_load: 5.0,
            task_concept: SqlConcept::ErrorHandling,
            explanation_needed: true,
            explanation_type: ExplanationTier::ErrorHandling,
            capability_threshold: 5.0,
            reasoning: "Query execution failed due to system error".to_string(),
            task_classification: "Error Handling".to_string(),
            complexity_breakdown: ComplexityBreakdown::proportional(5.0),
            final_complexity_score: 5.0,
        }
    }
}

/// Generated explanation content; a sentinel value stands in when no
/// explanation is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationContent {
    pub explanation_text: String,
    pub sql_concepts: Vec<String>,
    pub learning_objectives: Vec<String>,
    pub complexity_level: String,
    pub estimated_cognitive_load: u8,
}

impl ExplanationContent {
    /// Fixed sentinel for turns where no explanation is needed
    pub fn none() -> Self {
        Self {
            explanation_text: "No explanation needed - you can handle this query complexity."
                .to_string(),
            sql_concepts: Vec::new(),
            learning_objectives: Vec::new(),
            complexity_level: "none".to_string(),
            estimated_cognitive_load: 1,
        }
    }

    /// Safe placeholder when the generation call fails
    pub fn fallback() -> Self {
        Self {
            explanation_text: "Sorry, I couldn't generate an explanation at this time.".to_string(),
            sql_concepts: Vec::new(),
            learning_objectives: Vec::new(),
            complexity_level: "error".to_string(),
            estimated_cognitive_load: 1,
        }
    }
}
