//! Decision-quality metrics
//!
//! The explanation-need decision is a binary classifier; participants report
//! after each turn whether an explanation was actually needed. Standard
//! confusion-matrix metrics over those pairs tell the study how well the
//! heuristic calibrates.

use serde::Serialize;

/// Confusion matrix plus derived scores for the explanation-need classifier
#[derive(Debug, Clone, Default, Serialize)]
pub struct DecisionMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl DecisionMetrics {
    /// Build metrics from (explanation_given, was_needed) feedback pairs.
    pub fn from_feedback(pairs: &[(bool, bool)]) -> Self {
        let mut metrics = Self::default();

        for &(given, needed) in pairs {
            match (given, needed) {
                (true, true) => metrics.true_positives += 1,
                (true, false) => metrics.false_positives += 1,
                (false, false) => metrics.true_negatives += 1,
                (false, true) => metrics.false_negatives += 1,
            }
        }

        let total = pairs.len();
        if total > 0 {
            metrics.accuracy =
                (metrics.true_positives + metrics.true_negatives) as f64 / total as f64;
        }

        let predicted_positive = metrics.true_positives + metrics.false_positives;
        if predicted_positive > 0 {
            metrics.precision = metrics.true_positives as f64 / predicted_positive as f64;
        }

        let actual_positive = metrics.true_positives + metrics.false_negatives;
        if actual_positive > 0 {
            metrics.recall = metrics.true_positives as f64 / actual_positive as f64;
        }

        if metrics.precision + metrics.recall > 0.0 {
            metrics.f1 =
                2.0 * metrics.precision * metrics.recall / (metrics.precision + metrics.recall);
        }

        metrics
    }

    pub fn sample_count(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_feedback_outcomes() {
        let pairs = [(true, true), (true, false), (false, false), (false, true)];
        let metrics = DecisionMetrics::from_feedback(&pairs);
        assert_eq!(metrics.true_positives, 1);
        assert_eq!(metrics.false_positives, 1);
        assert_eq!(metrics.true_negatives, 1);
        assert_eq!(metrics.false_negatives, 1);
        assert!((metrics.accuracy - 0.5).abs() < 1e-9);
        assert!((metrics.precision - 0.5).abs() < 1e-9);
        assert!((metrics.recall - 0.5).abs() < 1e-9);
        assert!((metrics.f1 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_feedback_yields_zeroes() {
        let metrics = DecisionMetrics::from_feedback(&[]);
        assert_eq!(metrics.sample_count(), 0);
        assert_eq!(metrics.accuracy, 0.0);
        assert_eq!(metrics.f1, 0.0);
    }

    #[test]
    fn perfect_decisions_score_one() {
        let pairs = [(true, true), (false, false), (true, true)];
        let metrics = DecisionMetrics::from_feedback(&pairs);
        assert!((metrics.accuracy - 1.0).abs() < 1e-9);
        assert!((metrics.f1 - 1.0).abs() < 1e-9);
    }
}
