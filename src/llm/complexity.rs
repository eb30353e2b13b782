//! Structural complexity scoring and SQL concept classification
//!
//! The 1-5 structural score is a keyword scan over the generated SQL text,
//! used by the decision engine as the per-query cognitive load signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL concept categories, ordered roughly by difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlConcept {
    BasicSelect,
    Aggregation,
    Joins,
    AdvancedLogic,
    WindowFunctions,
    AdvancedAnalytics,
    /// Business questions assessed before any SQL exists
    DataAnalysis,
    /// Failed executions are classified here so the user is always told why
    ErrorHandling,
}

impl SqlConcept {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlConcept::BasicSelect => "basic_select",
            SqlConcept::Aggregation => "aggregation",
            SqlConcept::Joins => "joins",
            SqlConcept::AdvancedLogic => "advanced_logic",
            SqlConcept::WindowFunctions => "window_functions",
            SqlConcept::AdvancedAnalytics => "advanced_analytics",
            SqlConcept::DataAnalysis => "data_analysis",
            SqlConcept::ErrorHandling => "error_handling",
        }
    }

    /// Concepts that exist as skill levels on a user profile
    pub fn is_skill_concept(&self) -> bool {
        !matches!(self, SqlConcept::DataAnalysis | SqlConcept::ErrorHandling)
    }
}

impl fmt::Display for SqlConcept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_window_function(upper: &str) -> bool {
    upper.contains(" OVER (")
        || upper.contains(" OVER(")
        || upper.contains("PARTITION BY")
        || upper.contains("ROW_NUMBER(")
        || upper.contains("RANK(")
        || upper.contains("DENSE_RANK(")
}

fn has_cte(upper: &str) -> bool {
    upper.trim_start().starts_with("WITH ") || upper.contains("RECURSIVE")
}

/// Assess SQL query complexity on the 1-5 structural scale.
///
/// The score is the maximum matched tier:
/// 2 for filtering/grouping, 3 for joins, 4 for complex logic,
/// 5 for window functions, CTEs, or multiple joins.
pub fn structural_complexity(sql: &str) -> u8 {
    let upper = sql.to_uppercase();
    let mut score = 1;

    if upper.contains("WHERE") || upper.contains("GROUP BY") || upper.contains("ORDER BY") {
        score = score.max(2);
    }
    if upper.contains("JOIN") {
        score = score.max(3);
    }
    if upper.contains("HAVING") || upper.contains("CASE WHEN") {
        score = score.max(4);
    }
    if has_window_function(&upper) || has_cte(&upper) {
        score = score.max(5);
    }

    // Subqueries and multi-join statements bump the tier
    if upper.matches("SELECT").count() > 1 {
        score = score.max(4);
    }
    if upper.matches("JOIN").count() > 1 {
        score = score.max(5);
    }

    score.min(5)
}

/// Classify a SQL statement into its dominant concept category.
/// Most specific concepts are checked first.
pub fn classify_sql_concept(sql: &str) -> SqlConcept {
    let upper = sql.to_uppercase();

    if has_cte(&upper) {
        return SqlConcept::AdvancedAnalytics;
    }
    if has_window_function(&upper) {
        return SqlConcept::WindowFunctions;
    }
    if upper.contains("CASE WHEN") || upper.contains("UNION") || upper.contains("EXISTS")
        || upper.matches("SELECT").count() > 1
    {
        return SqlConcept::AdvancedLogic;
    }
    if upper.contains("JOIN") {
        return SqlConcept::Joins;
    }
    if ["GROUP BY", "ORDER BY", "HAVING", "SUM(", "COUNT(", "AVG(", "MAX(", "MIN("]
        .iter()
        .any(|kw| upper.contains(kw))
    {
        return SqlConcept::Aggregation;
    }

    SqlConcept::BasicSelect
}
