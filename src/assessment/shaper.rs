//! Result Shaper - cognitive-load-based display budget
//!
//! High-complexity results are trimmed harder for low-capacity users so a
//! wall of rows never lands on someone the decision engine already flagged
//! as overloaded. This is a display budget, not pagination.

use crate::assessment::CognitiveAssessment;
use crate::dataset::QueryResult;
use crate::profile::UserProfile;

/// Rows shown when the task load exceeds the user's capacity
const OVERLOAD_ROW_LIMIT: usize = 5;
/// Rows shown otherwise
const NORMAL_ROW_LIMIT: usize = 15;

/// Produce a row-limited copy of a successful result. Failures and empty
/// results pass through untouched; the original is never mutated.
pub fn shape_result(
    result: &QueryResult,
    assessment: &CognitiveAssessment,
    profile: &UserProfile,
) -> QueryResult {
    let mut shaped = result.clone();

    if !result.success {
        return shaped;
    }

    if let Some(data) = shaped.data.as_mut() {
        let limit = if assessment.intrinsic_load > f64::from(profile.cognitive_load_capacity) {
            tracing::debug!(
                load = assessment.intrinsic_load,
                capacity = profile.cognitive_load_capacity,
                "limiting rows due to cognitive overload"
            );
            OVERLOAD_ROW_LIMIT
        } else {
            NORMAL_ROW_LIMIT
        };

        if data.rows.len() > limit {
            data.rows.truncate(limit);
        }
    }

    shaped
}
