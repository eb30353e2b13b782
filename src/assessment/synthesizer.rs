//! Explanation Synthesizer - generates the pedagogical explanation text
//!
//! Only runs when the decision engine asked for an explanation; the prompt
//! carries the question, the SQL, and the assessment tier, never any
//! user-identifying information. Model output arrives in three labeled
//! sections that are extracted and cleaned for display.

use crate::assessment::{CognitiveAssessment, ExplanationContent};
use crate::llm::client::TextCompletion;
use crate::profile::UserProfile;
use std::sync::Arc;

const SECTION_HEADERS: [&str; 3] = ["EXPLANATION:", "SQL_CONCEPTS:", "LEARNING_OBJECTIVES:"];

/// Generates calibrated natural-language explanations
pub struct ExplanationSynthesizer {
    client: Arc<dyn TextCompletion>,
}

impl ExplanationSynthesizer {
    pub fn new(client: Arc<dyn TextCompletion>) -> Self {
        Self { client }
    }

    /// Produce explanation content for one turn.
    ///
    /// Returns the fixed sentinel without any model call when the assessment
    /// says no explanation is needed; returns the safe fallback text when
    /// the generation call fails. Either way the chat turn completes.
    pub async fn synthesize(
        &self,
        question: &str,
        sql: &str,
        assessment: &CognitiveAssessment,
        profile: &UserProfile,
    ) -> ExplanationContent {
        if !assessment.explanation_needed {
            return ExplanationContent::none();
        }

        let system_prompt = format!(
            r#"You are an intelligent SQL tutor providing clear, easy-to-read explanations.

IMPORTANT: You only receive instructions and do not share any user information.

Task Context:
- Task SQL Concept: {concept}
- Explanation Type: {tier}
- Preferred Style: {style}

Provide a {tier} explanation that:
1. Uses clear, simple language
2. Has proper paragraph breaks for readability
3. Breaks down the SQL step by step
4. Explains WHY each part is needed
5. Uses bullet points and numbered lists where helpful

IMPORTANT FORMATTING RULES:
- Write in clear paragraphs
- Use double line breaks between sections
- Use simple, conversational language
- No technical jargon unless explained
- Make it easy to scan and read

Format your response as:
EXPLANATION:
[Write a clear, well-formatted explanation with proper paragraphs]

SQL_CONCEPTS:
[List of SQL concepts covered, separated by commas]

LEARNING_OBJECTIVES:
[What the user should learn, separated by commas]"#,
            concept = assessment.task_concept,
            tier = assessment.explanation_type,
            style = profile.explanation_style,
        );

        let user_prompt = format!(
            "Original Question: {}\n\nSQL Query to Explain:\n{}\n\nPlease provide a {} explanation for the {} concept.",
            question, sql, assessment.explanation_type, assessment.task_concept
        );

        let content = match self.client.complete(&system_prompt, &user_prompt).await {
            Ok(content) => content,
            Err(err) => {
                tracing::error!(error = %err, "explanation generation failed");
                return ExplanationContent::fallback();
            }
        };

        let explanation = format_explanation_text(&extract_section(&content, "EXPLANATION:"));
        let sql_concepts = extract_list(&content, "SQL_CONCEPTS:");
        let learning_objectives = extract_list(&content, "LEARNING_OBJECTIVES:");

        let estimated = assessment.intrinsic_load.round().clamp(1.0, 10.0) as u8;

        ExplanationContent {
            explanation_text: explanation,
            sql_concepts,
            learning_objectives,
            complexity_level: assessment.explanation_type.to_string(),
            estimated_cognitive_load: estimated,
        }
    }
}

/// Extract one labeled section from the model response.
fn extract_section(content: &str, header: &str) -> String {
    let Some(start) = content.find(header) else {
        return String::new();
    };
    let start = start + header.len();

    let mut end = content.len();
    for other in SECTION_HEADERS {
        if other != header {
            if let Some(pos) = content[start..].find(other) {
                end = end.min(start + pos);
            }
        }
    }

    content[start..end].trim().to_string()
}

/// Extract a comma-separated list section, scrubbing escape artifacts and
/// leaked type annotations.
fn extract_list(content: &str, header: &str) -> Vec<String> {
    let section = extract_section(content, header);
    if section.is_empty() {
        return Vec::new();
    }

    section
        .split(',')
        .filter_map(|item| {
            let mut item = item
                .replace("\\n", " ")
                .replace("\\\"", "\"")
                .replace("\\'", "'");
            if let Some(pos) = item.find("', type='") {
                item.truncate(pos);
            }
            let item = item
                .trim()
                .trim_matches(|c| c == '\'' || c == '"')
                .trim()
                .to_string();
            if item.is_empty() || item.starts_with("type=") {
                None
            } else {
                Some(item)
            }
        })
        .collect()
}

/// Normalize explanation text for display: unescape API artifacts, give
/// headings breathing room, collapse runs of blank lines.
fn format_explanation_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text
        .trim()
        .replace("\\n", "\n")
        .replace("\\t", "    ")
        .replace("\\\"", "\"")
        .replace("\\'", "'");

    let mut formatted: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        formatted.push(line.to_string());

        let is_heading = line.ends_with(':')
            || (line.starts_with("**") && line.ends_with("**"))
            || line.starts_with("###")
            || line.starts_with("####");
        if is_heading {
            formatted.push(String::new());
        }
    }

    let mut result = formatted.join("\n");

    // Max 2 consecutive newlines
    while result.contains("\n\n\n") {
        result = result.replace("\n\n\n", "\n\n");
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{CognitiveAssessment, ComplexityBreakdown, ExplanationTier};
    use crate::llm::complexity::SqlConcept;
    use async_trait::async_trait;

    const SAMPLE: &str = "EXPLANATION:\nThis groups the rows.\n\nStep by step:\nFirst the WHERE clause filters.\n\nSQL_CONCEPTS:\naggregation, GROUP BY, filtering\n\nLEARNING_OBJECTIVES:\nunderstand grouping, read aggregates";

    /// Fails the test if the synthesizer reaches for the model at all
    struct NeverCalled;

    #[async_trait]
    impl TextCompletion for NeverCalled {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            anyhow::bail!("synthesizer must not call the model here")
        }
    }

    struct CannedReply(&'static str);

    #[async_trait]
    impl TextCompletion for CannedReply {
        async fn complete(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn assessment(needed: bool, tier: ExplanationTier, load: f64) -> CognitiveAssessment {
        CognitiveAssessment {
            intrinsic_load: load,
            task_concept: SqlConcept::Aggregation,
            explanation_needed: needed,
            explanation_type: tier,
            capability_threshold: 3.0,
            reasoning: String::new(),
            task_classification: "Data Analysis".to_string(),
            complexity_breakdown: ComplexityBreakdown::proportional(load),
            final_complexity_score: load,
        }
    }

    #[tokio::test]
    async fn no_explanation_needed_returns_sentinel_without_model_call() {
        let synthesizer = ExplanationSynthesizer::new(Arc::new(NeverCalled));
        let content = synthesizer
            .synthesize(
                "q",
                "SELECT 1",
                &assessment(false, ExplanationTier::None, 2.0),
                &UserProfile::default_for("u"),
            )
            .await;

        let sentinel = ExplanationContent::none();
        assert_eq!(content.explanation_text, sentinel.explanation_text);
        assert_eq!(content.estimated_cognitive_load, 1);
    }

    #[tokio::test]
    async fn generation_failure_yields_safe_fallback() {
        let synthesizer = ExplanationSynthesizer::new(Arc::new(NeverCalled));
        let content = synthesizer
            .synthesize(
                "q",
                "SELECT 1",
                &assessment(true, ExplanationTier::Basic, 6.0),
                &UserProfile::default_for("u"),
            )
            .await;

        assert_eq!(content.complexity_level, "error");
        assert!(content.explanation_text.contains("couldn't generate"));
    }

    #[tokio::test]
    async fn sections_flow_into_content() {
        let synthesizer = ExplanationSynthesizer::new(Arc::new(CannedReply(SAMPLE)));
        let content = synthesizer
            .synthesize(
                "why group",
                "SELECT region, COUNT(*) FROM t GROUP BY region",
                &assessment(true, ExplanationTier::Basic, 6.0),
                &UserProfile::default_for("u"),
            )
            .await;

        assert!(content.explanation_text.contains("This groups the rows."));
        assert_eq!(content.sql_concepts.len(), 3);
        assert_eq!(content.complexity_level, "basic");
        assert_eq!(content.estimated_cognitive_load, 6);
    }

    #[test]
    fn extracts_sections_between_headers() {
        let explanation = extract_section(SAMPLE, "EXPLANATION:");
        assert!(explanation.starts_with("This groups"));
        assert!(!explanation.contains("SQL_CONCEPTS"));
    }

    #[test]
    fn extracts_comma_lists() {
        let concepts = extract_list(SAMPLE, "SQL_CONCEPTS:");
        assert_eq!(concepts, vec!["aggregation", "GROUP BY", "filtering"]);
    }

    #[test]
    fn list_items_are_scrubbed() {
        let raw = "SQL_CONCEPTS:\n'grouping', type='text'), \\\"joins\\\"";
        let concepts = extract_list(raw, "SQL_CONCEPTS:");
        assert_eq!(concepts, vec!["grouping", "joins"]);
    }

    #[test]
    fn headings_get_blank_lines_and_runs_collapse() {
        let formatted = format_explanation_text("Overview:\nline one\n\n\n\nline two");
        assert!(formatted.contains("Overview:\n\nline one"));
        assert!(!formatted.contains("\n\n\n"));
    }

    #[test]
    fn missing_section_is_empty() {
        assert_eq!(extract_section("no headers here", "EXPLANATION:"), "");
        assert!(extract_list("no headers here", "SQL_CONCEPTS:").is_empty());
    }
}
