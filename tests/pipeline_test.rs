//! End-to-end pipeline tests against the public API with a deterministic
//! stub completion model.

use adaptive_sql_assistant::assessment::ExplanationTier;
use adaptive_sql_assistant::config::AssistantConfig;
use adaptive_sql_assistant::llm::TextCompletion;
use adaptive_sql_assistant::pipeline::{Assistant, TRANSLATION_FAILURE_MESSAGE};
use adaptive_sql_assistant::profile::{AssessmentScores, Demographics};
use adaptive_sql_assistant::study::FeedbackRecord;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Deterministic completion stub keyed off the system-prompt role markers
struct StubModel {
    translator_reply: String,
    /// None simulates a transport failure, forcing the deterministic fallback
    decision_reply: Option<String>,
    tutor_reply: Option<String>,
}

impl StubModel {
    fn with_sql(sql_reply: &str) -> Self {
        Self {
            translator_reply: sql_reply.to_string(),
            decision_reply: None,
            tutor_reply: Some(
                "EXPLANATION:\nThis query groups rows by year and sums sales.\n\n\
                 SQL_CONCEPTS:\nGROUP BY, SUM\n\n\
                 LEARNING_OBJECTIVES:\nunderstand aggregation"
                    .to_string(),
            ),
        }
    }
}

#[async_trait]
impl TextCompletion for StubModel {
    async fn complete(&self, system: &str, _user: &str) -> anyhow::Result<String> {
        if system.contains("expert SQL analyst") {
            return Ok(self.translator_reply.clone());
        }
        if system.contains("educational assessment system")
            || system.contains("Task Complexity Assessment Agent")
        {
            return match &self.decision_reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("decision service unavailable"),
            };
        }
        if system.contains("SQL tutor") {
            return match &self.tutor_reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("tutor unavailable"),
            };
        }
        anyhow::bail!("unexpected prompt")
    }
}

const YEARLY_SALES_REPLY: &str = "REASONING:\nYearly totals need grouping by the order year.\n\nSQL:\nSELECT strftime('%Y', Order_Date) AS year, SUM(Sales) AS total_sales\nFROM superstore\nWHERE Order_Date BETWEEN '2014-01-01' AND '2017-12-31'\nGROUP BY year\nORDER BY year";

fn config_in(dir: &Path) -> AssistantConfig {
    AssistantConfig {
        dataset_path: dir.join("superstore.db"),
        superstore_csv: None,
        readonly_dataset: false,
        profiles_path: dir.join("profiles.json"),
        interaction_log_path: dir.join("interactions.jsonl"),
        study_db_path: dir.join("study.db"),
        completion_url: None,
        completion_model: None,
        completion_timeout: Duration::from_secs(5),
        port: 0,
    }
}

fn seed_dataset(config: &AssistantConfig, rows: usize) {
    let conn = rusqlite::Connection::open(&config.dataset_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE superstore (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            Order_Date TEXT,
            Region TEXT,
            Sales REAL,
            Quantity INTEGER
        )",
    )
    .unwrap();

    let regions = ["West", "East", "South", "Central"];
    for i in 0..rows {
        let year = 2014 + (i % 4);
        conn.execute(
            "INSERT INTO superstore (Order_Date, Region, Sales, Quantity) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                format!("{}-03-{:02}", year, (i % 28) + 1),
                regions[i % regions.len()],
                100.0 + i as f64,
                (i % 5) + 1,
            ],
        )
        .unwrap();
    }
}

fn build_assistant(dir: &Path, model: StubModel, rows: usize) -> Assistant {
    let config = config_in(dir);
    seed_dataset(&config, rows);
    Assistant::new(config, Arc::new(model)).unwrap()
}

fn beginner_scores() -> AssessmentScores {
    AssessmentScores {
        data_analysis_fundamentals: 1,
        business_analytics: 1,
        forecasting_statistics: 0,
        data_visualization: 1,
        domain_knowledge_retail: 1,
    }
}

fn expert_scores() -> AssessmentScores {
    AssessmentScores {
        data_analysis_fundamentals: 4,
        business_analytics: 4,
        forecasting_statistics: 4,
        data_visualization: 4,
        domain_knowledge_retail: 4,
    }
}

#[tokio::test]
async fn yearly_sales_question_explains_for_beginner() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = build_assistant(dir.path(), StubModel::with_sql(YEARLY_SALES_REPLY), 40);

    assistant
        .submit_assessment("beginner", beginner_scores(), Demographics::default())
        .unwrap();

    let outcome = assistant
        .handle_question("beginner", "Show me total sales for each year from 2014 to 2017")
        .await;

    assert!(outcome.result.success);
    assert!(outcome.result.sql_text.contains("GROUP BY"));
    assert!(outcome.result.complexity_score >= 2);

    // Structural score 2 doubled onto the canonical band exceeds the
    // beginner's doubled expertise, so an explanation is attached.
    assert!(outcome.assessment.explanation_needed);
    assert_eq!(outcome.assessment.explanation_type, ExplanationTier::Basic);
    let explanation = outcome.explanation.expect("explanation should be generated");
    assert!(explanation.explanation_text.contains("groups rows"));
    assert_eq!(explanation.sql_concepts, vec!["GROUP BY", "SUM"]);
}

#[tokio::test]
async fn expert_gets_bare_result() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = build_assistant(dir.path(), StubModel::with_sql(YEARLY_SALES_REPLY), 40);

    assistant
        .submit_assessment("expert", expert_scores(), Demographics::default())
        .unwrap();

    let outcome = assistant
        .handle_question("expert", "Show me total sales for each year from 2014 to 2017")
        .await;

    assert!(outcome.result.success);
    assert!(!outcome.assessment.explanation_needed);
    assert!(outcome.explanation.is_none());
}

#[tokio::test]
async fn invalid_sql_forces_error_explanation() {
    let dir = tempfile::tempdir().unwrap();
    let reply = "REASONING:\nGuessing.\n\nSQL:\nSELECT nope FROM missing_table";
    let assistant = build_assistant(dir.path(), StubModel::with_sql(reply), 5);

    let outcome = assistant.handle_question("someone", "show the thing").await;

    assert!(!outcome.result.success);
    let message = outcome.result.error.expect("sanitized error expected");
    assert!(!message.contains("missing_table"));
    assert!(outcome.assessment.explanation_needed);
    assert_eq!(
        outcome.assessment.explanation_type,
        ExplanationTier::ErrorHandling
    );
}

#[tokio::test]
async fn unanswerable_question_is_nonfatal() {
    let dir = tempfile::tempdir().unwrap();
    let reply = "I am not sure what you mean by that, could you clarify?";
    let assistant = build_assistant(dir.path(), StubModel::with_sql(reply), 5);

    let outcome = assistant.handle_question("someone", "why?").await;

    assert!(!outcome.result.success);
    assert_eq!(outcome.result.sql_text, "");
    assert_eq!(
        outcome.result.error.as_deref(),
        Some(TRANSLATION_FAILURE_MESSAGE)
    );
    // Failure turns always carry an explanation of what went wrong
    assert!(outcome.assessment.explanation_needed);
}

#[tokio::test]
async fn translation_is_deterministic_across_turns() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = build_assistant(dir.path(), StubModel::with_sql(YEARLY_SALES_REPLY), 10);

    let first = assistant.handle_question("u", "total sales per year").await;
    let second = assistant.handle_question("u", "total sales per year").await;

    assert_eq!(first.result.complexity_score, second.result.complexity_score);
    assert_eq!(first.result.sql_text, second.result.sql_text);
}

#[tokio::test]
async fn row_shaping_follows_cognitive_budget() {
    let dir = tempfile::tempdir().unwrap();
    let reply = "REASONING:\nList everything.\n\nSQL:\nSELECT Region, Sales FROM superstore";
    let assistant = build_assistant(dir.path(), StubModel::with_sql(reply), 50);

    // Default profile: expertise 2, capacity 2. Structural score 1 doubles
    // to load 2, which does not exceed capacity, so the normal budget holds.
    let outcome = assistant.handle_question("default-user", "list sales").await;
    assert_eq!(outcome.result.data.unwrap().rows.len(), 15);

    // Beginner: expertise 1, capacity 1. Load 2 exceeds capacity, so the
    // overload budget applies.
    assistant
        .submit_assessment("beginner", beginner_scores(), Demographics::default())
        .unwrap();
    let outcome = assistant.handle_question("beginner", "list sales").await;
    assert_eq!(outcome.result.data.unwrap().rows.len(), 5);
}

#[tokio::test]
async fn feedback_feeds_decision_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = build_assistant(dir.path(), StubModel::with_sql(YEARLY_SALES_REPLY), 10);

    assistant
        .submit_assessment("beginner", beginner_scores(), Demographics::default())
        .unwrap();
    let outcome = assistant
        .handle_question("beginner", "total sales per year")
        .await;
    let session_id = outcome.session_id.expect("study row expected");

    assistant
        .submit_feedback(&FeedbackRecord {
            user_id: "beginner".to_string(),
            session_id,
            explanation_given: outcome.explanation.is_some(),
            was_needed: Some(true),
            was_helpful: Some(true),
        })
        .unwrap();

    let metrics = assistant.metrics().unwrap();
    assert_eq!(metrics.true_positives, 1);
    assert_eq!(metrics.sample_count(), 1);
    assert!((metrics.precision - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn profile_history_accumulates_per_turn() {
    let dir = tempfile::tempdir().unwrap();
    let assistant = build_assistant(dir.path(), StubModel::with_sql(YEARLY_SALES_REPLY), 10);

    assistant.handle_question("u", "first question").await;
    assistant.handle_question("u", "second question").await;

    let profile = assistant.profile("u");
    assert_eq!(profile.prior_query_history.len(), 2);
    assert_eq!(profile.prior_query_history[1].question, "second question");
}
