//! End-to-end pipeline: translate, execute, decide, shape, explain, log
//!
//! One [`Assistant`] instance serves all users. Each chat turn runs the full
//! pipeline before the response returns; there is no background queue. Every
//! internal failure is either surfaced as a sanitized user-facing message or
//! absorbed by a deterministic fallback - a turn always completes with some
//! result.

use crate::assessment::{
    shape_result, CognitiveAssessment, DecisionEngine, ExplanationContent, ExplanationSynthesizer,
};
use crate::config::AssistantConfig;
use crate::dataset::{import, DatasetStore, QueryResult};
use crate::error::Result;
use crate::llm::client::TextCompletion;
use crate::llm::translator::SqlTranslator;
use crate::profile::{
    AssessmentScores, Demographics, InteractionSummary, ProfileStore, UserProfile,
};
use crate::study::{DecisionMetrics, FeedbackRecord, InteractionLog, InteractionRecord, StudyStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

/// User-safe message when no SQL could be extracted from the model output
pub const TRANSLATION_FAILURE_MESSAGE: &str =
    "I couldn't understand your request. Please try rephrasing your question about the data.";

/// User-safe message for unexpected failures around the translation call
pub const PROCESSING_FAILURE_MESSAGE: &str = "I'm having trouble processing your request right now. \
     Please try again with a different question about the business data.";

/// Bound on the diagnostics ring kept by the interaction log
const RECENT_INTERACTIONS: usize = 200;

/// Everything one chat turn produces
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// Shaped (row-limited) result for display
    pub result: QueryResult,
    pub explanation: Option<ExplanationContent>,
    pub assessment: CognitiveAssessment,
    pub profile: UserProfile,
    /// Study row id for attaching feedback, when the study store accepted
    /// the turn
    pub session_id: Option<i64>,
}

/// The assistant service: owns the stores and the decision pipeline
pub struct Assistant {
    config: AssistantConfig,
    dataset: DatasetStore,
    translator: SqlTranslator,
    decision: DecisionEngine,
    synthesizer: ExplanationSynthesizer,
    profiles: ProfileStore,
    interaction_log: InteractionLog,
    study: StudyStore,
}

impl Assistant {
    /// Wire up the pipeline. Storage initialization failures are returned
    /// (and should be fatal at startup); everything after construction
    /// degrades gracefully instead of failing.
    pub fn new(config: AssistantConfig, client: Arc<dyn TextCompletion>) -> Result<Self> {
        let dataset = DatasetStore::new(&config.dataset_path, config.readonly_dataset);
        import::ensure_superstore(&dataset, config.superstore_csv.as_deref())?;

        let schema_context = dataset.schema_snapshot()?;
        tracing::info!(
            dataset = %config.dataset_path.display(),
            "dataset ready, schema snapshot built"
        );

        let profiles = ProfileStore::load(&config.profiles_path)?;
        let interaction_log = InteractionLog::new(&config.interaction_log_path, RECENT_INTERACTIONS);
        let study = StudyStore::open(&config.study_db_path)?;

        Ok(Self {
            config,
            dataset,
            translator: SqlTranslator::new(client.clone(), schema_context),
            decision: DecisionEngine::new(client.clone()),
            synthesizer: ExplanationSynthesizer::new(client),
            profiles,
            interaction_log,
            study,
        })
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn dataset(&self) -> &DatasetStore {
        &self.dataset
    }

    /// Process one natural-language chat turn end to end.
    pub async fn handle_question(&self, user_id: &str, question: &str) -> ChatOutcome {
        let started = Instant::now();
        tracing::info!(user_id, question, "processing chat turn");

        let profile = self.profiles.get_or_default(user_id);

        // Step 1: translate
        let mut result = match self.translator.translate(question).await {
            Ok(translated) if !translated.sql.is_empty() => {
                tracing::debug!(
                    complexity = translated.complexity,
                    concept = %translated.concept,
                    reasoning = %translated.reasoning,
                    "translated question to SQL"
                );
                // Step 2: execute against the dataset
                self.dataset.execute(&translated.sql, translated.complexity)
            }
            Ok(_) => {
                QueryResult::failure(String::new(), TRANSLATION_FAILURE_MESSAGE, 0.0, 1)
            }
            Err(err) => {
                tracing::error!(error = %err, "translation call failed");
                QueryResult::failure(String::new(), PROCESSING_FAILURE_MESSAGE, 0.0, 1)
            }
        };
        result.execution_time = started.elapsed().as_secs_f64();

        // Step 3: cognitive assessment (failures force an error explanation)
        let assessment = self.decision.assess_query(&result, &profile).await;

        // Step 4: shape the displayed rows to the cognitive budget
        let shaped = shape_result(&result, &assessment, &profile);

        // Step 5: synthesize an explanation when one is needed
        let explanation = if assessment.explanation_needed {
            let content = self
                .synthesizer
                .synthesize(question, &result.sql_text, &assessment, &profile)
                .await;
            tracing::info!(
                user_id,
                tier = %assessment.explanation_type,
                "generated explanation"
            );
            Some(content)
        } else {
            tracing::info!(user_id, "no explanation needed");
            None
        };

        // Step 6: profile update (history append, optional concept bump)
        let handled_unaided =
            result.success && result.complexity_score >= 4 && !assessment.explanation_needed;
        let summary = InteractionSummary {
            timestamp: Utc::now(),
            question: question.to_string(),
            concept: assessment.task_concept,
            intrinsic_load: assessment.intrinsic_load,
            explanation_provided: assessment.explanation_needed,
            explanation_type: assessment.explanation_type.to_string(),
        };
        let profile = match self
            .profiles
            .update(user_id, |p| p.record_interaction(summary, handled_unaided))
        {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(error = %err, user_id, "profile update failed");
                profile
            }
        };

        // Step 7: study storage + interaction log (never abort the turn)
        let response_text = match (&shaped.data, &shaped.error) {
            (Some(data), _) => format!("{} rows returned", data.row_count()),
            (None, Some(message)) => message.clone(),
            (None, None) => String::new(),
        };
        let session_id = match self.study.record_chat_turn(
            user_id,
            question,
            &response_text,
            &result.sql_text,
            explanation.is_some(),
        ) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist chat turn");
                None
            }
        };
        self.interaction_log.record(InteractionRecord::from_turn(
            user_id,
            question,
            &result,
            &assessment,
            explanation.as_ref(),
        ));

        ChatOutcome {
            result: shaped,
            explanation,
            assessment,
            profile,
            session_id,
        }
    }

    /// Full pre-query assessment of a question, used by the onboarding task
    /// screens to preview difficulty.
    pub async fn assess_question(&self, user_id: &str, question: &str) -> CognitiveAssessment {
        let profile = self.profiles.get_or_default(user_id);
        self.decision.assess_question(question, &profile).await
    }

    /// Store the onboarding assessment and return the resulting profile.
    pub fn submit_assessment(
        &self,
        user_id: &str,
        scores: AssessmentScores,
        demographics: Demographics,
    ) -> Result<UserProfile> {
        let profile = UserProfile::from_assessment(user_id, scores, demographics);
        self.profiles.upsert(profile.clone())?;
        tracing::info!(
            user_id,
            total = scores.total(),
            level = profile.user_level_category.as_str(),
            "assessment stored"
        );
        Ok(profile)
    }

    pub fn profile(&self, user_id: &str) -> UserProfile {
        self.profiles.get_or_default(user_id)
    }

    /// Attach participant feedback to a chat turn.
    pub fn submit_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        self.study.record_feedback(feedback)
    }

    /// Decision-quality metrics over all feedback collected so far.
    pub fn metrics(&self) -> Result<DecisionMetrics> {
        let pairs = self.study.feedback_pairs()?;
        Ok(DecisionMetrics::from_feedback(&pairs))
    }

    pub fn recent_interactions(&self) -> Vec<InteractionRecord> {
        self.interaction_log.recent()
    }

    pub fn schema_snapshot(&self) -> Result<String> {
        self.dataset.schema_snapshot()
    }
}
