//! Study instrumentation - interaction log and durable study storage
//!
//! Every decision the pipeline makes is recorded so the study can later
//! score the explanation-need classifier against participant feedback.
//! Logging is write-once append and must never abort a user-facing turn.

pub mod metrics;

use crate::assessment::{CognitiveAssessment, ExplanationContent};
use crate::dataset::QueryResult;
use crate::error::{AssistantError, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

pub use metrics::DecisionMetrics;

/// One logged pipeline decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub question: String,
    pub sql_text: String,
    pub query_success: bool,
    pub execution_time: f64,
    pub complexity_score: u8,
    pub intrinsic_load: f64,
    pub task_concept: String,
    pub explanation_needed: bool,
    pub explanation_type: String,
    pub explanation_generated: bool,
}

impl InteractionRecord {
    pub fn from_turn(
        user_id: &str,
        question: &str,
        result: &QueryResult,
        assessment: &CognitiveAssessment,
        explanation: Option<&ExplanationContent>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            question: question.to_string(),
            sql_text: result.sql_text.clone(),
            query_success: result.success,
            execution_time: result.execution_time,
            complexity_score: result.complexity_score,
            intrinsic_load: assessment.intrinsic_load,
            task_concept: assessment.task_concept.to_string(),
            explanation_needed: assessment.explanation_needed,
            explanation_type: assessment.explanation_type.to_string(),
            explanation_generated: explanation.is_some(),
        }
    }
}

/// Append-only interaction log: JSONL on disk plus a bounded in-memory ring
/// for diagnostics endpoints.
pub struct InteractionLog {
    path: PathBuf,
    recent: RwLock<Vec<InteractionRecord>>,
    max_recent: usize,
}

impl InteractionLog {
    pub fn new(path: impl Into<PathBuf>, max_recent: usize) -> Self {
        Self {
            path: path.into(),
            recent: RwLock::new(Vec::new()),
            max_recent,
        }
    }

    /// Record one interaction. Failures are absorbed: a broken log must not
    /// abort the response that produced it.
    pub fn record(&self, record: InteractionRecord) {
        if let Err(err) = self.append_to_disk(&record) {
            tracing::warn!(error = %err, "failed to append interaction log entry");
        }

        let mut recent = self.recent.write().unwrap();
        recent.push(record);
        if recent.len() > self.max_recent {
            recent.remove(0);
        }
    }

    fn append_to_disk(&self, record: &InteractionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    pub fn recent(&self) -> Vec<InteractionRecord> {
        self.recent.read().unwrap().clone()
    }
}

/// One feedback row: did we show an explanation, and did the participant
/// say one was needed / helpful
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user_id: String,
    pub session_id: i64,
    pub explanation_given: bool,
    pub was_needed: Option<bool>,
    pub was_helpful: Option<bool>,
}

/// Durable study storage: chat turns and explanation feedback in SQLite
pub struct StudyStore {
    conn: Mutex<Connection>,
}

impl StudyStore {
    /// Open (or create) the study database and run table setup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| {
            AssistantError::storage_with_path(e.to_string(), path.display().to_string())
        })?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS chat_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                session_uuid TEXT NOT NULL,
                user_message TEXT NOT NULL,
                system_response TEXT NOT NULL,
                sql_query TEXT,
                explanation_given INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS explanation_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                session_id INTEGER NOT NULL,
                explanation_given INTEGER NOT NULL,
                was_needed INTEGER,
                was_helpful INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_id ON chat_sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_explanation_feedback_user_id ON explanation_feedback(user_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Persist one chat turn; returns the session row id used to attach
    /// feedback later.
    pub fn record_chat_turn(
        &self,
        user_id: &str,
        user_message: &str,
        system_response: &str,
        sql_query: &str,
        explanation_given: bool,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_sessions (user_id, session_uuid, user_message, system_response, sql_query, explanation_given, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                user_id,
                uuid::Uuid::new_v4().to_string(),
                user_message,
                system_response,
                sql_query,
                explanation_given,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO explanation_feedback (user_id, session_id, explanation_given, was_needed, was_helpful, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                feedback.user_id,
                feedback.session_id,
                feedback.explanation_given,
                feedback.was_needed,
                feedback.was_helpful,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All (explanation_given, was_needed) pairs with a stated need verdict,
    /// the input to the decision-quality metrics.
    pub fn feedback_pairs(&self) -> Result<Vec<(bool, bool)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT explanation_given, was_needed FROM explanation_feedback WHERE was_needed IS NOT NULL",
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok((row.get::<_, bool>(0)?, row.get::<_, bool>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    pub fn session_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_turns_and_feedback_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudyStore::open(dir.path().join("study.db")).unwrap();

        let session_id = store
            .record_chat_turn("u1", "question", "response", "SELECT 1", true)
            .unwrap();
        assert!(session_id > 0);
        assert_eq!(store.session_count().unwrap(), 1);

        store
            .record_feedback(&FeedbackRecord {
                user_id: "u1".to_string(),
                session_id,
                explanation_given: true,
                was_needed: Some(true),
                was_helpful: Some(true),
            })
            .unwrap();

        let pairs = store.feedback_pairs().unwrap();
        assert_eq!(pairs, vec![(true, true)]);
    }

    #[test]
    fn interaction_log_appends_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("interactions.jsonl");
        let log = InteractionLog::new(&path, 100);

        let record = InteractionRecord {
            timestamp: Utc::now(),
            user_id: "u1".to_string(),
            question: "q".to_string(),
            sql_text: "SELECT 1".to_string(),
            query_success: true,
            execution_time: 0.1,
            complexity_score: 1,
            intrinsic_load: 2.0,
            task_concept: "basic_select".to_string(),
            explanation_needed: false,
            explanation_type: "none".to_string(),
            explanation_generated: false,
        };
        log.record(record.clone());
        log.record(record);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert_eq!(log.recent().len(), 2);
    }
}
