//! # Adaptive SQL Assistant
//!
//! A research-study web service that lets a participant chat with a
//! natural-language-to-SQL assistant over a fixed retail dataset. An
//! auxiliary decision engine scores each query's cognitive load, compares it
//! against the participant's capability estimate, and decides whether to
//! append a pedagogical explanation to the answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adaptive_sql_assistant::config::AssistantConfig;
//! use adaptive_sql_assistant::llm::OllamaClient;
//! use adaptive_sql_assistant::pipeline::Assistant;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AssistantConfig::from_env();
//!     let client = Arc::new(OllamaClient::new(None, None));
//!     let assistant = Assistant::new(config, client)?;
//!
//!     let outcome = assistant
//!         .handle_question("participant-1", "Show total sales by region")
//!         .await;
//!
//!     println!("SQL: {}", outcome.result.sql_text);
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! NL question → translator → executor → decision engine → {result shaper,
//! explanation synthesizer} → response → interaction logger.

// Internal modules
pub mod assessment;
pub mod config;
pub mod dataset;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod profile;
pub mod study;
pub mod web;

// Public API - main types users need
pub use assessment::{CognitiveAssessment, ExplanationContent, ExplanationTier};
pub use dataset::{DatasetStore, QueryResult, TableData};
pub use error::AssistantError;
pub use pipeline::{Assistant, ChatOutcome};
pub use profile::{UserLevel, UserProfile};
