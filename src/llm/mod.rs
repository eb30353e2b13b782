//! LLM Module - completion port and the natural-language-to-SQL pipeline

pub mod client;
pub mod complexity;
pub mod translator;

pub use client::{extract_json_block, OllamaClient, TextCompletion};
pub use complexity::{classify_sql_concept, structural_complexity, SqlConcept};
pub use translator::{SqlTranslator, TranslatedQuery};
