//! SQL Translator - natural language to SQL with a reason-then-produce protocol
//!
//! The model is asked for a REASONING section followed by a SQL section. The
//! extraction is deliberately forgiving: completion output arrives with
//! markdown fences, leaked client type annotations, and trailing prose, so
//! the parser scans line by line and keeps only what reads as SQL.

use crate::llm::client::TextCompletion;
use crate::llm::complexity::{classify_sql_concept, structural_complexity, SqlConcept};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Outcome of one translation call. `sql` is empty when no SQL section could
/// be extracted; callers treat that as a user-facing "please rephrase", not
/// as a crash.
#[derive(Debug, Clone)]
pub struct TranslatedQuery {
    pub sql: String,
    pub reasoning: String,
    pub complexity: u8,
    pub concept: SqlConcept,
}

/// Translates natural-language questions into executable SQL
pub struct SqlTranslator {
    client: Arc<dyn TextCompletion>,
    schema_context: String,
}

impl SqlTranslator {
    /// `schema_context` is the dataset schema snapshot injected into every
    /// generation call (tables, columns, row counts).
    pub fn new(client: Arc<dyn TextCompletion>, schema_context: String) -> Self {
        Self {
            client,
            schema_context,
        }
    }

    pub fn schema_context(&self) -> &str {
        &self.schema_context
    }

    /// Translate a natural-language question into SQL plus a 1-5 structural
    /// complexity score.
    pub async fn translate(&self, question: &str) -> Result<TranslatedQuery> {
        let system_prompt = format!(
            r#"You are an expert SQL analyst following the ReAct (Reasoning and Acting) approach.

{schema}

For the given natural language query, follow this pattern:
1. THOUGHT: Analyze what the user is asking for
2. ACTION: Determine what SQL operations are needed
3. OBSERVATION: Consider the database schema and available tables
4. THOUGHT: Plan the SQL query structure
5. ACTION: Write the final SQL query

Provide both your reasoning process and the final SQL query.
Be precise and consider performance implications.
You can generate any SQL operation including SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, etc.

Format your response as:
REASONING:
[Your step-by-step reasoning]

SQL:
[Your SQL query]"#,
            schema = self.schema_context
        );

        let content = self
            .client
            .complete(&system_prompt, &format!("Generate SQL for: {}", question))
            .await
            .context("SQL generation call failed")?;

        let (sql, reasoning) = if content.contains("REASONING:") && content.contains("SQL:") {
            let mut parts = content.splitn(2, "SQL:");
            let reasoning = parts
                .next()
                .unwrap_or("")
                .replace("REASONING:", "")
                .trim()
                .to_string();
            let sql = clean_sql_text(parts.next().unwrap_or(""));
            (sql, reasoning)
        } else {
            // Model ignored the protocol; try to salvage SQL anyway
            (clean_sql_text(&content), "Reasoning not available".to_string())
        };

        let complexity = if sql.is_empty() {
            1
        } else {
            structural_complexity(&sql)
        };
        let concept = if sql.is_empty() {
            SqlConcept::BasicSelect
        } else {
            classify_sql_concept(&sql)
        };

        Ok(TranslatedQuery {
            sql,
            reasoning,
            complexity,
            concept,
        })
    }
}

const STATEMENT_STARTS: [&str; 8] = [
    "SELECT", "INSERT", "UPDATE", "DELETE", "WITH", "CREATE", "DROP", "ALTER",
];

const CONTINUATION_STARTS: [&str; 26] = [
    "FROM", "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "JOIN", "INNER", "LEFT",
    "RIGHT", "UNION", "AND", "OR", "ON", "AS", "IN", "EXISTS", "CASE", "WHEN", "THEN", "ELSE",
    "END", ")", "(", ",",
];

const PROSE_MARKERS: [&str; 4] = ["This query", "provides", "shows", "The results"];

/// Clean a raw SQL section: strip markdown fences and API artifacts, then
/// keep the contiguous run of lines that read as SQL.
pub fn clean_sql_text(raw: &str) -> String {
    let mut text = raw.replace("```sql", "").replace("```", "");

    // Type annotations occasionally leak through from the API client
    text = text.replace("', type='text')", "").replace("type='text'", "");

    let mut sql_lines: Vec<&str> = Vec::new();
    let mut found_start = false;

    for line in text.lines() {
        let stripped = line.trim();

        // Standalone language tag left over from a fence
        if stripped.eq_ignore_ascii_case("sql") {
            continue;
        }

        let upper = stripped.to_uppercase();
        if !found_start {
            if STATEMENT_STARTS.iter().any(|kw| upper.starts_with(kw)) {
                found_start = true;
                sql_lines.push(line);
            }
        } else {
            if !stripped.is_empty() && !looks_like_sql_continuation(stripped) && contains_prose(stripped) {
                break;
            }
            sql_lines.push(line);
        }
    }

    let mut sql = sql_lines.join("\n").trim().to_string();
    if sql.ends_with('\'') {
        sql.pop();
    }
    sql.trim().to_string()
}

fn contains_prose(line: &str) -> bool {
    PROSE_MARKERS.iter().any(|m| line.contains(m))
}

fn looks_like_sql_continuation(line: &str) -> bool {
    let upper = line.to_uppercase();
    if CONTINUATION_STARTS.iter().any(|kw| upper.starts_with(kw)) {
        return true;
    }

    let mut chars = line.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('\'') | Some('"') => true,
        Some(c) if "+-*/=<>!".contains(c) => true,
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            // Column-name lines inside a SELECT list end with ',' or ')'
            let rest = line.trim_end();
            rest.ends_with(',') || rest.ends_with(')')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        let raw = "```sql\nSELECT * FROM superstore\n```";
        assert_eq!(clean_sql_text(raw), "SELECT * FROM superstore");
    }

    #[test]
    fn stops_at_trailing_prose() {
        let raw = "SELECT region, SUM(sales) AS total\nFROM superstore\nGROUP BY region\n\nThis query provides total sales per region.";
        let cleaned = clean_sql_text(raw);
        assert!(cleaned.ends_with("GROUP BY region"));
        assert!(!cleaned.contains("This query"));
    }

    #[test]
    fn keeps_multiline_select_lists() {
        let raw = "SELECT\n  region,\n  SUM(sales) AS total\nFROM superstore\nGROUP BY region";
        let cleaned = clean_sql_text(raw);
        assert!(cleaned.contains("region,"));
        assert!(cleaned.contains("GROUP BY region"));
    }

    #[test]
    fn empty_when_no_statement_found() {
        assert_eq!(clean_sql_text("I cannot answer that question."), "");
    }

    #[test]
    fn drops_leaked_type_annotations() {
        let raw = "SELECT * FROM superstore', type='text')";
        assert_eq!(clean_sql_text(raw), "SELECT * FROM superstore");
    }
}
