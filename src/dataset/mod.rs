//! Dataset store - the fixed retail SQLite database the assistant queries
//!
//! Connections are opened, used, and closed within the scope of one request;
//! no pool is kept. Execution performs no validation or sandboxing before
//! running a statement: the study allows any statement type, including
//! mutation and DDL (see DESIGN.md). The optional read-only mode applies
//! PRAGMA query_only per connection.

pub mod import;

use crate::error::{AssistantError, Result};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// User-safe message for failed executions. The underlying error is logged
/// at the execution boundary for operators only.
pub const EXECUTION_FAILURE_MESSAGE: &str = "I encountered an issue while processing your request. \
     Please try rephrasing your question or ask about different data.";

/// Tabular result data: column names plus string-rendered rows
#[derive(Debug, Clone, Serialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Result of one natural-language request, immutable after creation.
/// The shaper produces a row-limited copy downstream.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub success: bool,
    pub data: Option<TableData>,
    pub sql_text: String,
    pub error: Option<String>,
    /// Wall-clock seconds for the whole request so far
    pub execution_time: f64,
    /// 1-5 structural complexity of the executed SQL
    pub complexity_score: u8,
}

impl QueryResult {
    pub fn failure(
        sql_text: impl Into<String>,
        message: impl Into<String>,
        execution_time: f64,
        complexity_score: u8,
    ) -> Self {
        Self {
            success: false,
            data: None,
            sql_text: sql_text.into(),
            error: Some(message.into()),
            execution_time,
            complexity_score,
        }
    }
}

/// Per-table schema information used for prompt context
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    /// (column name, declared type) pairs
    pub columns: Vec<(String, String)>,
    pub row_count: i64,
}

/// Handle to the dataset database file
#[derive(Clone, Debug)]
pub struct DatasetStore {
    path: PathBuf,
    readonly: bool,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>, readonly: bool) -> Self {
        Self {
            path: path.into(),
            readonly,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            AssistantError::storage_with_path(e.to_string(), self.path.display().to_string())
        })?;
        if self.readonly {
            conn.pragma_update(None, "query_only", true)?;
        }
        Ok(conn)
    }

    /// Open ignoring the read-only flag; used by bootstrap/import only.
    pub(crate) fn open_writable(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Connection::open(&self.path).map_err(|e| {
            AssistantError::storage_with_path(e.to_string(), self.path.display().to_string())
        })
    }

    /// Enumerate all user tables with their columns and row counts.
    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let conn = self.open()?;
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;

        let mut tables = Vec::new();
        for name in names {
            if name.starts_with("sqlite_") {
                continue;
            }

            let mut info_stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", name))?;
            let columns: Vec<(String, String)> = info_stmt
                .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
                .collect::<std::result::Result<_, _>>()?;

            let row_count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", name), [], |row| {
                    row.get(0)
                })
                .unwrap_or(-1);

            tables.push(TableInfo {
                name,
                columns,
                row_count,
            });
        }

        Ok(tables)
    }

    /// Build the schema snapshot injected into generation prompts: every
    /// table, every column name and type, and each table's row count.
    pub fn schema_snapshot(&self) -> Result<String> {
        let mut snapshot = String::from("Database Schema (All tables available):\n");

        for table in self.tables()? {
            snapshot.push_str(&format!("\nTable: {}\n", table.name));
            for (column, column_type) in &table.columns {
                snapshot.push_str(&format!("  - {} ({})\n", column, column_type));
            }
            if table.row_count >= 0 {
                snapshot.push_str(&format!("  Total rows: {}\n", table.row_count));
            } else {
                snapshot.push_str("  Could not count rows\n");
            }
        }

        Ok(snapshot)
    }

    /// Execute a statement and package the outcome as a [`QueryResult`].
    ///
    /// Backend errors never surface raw to the caller: the detail goes to the
    /// trace log and the result carries a generic user-safe message.
    pub fn execute(&self, sql: &str, complexity_score: u8) -> QueryResult {
        let start = Instant::now();

        let conn = match self.open() {
            Ok(conn) => conn,
            Err(err) => {
                tracing::error!(error = %err, "failed to open dataset store");
                return QueryResult::failure(
                    sql,
                    EXECUTION_FAILURE_MESSAGE,
                    start.elapsed().as_secs_f64(),
                    complexity_score,
                );
            }
        };

        match run_statement(&conn, sql) {
            Ok(data) => QueryResult {
                success: true,
                data: Some(data),
                sql_text: sql.to_string(),
                error: None,
                execution_time: start.elapsed().as_secs_f64(),
                complexity_score,
            },
            Err(err) => {
                tracing::error!(error = %err, sql, "SQL execution error");
                QueryResult::failure(
                    sql,
                    EXECUTION_FAILURE_MESSAGE,
                    start.elapsed().as_secs_f64(),
                    complexity_score,
                )
            }
        }
    }
}

fn run_statement(conn: &Connection, sql: &str) -> Result<TableData> {
    let mut stmt = conn.prepare(sql)?;
    let column_count = stmt.column_count();

    if column_count == 0 {
        // Mutation or DDL: report the affected row count as a one-cell table
        let affected = stmt.execute([])?;
        return Ok(TableData {
            columns: vec!["rows_affected".to_string()],
            rows: vec![vec![affected.to_string()]],
        });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut rendered_rows = Vec::new();

    while let Some(row) = rows.next()? {
        let mut rendered = Vec::with_capacity(column_count);
        for index in 0..column_count {
            rendered.push(render_value(row.get_ref(index)?));
        }
        rendered_rows.push(rendered);
    }

    Ok(TableData {
        columns,
        rows: rendered_rows,
    })
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).to_string(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, DatasetStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("data.db"), false);
        let conn = store.open_writable().unwrap();
        conn.execute_batch(
            "CREATE TABLE sales (region TEXT, amount REAL);
             INSERT INTO sales VALUES ('West', 100.0), ('East', 250.5);",
        )
        .unwrap();
        (dir, store)
    }

    #[test]
    fn executes_select() {
        let (_dir, store) = temp_store();
        let result = store.execute("SELECT region, amount FROM sales ORDER BY region", 2);
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data.columns, vec!["region", "amount"]);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0][0], "East");
    }

    #[test]
    fn invalid_sql_yields_sanitized_failure() {
        let (_dir, store) = temp_store();
        let result = store.execute("SELECT nope FROM missing_table", 1);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(EXECUTION_FAILURE_MESSAGE));
        assert!(result.data.is_none());
    }

    #[test]
    fn schema_snapshot_lists_tables_and_counts() {
        let (_dir, store) = temp_store();
        let snapshot = store.schema_snapshot().unwrap();
        assert!(snapshot.contains("Table: sales"));
        assert!(snapshot.contains("region (TEXT)"));
        assert!(snapshot.contains("Total rows: 2"));
    }

    #[test]
    fn readonly_mode_rejects_writes() {
        let (_dir, store) = temp_store();
        let readonly = DatasetStore::new(store.path().to_path_buf(), true);
        let result = readonly.execute("INSERT INTO sales VALUES ('North', 1.0)", 1);
        assert!(!result.success);
    }
}
