//! Superstore dataset bootstrap
//!
//! Creates the `superstore` table and bulk-loads the study CSV into it.
//! Column types are sniffed from the first non-empty value per column, the
//! same way the engine's CSV loader decides between integer, real, and text.

use crate::dataset::DatasetStore;
use crate::error::{AssistantError, Result};
use csv::Reader;
use std::path::Path;

/// Fixed schema used when no CSV is available, matching the retail study
/// dataset: order/ship dates, customer, region, category hierarchy, and the
/// sales/quantity/discount/profit measures.
const SUPERSTORE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS superstore (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    "Order_ID" TEXT,
    "Order_Date" TEXT,
    "Ship_Date" TEXT,
    "Ship_Mode" TEXT,
    "Customer_ID" TEXT,
    "Customer_Name" TEXT,
    "Segment" TEXT,
    "Country" TEXT,
    "City" TEXT,
    "State" TEXT,
    "Postal_Code" TEXT,
    "Region" TEXT,
    "Product_ID" TEXT,
    "Category" TEXT,
    "Sub_Category" TEXT,
    "Product_Name" TEXT,
    "Sales" REAL,
    "Quantity" INTEGER,
    "Discount" REAL,
    "Profit" REAL
)
"#;

/// Ensure the superstore table exists, importing `csv_path` when given.
/// Returns the number of rows imported (0 when the table already had data
/// or no CSV was supplied).
pub fn ensure_superstore(store: &DatasetStore, csv_path: Option<&Path>) -> Result<usize> {
    let conn = store.open_writable()?;

    let existing: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='superstore'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if existing > 0 {
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM superstore", [], |row| row.get(0))?;
        if rows > 0 {
            tracing::debug!(rows, "superstore table already populated");
            return Ok(0);
        }
    }

    match csv_path {
        Some(path) => import_superstore_csv(store, path),
        None => {
            conn.execute_batch(SUPERSTORE_DDL)?;
            tracing::info!("created empty superstore table (no CSV configured)");
            Ok(0)
        }
    }
}

/// Import the superstore CSV, creating the table from the file's headers.
pub fn import_superstore_csv(store: &DatasetStore, csv_path: &Path) -> Result<usize> {
    let mut reader = Reader::from_path(csv_path).map_err(|e| {
        AssistantError::storage_with_path(e.to_string(), csv_path.display().to_string())
    })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AssistantError::storage(e.to_string()))?
        .iter()
        .map(clean_column_name)
        .collect();

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AssistantError::storage(e.to_string()))?;
        records.push(record.iter().map(|field| field.to_string()).collect());
    }

    if headers.is_empty() {
        return Err(AssistantError::storage("superstore CSV has no header row"));
    }

    // Sniff a SQL type per column from the first non-empty value
    let mut column_defs = Vec::with_capacity(headers.len());
    for (index, header) in headers.iter().enumerate() {
        let sample = records
            .iter()
            .map(|row| row.get(index).map(String::as_str).unwrap_or(""))
            .find(|value| !value.is_empty());
        column_defs.push(format!("\"{}\" {}", header, sniff_sql_type(sample)));
    }

    let mut conn = store.open_writable()?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS superstore (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
        column_defs.join(", ")
    ))?;

    let placeholders = vec!["?"; headers.len()].join(", ");
    let column_list = headers
        .iter()
        .map(|h| format!("\"{}\"", h))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT INTO superstore ({}) VALUES ({})",
        column_list, placeholders
    );

    let tx = conn.transaction()?;
    let mut inserted = 0usize;
    {
        let mut stmt = tx.prepare(&insert_sql)?;
        for record in &records {
            match stmt.execute(rusqlite::params_from_iter(record.iter())) {
                Ok(_) => inserted += 1,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable superstore row");
                }
            }
        }
    }
    tx.commit()?;

    tracing::info!(inserted, path = %csv_path.display(), "imported superstore dataset");
    Ok(inserted)
}

fn clean_column_name(raw: &str) -> String {
    raw.trim()
        .replace(' ', "_")
        .replace('-', "_")
        .replace('(', "")
        .replace(')', "")
        .replace('/', "_")
}

fn sniff_sql_type(sample: Option<&str>) -> &'static str {
    match sample {
        Some(value) if value.parse::<i64>().is_ok() => "INTEGER",
        Some(value) if value.parse::<f64>().is_ok() => "REAL",
        _ => "TEXT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn imports_csv_with_sniffed_types() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("superstore.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "Order ID,Region,Sales,Quantity").unwrap();
        writeln!(file, "CA-2016-1,West,261.96,2").unwrap();
        writeln!(file, "CA-2016-2,South,731.94,3").unwrap();

        let store = DatasetStore::new(dir.path().join("data.db"), false);
        let inserted = import_superstore_csv(&store, &csv_path).unwrap();
        assert_eq!(inserted, 2);

        let result = store.execute("SELECT Region, Sales FROM superstore ORDER BY Sales", 1);
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0][0], "West");
    }

    #[test]
    fn ensure_creates_empty_table_without_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(dir.path().join("data.db"), false);
        let inserted = ensure_superstore(&store, None).unwrap();
        assert_eq!(inserted, 0);

        let snapshot = store.schema_snapshot().unwrap();
        assert!(snapshot.contains("Table: superstore"));
        assert!(snapshot.contains("Sales (REAL)"));
    }
}
