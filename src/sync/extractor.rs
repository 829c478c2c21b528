// ABOUTME: Reads the latest row (max RINDEX) of each send table
// ABOUTME: Sets the session date format first so date text round-trips to the peer

use super::{INDEX_COLUMN, SESSION_DATE_FORMAT};
use crate::driver::{Connection, ResultSet, Value};
use crate::error::ExtractionError;

/// The latest row of one table: column names and values in query metadata order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(table: impl Into<String>, columns: Vec<String>, values: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            columns,
            values,
        }
    }

    /// Iterate `(column, value)` pairs in metadata order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Look up a value by column name, ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }
}

/// Query selecting every column of the row holding the table's maximum index.
pub fn latest_row_query(table: &str) -> String {
    format!(
        "SELECT * FROM {table} WHERE {index} = (SELECT MAX({index}) FROM {table})",
        table = table,
        index = INDEX_COLUMN
    )
}

/// Read the latest row of each table, in order.
///
/// Tables without rows are skipped. The first query failure stops the
/// extraction; rows already read are discarded with it.
pub async fn extract_latest(
    conn: &mut dyn Connection,
    tables: &[String],
) -> Result<Vec<Row>, ExtractionError> {
    if tables.is_empty() {
        return Ok(Vec::new());
    }

    conn.set_date_format(SESSION_DATE_FORMAT)
        .await
        .map_err(ExtractionError::SessionSetup)?;

    let mut rows = Vec::with_capacity(tables.len());
    for table in tables {
        let ResultSet {
            columns,
            rows: mut data,
        } = conn
            .query(&latest_row_query(table))
            .await
            .map_err(|source| ExtractionError::Query {
                table: table.clone(),
                source,
            })?;

        if data.is_empty() {
            tracing::debug!("{} has no rows, skipping", table);
            continue;
        }
        if data.len() > 1 {
            tracing::warn!(
                "{} has {} rows sharing the latest {}; using the first",
                table,
                data.len(),
                INDEX_COLUMN
            );
        }

        let values = data.swap_remove(0);
        rows.push(Row::new(table.clone(), columns, values));
    }

    Ok(rows)
}
