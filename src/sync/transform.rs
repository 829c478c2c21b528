// ABOUTME: Turns an extracted row into an UPDATE statement for the peer table
// ABOUTME: Coercion is keyed by column name: audit columns dropped, dates wrapped, rest numeric

use super::extractor::Row;
use super::{INDEX_COLUMN, SESSION_DATE_FORMAT};
use crate::driver::Value;
use crate::error::{ExtractionError, TransformError};
use crate::utils::quote_literal;

/// Audit columns are owned by each site and never replicated.
pub const AUDIT_COLUMNS: &[&str] = &["AUSER", "ADATE"];

/// Columns holding dates in the session date format.
pub const DATE_COLUMNS: &[&str] = &["IDATE", "LDATE"];

/// Date parsing function used unless the destination connection names another.
pub const DEFAULT_DATE_FUNCTION: &str = "TO_DATE";

/// How a column's value is rendered into the `SET` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    Excluded,
    Date,
    Index,
    Numeric,
}

/// Classify a column by name. Names are compared ignoring ASCII case.
pub fn classify(column: &str) -> ColumnRule {
    let is = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(column));
    if is(AUDIT_COLUMNS) {
        ColumnRule::Excluded
    } else if is(DATE_COLUMNS) {
        ColumnRule::Date
    } else if column.eq_ignore_ascii_case(INDEX_COLUMN) {
        ColumnRule::Index
    } else {
        ColumnRule::Numeric
    }
}

fn format_date(date_function: &str, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => format!(
            "{}({}, '{}')",
            date_function,
            quote_literal(&other.to_string()),
            SESSION_DATE_FORMAT
        ),
    }
}

/// Render a numeric column.
///
/// Missing values become `0.0`, zero is passed through in its plain form,
/// anything else gets exactly three decimal places.
fn format_numeric(column: &str, value: &Value) -> Result<String, TransformError> {
    let not_numeric = || TransformError {
        column: column.to_string(),
        value: value.to_string(),
    };

    match value {
        Value::Null => Ok("0.0".to_string()),
        Value::Int(0) => Ok("0".to_string()),
        Value::Int(i) => Ok(format!("{:.3}", *i as f64)),
        Value::Float(f) if !f.is_finite() => Err(not_numeric()),
        Value::Float(f) if *f == 0.0 => Ok("0.0".to_string()),
        Value::Float(f) => Ok(format!("{:.3}", f)),
        Value::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("NULL") {
                return Ok("0.0".to_string());
            }
            let parsed: f64 = trimmed.parse().map_err(|_| not_numeric())?;
            if !parsed.is_finite() {
                Err(not_numeric())
            } else if parsed == 0.0 {
                Ok(trimmed.to_string())
            } else {
                Ok(format!("{:.3}", parsed))
            }
        }
    }
}

/// Render one `column=value` fragment, or `None` for excluded columns.
///
/// Date columns are wrapped in `date_function`, which must accept the text
/// and [`SESSION_DATE_FORMAT`] and keep the time of day.
pub fn format_fragment(
    column: &str,
    value: &Value,
    date_function: &str,
) -> Result<Option<String>, TransformError> {
    let rendered = match classify(column) {
        ColumnRule::Excluded => return Ok(None),
        ColumnRule::Date => format_date(date_function, value),
        ColumnRule::Index => value.to_string(),
        ColumnRule::Numeric => format_numeric(column, value)?,
    };
    Ok(Some(format!("{}={}", column, rendered)))
}

/// Build `UPDATE <table> SET c=v,...` from a row.
///
/// `table` is the destination table, not the table the row was read from.
/// Returns `None` when every column of the row is excluded.
pub fn build_update(table: &str, row: &Row) -> Result<Option<String>, TransformError> {
    build_update_with(table, row, DEFAULT_DATE_FUNCTION)
}

/// [`build_update`] with the destination's date parsing function.
pub fn build_update_with(
    table: &str,
    row: &Row,
    date_function: &str,
) -> Result<Option<String>, TransformError> {
    let mut fragments = Vec::with_capacity(row.columns.len());
    for (column, value) in row.iter() {
        if let Some(fragment) = format_fragment(column, value, date_function)? {
            fragments.push(fragment);
        }
    }

    if fragments.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("UPDATE {} SET {}", table, fragments.join(","))))
}

/// Map extracted rows onto the peer's receive tables.
///
/// `send_tables[i]` is written into `receive_tables[i]`. Rows arrive in send
/// order with empty tables skipped, so each row is matched to the next send
/// table that produced it.
pub fn build_statements(
    send_tables: &[String],
    receive_tables: &[String],
    rows: &[Row],
) -> Result<Vec<String>, ExtractionError> {
    build_statements_with(send_tables, receive_tables, rows, DEFAULT_DATE_FUNCTION)
}

/// [`build_statements`] with the destination's date parsing function.
pub fn build_statements_with(
    send_tables: &[String],
    receive_tables: &[String],
    rows: &[Row],
    date_function: &str,
) -> Result<Vec<String>, ExtractionError> {
    let mut rows = rows.iter().peekable();
    let mut statements = Vec::with_capacity(send_tables.len());

    for (source, destination) in send_tables.iter().zip(receive_tables) {
        let Some(row) = rows.next_if(|row| &row.table == source) else {
            continue;
        };
        let statement =
            build_update_with(destination, row, date_function).map_err(|e| ExtractionError::Transform {
                table: source.clone(),
                source: e,
            })?;
        match statement {
            Some(sql) => statements.push(sql),
            None => tracing::debug!("{} has only excluded columns, nothing to send", source),
        }
    }

    Ok(statements)
}
