// ABOUTME: Database driver seam - connection traits and raw row values
// ABOUTME: The engine only talks to databases through Driver and Connection

pub mod postgres;

pub use postgres::PostgresDriver;

use crate::config::Endpoint;
use crate::error::DriverError;
use crate::sync::DEFAULT_DATE_FUNCTION;
use async_trait::async_trait;
use std::fmt;

/// A raw column value as returned by a driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Result of a query: column names in metadata order plus the returned rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// A live database session.
///
/// DML issued through [`Connection::execute`] is not visible to other
/// sessions until [`Connection::commit`] succeeds.
#[async_trait]
pub trait Connection: Send {
    /// Set the session's textual date format, e.g. `yyyy-mm-dd hh24:mi:ss`.
    async fn set_date_format(&mut self, format: &str) -> Result<(), DriverError>;

    /// SQL function that parses date text in the session format, keeping the
    /// time of day. Called as `f('<text>', '<format>')` in generated updates.
    fn date_function(&self) -> &'static str {
        DEFAULT_DATE_FUNCTION
    }

    /// Run a query and return all rows.
    async fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError>;

    /// Run a DML statement inside the current transaction, returning affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError>;

    async fn commit(&mut self) -> Result<(), DriverError>;

    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// End the session. Uncommitted work is discarded.
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Opens connections to endpoints.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, DriverError>;
}
