// ABOUTME: tokio-postgres implementation of the Driver and Connection traits
// ABOUTME: Uses the simple-query protocol so values arrive as text in the session's date style

use super::{Connection, Driver, ResultSet, Value};
use crate::config::Endpoint;
use crate::error::DriverError;
use crate::sync::SESSION_DATE_FORMAT;
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

/// Connects to PostgreSQL endpoints.
///
/// Each call to [`Driver::connect`] opens a fresh session; nothing is pooled.
#[derive(Debug, Clone, Default)]
pub struct PostgresDriver {
    application_name: Option<String>,
}

impl PostgresDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `application_name` on every session so DBAs can spot replicator traffic.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    fn pg_config(&self, endpoint: &Endpoint) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&endpoint.address.host)
            .port(endpoint.address.port)
            .user(&endpoint.credentials.user)
            .password(endpoint.credentials.password())
            .dbname(&endpoint.database_id);
        if let Some(ref name) = self.application_name {
            config.application_name(name);
        }
        config
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, DriverError> {
        let config = self.pg_config(endpoint);
        let label = endpoint.name.clone();

        // The connection future drives the socket and must be polled on its own task
        let (client, handle) = if endpoint.tls {
            let connector = native_tls::TlsConnector::builder().build()?;
            let tls = postgres_native_tls::MakeTlsConnector::new(connector);
            let (client, connection) = config.connect(tls).await?;
            let handle = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!("Connection to {} ended with error: {}", label, e);
                }
            });
            (client, handle)
        } else {
            let (client, connection) = config.connect(NoTls).await?;
            let handle = tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!("Connection to {} ended with error: {}", label, e);
                }
            });
            (client, handle)
        };

        tracing::debug!("Connected to {} ({})", endpoint.name, endpoint.address);
        Ok(Box::new(PostgresConnection {
            client,
            handle,
            in_transaction: false,
        }))
    }
}

/// A single PostgreSQL session.
///
/// PostgreSQL autocommits unless a transaction is open, so the first
/// [`Connection::execute`] issues `BEGIN` and commit/rollback close it.
pub struct PostgresConnection {
    client: Client,
    handle: JoinHandle<()>,
    in_transaction: bool,
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn set_date_format(&mut self, format: &str) -> Result<(), DriverError> {
        // ISO output is exactly yyyy-mm-dd hh24:mi:ss for whole-second timestamps
        if !format.eq_ignore_ascii_case(SESSION_DATE_FORMAT) {
            return Err(DriverError::Unsupported(format!(
                "PostgreSQL sessions only support the '{}' date format",
                SESSION_DATE_FORMAT
            )));
        }
        self.client.batch_execute("SET DateStyle TO 'ISO, YMD'").await?;
        Ok(())
    }

    // to_date() truncates to a bare date; to_timestamp() keeps the time
    fn date_function(&self) -> &'static str {
        "TO_TIMESTAMP"
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        let messages = self.client.simple_query(sql).await?;
        let mut result = ResultSet::default();

        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                if result.columns.is_empty() {
                    result.columns = row
                        .columns()
                        .iter()
                        .map(|column| column.name().to_string())
                        .collect();
                }
                let values = (0..row.len())
                    .map(|idx| match row.get(idx) {
                        Some(text) => Value::Text(text.to_string()),
                        None => Value::Null,
                    })
                    .collect();
                result.rows.push(values);
            }
        }

        Ok(result)
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        if !self.in_transaction {
            self.client.batch_execute("BEGIN").await?;
            self.in_transaction = true;
        }

        let messages = self.client.simple_query(sql).await?;
        Ok(messages
            .iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => Some(*rows),
                _ => None,
            })
            .sum())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("COMMIT").await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        if self.in_transaction {
            self.in_transaction = false;
            self.client.batch_execute("ROLLBACK").await?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let PostgresConnection { client, handle, .. } = *self;
        // Dropping the client terminates the session, which ends the connection task
        drop(client);
        handle
            .await
            .map_err(|e| DriverError::Other(format!("connection task failed: {}", e)))
    }
}
