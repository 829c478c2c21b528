// ABOUTME: In-memory test doubles for the driver, prober, and reporting sink
// ABOUTME: Every call is recorded so tests can assert on call counts and SQL text

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tunnel_replicator::driver::{Connection, Driver, ResultSet, Value};
use tunnel_replicator::probe::{ProbeOutcome, Prober};
use tunnel_replicator::{Address, Credentials, DriverError, Endpoint, Reporter, SyncEvent};

/// Scripted state and call log for one endpoint's database.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    /// Latest-row result per table name
    pub tables: HashMap<String, ResultSet>,
    pub fail_connect: Option<String>,
    pub fail_date_format: bool,
    /// Queries mentioning this table fail
    pub fail_query_on: Option<String>,
    /// Statements containing this text fail
    pub fail_execute_on: Option<String>,
    pub connect_delay: Option<Duration>,
    /// Overrides the connection's date parsing function
    pub date_function: Option<&'static str>,

    pub connects: usize,
    pub calls: usize,
    pub date_formats: Vec<String>,
    pub queries: Vec<String>,
    pub executed: Vec<String>,
    pub pending: Vec<String>,
    pub committed: Vec<String>,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `table` a latest row.
    pub fn with_row(mut self, table: &str, columns: &[&str], values: Vec<Value>) -> Self {
        self.tables.insert(
            table.to_string(),
            ResultSet::new(
                columns.iter().map(|c| c.to_string()).collect(),
                vec![values],
            ),
        );
        self
    }

    /// Statements applied and committed, in order.
    pub fn committed(&self) -> &[String] {
        &self.committed
    }
}

type Databases = Arc<Mutex<HashMap<String, MockDatabase>>>;

/// Driver keyed by endpoint name; unknown endpoints get an empty database.
#[derive(Clone, Default)]
pub struct MockDriver {
    databases: Databases,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, endpoint: &str, db: MockDatabase) -> Self {
        self.databases
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), db);
        self
    }

    /// Snapshot of an endpoint's database state.
    pub fn db(&self, endpoint: &str) -> MockDatabase {
        self.databases
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_connects(&self) -> usize {
        self.databases
            .lock()
            .unwrap()
            .values()
            .map(|db| db.connects)
            .sum()
    }

    pub fn total_calls(&self) -> usize {
        self.databases
            .lock()
            .unwrap()
            .values()
            .map(|db| db.calls)
            .sum()
    }

    /// Open a connection directly, bypassing the synchronizer.
    pub async fn open(&self, endpoint: &str) -> Box<dyn Connection> {
        let ep = endpoint_named(endpoint);
        self.connect(&ep).await.expect("mock connect failed")
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, DriverError> {
        let (delay, date_function) = {
            let mut dbs = self.databases.lock().unwrap();
            let db = dbs.entry(endpoint.name.clone()).or_default();
            db.connects += 1;
            if let Some(ref msg) = db.fail_connect {
                return Err(DriverError::Other(msg.clone()));
            }
            (db.connect_delay, db.date_function)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Box::new(MockConnection {
            name: endpoint.name.clone(),
            databases: Arc::clone(&self.databases),
            date_function,
        }))
    }
}

pub struct MockConnection {
    name: String,
    databases: Databases,
    date_function: Option<&'static str>,
}

impl MockConnection {
    fn with_db<T>(&self, f: impl FnOnce(&mut MockDatabase) -> T) -> T {
        let mut dbs = self.databases.lock().unwrap();
        let db = dbs.entry(self.name.clone()).or_default();
        db.calls += 1;
        f(db)
    }
}

fn table_of(sql: &str) -> String {
    sql.split("FROM ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Connection for MockConnection {
    async fn set_date_format(&mut self, format: &str) -> Result<(), DriverError> {
        self.with_db(|db| {
            if db.fail_date_format {
                return Err(DriverError::Unsupported("date format".to_string()));
            }
            db.date_formats.push(format.to_string());
            Ok(())
        })
    }

    fn date_function(&self) -> &'static str {
        self.date_function.unwrap_or("TO_DATE")
    }

    async fn query(&mut self, sql: &str) -> Result<ResultSet, DriverError> {
        self.with_db(|db| {
            db.queries.push(sql.to_string());
            let table = table_of(sql);
            if db.fail_query_on.as_deref() == Some(table.as_str()) {
                return Err(DriverError::Other(format!("table {} does not exist", table)));
            }
            Ok(db.tables.get(&table).cloned().unwrap_or_default())
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.with_db(|db| {
            db.executed.push(sql.to_string());
            if let Some(ref needle) = db.fail_execute_on {
                if sql.contains(needle.as_str()) {
                    return Err(DriverError::Other("value too large for column".to_string()));
                }
            }
            db.pending.push(sql.to_string());
            Ok(1)
        })
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.with_db(|db| {
            db.commits += 1;
            let pending = std::mem::take(&mut db.pending);
            db.committed.extend(pending);
            Ok(())
        })
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.with_db(|db| {
            db.rollbacks += 1;
            db.pending.clear();
            Ok(())
        })
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.with_db(|db| {
            db.closes += 1;
            Ok(())
        })
    }
}

/// Prober answering per host; hosts not listed are reachable.
#[derive(Default)]
pub struct ScriptedProber {
    down: Mutex<HashMap<String, String>>,
    probes: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_down(self, host: &str, reason: &str) -> Self {
        self.down
            .lock()
            .unwrap()
            .insert(host.to_string(), reason.to_string());
        self
    }

    pub fn probed(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, address: &Address, _timeout: Duration) -> ProbeOutcome {
        self.probes.lock().unwrap().push(address.host.clone());
        match self.down.lock().unwrap().get(&address.host) {
            Some(reason) => ProbeOutcome::Unreachable(reason.clone()),
            None => ProbeOutcome::Reachable,
        }
    }
}

/// Captures every reported event.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &SyncEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Endpoint whose host equals its name, so probers can key on either.
pub fn endpoint_named(name: &str) -> Endpoint {
    Endpoint::new(name, name, 1521, Credentials::new("abbsg", "abbsg"), "ADVA")
}

pub fn endpoint(name: &str, send: &[&str], receive: &[&str]) -> Endpoint {
    endpoint_named(name)
        .with_send_tables(send.iter().copied())
        .with_receive_tables(receive.iter().copied())
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
