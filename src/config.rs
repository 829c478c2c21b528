// ABOUTME: Endpoint and pair definitions plus the JSON/TOML config loader
// ABOUTME: Validates positional table mappings before any pair is synchronized

use crate::error::ConfigError;
use crate::utils::validate_table_name;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Network location of a database endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Login for a database endpoint. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// One database site and the tables it exchanges with its peer.
///
/// `send_tables[i]` on one endpoint is written into `receive_tables[i]` on
/// the other endpoint of the same pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub address: Address,
    pub credentials: Credentials,
    pub database_id: String,
    pub send_tables: Vec<String>,
    pub receive_tables: Vec<String>,
    /// Request an encrypted session from the driver
    pub tls: bool,
}

impl Endpoint {
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: Address {
                host: host.into(),
                port,
            },
            credentials,
            database_id: database_id.into(),
            send_tables: Vec::new(),
            receive_tables: Vec::new(),
            tls: false,
        }
    }

    pub fn with_send_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_receive_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.receive_tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Structural checks that do not depend on the peer.
    fn validate(&self) -> Result<(), ConfigError> {
        let label = if self.name.trim().is_empty() {
            self.address.to_string()
        } else {
            self.name.clone()
        };
        let missing = |field: &'static str| ConfigError::MissingField {
            endpoint: label.clone(),
            field,
        };

        if self.name.trim().is_empty() {
            return Err(missing("name"));
        }
        if self.address.host.trim().is_empty() {
            return Err(missing("host"));
        }
        if self.address.port == 0 {
            return Err(missing("port"));
        }
        if self.credentials.user.is_empty() {
            return Err(missing("user"));
        }
        if self.credentials.password.is_empty() {
            return Err(missing("password"));
        }
        if self.database_id.trim().is_empty() {
            return Err(missing("database_id"));
        }

        for table in self.send_tables.iter().chain(self.receive_tables.iter()) {
            validate_table_name(table).map_err(|reason| ConfigError::InvalidTable {
                endpoint: self.name.clone(),
                table: table.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

/// Two endpoints that exchange latest rows in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    active: bool,
    endpoints: (Endpoint, Endpoint),
}

impl Pair {
    /// Build a pair, checking both endpoints and the positional table mapping.
    pub fn new(active: bool, first: Endpoint, second: Endpoint) -> Result<Self, ConfigError> {
        first.validate()?;
        second.validate()?;
        check_mapping(&first, &second)?;
        check_mapping(&second, &first)?;
        Ok(Self {
            active,
            endpoints: (first, second),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn first(&self) -> &Endpoint {
        &self.endpoints.0
    }

    pub fn second(&self) -> &Endpoint {
        &self.endpoints.1
    }

    /// Display label, e.g. `pulp2<->nps`.
    pub fn label(&self) -> String {
        format!("{}<->{}", self.endpoints.0.name, self.endpoints.1.name)
    }
}

fn check_mapping(from: &Endpoint, to: &Endpoint) -> Result<(), ConfigError> {
    if from.send_tables.len() != to.receive_tables.len() {
        return Err(ConfigError::TableCountMismatch {
            from: from.name.clone(),
            to: to.name.clone(),
            send: from.send_tables.len(),
            receive: to.receive_tables.len(),
        });
    }
    Ok(())
}

/// Optional `schedule` section of the config document.
///
/// Every field falls back to [`crate::scheduler::SchedulerConfig::default`]
/// and can be overridden again on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSettings {
    pub trigger_second: Option<u32>,
    pub cooldown_secs: Option<u64>,
    pub probe_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

/// Raw document shape, kept compatible with the `{"app": [{"active", "comm"}]}` layout.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    schedule: ScheduleSettings,
    app: Vec<PairDocument>,
}

#[derive(Debug, Deserialize)]
struct PairDocument {
    active: bool,
    comm: Vec<EndpointDocument>,
}

#[derive(Debug, Deserialize)]
struct EndpointDocument {
    name: String,
    #[serde(alias = "host")]
    ip: String,
    port: u16,
    user: String,
    #[serde(alias = "password")]
    passwd: String,
    #[serde(alias = "database")]
    sid: String,
    #[serde(default, alias = "post")]
    send: Vec<String>,
    #[serde(default, alias = "get")]
    receive: Vec<String>,
    #[serde(default)]
    tls: bool,
}

impl From<EndpointDocument> for Endpoint {
    fn from(doc: EndpointDocument) -> Self {
        Endpoint::new(
            doc.name,
            doc.ip,
            doc.port,
            Credentials::new(doc.user, doc.passwd),
            doc.sid,
        )
        .with_send_tables(doc.send)
        .with_receive_tables(doc.receive)
        .with_tls(doc.tls)
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub schedule: ScheduleSettings,
    pub pairs: Vec<Pair>,
}

impl Config {
    /// Parse a JSON document. `origin` is only used in error messages.
    pub fn from_json_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let doc: ConfigDocument =
            serde_json::from_str(contents).map_err(|source| ConfigError::Json {
                path: origin.to_path_buf(),
                source,
            })?;
        Self::from_document(doc)
    }

    /// Parse a TOML document with the same shape as the JSON one.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let doc: ConfigDocument = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        Self::from_document(doc)
    }

    fn from_document(doc: ConfigDocument) -> Result<Self, ConfigError> {
        if let Some(second) = doc.schedule.trigger_second {
            if second > 59 {
                return Err(ConfigError::Schedule(format!(
                    "trigger_second must be 0-59, got {}",
                    second
                )));
            }
        }

        let mut pairs = Vec::with_capacity(doc.app.len());
        for (index, pair_doc) in doc.app.into_iter().enumerate() {
            let found = pair_doc.comm.len();
            let mut endpoints = pair_doc.comm.into_iter().map(Endpoint::from);
            let (first, second) = match (endpoints.next(), endpoints.next(), endpoints.next()) {
                (Some(first), Some(second), None) => (first, second),
                _ => return Err(ConfigError::EndpointCount { index, found }),
            };
            pairs.push(Pair::new(pair_doc.active, first, second)?);
        }

        Ok(Self {
            schedule: doc.schedule,
            pairs,
        })
    }
}

/// Load and validate the config file at `path`.
///
/// Files ending in `.toml` are parsed as TOML, everything else as JSON.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => Config::from_toml_str(&contents, path)?,
        _ => Config::from_json_str(&contents, path)?,
    };

    tracing::debug!(
        "Loaded {} pair(s) from {:?} ({} active)",
        config.pairs.len(),
        path,
        config.pairs.iter().filter(|p| p.is_active()).count()
    );
    Ok(config)
}
