// ABOUTME: TCP reachability check run before opening database sessions
// ABOUTME: Never fails - every error becomes an Unreachable outcome with a reason

use crate::config::Address;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Default bound on a single reachability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    /// Carries a human-readable reason for the report
    Unreachable(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }
}

/// Checks whether an endpoint accepts connections at all.
///
/// Advisory only: a reachable host can still refuse the database login.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, address: &Address, timeout: Duration) -> ProbeOutcome;
}

/// Opens and immediately drops a bare TCP connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, address: &Address, timeout: Duration) -> ProbeOutcome {
        probe(&address.host, address.port, timeout).await
    }
}

/// Attempt a TCP connection to `host:port` within `timeout`.
pub async fn probe(host: &str, port: u16, timeout: Duration) -> ProbeOutcome {
    if host.is_empty() || port == 0 {
        return ProbeOutcome::Unreachable("no host or port configured".to_string());
    }

    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => ProbeOutcome::Reachable,
        Ok(Err(e)) => ProbeOutcome::Unreachable(format!("{}:{}: {}", host, port, e)),
        Err(_) => ProbeOutcome::Unreachable(format!(
            "{}:{}: no response within {:?}",
            host, port, timeout
        )),
    }
}
