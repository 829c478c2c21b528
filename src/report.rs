// ABOUTME: Reporting sink for synchronization events
// ABOUTME: The engine emits SyncEvents; TracingReporter routes them to tracing

use std::fmt;

/// A discrete, human-readable event emitted while synchronizing a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    PairInactive {
        pair: String,
    },
    NetworkDown {
        endpoint: String,
        reason: String,
    },
    ConnectionFailed {
        endpoint: String,
        reason: String,
    },
    ExtractionFailed {
        from: String,
        to: String,
        reason: String,
    },
    ApplyFailed {
        from: String,
        to: String,
        reason: String,
    },
    /// Nothing was extracted, so nothing was sent. Not a failure.
    NothingToApply {
        from: String,
        to: String,
    },
    TransferComplete {
        from: String,
        to: String,
        statements: usize,
    },
    CloseFailed {
        endpoint: String,
        reason: String,
    },
    PairFinished {
        pair: String,
        success: bool,
    },
}

impl SyncEvent {
    /// True for events describing a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncEvent::NetworkDown { .. }
                | SyncEvent::ConnectionFailed { .. }
                | SyncEvent::ExtractionFailed { .. }
                | SyncEvent::ApplyFailed { .. }
                | SyncEvent::PairFinished { success: false, .. }
        )
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::PairInactive { pair } => write!(f, "{} is inactive, skipping", pair),
            SyncEvent::NetworkDown { endpoint, reason } => {
                write!(f, "{} Network is Down! ({})", endpoint, reason)
            }
            SyncEvent::ConnectionFailed { endpoint, reason } => {
                write!(f, "{} Database Connection failed! ({})", endpoint, reason)
            }
            SyncEvent::ExtractionFailed { from, to, reason } => {
                write!(f, "Fetching data from {} for {} failed: {}", from, to, reason)
            }
            SyncEvent::ApplyFailed { from, to, reason } => {
                write!(f, "Updating {} with data from {} failed: {}", to, from, reason)
            }
            SyncEvent::NothingToApply { from, to } => {
                write!(f, "No new data from {} for {}", from, to)
            }
            SyncEvent::TransferComplete {
                from,
                to,
                statements,
            } => write!(
                f,
                "Data sending from {} to {} done ({} table(s))",
                from, to, statements
            ),
            SyncEvent::CloseFailed { endpoint, reason } => {
                write!(f, "Closing connection to {} failed: {}", endpoint, reason)
            }
            SyncEvent::PairFinished { pair, success } => write!(
                f,
                "Pair {} finished: {}",
                pair,
                if *success { "ok" } else { "with errors" }
            ),
        }
    }
}

/// Accepts events from the engine.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &SyncEvent);
}

/// Logs each event at a level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &SyncEvent) {
        match event {
            SyncEvent::CloseFailed { .. } | SyncEvent::PairFinished { success: false, .. } => {
                tracing::warn!("{}", event)
            }
            _ if event.is_failure() => tracing::error!("{}", event),
            SyncEvent::PairInactive { .. } | SyncEvent::PairFinished { .. } => {
                tracing::debug!("{}", event)
            }
            _ => tracing::info!("{}", event),
        }
    }
}
