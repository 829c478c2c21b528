// ABOUTME: PairSynchronizer - one bidirectional exchange between two endpoints
// ABOUTME: probe -> connect -> A to B -> B to A -> close, with closing guaranteed

use super::applier::apply;
use super::extractor::extract_latest;
use super::transform::build_statements_with;
use crate::config::{Endpoint, Pair};
use crate::driver::{Connection, Driver};
use crate::error::SyncError;
use crate::probe::{ProbeOutcome, Prober, DEFAULT_PROBE_TIMEOUT};
use crate::report::{Reporter, SyncEvent};
use std::sync::Arc;
use std::time::Duration;

/// Where a pair pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    ProbingNetwork,
    Connecting,
    ExtractingA,
    TransformingA,
    ApplyingToB,
    ExtractingB,
    TransformingB,
    ApplyingToA,
    Closing,
    Done,
    Aborted,
}

/// Result of one transfer direction.
#[derive(Debug)]
pub enum DirectionOutcome {
    Transferred { statements: usize },
    /// No source table had rows; nothing was sent
    NothingToApply,
    Failed(SyncError),
}

impl DirectionOutcome {
    /// A direction fails only on error; having nothing to send is fine.
    pub fn is_success(&self) -> bool {
        !matches!(self, DirectionOutcome::Failed(_))
    }
}

/// Result of a full pair pass.
#[derive(Debug)]
pub enum PairOutcome {
    /// The pair is switched off; nothing was touched
    Inactive,
    /// The pass stopped before any transfer ran
    Aborted { phase: SyncPhase, error: SyncError },
    Done {
        forward: DirectionOutcome,
        reverse: DirectionOutcome,
    },
}

impl PairOutcome {
    /// Both directions ran without failing.
    pub fn is_success(&self) -> bool {
        match self {
            PairOutcome::Done { forward, reverse } => forward.is_success() && reverse.is_success(),
            _ => false,
        }
    }

    /// Terminal phase of the state machine.
    pub fn final_phase(&self) -> SyncPhase {
        match self {
            PairOutcome::Done { .. } => SyncPhase::Done,
            _ => SyncPhase::Aborted,
        }
    }
}

/// Phases used by one transfer direction.
struct DirectionPhases {
    extracting: SyncPhase,
    transforming: SyncPhase,
    applying: SyncPhase,
}

const FORWARD: DirectionPhases = DirectionPhases {
    extracting: SyncPhase::ExtractingA,
    transforming: SyncPhase::TransformingA,
    applying: SyncPhase::ApplyingToB,
};

const REVERSE: DirectionPhases = DirectionPhases {
    extracting: SyncPhase::ExtractingB,
    transforming: SyncPhase::TransformingB,
    applying: SyncPhase::ApplyingToA,
};

/// Runs the exchange protocol for one pair.
///
/// Everything is sequential: endpoint A is probed and connected before B,
/// and A→B completes before B→A starts. Both connections are closed on
/// every path once they are open.
pub struct PairSynchronizer {
    driver: Arc<dyn Driver>,
    prober: Arc<dyn Prober>,
    reporter: Arc<dyn Reporter>,
    probe_timeout: Duration,
}

impl PairSynchronizer {
    pub fn new(
        driver: Arc<dyn Driver>,
        prober: Arc<dyn Prober>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            driver,
            prober,
            reporter,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Run one pass over `pair`.
    pub async fn sync(&self, pair: &Pair) -> PairOutcome {
        let label = pair.label();
        let mut phase = SyncPhase::Idle;

        if !pair.is_active() {
            self.reporter.report(&SyncEvent::PairInactive {
                pair: label.clone(),
            });
            tracing::debug!("{}: {:?} -> {:?}", label, phase, SyncPhase::Aborted);
            return PairOutcome::Inactive;
        }

        let (a, b) = (pair.first(), pair.second());

        self.enter(&label, &mut phase, SyncPhase::ProbingNetwork);
        for endpoint in [a, b] {
            if let Err(error) = self.probe(endpoint).await {
                return self.abort(&label, phase, error);
            }
        }

        self.enter(&label, &mut phase, SyncPhase::Connecting);
        let mut conn_a = match self.connect(a).await {
            Ok(conn) => conn,
            Err(error) => return self.abort(&label, phase, error),
        };
        let mut conn_b = match self.connect(b).await {
            Ok(conn) => conn,
            Err(error) => {
                self.close(a, conn_a).await;
                return self.abort(&label, phase, error);
            }
        };

        let forward = self
            .transfer(&label, &mut phase, &FORWARD, a, conn_a.as_mut(), b, conn_b.as_mut())
            .await;
        let reverse = self
            .transfer(&label, &mut phase, &REVERSE, b, conn_b.as_mut(), a, conn_a.as_mut())
            .await;

        self.enter(&label, &mut phase, SyncPhase::Closing);
        self.close(a, conn_a).await;
        self.close(b, conn_b).await;
        self.enter(&label, &mut phase, SyncPhase::Done);

        let outcome = PairOutcome::Done { forward, reverse };
        self.reporter.report(&SyncEvent::PairFinished {
            pair: label,
            success: outcome.is_success(),
        });
        outcome
    }

    fn enter(&self, label: &str, phase: &mut SyncPhase, next: SyncPhase) {
        tracing::debug!("{}: {:?} -> {:?}", label, *phase, next);
        *phase = next;
    }

    fn abort(&self, label: &str, phase: SyncPhase, error: SyncError) -> PairOutcome {
        tracing::debug!("{}: {:?} -> {:?} ({})", label, phase, SyncPhase::Aborted, error);
        self.reporter.report(&SyncEvent::PairFinished {
            pair: label.to_string(),
            success: false,
        });
        PairOutcome::Aborted { phase, error }
    }

    async fn probe(&self, endpoint: &Endpoint) -> Result<(), SyncError> {
        match self
            .prober
            .probe(&endpoint.address, self.probe_timeout)
            .await
        {
            ProbeOutcome::Reachable => Ok(()),
            ProbeOutcome::Unreachable(reason) => {
                self.reporter.report(&SyncEvent::NetworkDown {
                    endpoint: endpoint.name.clone(),
                    reason: reason.clone(),
                });
                Err(SyncError::NetworkUnreachable {
                    endpoint: endpoint.name.clone(),
                    reason,
                })
            }
        }
    }

    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, SyncError> {
        self.driver.connect(endpoint).await.map_err(|source| {
            self.reporter.report(&SyncEvent::ConnectionFailed {
                endpoint: endpoint.name.clone(),
                reason: source.to_string(),
            });
            SyncError::Connection {
                endpoint: endpoint.name.clone(),
                source,
            }
        })
    }

    async fn close(&self, endpoint: &Endpoint, conn: Box<dyn Connection>) {
        if let Err(e) = conn.close().await {
            self.reporter.report(&SyncEvent::CloseFailed {
                endpoint: endpoint.name.clone(),
                reason: e.to_string(),
            });
        }
    }

    /// Send the latest rows of `from`'s send tables into `to`'s receive tables.
    #[allow(clippy::too_many_arguments)]
    async fn transfer(
        &self,
        label: &str,
        phase: &mut SyncPhase,
        phases: &DirectionPhases,
        from: &Endpoint,
        from_conn: &mut dyn Connection,
        to: &Endpoint,
        to_conn: &mut dyn Connection,
    ) -> DirectionOutcome {
        self.enter(label, phase, phases.extracting);
        let rows = match extract_latest(from_conn, &from.send_tables).await {
            Ok(rows) => rows,
            Err(source) => return self.extraction_failed(from, to, source),
        };

        self.enter(label, phase, phases.transforming);
        let statements = match build_statements_with(
            &from.send_tables,
            &to.receive_tables,
            &rows,
            to_conn.date_function(),
        ) {
            Ok(statements) => statements,
            Err(source) => return self.extraction_failed(from, to, source),
        };

        self.enter(label, phase, phases.applying);
        match apply(Some(to_conn), &statements).await {
            Ok(true) => {
                self.reporter.report(&SyncEvent::TransferComplete {
                    from: from.name.clone(),
                    to: to.name.clone(),
                    statements: statements.len(),
                });
                DirectionOutcome::Transferred {
                    statements: statements.len(),
                }
            }
            Ok(false) => {
                self.reporter.report(&SyncEvent::NothingToApply {
                    from: from.name.clone(),
                    to: to.name.clone(),
                });
                DirectionOutcome::NothingToApply
            }
            Err(source) => {
                self.reporter.report(&SyncEvent::ApplyFailed {
                    from: from.name.clone(),
                    to: to.name.clone(),
                    reason: source.to_string(),
                });
                DirectionOutcome::Failed(SyncError::Apply {
                    endpoint: to.name.clone(),
                    source,
                })
            }
        }
    }

    fn extraction_failed(
        &self,
        from: &Endpoint,
        to: &Endpoint,
        source: crate::error::ExtractionError,
    ) -> DirectionOutcome {
        self.reporter.report(&SyncEvent::ExtractionFailed {
            from: from.name.clone(),
            to: to.name.clone(),
            reason: source.to_string(),
        });
        DirectionOutcome::Failed(SyncError::Extraction {
            endpoint: from.name.clone(),
            source,
        })
    }
}
