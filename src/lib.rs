// ABOUTME: Library entry point for tunnel-replicator
// ABOUTME: Exports config, driver, probe, sync pipeline, reporting, and scheduler modules

pub mod config;
pub mod driver;
pub mod error;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod sync;
pub mod utils;

pub use config::{load_config, Address, Config, Credentials, Endpoint, Pair};
pub use error::{ApplyError, ConfigError, DriverError, ExtractionError, SyncError, TransformError};
pub use report::{Reporter, SyncEvent, TracingReporter};
pub use scheduler::{Scheduler, SchedulerConfig, TickStats, TriggerSchedule};
