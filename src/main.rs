// ABOUTME: CLI entry point for tunnel-replicator
// ABOUTME: Loads the pair config, then runs the scheduler until Ctrl+C

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tunnel_replicator::driver::PostgresDriver;
use tunnel_replicator::probe::TcpProber;
use tunnel_replicator::{load_config, Scheduler, SchedulerConfig, TracingReporter, TriggerSchedule};

#[derive(Parser)]
#[command(name = "tunnel-replicator")]
#[command(
    about = "Exchange the latest row of configured tables between database pairs every minute",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to the pair configuration (JSON, or TOML with a .toml extension)
    #[arg(long, env = "TUNNEL_REPLICATOR_CONFIG")]
    config: PathBuf,
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log: String,
    /// Run every pair once and exit instead of waiting for the trigger second
    #[arg(long)]
    once: bool,
    /// Second of each minute at which pairs are synchronized (overrides config)
    #[arg(long)]
    trigger_second: Option<u32>,
    /// Seconds to pause after a tick (overrides config)
    #[arg(long)]
    cooldown_secs: Option<u64>,
    /// Seconds to wait for a reachability probe (overrides config)
    #[arg(long)]
    probe_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --log
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    let mut scheduler_config = SchedulerConfig::default();
    scheduler_config
        .apply_settings(&config.schedule)
        .context("Invalid schedule section")?;
    if let Some(second) = cli.trigger_second {
        scheduler_config.trigger =
            TriggerSchedule::every_minute_at(second).context("Invalid --trigger-second")?;
    }
    if let Some(secs) = cli.cooldown_secs {
        scheduler_config
            .set_cooldown_secs(secs)
            .context("Invalid --cooldown-secs")?;
    }
    if let Some(secs) = cli.probe_timeout_secs {
        scheduler_config.probe_timeout = Duration::from_secs(secs);
    }

    tracing::info!("Config: {:?}", cli.config);
    for pair in &config.pairs {
        tracing::info!(
            "Pair {} ({}): {} -> {} table(s), {} -> {} table(s)",
            pair.label(),
            if pair.is_active() { "active" } else { "inactive" },
            pair.first().name,
            pair.first().send_tables.len(),
            pair.second().name,
            pair.second().send_tables.len()
        );
    }

    let scheduler = Scheduler::new(
        scheduler_config,
        config.pairs,
        Arc::new(PostgresDriver::new().with_application_name("tunnel-replicator")),
        Arc::new(TcpProber),
        Arc::new(TracingReporter),
    );

    if cli.once {
        tracing::info!("Running a single pass over all pairs...");
        let stats = scheduler.run_once().await;

        println!();
        println!("========================================");
        println!("Replication pass complete");
        println!("========================================");
        println!("  Pairs: {}", stats.pairs);
        println!("  Succeeded: {}", stats.succeeded);
        println!("  Failed: {}", stats.failed);
        println!("  Skipped (inactive): {}", stats.skipped);
        return Ok(());
    }

    println!();
    println!("========================================");
    println!("Starting scheduled replication");
    println!("========================================");
    println!(
        "  Trigger: second {} of every minute",
        scheduler.config().trigger.second()
    );
    println!("  Press Ctrl+C to stop");
    println!();

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            // Keep the sender alive; dropping it would read as a shutdown
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal, finishing current tick");
        let _ = shutdown_tx.send(());
    });

    let ticks = scheduler.run(shutdown_rx).await;
    tracing::info!("Stopped after {} tick(s)", ticks);
    Ok(())
}
