//! integrid CLI entry point

use anyhow::{Context, Result};
use integrid::config::cli::{Cli, ExecutionMode};
use integrid::config::{toml, validator, Config};
use integrid::distributed::{DistributedCoordinator, NodeService, Range, RunSummary};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();
    cli.validate()?;

    setup_logging(&cli);

    let config = toml::load_config(&cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    match cli.mode {
        ExecutionMode::Master => run_master(&cli, config),
        ExecutionMode::Worker => run_worker(config),
    }
}

/// Initialize env_logger
///
/// `--log-level` wins; otherwise `RUST_LOG` is honored, falling back to info.
fn setup_logging(cli: &Cli) {
    let mut builder = env_logger::Builder::new();

    match cli.log_level.as_deref() {
        Some(level) => {
            let level = match level.to_lowercase().as_str() {
                "trace" => log::LevelFilter::Trace,
                "debug" => log::LevelFilter::Debug,
                "warn" => log::LevelFilter::Warn,
                "error" => log::LevelFilter::Error,
                "off" => log::LevelFilter::Off,
                _ => log::LevelFilter::Info,
            };
            builder.filter_level(level);
        }
        None => {
            builder.filter_level(log::LevelFilter::Info);
            builder.parse_default_env();
        }
    }

    builder.format_timestamp_millis().init();
}

/// Run in master mode: discover, distribute, print the aggregate
fn run_master(cli: &Cli, config: Config) -> Result<()> {
    let (start, end, step) = cli
        .range()
        .context("master mode requires three arguments: <START> <END> <STEP>")?;
    validator::validate_range(start, end, step)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let summary = runtime.block_on(async {
        let coordinator = DistributedCoordinator::new(Arc::new(config), Range { start, end, step });
        coordinator.run().await
    })?;

    print_summary(&summary, cli.json)
}

/// Run in worker mode until both handlers have stopped
fn run_worker(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = NodeService::new(config);
        service.run().await
    })
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
        println!("{}", out);
        return Ok(());
    }

    println!("Final result: {}", summary.result);
    println!(
        "  tasks: {}, rounds: {}, dispatches: {}, failures: {}, discovery passes: {}, elapsed: {:.3}s",
        summary.tasks,
        summary.rounds,
        summary.dispatches,
        summary.failures,
        summary.discovery_passes,
        summary.elapsed_secs
    );
    Ok(())
}
