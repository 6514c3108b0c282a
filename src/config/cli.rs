//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Master mode - discover workers, distribute the integral, print the result
    Master,
    /// Worker mode - answer discovery probes and compute dispatched tasks
    Worker,
}

/// Function integrated by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IntegrandArg {
    /// f(x) = x^2
    Square,
    /// f(x) = x^3
    Cube,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = x
    Identity,
}

/// integrid - Minimal distributed compute grid
#[derive(Parser, Debug)]
#[command(name = "integrid")]
#[command(version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Execution mode: master or worker
    #[arg(long, value_enum, default_value = "master")]
    pub mode: ExecutionMode,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (defaults to RUST_LOG or info)
    #[arg(long, env = "INTEGRID_LOG")]
    pub log_level: Option<String>,

    /// Start of the integration range (master mode only)
    #[arg(value_name = "START")]
    pub start: Option<f64>,

    /// End of the integration range, exclusive (master mode only)
    #[arg(value_name = "END")]
    pub end: Option<f64>,

    /// Rectangle width used by workers (master mode only)
    #[arg(value_name = "STEP")]
    pub step: Option<f64>,

    // === Network Options ===
    /// UDP port for discovery probes
    #[arg(long)]
    pub discovery_port: Option<u16>,

    /// TCP port for task dispatch
    #[arg(long)]
    pub task_port: Option<u16>,

    /// Address the discovery probe is sent to (master mode only)
    #[arg(long)]
    pub broadcast_addr: Option<Ipv4Addr>,

    /// Address the worker binds its sockets to (worker mode only)
    #[arg(long)]
    pub bind_addr: Option<Ipv4Addr>,

    /// Silence window that ends discovery (e.g., 2s, 500ms)
    #[arg(long)]
    pub discovery_timeout: Option<String>,

    /// Bound on one task round trip (e.g., 2s, 500ms)
    #[arg(long)]
    pub dispatch_timeout: Option<String>,

    // === Grid Options ===
    /// Maximum number of workers kept in the registry
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Width of one sub-task along the x axis
    #[arg(long)]
    pub task_width: Option<f64>,

    /// Pause after a round with no active workers (e.g., 1s, 250ms)
    #[arg(long)]
    pub idle_backoff: Option<String>,

    // === Worker Options ===
    /// Function to integrate (worker mode only)
    #[arg(long, value_enum)]
    pub integrand: Option<IntegrandArg>,

    // === Output Options ===
    /// Print the run summary as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Parse CLI arguments
    ///
    /// Usage errors exit with status 1; `--help` and `--version` exit with 0.
    pub fn parse_args() -> Self {
        match Self::try_parse() {
            Ok(cli) => cli,
            Err(e) => {
                let code = if e.use_stderr() { 1 } else { 0 };
                let _ = e.print();
                std::process::exit(code);
            }
        }
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.mode {
            ExecutionMode::Master => {
                if self.range().is_none() {
                    anyhow::bail!("master mode requires three arguments: <START> <END> <STEP>");
                }
            }
            ExecutionMode::Worker => {
                if self.start.is_some() {
                    anyhow::bail!("worker mode takes no positional arguments");
                }
            }
        }

        if self.max_workers == Some(0) {
            anyhow::bail!("max_workers must be at least 1");
        }

        Ok(())
    }

    /// The `(start, end, step)` triple, if all three were given
    pub fn range(&self) -> Option<(f64, f64, f64)> {
        match (self.start, self.end, self.step) {
            (Some(start), Some(end), Some(step)) => Some((start, end, step)),
            _ => None,
        }
    }
}
