//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_network(&config.network)?;
    validate_grid(&config.grid)?;

    Ok(())
}

/// Validate network configuration
pub fn validate_network(network: &NetworkConfig) -> Result<()> {
    if network.discovery_port == 0 {
        anyhow::bail!("discovery_port must be non-zero");
    }
    if network.task_port == 0 {
        anyhow::bail!("task_port must be non-zero");
    }
    if network.discovery_timeout_ms == 0 {
        anyhow::bail!("discovery_timeout must be greater than zero");
    }
    if network.dispatch_timeout_ms == 0 {
        anyhow::bail!("dispatch_timeout must be greater than zero");
    }
    if network.listen_backlog == 0 {
        anyhow::bail!("listen_backlog must be at least 1");
    }

    Ok(())
}

/// Validate grid configuration
pub fn validate_grid(grid: &GridConfig) -> Result<()> {
    if grid.max_workers == 0 {
        anyhow::bail!("max_workers must be at least 1");
    }
    if !grid.task_width.is_finite() || grid.task_width <= 0.0 {
        anyhow::bail!("task_width must be a positive number, got {}", grid.task_width);
    }

    Ok(())
}

/// Validate the integration range given to the master
///
/// `start >= end` is accepted and yields an empty workload.
pub fn validate_range(start: f64, end: f64, step: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() {
        anyhow::bail!("range bounds must be finite, got [{}, {})", start, end);
    }
    if !step.is_finite() || step <= 0.0 {
        anyhow::bail!("step must be a positive number, got {}", step);
    }

    Ok(())
}
