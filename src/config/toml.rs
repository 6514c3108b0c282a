//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_integrand, parse_duration_ms};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Network overrides
    if let Some(port) = cli.discovery_port {
        config.network.discovery_port = port;
    }
    if let Some(port) = cli.task_port {
        config.network.task_port = port;
    }
    if let Some(addr) = cli.broadcast_addr {
        config.network.broadcast_addr = addr;
    }
    if let Some(addr) = cli.bind_addr {
        config.network.bind_addr = addr;
    }
    if let Some(ref timeout) = cli.discovery_timeout {
        config.network.discovery_timeout_ms = parse_duration_ms(timeout)
            .context("Invalid discovery timeout")?;
    }
    if let Some(ref timeout) = cli.dispatch_timeout {
        config.network.dispatch_timeout_ms = parse_duration_ms(timeout)
            .context("Invalid dispatch timeout")?;
    }

    // Grid overrides
    if let Some(max_workers) = cli.max_workers {
        config.grid.max_workers = max_workers;
    }
    if let Some(width) = cli.task_width {
        config.grid.task_width = width;
    }
    if let Some(ref backoff) = cli.idle_backoff {
        config.grid.idle_backoff_ms = parse_duration_ms(backoff)
            .context("Invalid idle backoff")?;
    }

    // Worker overrides
    if let Some(integrand) = cli.integrand {
        config.worker.integrand = convert_integrand(integrand);
    }

    Ok(config)
}

/// Build the effective configuration: optional TOML file, then CLI overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    merge_cli_with_config(cli, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Integrand;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_parse_partial_toml() {
        let config = parse_toml_string(
            r#"
            [network]
            discovery_port = 20000
            broadcast_addr = "10.0.0.255"

            [grid]
            max_workers = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.network.discovery_port, 20000);
        assert_eq!(config.network.task_port, DEFAULT_TASK_PORT);
        assert_eq!(config.network.broadcast_addr, Ipv4Addr::new(10, 0, 0, 255));
        assert_eq!(config.grid.max_workers, 4);
        assert_eq!(config.grid.task_width, 1.0);
        assert_eq!(config.worker.integrand, Integrand::Square);
    }

    #[test]
    fn test_parse_empty_toml_gives_defaults() {
        let config = parse_toml_string("").unwrap();
        assert_eq!(config.network.discovery_port, DEFAULT_DISCOVERY_PORT);
        assert_eq!(config.grid.max_workers, 10);
    }

    #[test]
    fn test_parse_worker_section() {
        let config = parse_toml_string("[worker]\nintegrand = \"cube\"\n").unwrap();
        assert_eq!(config.worker.integrand, Integrand::Cube);
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(parse_toml_string("[network]\ndiscovery_port = \"not a port\"").is_err());
    }

    #[test]
    fn test_parse_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\ndispatch_timeout_ms = 750").unwrap();

        let config = parse_toml_file(file.path()).unwrap();
        assert_eq!(config.network.dispatch_timeout_ms, 750);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_toml_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network]\ntask_port = 4000\ndiscovery_timeout_ms = 9000").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::try_parse_from([
            "integrid",
            "--config",
            &path,
            "--discovery-timeout",
            "500ms",
            "--max-workers",
            "3",
            "0",
            "1",
            "0.1",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.network.task_port, 4000);
        assert_eq!(config.network.discovery_timeout_ms, 500);
        assert_eq!(config.grid.max_workers, 3);
    }

    #[test]
    fn test_invalid_cli_duration() {
        let cli = Cli::try_parse_from(["integrid", "--dispatch-timeout", "soon", "0", "1", "0.1"]).unwrap();
        assert!(merge_cli_with_config(&cli, Config::default()).is_err());
    }
}
