//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::workload::Integrand;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// Well-known UDP port workers listen on for discovery probes
pub const DEFAULT_DISCOVERY_PORT: u16 = 12345;

/// Well-known TCP port workers accept tasks on
pub const DEFAULT_TASK_PORT: u16 = 12346;

/// Complete grid configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// Ports, addresses and network timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// UDP port for DISCOVER/AVAILABLE
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// TCP port for task dispatch
    #[serde(default = "default_task_port")]
    pub task_port: u16,
    /// Destination of the discovery probe
    #[serde(default = "default_broadcast_addr")]
    pub broadcast_addr: Ipv4Addr,
    /// Local address the worker binds both sockets to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: Ipv4Addr,
    /// Silence window that ends a discovery pass (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub discovery_timeout_ms: u64,
    /// Bound on one task round trip (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Listen backlog of the worker's task socket
    #[serde(default = "default_listen_backlog")]
    pub listen_backlog: u32,
}

fn default_discovery_port() -> u16 {
    DEFAULT_DISCOVERY_PORT
}

fn default_task_port() -> u16 {
    DEFAULT_TASK_PORT
}

fn default_broadcast_addr() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_bind_addr() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_listen_backlog() -> u32 {
    5
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            discovery_port: default_discovery_port(),
            task_port: default_task_port(),
            broadcast_addr: default_broadcast_addr(),
            bind_addr: default_bind_addr(),
            discovery_timeout_ms: default_timeout_ms(),
            dispatch_timeout_ms: default_timeout_ms(),
            listen_backlog: default_listen_backlog(),
        }
    }
}

impl NetworkConfig {
    /// Where the master sends its probe
    pub fn probe_target(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.broadcast_addr, self.discovery_port))
    }

    /// Address the worker's discovery responder binds to
    pub fn discovery_bind(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.bind_addr, self.discovery_port)
    }

    /// Address the worker's task handler binds to
    pub fn task_bind(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.bind_addr, self.task_port)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

/// Master-side scheduling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Registry capacity; further workers are ignored
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Width of one sub-task along the x axis
    #[serde(default = "default_task_width")]
    pub task_width: f64,
    /// Pause after a round that dispatched nothing (milliseconds, 0 = none)
    #[serde(default)]
    pub idle_backoff_ms: u64,
}

fn default_max_workers() -> usize {
    10
}

fn default_task_width() -> f64 {
    1.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            task_width: default_task_width(),
            idle_backoff_ms: 0,
        }
    }
}

impl GridConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Worker-side settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Function the task handler integrates
    #[serde(default)]
    pub integrand: Integrand,
}
