//! Master coordinator
//!
//! Builds the network-backed engine from a [`Config`]:
//! - Partitions the requested range into tasks
//! - Creates the registry sized to `max_workers`
//! - Wires broadcast discovery and TCP dispatch into the engine
//! - Runs the engine and returns its summary

use crate::config::Config;
use crate::distributed::discovery::BroadcastDiscovery;
use crate::distributed::dispatch::TcpDispatcher;
use crate::distributed::engine::{DistributionEngine, RunSummary};
use crate::distributed::registry::ServerRegistry;
use crate::workload::partition;
use anyhow::Result;
use log::info;
use std::sync::Arc;

/// Integration range handed to the master
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

/// Master side of a grid run
pub struct DistributedCoordinator {
    /// Grid configuration
    config: Arc<Config>,

    /// Range to integrate
    range: Range,
}

impl DistributedCoordinator {
    pub fn new(config: Arc<Config>, range: Range) -> Self {
        Self { config, range }
    }

    /// Discover workers, distribute every task and sum the results
    pub async fn run(self) -> Result<RunSummary> {
        let Range { start, end, step } = self.range;
        let network = &self.config.network;
        let grid = &self.config.grid;

        let tasks = partition(start, end, step, grid.task_width);
        info!(
            "Integrating over [{}, {}) with step {}: {} tasks of width {}",
            start,
            end,
            step,
            tasks.len(),
            grid.task_width
        );

        let registry = Arc::new(ServerRegistry::new(grid.max_workers));
        let discovery = BroadcastDiscovery::new(
            network.probe_target(),
            network.task_port,
            network.discovery_timeout(),
        );
        let dispatcher = TcpDispatcher::new(network.dispatch_timeout());

        let engine = DistributionEngine::new(registry, discovery, dispatcher)
            .with_idle_backoff(grid.idle_backoff());

        engine.run(&tasks).await
    }
}
