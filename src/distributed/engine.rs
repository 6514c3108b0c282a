//! Task distribution engine
//!
//! The engine drives a queue of pending task indices to empty:
//!
//! 1. **Dispatch**: walk the registry slots once; every active worker gets
//!    the next pending task, dispatched on its own tokio task.
//! 2. **Reconcile**: await the dispatches in the order they were started.
//!    Results are added to the running sum. A failed task goes to the back
//!    of the queue and discovery is re-run at once to replace lost capacity.
//! 3. **Drain**: if work remains after the round, run discovery again before
//!    the next round, failures or not.
//!
//! A worker never gets more than one task per round. Tasks are never
//! abandoned: with no reachable workers the engine keeps rediscovering. Only a
//! discovery setup error ends a run early.
//!
//! The queue and the sum belong to the task calling [`DistributionEngine::run`];
//! only the registry is shared with the dispatch tasks.

use crate::distributed::discovery::Discovery;
use crate::distributed::dispatch::{DispatchError, TaskDispatcher};
use crate::distributed::registry::{Server, ServerRegistry};
use crate::workload::Task;
use crate::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// One task bound to one registry slot for the current round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub slot: usize,
    pub task_index: usize,
    pub server: Server,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Sum of all task results
    pub result: f64,
    /// Number of tasks in the workload
    pub tasks: usize,
    /// Dispatch rounds executed
    pub rounds: u64,
    /// Dispatches started, successful or not
    pub dispatches: u64,
    /// Dispatches that failed and were requeued
    pub failures: u64,
    /// Discovery passes, including the initial one
    pub discovery_passes: u64,
    /// Wall-clock time of the run
    pub elapsed_secs: f64,
}

/// Pick this round's assignments
///
/// Samples the registry size once, then hands the front of `pending` to each
/// active slot in registry order. Stops early when `pending` runs dry.
pub fn plan_round(registry: &ServerRegistry, pending: &mut VecDeque<usize>) -> Vec<Assignment> {
    let count = registry.size();
    let mut assignments = Vec::with_capacity(count.min(pending.len()));

    for slot in 0..count {
        // Entries are never removed, so every slot below `count` still exists
        let Some(server) = registry.get(slot) else {
            break;
        };
        if !server.active {
            continue;
        }
        let Some(task_index) = pending.pop_front() else {
            break;
        };
        assignments.push(Assignment {
            slot,
            task_index,
            server,
        });
    }

    assignments
}

/// Round-based scheduler over a registry, a discovery source and a dispatcher
pub struct DistributionEngine<D, T> {
    registry: Arc<ServerRegistry>,
    discovery: D,
    dispatcher: Arc<T>,
    idle_backoff: Duration,
}

impl<D: Discovery, T: TaskDispatcher> DistributionEngine<D, T> {
    pub fn new(registry: Arc<ServerRegistry>, discovery: D, dispatcher: T) -> Self {
        Self {
            registry,
            discovery,
            dispatcher: Arc::new(dispatcher),
            idle_backoff: Duration::ZERO,
        }
    }

    /// Pause before rediscovering after a round that dispatched nothing
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    /// Run every task to completion and return the aggregated result
    pub async fn run(&self, tasks: &[Task]) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary {
            tasks: tasks.len(),
            ..RunSummary::default()
        };

        if tasks.is_empty() {
            info!("Nothing to distribute");
            return Ok(summary);
        }

        let mut pending: VecDeque<usize> = (0..tasks.len()).collect();
        info!("Distributing {} tasks...", tasks.len());

        self.rediscover(&mut summary).await?;

        while !pending.is_empty() {
            summary.rounds += 1;
            info!("Round {}: {} tasks remaining", summary.rounds, pending.len());

            let in_flight: Vec<(usize, SocketAddr, JoinHandle<std::result::Result<f64, DispatchError>>)> =
                plan_round(&self.registry, &mut pending)
                    .into_iter()
                    .map(|a| {
                        debug!("Task {} -> slot {} ({})", a.task_index, a.slot, a.server.addr);
                        (a.task_index, a.server.addr, self.spawn_dispatch(a.server, tasks[a.task_index]))
                    })
                    .collect();

            let dispatched = in_flight.len();
            summary.dispatches += dispatched as u64;

            for (task_index, addr, handle) in in_flight {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        // The dispatch task panicked before it could mark the worker
                        self.registry.deactivate(addr.ip());
                        Err(DispatchError::Aborted {
                            addr,
                            reason: e.to_string(),
                        })
                    }
                };

                match outcome {
                    Ok(value) => {
                        summary.result += value;
                    }
                    Err(e) => {
                        warn!("Task {} failed: {}", task_index, e);
                        summary.failures += 1;
                        pending.push_back(task_index);
                        self.rediscover(&mut summary).await?;
                    }
                }
            }

            if !pending.is_empty() {
                if dispatched == 0 && !self.idle_backoff.is_zero() {
                    debug!("No active workers, backing off for {:?}", self.idle_backoff);
                    tokio::time::sleep(self.idle_backoff).await;
                }
                info!("Searching for workers for the remaining {} tasks...", pending.len());
                self.rediscover(&mut summary).await?;
            }
        }

        summary.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            "All {} tasks completed in {} rounds ({} failures)",
            summary.tasks, summary.rounds, summary.failures
        );

        Ok(summary)
    }

    async fn rediscover(&self, summary: &mut RunSummary) -> Result<()> {
        summary.discovery_passes += 1;
        self.discovery.discover(&self.registry).await?;
        Ok(())
    }

    /// Start one dispatch; on failure the worker is marked inactive before the
    /// outcome is reported
    fn spawn_dispatch(&self, server: Server, task: Task) -> JoinHandle<std::result::Result<f64, DispatchError>> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let registry = Arc::clone(&self.registry);

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(server.addr, task).await;
            if outcome.is_err() {
                registry.deactivate(server.ip());
            }
            outcome
        })
    }
}
