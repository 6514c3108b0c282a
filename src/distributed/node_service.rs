//! Worker runtime
//!
//! A worker runs two independent handlers:
//!
//! - [`DiscoveryResponder`] answers every exact `DISCOVER` datagram with
//!   `AVAILABLE`, sent back to the probe's source address
//! - [`TaskHandler`] accepts one TCP connection at a time, reads one task
//!   record, integrates it and writes back one result record
//!
//! Neither handler depends on the other. If one of them stops, the other keeps
//! serving; the worker process only fails once both have stopped.

use crate::config::Config;
use crate::distributed::protocol::{is_probe, read_task, write_result, AVAILABLE_ACK, MAX_DATAGRAM_LEN};
use crate::util::net::{bind_reusable_tcp, bind_reusable_udp_async};
use crate::workload::{integrate, Integrand};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::net::{SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

/// UDP side of the worker: replies to discovery probes
pub struct DiscoveryResponder {
    socket: UdpSocket,
}

impl DiscoveryResponder {
    /// Bind the responder with `SO_REUSEADDR`
    pub fn bind(addr: SocketAddrV4) -> Result<Self> {
        let socket = bind_reusable_udp_async(addr)
            .with_context(|| format!("Failed to bind discovery socket on {}", addr))?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve probes until the task is dropped
    ///
    /// Receive and send errors are logged and the loop continues.
    pub async fn run(self) -> Result<()> {
        let mut buf = [0u8; MAX_DATAGRAM_LEN];

        loop {
            let (n, from) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("Discovery receive error: {}", e);
                    continue;
                }
            };

            if !is_probe(&buf[..n]) {
                debug!("Ignoring {}-byte datagram from {}", n, from);
                continue;
            }

            info!("Discovery request from {}", from);
            if let Err(e) = self.socket.send_to(AVAILABLE_ACK, from).await {
                warn!("Failed to answer {}: {}", from, e);
            }
        }
    }
}

/// TCP side of the worker: computes one task per connection
pub struct TaskHandler {
    listener: TcpListener,
    integrand: Integrand,
    read_timeout: Duration,
}

impl TaskHandler {
    /// Bind the task listener with `SO_REUSEADDR` and `backlog`
    pub fn bind(addr: SocketAddrV4, backlog: u32, integrand: Integrand, read_timeout: Duration) -> Result<Self> {
        let listener = bind_reusable_tcp(addr, backlog)
            .with_context(|| format!("Failed to bind task listener on {}", addr))?;
        Ok(Self {
            listener,
            integrand,
            read_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections one after another until the task is dropped
    ///
    /// A connection that fails is closed and the next one accepted.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept task connection: {}", e);
                    continue;
                }
            };

            if let Err(e) = self.serve(stream, peer).await {
                warn!("Task from {} dropped: {:#}", peer, e);
            }
        }
    }

    async fn serve(&self, mut stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let task = tokio::time::timeout(self.read_timeout, read_task(&mut stream))
            .await
            .context("Timed out waiting for task record")?
            .context("Incomplete task record")?;

        if !task.is_integrable() {
            // No reply: the master sees a closed connection and requeues
            anyhow::bail!(
                "Refusing task [{}, {}) with step {}",
                task.start,
                task.end,
                task.step
            );
        }

        info!(
            "Computing task from {}: range {} - {}, step {}",
            peer, task.start, task.end, task.step
        );

        let integrand = self.integrand;
        let result = tokio::task::spawn_blocking(move || integrate(&task, integrand))
            .await
            .context("Integration task panicked")?;

        write_result(&mut stream, result)
            .await
            .context("Failed to send result")?;
        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of connection to {} failed: {}", peer, e);
        }

        info!("Sent result {} to {}", result, peer);
        Ok(())
    }
}

/// Worker process: discovery responder plus task handler
pub struct NodeService {
    /// Node identifier (hostname)
    node_id: String,

    config: Config,
}

impl NodeService {
    pub fn new(config: Config) -> Self {
        Self {
            node_id: get_node_id(),
            config,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Run both handlers until both have stopped
    ///
    /// Each handler binds its own socket; a bind failure stops that handler
    /// only and the other keeps serving.
    pub async fn run(self) -> Result<()> {
        let network = self.config.network.clone();
        let integrand = self.config.worker.integrand;

        info!("Worker {} starting (integrand: {})", self.node_id, integrand.name());

        let discovery_bind = network.discovery_bind();
        let discovery = tokio::spawn(async move {
            let responder = DiscoveryResponder::bind(discovery_bind)?;
            info!("Listening for discovery on udp {}", responder.local_addr()?);
            responder.run().await
        });

        let tasks = tokio::spawn(async move {
            let handler = TaskHandler::bind(
                network.task_bind(),
                network.listen_backlog,
                integrand,
                network.dispatch_timeout(),
            )?;
            info!("Listening for tasks on tcp {}", handler.local_addr()?);
            handler.run().await
        });

        tokio::join!(
            watch("Discovery responder", discovery),
            watch("Task handler", tasks)
        );

        anyhow::bail!("Both worker handlers stopped")
    }
}

/// Await a handler and log how it ended
async fn watch(name: &str, handle: JoinHandle<Result<()>>) {
    match handle.await {
        Ok(Ok(())) => warn!("{} stopped", name),
        Ok(Err(e)) => error!("{} failed: {:#}", name, e),
        Err(e) => error!("{} aborted: {}", name, e),
    }
}

/// Get node identifier (hostname)
fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
