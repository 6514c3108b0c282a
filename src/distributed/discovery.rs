//! Worker discovery
//!
//! The master finds workers by sending a single `DISCOVER` datagram to the
//! broadcast address and treating every reply as an acknowledgement from the
//! replying host. The reply's source port is ignored: workers are always
//! reached on the task port.
//!
//! The receive window restarts after each acknowledgement and ends after a
//! full window of silence. Receive errors are logged and do not restart the
//! window, so a pass always ends in bounded time.
//!
//! Discovery is idempotent: running it again only adds workers or reactivates
//! known ones. The distribution engine relies on that to recover from failures.

use crate::distributed::protocol::{DISCOVER_PROBE, MAX_DATAGRAM_LEN};
use crate::distributed::registry::{Admission, ServerRegistry};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Something that can refresh the registry with reachable workers
///
/// Errors are setup failures and abort the caller's run.
pub trait Discovery: Send + Sync {
    /// Run one discovery pass, returning the number of acknowledgements seen
    fn discover(&self, registry: &ServerRegistry) -> impl Future<Output = Result<usize>> + Send;
}

/// UDP broadcast discovery
#[derive(Debug, Clone)]
pub struct BroadcastDiscovery {
    /// Probe destination (broadcast address, discovery port)
    target: SocketAddr,

    /// Port recorded for every discovered worker
    task_port: u16,

    /// Silence window that ends a pass
    window: Duration,
}

impl BroadcastDiscovery {
    pub fn new(target: SocketAddr, task_port: u16, window: Duration) -> Self {
        Self {
            target,
            task_port,
            window,
        }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    async fn open_and_probe(&self) -> Result<UdpSocket> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .context("Failed to create discovery socket")?;

        socket
            .set_broadcast(true)
            .context("Failed to enable SO_BROADCAST on discovery socket")?;

        socket
            .send_to(DISCOVER_PROBE, self.target)
            .await
            .with_context(|| format!("Failed to send discovery probe to {}", self.target))?;

        Ok(socket)
    }
}

impl Discovery for BroadcastDiscovery {
    async fn discover(&self, registry: &ServerRegistry) -> Result<usize> {
        info!("Searching for workers ({})...", self.target);

        let socket = self.open_and_probe().await?;

        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        let mut acks = 0;
        let mut deadline = Instant::now() + self.window;

        loop {
            match tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Err(_) => break,
                Ok(Ok((0, from))) => {
                    debug!("Ignoring empty datagram from {}", from);
                }
                Ok(Ok((_, from))) => {
                    acks += 1;
                    let worker = SocketAddr::new(from.ip(), self.task_port);
                    match registry.add_or_reactivate(worker) {
                        Admission::Rejected => {
                            warn!("Registry full ({} workers), ignoring {}", registry.capacity(), worker)
                        }
                        admission => debug!("Ack from {}: {:?}", from, admission),
                    }
                    deadline = Instant::now() + self.window;
                }
                Ok(Err(e)) => {
                    // e.g. ICMP port unreachable surfacing as ECONNREFUSED
                    warn!("Discovery receive error: {}", e);
                }
            }
        }

        registry.log_servers();
        Ok(acks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::AVAILABLE_ACK;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn test_no_responders_returns_after_window() {
        // A bound but silent socket: the probe is delivered and never answered
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = silent.local_addr().unwrap();

        let registry = ServerRegistry::new(10);
        let discovery = BroadcastDiscovery::new(target, 12346, Duration::from_millis(200));

        let started = StdInstant::now();
        let acks = discovery.discover(&registry).await.unwrap();

        assert_eq!(acks, 0);
        assert_eq!(registry.size(), 0);
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_target_still_terminates() {
        let target = {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            socket.local_addr().unwrap()
        };

        let registry = ServerRegistry::new(10);
        let discovery = BroadcastDiscovery::new(target, 12346, Duration::from_millis(200));

        let acks = tokio::time::timeout(Duration::from_secs(5), discovery.discover(&registry))
            .await
            .expect("discovery must end in bounded time")
            .unwrap();
        assert_eq!(acks, 0);
        assert_eq!(registry.size(), 0);
    }

    #[tokio::test]
    async fn test_ack_registers_worker_on_task_port() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        let answer = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (n, from) = responder.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], DISCOVER_PROBE);
            responder.send_to(AVAILABLE_ACK, from).await.unwrap();
            // Duplicate replies from the same host collapse into one entry
            responder.send_to(b"anything", from).await.unwrap();
        });

        let registry = ServerRegistry::new(10);
        let discovery = BroadcastDiscovery::new(target, 4242, Duration::from_millis(300));
        let acks = discovery.discover(&registry).await.unwrap();
        answer.await.unwrap();

        assert_eq!(acks, 2);
        assert_eq!(registry.size(), 1);
        let server = registry.get(0).unwrap();
        assert_eq!(server.addr, "127.0.0.1:4242".parse().unwrap());
        assert!(server.active);
    }

    #[tokio::test]
    async fn test_rediscovery_reactivates() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = responder.local_addr().unwrap();

        let answer = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            for _ in 0..2 {
                let (_, from) = responder.recv_from(&mut buf).await.unwrap();
                responder.send_to(AVAILABLE_ACK, from).await.unwrap();
            }
        });

        let registry = ServerRegistry::new(10);
        let discovery = BroadcastDiscovery::new(target, 4242, Duration::from_millis(200));

        discovery.discover(&registry).await.unwrap();
        registry.deactivate("127.0.0.1".parse().unwrap());
        assert_eq!(registry.active_count(), 0);

        discovery.discover(&registry).await.unwrap();
        answer.await.unwrap();
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.active_count(), 1);
    }
}
