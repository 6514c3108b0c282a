//! Per-task dispatch
//!
//! A dispatch is one TCP round trip: connect to the worker's task port, send
//! one task record, read one result record. The whole exchange is bounded by
//! a single timeout so a stalled worker surfaces as a failure instead of
//! blocking its round.
//!
//! The [`TaskDispatcher`] trait is the seam the distribution engine is written
//! against; [`TcpDispatcher`] is the network implementation.

use crate::distributed::protocol::{read_result, write_task};
use crate::workload::Task;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;

/// Why a single dispatch failed
///
/// Every variant is a transient peer failure: the engine requeues the task
/// and marks the worker inactive, it never aborts the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send task to {addr}: {source}")]
    Send {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to receive result from {addr}: {source}")]
    Receive {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no result from {addr} within {timeout:?}")]
    Timeout { addr: SocketAddr, timeout: Duration },

    #[error("dispatch to {addr} aborted: {reason}")]
    Aborted { addr: SocketAddr, reason: String },
}

/// Sends one task to one worker and returns its result
pub trait TaskDispatcher: Send + Sync + 'static {
    fn dispatch(
        &self,
        addr: SocketAddr,
        task: Task,
    ) -> impl Future<Output = Result<f64, DispatchError>> + Send;
}

/// Dispatcher speaking the binary task protocol over TCP
#[derive(Debug, Clone)]
pub struct TcpDispatcher {
    timeout: Duration,
}

impl TcpDispatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TaskDispatcher for TcpDispatcher {
    async fn dispatch(&self, addr: SocketAddr, task: Task) -> Result<f64, DispatchError> {
        log::debug!(
            "Sending task to {} (range: {} - {}, step: {})",
            addr, task.start, task.end, task.step
        );

        let result = match tokio::time::timeout(self.timeout, round_trip(addr, &task)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DispatchError::Timeout {
                    addr,
                    timeout: self.timeout,
                })
            }
        };

        log::debug!("Result from {}: {}", addr, result);
        Ok(result)
    }
}

async fn round_trip(addr: SocketAddr, task: &Task) -> Result<f64, DispatchError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|source| DispatchError::Connect { addr, source })?;

    write_task(&mut stream, task)
        .await
        .map_err(|source| DispatchError::Send { addr, source })?;

    read_result(&mut stream)
        .await
        .map_err(|source| DispatchError::Receive { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::protocol::{read_task, write_result};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let task = read_task(&mut stream).await.unwrap();
            write_result(&mut stream, task.end - task.start).await.unwrap();
        });

        let dispatcher = TcpDispatcher::new(Duration::from_secs(2));
        let value = dispatcher.dispatch(addr, Task::new(1.0, 1.75, 0.25)).await.unwrap();
        assert_eq!(value, 0.75);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let dispatcher = TcpDispatcher::new(Duration::from_secs(2));
        let err = dispatcher.dispatch(addr, Task::new(0.0, 1.0, 0.5)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Connect { .. }), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_silent_worker_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept and hold the connection without answering
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let dispatcher = TcpDispatcher::new(Duration::from_millis(200));
        let err = dispatcher.dispatch(addr, Task::new(0.0, 1.0, 0.5)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout { .. }), "unexpected error: {}", err);
        server.abort();
    }

    #[tokio::test]
    async fn test_closed_without_result() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _ = read_task(&mut stream).await;
        });

        let dispatcher = TcpDispatcher::new(Duration::from_secs(2));
        let err = dispatcher.dispatch(addr, Task::new(0.0, 1.0, 0.5)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Receive { .. }), "unexpected error: {}", err);
        server.await.unwrap();
    }
}
