//! integrid - Minimal distributed compute grid
//!
//! integrid splits a numeric integration over `[start, end)` into unit-width
//! sub-tasks and farms them out to worker processes found on the local
//! network by UDP broadcast.
//!
//! # Architecture
//!
//! - **Discovery**: broadcast `DISCOVER`, collect `AVAILABLE` replies into a registry
//! - **Registry**: mutex-guarded list of known workers with a liveness flag
//! - **Distribution engine**: rounds of concurrent dispatch, requeue on failure, rediscover
//! - **Worker runtime**: discovery responder plus a TCP task handler
//! - **Wire protocol**: big-endian doubles, 24-byte task record, 8-byte result

pub mod config;
pub mod distributed;
pub mod util;
pub mod workload;

// Re-export commonly used types
pub use config::Config;
pub use workload::Task;

/// Result type used throughout integrid
pub type Result<T> = anyhow::Result<T>;
