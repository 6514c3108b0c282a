//! Distributed grid implementation
//!
//! # Architecture
//!
//! integrid uses a master-worker architecture with no fixed membership:
//!
//! - **Master**: Discovers workers by UDP broadcast, dispatches tasks over TCP,
//!   requeues failed tasks and rediscovers until every task has a result
//! - **Worker**: Answers discovery probes and computes one task per connection
//!
//! # Modules
//!
//! - `protocol`: Discovery payloads and binary task/result records
//! - `registry`: Shared list of known workers with a liveness flag
//! - `discovery`: Broadcast discovery pass
//! - `dispatch`: One task round trip to one worker
//! - `engine`: Round-based scheduling, failure handling and aggregation
//! - `coordinator`: Master entry point built from configuration
//! - `node_service`: Worker entry point

pub mod coordinator;
pub mod discovery;
pub mod dispatch;
pub mod engine;
pub mod node_service;
pub mod protocol;
pub mod registry;

// Re-export key types
pub use coordinator::{DistributedCoordinator, Range};
pub use discovery::{BroadcastDiscovery, Discovery};
pub use dispatch::{DispatchError, TaskDispatcher, TcpDispatcher};
pub use engine::{DistributionEngine, RunSummary};
pub use node_service::{DiscoveryResponder, NodeService, TaskHandler};
pub use registry::{Server, ServerRegistry};
