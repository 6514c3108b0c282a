//! Registry of discovered workers
//!
//! The registry is the only state the master shares between concurrent
//! dispatches. Entries are keyed by IP address, are never removed, and carry
//! an `active` flag that dispatch failures clear and discovery sets again.

use log::{debug, info};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard};

/// One known worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Server {
    /// Task endpoint (IP of the worker, task port)
    pub addr: SocketAddr,

    /// Eligible for new dispatches
    pub active: bool,
}

impl Server {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, active: true }
    }

    /// Uniqueness key
    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }
}

/// Outcome of [`ServerRegistry::add_or_reactivate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// New entry appended
    Inserted,
    /// Existing entry marked active again
    Reactivated,
    /// Registry full, worker ignored
    Rejected,
}

/// Mutex-guarded, bounded list of workers
#[derive(Debug)]
pub struct ServerRegistry {
    servers: Mutex<Vec<Server>>,
    capacity: usize,
}

impl ServerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            servers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave a half-written entry
    // (every mutation is a single field store or push), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<Server>> {
        self.servers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a worker, or mark the entry with the same IP active
    pub fn add_or_reactivate(&self, addr: SocketAddr) -> Admission {
        let mut servers = self.lock();

        if let Some(existing) = servers.iter_mut().find(|s| s.ip() == addr.ip()) {
            if !existing.active {
                info!("Worker {} is back", existing.addr);
            }
            existing.active = true;
            return Admission::Reactivated;
        }

        if servers.len() >= self.capacity {
            debug!("Registry full ({}), ignoring worker {}", self.capacity, addr);
            return Admission::Rejected;
        }

        servers.push(Server::new(addr));
        info!("Added new worker: {}", addr);
        Admission::Inserted
    }

    /// Number of entries, active or not
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Number of active entries
    pub fn active_count(&self) -> usize {
        self.lock().iter().filter(|s| s.active).count()
    }

    /// Copy of the entry at `index`
    pub fn get(&self, index: usize) -> Option<Server> {
        self.lock().get(index).copied()
    }

    /// Exclude the worker at `ip` from new dispatches
    ///
    /// Returns false if no entry has that IP.
    pub fn deactivate(&self, ip: IpAddr) -> bool {
        let mut servers = self.lock();
        match servers.iter_mut().find(|s| s.ip() == ip) {
            Some(server) => {
                server.active = false;
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of all entries
    pub fn snapshot(&self) -> Vec<Server> {
        self.lock().clone()
    }

    /// Log every entry with its status
    pub fn log_servers(&self) {
        let servers = self.snapshot();
        info!("Known workers: {} ({} active)", servers.len(), servers.iter().filter(|s| s.active).count());
        for (i, server) in servers.iter().enumerate() {
            info!(
                "  {}: {} ({})",
                i,
                server.addr,
                if server.active { "active" } else { "inactive" }
            );
        }
    }
}
