//! Integration workload
//!
//! A run integrates `f(x)` over `[start, end)`. The range is cut into
//! independent [`Task`]s of a fixed width (1.0 by default) which are the unit
//! of dispatch, retry and aggregation.
//!
//! # Example
//!
//! ```
//! use integrid::workload::{partition, integrate, Integrand};
//!
//! let tasks = partition(0.0, 2.0, 0.5, 1.0);
//! assert_eq!(tasks.len(), 2);
//!
//! let total: f64 = tasks.iter().map(|t| integrate(t, Integrand::Square)).sum();
//! assert_eq!(total, 1.75);
//! ```

pub mod integrate;

pub use integrate::{integrate, Integrand};

/// Default width of one sub-task along the x axis
pub const DEFAULT_TASK_WIDTH: f64 = 1.0;

/// One sub-interval of integration work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Task {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Task {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Whether the kernel can integrate this task in bounded time
    pub fn is_integrable(&self) -> bool {
        self.start.is_finite() && self.end.is_finite() && self.step.is_finite() && self.step > 0.0
    }
}

/// Split `[start, end)` into consecutive tasks of `width`, each carrying `step`
///
/// Slice `i` starts at `start + i * width`; the last slice is clipped to `end`.
/// An empty or inverted range yields no tasks.
pub fn partition(start: f64, end: f64, step: f64, width: f64) -> Vec<Task> {
    let mut tasks = Vec::new();
    if width.is_nan() || width <= 0.0 {
        return tasks;
    }

    let mut i: u64 = 0;
    loop {
        let lo = start + i as f64 * width;
        if lo >= end {
            break;
        }
        let hi = (start + (i + 1) as f64 * width).min(end);
        tasks.push(Task::new(lo, hi, step));
        i += 1;
    }

    tasks
}
