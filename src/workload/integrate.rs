//! Rectangle-rule integration kernel

use super::Task;
use serde::{Deserialize, Serialize};

/// Scalar function a worker integrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrand {
    /// f(x) = x^2
    #[default]
    Square,
    /// f(x) = x^3
    Cube,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = x
    Identity,
}

impl Integrand {
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Self::Square => x * x,
            Self::Cube => x * x * x,
            Self::Sine => x.sin(),
            Self::Identity => x,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Square => "x^2",
            Self::Cube => "x^3",
            Self::Sine => "sin(x)",
            Self::Identity => "x",
        }
    }
}

/// Left rectangle sum of `f` over the task: `sum f(x) * step` for `x` in `[start, end)`
///
/// Sample points are `start + i * step` rather than a running sum so rounding
/// does not accumulate across a slice. Returns 0.0 for tasks that are not
/// integrable (see [`Task::is_integrable`]).
pub fn integrate(task: &Task, f: Integrand) -> f64 {
    if !task.is_integrable() {
        return 0.0;
    }

    let mut result = 0.0;
    let mut i: u64 = 0;
    loop {
        let x = task.start + i as f64 * task.step;
        if x >= task.end {
            break;
        }
        result += f.eval(x) * task.step;
        i += 1;
    }

    result
}
