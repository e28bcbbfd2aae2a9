//! Evaluation options threaded through every join-engine call.

use serde::{Deserialize, Serialize};

/// Execution options for one query evaluation.
///
/// Passed by reference into each operation; there is no process-wide switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Allow data-parallel evaluation of join/product/filter loops.
    pub parallel_enabled: bool,
    /// Smallest operand (in solutions) worth handing to the thread pool.
    pub min_parallel_size: usize,
    /// Overall evaluation budget in milliseconds (`0` = unbounded).
    pub timeout_ms: u64,
    /// Return what has been computed so far instead of failing on timeout.
    pub partial_results_on_timeout: bool,
    /// Drop `_:`-prefixed translation variables from BGP and DISTINCT results.
    pub trim_temporary_variables: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            parallel_enabled: true,
            min_parallel_size: 64,
            timeout_ms: 0,
            partial_results_on_timeout: false,
            trim_temporary_variables: true,
        }
    }
}

impl EvaluationOptions {
    pub fn serial() -> Self {
        Self {
            parallel_enabled: false,
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Load options from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Whether a loop over `len` items should run on the thread pool.
    pub fn should_parallelise(&self, len: usize) -> bool {
        self.parallel_enabled && len >= self.min_parallel_size.max(2)
    }
}
