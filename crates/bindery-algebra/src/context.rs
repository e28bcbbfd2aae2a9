//! Per-evaluation state threaded through every node.

use std::time::{Duration, Instant};

use bindery_core::{EvaluationOptions, Multiset, StopToken, Term};

use crate::error::{EvaluationError, Result};

/// Mutable state of one query evaluation.
///
/// `input` is what the node being evaluated may read as its incoming
/// bindings; `output` holds the last result. One context serves one
/// evaluation at a time and is never shared between threads.
#[derive(Debug)]
pub struct EvaluationContext {
    pub input: Multiset,
    pub output: Multiset,
    options: EvaluationOptions,
    started: Instant,
    deadline: Option<Instant>,
    stop: StopToken,
    active_graph: Option<Term>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(EvaluationOptions::default())
    }
}

impl EvaluationContext {
    pub fn new(options: EvaluationOptions) -> Self {
        let started = Instant::now();
        let deadline =
            (options.timeout_ms > 0).then(|| started + Duration::from_millis(options.timeout_ms));
        Self {
            input: Multiset::Identity,
            output: Multiset::Identity,
            options,
            started,
            deadline,
            stop: StopToken::with_deadline(deadline),
            active_graph: None,
        }
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fails once the time budget is spent, unless partial results were
    /// requested, in which case the stop token is raised and evaluation
    /// carries on with whatever each operator already produced.
    pub fn check_timeout(&self) -> Result<()> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };
        if Instant::now() < deadline {
            return Ok(());
        }
        if self.options.partial_results_on_timeout {
            if !self.stop.should_stop() {
                self.stop.stop();
            }
            return Ok(());
        }
        Err(EvaluationError::Timeout {
            timeout_ms: self.options.timeout_ms,
        })
    }

    /// Budget left for a bounded operation: `0` when there is no deadline,
    /// otherwise at least one millisecond.
    pub fn remaining_timeout_ms(&self) -> i64 {
        match self.deadline {
            None => 0,
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now()).as_millis();
                i64::try_from(left).unwrap_or(i64::MAX).max(1)
            }
        }
    }

    /// Token shared with cancellable operators; raised at the deadline.
    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// True once the deadline passed; results computed from here on may be
    /// incomplete.
    pub fn timed_out(&self) -> bool {
        self.stop.should_stop()
    }

    pub fn active_graph(&self) -> Option<&Term> {
        self.active_graph.as_ref()
    }

    /// Switch the active graph, returning the previous one.
    pub fn set_active_graph(&mut self, graph: Option<Term>) -> Option<Term> {
        std::mem::replace(&mut self.active_graph, graph)
    }

    pub fn take_output(&mut self) -> Multiset {
        std::mem::replace(&mut self.output, Multiset::Identity)
    }

    /// Run `f` with `input` installed as the context input, then restore the
    /// previous input. Returns the input `f` left behind alongside its result.
    pub fn with_input<R>(
        &mut self,
        input: Multiset,
        f: impl FnOnce(&mut Self) -> R,
    ) -> (Multiset, R) {
        let previous = std::mem::replace(&mut self.input, input);
        let result = f(self);
        let used = std::mem::replace(&mut self.input, previous);
        (used, result)
    }
}
