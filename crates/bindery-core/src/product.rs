//! Cartesian products through the partitioned form.
//!
//! The larger operand drives the outer loop. Outer row `i` owns partition `i`
//! of a `PartitionedMultiset(|larger|, |smaller|)`, so its combined rows get
//! the IDs `i * |smaller| + offset` regardless of which worker produced them.
//! Cancellation is checked once per outer row, never inside one.

use std::sync::mpsc;
use std::time::Duration;

use rayon::prelude::*;

use crate::error::{MultisetError, Result};
use crate::join::{union_variables, SolutionPredicate};
use crate::multiset::{Multiset, Partition, PartitionedMultiset};
use crate::options::EvaluationOptions;
use crate::solution::Solution;
use crate::stop::StopToken;

/// Outer/inner roles for one product, remembering which side was the left operand.
struct ProductPlan<'a> {
    outer: Vec<&'a Solution>,
    inner: Vec<&'a Solution>,
    left_is_outer: bool,
}

impl<'a> ProductPlan<'a> {
    fn new(left: &'a Multiset, right: &'a Multiset) -> Self {
        let left_is_outer = left.count() >= right.count();
        let (outer, inner) = if left_is_outer {
            (left, right)
        } else {
            (right, left)
        };
        Self {
            outer: outer.solutions().collect(),
            inner: inner.solutions().collect(),
            left_is_outer,
        }
    }

    fn combine(&self, outer: &Solution, inner: &Solution) -> Solution {
        if self.left_is_outer {
            outer.join(inner)
        } else {
            inner.join(outer)
        }
    }

    fn layout(&self) -> PartitionedMultiset {
        PartitionedMultiset::new(self.outer.len(), self.inner.len())
    }

    /// Fill one partition per outer row. Rows whose turn comes after `stop`
    /// is raised are skipped whole.
    fn fill<P>(
        &self,
        partitions: &mut [Partition],
        predicate: Option<&P>,
        stop: Option<&StopToken>,
        parallel: bool,
    ) -> Result<()>
    where
        P: SolutionPredicate + ?Sized,
    {
        let work = |(partition, x): (&mut Partition, &&Solution)| -> Result<()> {
            if stop.is_some_and(StopToken::should_stop) {
                return Ok(());
            }
            for y in &self.inner {
                let z = self.combine(x, y);
                let keep = match predicate {
                    Some(p) => matches!(p.test(&z), Ok(true)),
                    None => true,
                };
                if keep {
                    partition.push(z)?;
                }
            }
            Ok(())
        };
        if parallel {
            partitions
                .par_iter_mut()
                .zip(self.outer.par_iter())
                .try_for_each(work)
        } else {
            partitions.iter_mut().zip(self.outer.iter()).try_for_each(work)
        }
    }
}

/// Shared short-circuits for product-like operations. `Err` carries the
/// operand pair on to the general path.
fn product_shortcut(left: Multiset, right: &Multiset) -> std::result::Result<Multiset, Multiset> {
    if left.is_empty() || right.is_empty() {
        return Ok(Multiset::Null);
    }
    if left.is_identity() {
        return Ok(right.clone());
    }
    if right.is_identity() {
        return Ok(left);
    }
    Err(left)
}

fn build_product<P>(
    left: &Multiset,
    right: &Multiset,
    predicate: Option<&P>,
    stop: Option<&StopToken>,
    parallel: bool,
) -> Result<PartitionedMultiset>
where
    P: SolutionPredicate + ?Sized,
{
    let plan = ProductPlan::new(left, right);
    let mut out = plan.layout();
    for v in union_variables(left, right) {
        out.add_variable(v);
    }
    plan.fill(out.partitions_mut(), predicate, stop, parallel)?;
    Ok(out)
}

type NoPredicate = dyn SolutionPredicate;

impl Multiset {
    /// Unconditional cartesian product.
    pub fn product(self, other: &Multiset, options: &EvaluationOptions) -> Result<Multiset> {
        let this = match product_shortcut(self, other) {
            Ok(done) => return Ok(done),
            Err(this) => this,
        };
        let parallel = options.should_parallelise(this.count().max(other.count()));
        tracing::trace!(left = this.count(), right = other.count(), parallel, "product");
        let out = build_product::<NoPredicate>(&this, other, None, None, parallel)?;
        Ok(Multiset::Partitioned(out))
    }

    /// Product computed on a background worker for at most `timeout_ms`.
    ///
    /// On expiry the worker is told to stop and joined; whatever complete
    /// outer rows it committed are returned. Callers needing the full answer
    /// must check their own time budget afterwards. `timeout_ms <= 0` means
    /// no bound.
    pub fn product_with_timeout(
        self,
        other: &Multiset,
        timeout_ms: i64,
        options: &EvaluationOptions,
    ) -> Result<Multiset> {
        if timeout_ms <= 0 {
            return self.product(other, options);
        }
        let this = match product_shortcut(self, other) {
            Ok(done) => return Ok(done),
            Err(this) => this,
        };
        let parallel = options.should_parallelise(this.count().max(other.count()));
        let stop = StopToken::new();
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let out = std::thread::scope(|scope| {
            let worker_stop = stop.clone();
            let left = &this;
            let worker = scope.spawn(move || {
                let out = build_product::<NoPredicate>(left, other, None, Some(&worker_stop), parallel);
                // The receiver may already have given up waiting.
                let _ = done_tx.send(());
                out
            });
            if done_rx
                .recv_timeout(Duration::from_millis(timeout_ms as u64))
                .is_err()
            {
                stop.stop();
                tracing::warn!(
                    timeout_ms,
                    left = left.count(),
                    right = other.count(),
                    "product exceeded its time budget; returning partial results"
                );
            }
            worker
                .join()
                .map_err(|_| MultisetError::Worker("product worker panicked".to_string()))
        })??;
        Ok(Multiset::Partitioned(out))
    }

    /// Product that only materialises combined rows passing `predicate`.
    ///
    /// `stop` is polled between outer rows; a stopped product returns the
    /// rows committed so far.
    pub fn filtered_product<P>(
        self,
        other: &Multiset,
        predicate: &P,
        options: &EvaluationOptions,
        stop: Option<&StopToken>,
    ) -> Result<Multiset>
    where
        P: SolutionPredicate + ?Sized,
    {
        if self.is_trivially_empty() || other.is_trivially_empty() {
            return Ok(Multiset::Null);
        }
        if other.is_identity() {
            return self.filter(predicate, options);
        }
        if self.is_identity() {
            return other.clone().filter(predicate, options);
        }
        let parallel = options.should_parallelise(self.count().max(other.count()))
            && predicate.can_parallelise();
        tracing::trace!(
            left = self.count(),
            right = other.count(),
            parallel,
            "filtered product"
        );
        let out = build_product(&self, other, Some(predicate), stop, parallel)?;
        Ok(Multiset::Partitioned(out))
    }
}
