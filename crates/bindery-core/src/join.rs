//! Hash-partitioned join algorithms over [`Multiset`].
//!
//! Every operation checks the absorbing forms (Identity, Null, empty) before
//! doing any indexing work. The general path is two passes:
//!
//! 1. index one operand per shared variable: `value -> {ids}` plus the set of
//!    ids that leave the variable unbound (a wildcard)
//! 2. probe with each row of the other operand, intersecting candidate sets
//!    across the shared variables, then verify full compatibility
//!
//! Candidate sets are `RoaringTreemap`s so the intersection is cheap even for
//! wide indexes.

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use roaring::RoaringTreemap;

use crate::error::{PredicateError, Result};
use crate::multiset::{Multiset, OrdinaryMultiset};
use crate::options::EvaluationOptions;
use crate::solution::Solution;
use crate::term::{Term, Variable};

// ============================================================================
// Predicates
// ============================================================================

/// A boolean test over a candidate row (LeftJoin filters, FILTER, fused products).
pub trait SolutionPredicate: Sync {
    fn test(&self, solution: &Solution) -> std::result::Result<bool, PredicateError>;

    /// Whether `test` may be called from several worker threads at once.
    fn can_parallelise(&self) -> bool {
        true
    }
}

impl<F> SolutionPredicate for F
where
    F: Fn(&Solution) -> std::result::Result<bool, PredicateError> + Sync,
{
    fn test(&self, solution: &Solution) -> std::result::Result<bool, PredicateError> {
        self(solution)
    }
}

// ============================================================================
// Join index
// ============================================================================

/// Per-variable value index over one operand.
pub(crate) struct JoinIndex<'a> {
    variables: &'a [Variable],
    values: Vec<AHashMap<&'a Term, RoaringTreemap>>,
    unbound: Vec<RoaringTreemap>,
    all: RoaringTreemap,
}

impl<'a> JoinIndex<'a> {
    pub(crate) fn build(source: &'a Multiset, variables: &'a [Variable]) -> Self {
        let mut values = vec![AHashMap::new(); variables.len()];
        let mut unbound = vec![RoaringTreemap::new(); variables.len()];
        let mut all = RoaringTreemap::new();
        for s in source.solutions() {
            all.insert(s.id());
            for (i, var) in variables.iter().enumerate() {
                match s.get(var) {
                    Some(value) => {
                        values[i]
                            .entry(value)
                            .or_insert_with(RoaringTreemap::new)
                            .insert(s.id());
                    }
                    None => {
                        unbound[i].insert(s.id());
                    }
                }
            }
        }
        Self {
            variables,
            values,
            unbound,
            all,
        }
    }

    /// IDs of indexed rows that could be compatible with `probe`. A variable
    /// the probe leaves unbound does not narrow the candidates.
    pub(crate) fn candidates(&self, probe: &Solution) -> RoaringTreemap {
        let mut acc: Option<RoaringTreemap> = None;
        for (i, var) in self.variables.iter().enumerate() {
            let Some(value) = probe.get(var) else {
                continue;
            };
            let mut ids = self.unbound[i].clone();
            if let Some(bound) = self.values[i].get(value) {
                ids |= bound;
            }
            let narrowed = match acc {
                Some(prev) => prev & ids,
                None => ids,
            };
            if narrowed.is_empty() {
                return narrowed;
            }
            acc = Some(narrowed);
        }
        acc.unwrap_or_else(|| self.all.clone())
    }
}

/// Left variables followed by right-only variables.
pub(crate) fn union_variables(left: &Multiset, right: &Multiset) -> Vec<Variable> {
    let mut out = left.variables().to_vec();
    for v in right.variables() {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    out
}

/// Apply `rows_for` to every row, in parallel when the options allow it, and
/// concatenate the outputs in input order.
pub(crate) fn flat_map_rows<'a, F>(
    rows: &[&'a Solution],
    parallel: bool,
    rows_for: F,
) -> Vec<Solution>
where
    F: Fn(&'a Solution) -> Vec<Solution> + Sync + Send,
{
    if parallel {
        rows.par_iter().flat_map_iter(|row| rows_for(*row)).collect()
    } else {
        rows.iter().flat_map(|row| rows_for(*row)).collect()
    }
}

fn collect_into(variables: Vec<Variable>, rows: Vec<Solution>) -> Multiset {
    let mut out = OrdinaryMultiset::with_variables(variables);
    for row in rows {
        out.add(row);
    }
    Multiset::Ordinary(out)
}

// ============================================================================
// Join operations
// ============================================================================

impl Multiset {
    /// Natural join on the shared variables.
    pub fn join(self, other: &Multiset, options: &EvaluationOptions) -> Result<Multiset> {
        if self.is_empty() || other.is_empty() {
            return Ok(Multiset::Null);
        }
        if self.is_identity() {
            return Ok(other.clone());
        }
        if other.is_identity() {
            return Ok(self);
        }
        if self.is_disjoint_with(other) {
            return self.product(other, options);
        }

        let join_vars = self.shared_variables(other);
        tracing::trace!(
            left = self.count(),
            right = other.count(),
            shared = join_vars.len(),
            "hash join"
        );

        let index = JoinIndex::build(&self, &join_vars);
        let right: Vec<&Solution> = other.solutions().collect();
        let joined = flat_map_rows(&right, options.should_parallelise(right.len()), |y| {
            index
                .candidates(y)
                .iter()
                .filter_map(|id| self.get(id).ok())
                .filter(|x| x.is_compatible_with(y, &join_vars))
                .map(|x| x.join(y))
                .collect()
        });
        Ok(collect_into(union_variables(&self, other), joined))
    }

    /// Outer join: every left row survives, extended by each approved
    /// compatible right row, or copied unchanged when none is approved.
    ///
    /// A predicate failure discards the candidate and also keeps a standalone
    /// copy of the left row.
    pub fn left_join<P>(
        self,
        other: &Multiset,
        predicate: &P,
        options: &EvaluationOptions,
    ) -> Result<Multiset>
    where
        P: SolutionPredicate + ?Sized,
    {
        if self.is_null() {
            return Ok(Multiset::Null);
        }
        if other.is_identity() || other.is_trivially_empty() || self.is_empty() {
            return Ok(self);
        }
        let this = match self {
            Multiset::Identity => Multiset::Ordinary(Multiset::Identity.into_ordinary()),
            m => m,
        };

        let join_vars = this.shared_variables(other);
        let left: Vec<&Solution> = this.solutions().collect();
        let parallel = options.should_parallelise(left.len()) && predicate.can_parallelise();
        tracing::trace!(
            left = left.len(),
            right = other.count(),
            shared = join_vars.len(),
            "left join"
        );

        let rows = if join_vars.is_empty() {
            let right: Vec<&Solution> = other.solutions().collect();
            flat_map_rows(&left, parallel, |x| {
                let mut out = Vec::new();
                let mut matched = false;
                let mut standalone = false;
                for y in &right {
                    let z = x.join(y);
                    match predicate.test(&z) {
                        Ok(true) => {
                            out.push(z);
                            matched = true;
                        }
                        Ok(false) | Err(_) => standalone = true,
                    }
                }
                if standalone && !matched {
                    out.push(x.clone());
                }
                out
            })
        } else {
            let index = JoinIndex::build(other, &join_vars);
            flat_map_rows(&left, parallel, |x| {
                let candidates = index.candidates(x);
                if candidates.is_empty() {
                    return vec![x.clone()];
                }
                let mut out = Vec::new();
                let mut matched = false;
                let mut standalone = false;
                for y in candidates.iter().filter_map(|id| other.get(id).ok()) {
                    if !x.is_compatible_with(y, &join_vars) {
                        continue;
                    }
                    let z = x.join(y);
                    match predicate.test(&z) {
                        Ok(true) => {
                            out.push(z);
                            matched = true;
                        }
                        Ok(false) => {}
                        Err(err) => {
                            tracing::trace!(error = %err, "left join predicate failed");
                            standalone = true;
                        }
                    }
                }
                if standalone || !matched {
                    out.push(x.clone());
                }
                out
            })
        };
        Ok(collect_into(union_variables(&this, other), rows))
    }

    /// Keep the left rows that have (`must_exist`) or lack (`!must_exist`) a
    /// compatible right row.
    pub fn exists_join(
        self,
        other: &Multiset,
        must_exist: bool,
        options: &EvaluationOptions,
    ) -> Result<Multiset> {
        match self {
            Multiset::Null => return Ok(Multiset::Null),
            Multiset::Identity => {
                let exists = !other.is_trivially_empty();
                return Ok(if exists == must_exist {
                    Multiset::Identity
                } else {
                    Multiset::Null
                });
            }
            _ => {}
        }
        if other.is_identity() {
            return Ok(self);
        }
        if other.is_trivially_empty() {
            return Ok(if must_exist { Multiset::Null } else { self });
        }
        if self.is_disjoint_with(other) {
            return Ok(if must_exist { self } else { Multiset::Null });
        }

        let join_vars = self.shared_variables(other);
        let exists = {
            let index = JoinIndex::build(&self, &join_vars);
            let right: Vec<&Solution> = other.solutions().collect();
            let matches_for = |y: &Solution| -> RoaringTreemap {
                index
                    .candidates(y)
                    .iter()
                    .filter(|&id| {
                        self.get(id)
                            .is_ok_and(|x| x.is_compatible_with(y, &join_vars))
                    })
                    .collect()
            };
            if options.should_parallelise(right.len()) {
                right
                    .par_iter()
                    .map(|y| matches_for(y))
                    .reduce(RoaringTreemap::new, |a, b| a | b)
            } else {
                right.iter().fold(RoaringTreemap::new(), |acc, y| acc | matches_for(y))
            }
        };

        if exists.len() == self.count() as u64 {
            return Ok(if must_exist { self } else { Multiset::Null });
        }
        let mut out = self;
        out.retain(|x| exists.contains(x.id()) == must_exist);
        Ok(out)
    }

    /// Remove the left rows that are minus-compatible with some right row.
    pub fn minus_join(self, other: &Multiset, options: &EvaluationOptions) -> Result<Multiset> {
        match self {
            Multiset::Null => return Ok(Multiset::Null),
            Multiset::Identity => return Ok(Multiset::Identity),
            _ => {}
        }
        if other.is_identity() || other.is_trivially_empty() || self.is_disjoint_with(other) {
            return Ok(self);
        }
        let join_vars = self.shared_variables(other);
        if join_vars.is_empty() {
            return Ok(self);
        }

        let to_minus = {
            let index = JoinIndex::build(&self, &join_vars);
            let right: Vec<&Solution> = other.solutions().collect();
            let matches_for = |y: &Solution| -> RoaringTreemap {
                index
                    .candidates(y)
                    .iter()
                    .filter(|&id| {
                        self.get(id)
                            .is_ok_and(|x| x.is_minus_compatible_with(y, &join_vars))
                    })
                    .collect()
            };
            if options.should_parallelise(right.len()) {
                right
                    .par_iter()
                    .map(|y| matches_for(y))
                    .reduce(RoaringTreemap::new, |a, b| a | b)
            } else {
                right.iter().fold(RoaringTreemap::new(), |acc, y| acc | matches_for(y))
            }
        };

        if to_minus.len() == self.count() as u64 {
            return Ok(Multiset::Null);
        }
        let mut out = self;
        out.retain(|x| !to_minus.contains(x.id()));
        Ok(out)
    }

    /// Bag union: append copies of every right row.
    pub fn union(self, other: &Multiset) -> Result<Multiset> {
        if self.is_null() {
            return Ok(other.clone());
        }
        if other.is_trivially_empty() {
            return Ok(self);
        }
        let mut out = self.into_ordinary();
        for v in other.variables() {
            out.add_variable(v.clone());
        }
        for s in other.solutions() {
            out.add(s.copy());
        }
        Ok(Multiset::Ordinary(out))
    }

    /// Union that skips right rows equal (after trimming to the left
    /// variables) to a row already present.
    pub fn merge(self, other: &Multiset) -> Result<Multiset> {
        if self.is_null() {
            return Ok(other.clone());
        }
        if other.is_trivially_empty() {
            return Ok(self);
        }
        let mut out = self.into_ordinary();
        let variables = out.variables().to_vec();
        let mut seen: AHashSet<Solution> = out.solutions().map(|s| s.trimmed_to(&variables)).collect();
        for s in other.solutions() {
            let trimmed = s.trimmed_to(&variables);
            if seen.insert(trimmed.clone()) {
                out.add(trimmed);
            }
        }
        Ok(Multiset::Ordinary(out))
    }

    /// Keep the rows for which the predicate holds; failures reject the row.
    pub fn filter<P>(self, predicate: &P, options: &EvaluationOptions) -> Result<Multiset>
    where
        P: SolutionPredicate + ?Sized,
    {
        match self {
            Multiset::Null => Ok(Multiset::Null),
            Multiset::Identity => Ok(match predicate.test(&Solution::new()) {
                Ok(true) => Multiset::Identity,
                _ => Multiset::Null,
            }),
            mut this => {
                let rejected: RoaringTreemap = {
                    let rows: Vec<&Solution> = this.solutions().collect();
                    let keeps = |s: &Solution| matches!(predicate.test(s), Ok(true));
                    if options.should_parallelise(rows.len()) && predicate.can_parallelise() {
                        rows.par_iter()
                            .filter(|s| !keeps(s))
                            .map(|s| s.id())
                            .collect::<Vec<_>>()
                            .into_iter()
                            .collect()
                    } else {
                        rows.iter().filter(|s| !keeps(s)).map(|s| s.id()).collect()
                    }
                };
                if !rejected.is_empty() {
                    this.retain(|s| !rejected.contains(s.id()));
                }
                Ok(this)
            }
        }
    }
}
