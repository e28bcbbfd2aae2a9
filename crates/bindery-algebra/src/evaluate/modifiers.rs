//! Unary nodes: filter, assignment, projection, duplicate removal, ordering
//! and slicing.

use std::cmp::Ordering;

use ahash::{AHashMap, AHashSet};
use bindery_core::{compare_for_ordering, Multiset, Solution, SolutionId, Term};
use rayon::prelude::*;

use super::QueryEvaluator;
use crate::algebra::{Algebra, Distinct, Extend, OrderBy, Reduced, Select, Slice, SortCondition};
use crate::context::EvaluationContext;
use crate::error::{EvaluationError, Result};
use crate::expression::{Expression, ExpressionPredicate};

impl QueryEvaluator<'_> {
    /// FILTER and HAVING: keep the solutions whose expression is true.
    pub(super) fn eval_filter(
        &self,
        inner: &Algebra,
        expression: &Expression,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let input = self.eval(inner, context)?;
        let predicate = ExpressionPredicate::new(expression, self.expressions);
        Ok(input.filter(&predicate, context.options())?.or_null())
    }

    /// BIND. The variable must not already be in scope; a failed evaluation
    /// leaves it unbound on that row.
    pub(super) fn eval_extend(&self, node: &Extend, context: &mut EvaluationContext) -> Result<Multiset> {
        let input = self.eval(&node.inner, context)?;
        if input.is_null() {
            return Ok(Multiset::Null);
        }
        if input.contains_variable(&node.variable) {
            return Err(EvaluationError::AssignmentConflict {
                variable: node.variable.clone(),
            });
        }

        let mut variables = input.variables().to_vec();
        variables.push(node.variable.clone());
        let rows = input.into_solutions();

        let assign = |row: &Solution| -> Solution {
            let mut out = row.clone();
            match self.expressions.evaluate(&node.expression, row) {
                Ok(value) => {
                    out.add(node.variable.clone(), value);
                }
                Err(err) => {
                    tracing::trace!(variable = %node.variable, error = %err, "assignment left unbound");
                }
            }
            out
        };
        let extended: Vec<Solution> = if context.options().should_parallelise(rows.len())
            && node.expression.can_parallelise()
        {
            rows.par_iter().map(assign).collect()
        } else {
            rows.iter().map(assign).collect()
        };
        Ok(Multiset::from_solutions(variables, extended))
    }

    /// Projection: drop unprojected variables, add missing projected ones as
    /// unbound, and fix the output variable order.
    pub(super) fn eval_select(&self, node: &Select, context: &mut EvaluationContext) -> Result<Multiset> {
        let input = self.eval(&node.inner, context)?;
        let projection = match &node.variables {
            Some(_) => node.projection(),
            None => input
                .variables()
                .iter()
                .filter(|v| !v.is_temporary())
                .cloned()
                .collect(),
        };
        let mut out = match input {
            Multiset::Null => return Ok(Multiset::with_variables(projection)),
            Multiset::Identity => Multiset::from_solutions(projection.clone(), [Solution::new()]),
            other => Multiset::Ordinary(other.into_ordinary()),
        };
        let dropped: Vec<_> = out
            .variables()
            .iter()
            .filter(|v| !projection.contains(v))
            .cloned()
            .collect();
        for variable in &dropped {
            out.trim_variable(variable);
        }
        for variable in &projection {
            if !out.contains_variable(variable) {
                out.add_variable(variable.clone())?;
            }
        }
        out.set_variable_order(&projection)?;
        Ok(out)
    }

    pub(super) fn eval_distinct(&self, node: &Distinct, context: &mut EvaluationContext) -> Result<Multiset> {
        let mut input = self.eval(&node.inner, context)?;
        if input.is_identity() || input.is_null() {
            return Ok(input);
        }
        if context.options().trim_temporary_variables {
            input.trim();
        }
        let mut seen: AHashSet<&Solution> = AHashSet::new();
        let duplicates: AHashSet<SolutionId> = input
            .solutions()
            .filter(|s| !seen.insert(*s))
            .map(Solution::id)
            .collect();
        drop(seen);
        input.retain(|s| !duplicates.contains(&s.id()));
        Ok(input)
    }

    /// REDUCED: drop a solution equal to the one enumerated just before it.
    pub(super) fn eval_reduced(&self, node: &Reduced, context: &mut EvaluationContext) -> Result<Multiset> {
        let mut input = self.eval(&node.inner, context)?;
        if input.is_identity() || input.is_null() {
            return Ok(input);
        }
        let mut previous: Option<&Solution> = None;
        let mut duplicates: AHashSet<SolutionId> = AHashSet::new();
        for s in input.solutions() {
            if previous == Some(s) {
                duplicates.insert(s.id());
            }
            previous = Some(s);
        }
        input.retain(|s| !duplicates.contains(&s.id()));
        Ok(input)
    }

    /// ORDER BY: materialise a sort order. Sort keys are evaluated once per
    /// solution; a failed key sorts as unbound.
    pub(super) fn eval_order_by(&self, node: &OrderBy, context: &mut EvaluationContext) -> Result<Multiset> {
        let mut input = self.eval(&node.inner, context)?;
        if input.is_identity() || input.is_null() || node.conditions.is_empty() {
            return Ok(input);
        }
        let keys: AHashMap<SolutionId, Vec<Option<Term>>> = input
            .solutions()
            .map(|s| {
                let key = node
                    .conditions
                    .iter()
                    .map(|c| self.expressions.evaluate(&c.expression, s).ok())
                    .collect();
                (s.id(), key)
            })
            .collect();
        input.sort_by(|a, b| compare_keys(keys.get(&a.id()), keys.get(&b.id()), &node.conditions));
        Ok(input)
    }

    /// LIMIT/OFFSET over the enumeration order. The pre-slice count is kept
    /// as the virtual count.
    pub(super) fn eval_slice(&self, node: &Slice, context: &mut EvaluationContext) -> Result<Multiset> {
        let mut input = self.eval(&node.inner, context)?;
        let limit = node.limit.unwrap_or(usize::MAX);
        match input {
            Multiset::Null => return Ok(Multiset::Null),
            Multiset::Identity if limit > 0 && node.offset == 0 => return Ok(Multiset::Identity),
            Multiset::Identity => return Ok(Multiset::new()),
            _ => {}
        }
        if limit == 0 {
            return Ok(Multiset::with_variables(input.variables().to_vec()));
        }
        let total = input.count();
        let keep: AHashSet<SolutionId> = input
            .solutions()
            .skip(node.offset)
            .take(limit)
            .map(Solution::id)
            .collect();
        input.retain(|s| keep.contains(&s.id()));
        input.set_virtual_count(total)?;
        Ok(input)
    }
}

fn compare_keys(
    a: Option<&Vec<Option<Term>>>,
    b: Option<&Vec<Option<Term>>>,
    conditions: &[SortCondition],
) -> Ordering {
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };
    for ((x, y), condition) in a.iter().zip(b).zip(conditions) {
        let ordering = compare_for_ordering(x.as_ref(), y.as_ref());
        let ordering = if condition.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
