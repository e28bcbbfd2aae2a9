//! GROUP BY with aggregates.

use ahash::AHashMap;
use bindery_core::{Multiset, Solution, Term};
use rayon::prelude::*;

use super::QueryEvaluator;
use crate::algebra::GroupBy;
use crate::context::EvaluationContext;
use crate::error::{ExpressionError, Result};

/// One component of a group key. Rows whose key expression is unbound or
/// fails still form groups of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyPart {
    Value(Term),
    Unbound,
    Error,
}

impl QueryEvaluator<'_> {
    pub(super) fn eval_group_by(&self, node: &GroupBy, context: &mut EvaluationContext) -> Result<Multiset> {
        let input = self.eval(&node.inner, context)?;
        let rows = input.into_solutions();

        // Groups in first-seen order.
        let mut groups: Vec<(Vec<KeyPart>, Vec<usize>)> = Vec::new();
        if node.keys.is_empty() {
            if !rows.is_empty() || !node.aggregates.is_empty() {
                groups.push((Vec::new(), (0..rows.len()).collect()));
            }
        } else {
            let mut index: AHashMap<Vec<KeyPart>, usize> = AHashMap::new();
            for (i, row) in rows.iter().enumerate() {
                let key: Vec<KeyPart> = node
                    .keys
                    .iter()
                    .map(|k| match self.expressions.evaluate(&k.expression, row) {
                        Ok(value) => KeyPart::Value(value),
                        Err(ExpressionError::Unbound(_)) => KeyPart::Unbound,
                        Err(_) => KeyPart::Error,
                    })
                    .collect();
                let slot = *index.entry(key.clone()).or_insert_with(|| {
                    groups.push((key, Vec::new()));
                    groups.len() - 1
                });
                groups[slot].1.push(i);
            }
        }
        tracing::debug!(op = "group_by", rows = rows.len(), groups = groups.len());

        let build = |(key, members): &(Vec<KeyPart>, Vec<usize>)| -> Solution {
            let mut out = Solution::new();
            for (part, group_key) in key.iter().zip(&node.keys) {
                if let (KeyPart::Value(value), Some(var)) = (part, group_key.output_variable()) {
                    out.add(var.clone(), value.clone());
                }
            }
            let members: Vec<&Solution> = members.iter().map(|&i| &rows[i]).collect();
            for binding in &node.aggregates {
                match binding
                    .aggregate
                    .apply(members.iter().copied(), self.expressions)
                {
                    Ok(value) => {
                        out.add(binding.variable.clone(), value);
                    }
                    Err(err) => {
                        tracing::trace!(variable = %binding.variable, error = %err, "aggregate left unbound");
                    }
                }
            }
            out
        };
        let parallel = context.options().should_parallelise(groups.len())
            && node.aggregates.iter().all(|a| a.aggregate.can_parallelise());
        let solutions: Vec<Solution> = if parallel {
            groups.par_iter().map(build).collect()
        } else {
            groups.iter().map(build).collect()
        };

        Ok(Multiset::from_solutions(node.variables(), solutions).or_null())
    }
}
