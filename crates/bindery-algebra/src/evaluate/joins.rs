//! Binary nodes: evaluate both operands, then call the join engine.

use bindery_core::{Multiset, PredicateError, Solution};

use super::QueryEvaluator;
use crate::algebra::{Algebra, ExistsJoin, FilteredProduct, Join, LeftJoin, Minus};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::expression::ExpressionPredicate;

fn approve_all(_: &Solution) -> std::result::Result<bool, PredicateError> {
    Ok(true)
}

impl QueryEvaluator<'_> {
    /// Evaluate `lhs`; `None` when it produced nothing, in which case the
    /// node's result is Null and the right side is never evaluated.
    fn eval_lhs(&self, lhs: &Algebra, context: &mut EvaluationContext) -> Result<Option<Multiset>> {
        let out = self.eval(lhs, context)?;
        Ok((!out.is_empty()).then_some(out))
    }

    /// Evaluate `rhs` with `lhs` installed as the context input.
    fn eval_rhs_seeded(
        &self,
        lhs: Multiset,
        rhs: &Algebra,
        context: &mut EvaluationContext,
    ) -> Result<(Multiset, Multiset)> {
        let (lhs, rhs) = context.with_input(lhs, |context| self.eval(rhs, context));
        Ok((lhs, rhs?))
    }

    pub(super) fn eval_join(&self, node: &Join, context: &mut EvaluationContext) -> Result<Multiset> {
        let Some(lhs) = self.eval_lhs(&node.lhs, context)? else {
            return Ok(Multiset::Null);
        };
        let (lhs, rhs) = self.eval_rhs_seeded(lhs, &node.rhs, context)?;
        tracing::debug!(op = "join", left = lhs.count(), right = rhs.count());
        Ok(lhs.join(&rhs, context.options())?)
    }

    pub(super) fn eval_left_join(
        &self,
        node: &LeftJoin,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let Some(lhs) = self.eval_lhs(&node.lhs, context)? else {
            return Ok(Multiset::Null);
        };
        let (lhs, rhs) = if node.can_flow_results_to_rhs() {
            self.eval_rhs_seeded(lhs, &node.rhs, context)?
        } else {
            let (_, rhs) = self.eval_rhs_seeded(Multiset::Identity, &node.rhs, context)?;
            (lhs, rhs)
        };
        tracing::debug!(
            op = "left_join",
            left = lhs.count(),
            right = rhs.count(),
            filtered = node.filter.is_some()
        );
        let out = match &node.filter {
            Some(filter) => {
                let predicate = ExpressionPredicate::new(filter, self.expressions);
                lhs.left_join(&rhs, &predicate, context.options())?
            }
            None => lhs.left_join(&rhs, &approve_all, context.options())?,
        };
        Ok(out)
    }

    pub(super) fn eval_exists_join(
        &self,
        node: &ExistsJoin,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let Some(lhs) = self.eval_lhs(&node.lhs, context)? else {
            return Ok(Multiset::Null);
        };
        let (lhs, rhs) = self.eval_rhs_seeded(lhs, &node.rhs, context)?;
        tracing::debug!(
            op = "exists_join",
            left = lhs.count(),
            right = rhs.count(),
            must_exist = node.must_exist
        );
        Ok(lhs.exists_join(&rhs, node.must_exist, context.options())?)
    }

    /// Minus against the initial input. When the left result shares no
    /// variable with the right pattern nothing can be removed and the right
    /// side is skipped.
    pub(super) fn eval_minus(&self, node: &Minus, context: &mut EvaluationContext) -> Result<Multiset> {
        let Some(lhs) = self.eval_lhs(&node.lhs, context)? else {
            return Ok(Multiset::Null);
        };
        let rhs_variables = node.rhs.variables();
        if !lhs.variables().iter().any(|v| rhs_variables.contains(v)) {
            tracing::trace!(op = "minus", "disjoint operands; left returned unchanged");
            return Ok(lhs);
        }
        let rhs = self.eval(&node.rhs, context)?;
        tracing::debug!(op = "minus", left = lhs.count(), right = rhs.count());
        Ok(lhs.minus_join(&rhs, context.options())?)
    }

    /// Both sides see the same input snapshot, or Identity when either side
    /// is an assignment. `skip_rhs` decides from the left result whether the
    /// right side is needed at all.
    pub(super) fn eval_union(
        &self,
        lhs: &Algebra,
        rhs: &Algebra,
        skip_rhs: impl Fn(&Multiset) -> bool,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let snapshot = if matches!(lhs, Algebra::Extend(_)) || matches!(rhs, Algebra::Extend(_)) {
            Multiset::Identity
        } else {
            context.input.clone()
        };
        let (_, lhs_result) = context.with_input(snapshot.clone(), |context| self.eval(lhs, context));
        let lhs_result = lhs_result?;
        if skip_rhs(&lhs_result) {
            tracing::trace!(op = "union", left = lhs_result.count(), "right side skipped");
            return Ok(lhs_result);
        }
        let (_, rhs_result) = context.with_input(snapshot, |context| self.eval(rhs, context));
        let rhs_result = rhs_result?;
        tracing::debug!(op = "union", left = lhs_result.count(), right = rhs_result.count());
        Ok(lhs_result.union(&rhs_result)?)
    }

    pub(super) fn eval_filtered_product(
        &self,
        node: &FilteredProduct,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let Some(lhs) = self.eval_lhs(&node.lhs, context)? else {
            return Ok(Multiset::Null);
        };
        let rhs = self.eval(&node.rhs, context)?;
        tracing::debug!(op = "filtered_product", left = lhs.count(), right = rhs.count());
        let predicate = ExpressionPredicate::new(&node.filter, self.expressions);
        let out = lhs.filtered_product(
            &rhs,
            &predicate,
            context.options(),
            Some(context.stop_token()),
        )?;
        Ok(out.or_null())
    }
}
