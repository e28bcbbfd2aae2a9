//! Reference evaluator: drives the join engine from the operator tree.
//!
//! [`QueryEvaluator`] is an [`AlgebraProcessor`] over an
//! [`EvaluationContext`]. Each node evaluates its operand(s), calls the
//! matching multiset operation and hands the result back up; the top-level
//! result is left in `context.output`.
//!
//! Conventions shared by every node:
//!
//! - an operand that produced no solutions becomes `Multiset::Null`
//! - the right operand of a join-like node is only evaluated when the left
//!   produced something
//! - the time budget is checked after every node

mod basic;
mod group;
mod joins;
mod modifiers;
mod paths;

use bindery_core::{EvaluationOptions, Multiset};

use crate::algebra::{
    Algebra, Ask, AskBgp, AskUnion, Bgp, Distinct, ExistsJoin, Extend, Filter, FilteredProduct,
    Graph, GroupBy, Having, Join, LazyBgp, LazyUnion, LeftJoin, Minus, NegatedPropertySet,
    NullOperator, OrderBy, PathPattern, Reduced, Select, Service, Slice, Table, Union,
};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::expression::ExpressionEvaluator;
use crate::source::{GraphSource, ServiceExecutor};
use crate::visit::AlgebraProcessor;

pub use paths::PathEvaluator;

pub struct QueryEvaluator<'a> {
    graph: &'a dyn GraphSource,
    expressions: &'a dyn ExpressionEvaluator,
    services: Option<&'a dyn ServiceExecutor>,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(graph: &'a dyn GraphSource, expressions: &'a dyn ExpressionEvaluator) -> Self {
        Self {
            graph,
            expressions,
            services: None,
        }
    }

    pub fn with_services(mut self, services: &'a dyn ServiceExecutor) -> Self {
        self.services = Some(services);
        self
    }

    /// Evaluate `algebra` and store the result in `context.output`.
    pub fn evaluate(&self, algebra: &Algebra, context: &mut EvaluationContext) -> Result<()> {
        let out = self.eval(algebra, context)?;
        context.output = out;
        Ok(())
    }

    /// Evaluate `algebra` in a fresh context.
    pub fn run(&self, algebra: &Algebra, options: EvaluationOptions) -> Result<Multiset> {
        let mut context = EvaluationContext::new(options);
        self.evaluate(algebra, &mut context)?;
        if context.timed_out() {
            tracing::warn!(
                elapsed_ms = context.elapsed().as_millis() as u64,
                "evaluation ran out of time; returning partial results"
            );
        }
        Ok(context.take_output())
    }

    pub(crate) fn eval(&self, algebra: &Algebra, context: &mut EvaluationContext) -> Result<Multiset> {
        let out = algebra.accept(self, context)?;
        context.check_timeout()?;
        tracing::trace!(node = algebra.name(), count = out.count(), "evaluated");
        Ok(out)
    }
}

impl AlgebraProcessor for QueryEvaluator<'_> {
    type Context = EvaluationContext;
    type Output = Result<Multiset>;

    fn process_bgp(&self, node: &Bgp, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_bgp(node, context)
    }

    fn process_ask_bgp(&self, node: &AskBgp, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_limited_bgp(&node.patterns, 1, context)
    }

    fn process_lazy_bgp(&self, node: &LazyBgp, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_limited_bgp(&node.patterns, node.required_results, context)
    }

    fn process_join(&self, node: &Join, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_join(node, context)
    }

    fn process_left_join(&self, node: &LeftJoin, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_left_join(node, context)
    }

    fn process_union(&self, node: &Union, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_union(&node.lhs, &node.rhs, |_| false, context)
    }

    fn process_ask_union(&self, node: &AskUnion, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_union(&node.lhs, &node.rhs, |lhs| !lhs.is_empty(), context)
    }

    fn process_lazy_union(&self, node: &LazyUnion, context: &mut EvaluationContext) -> Result<Multiset> {
        let required = node.required_results;
        self.eval_union(&node.lhs, &node.rhs, |lhs| lhs.count() >= required, context)
    }

    fn process_minus(&self, node: &Minus, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_minus(node, context)
    }

    fn process_exists_join(&self, node: &ExistsJoin, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_exists_join(node, context)
    }

    fn process_filtered_product(
        &self,
        node: &FilteredProduct,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        self.eval_filtered_product(node, context)
    }

    fn process_filter(&self, node: &Filter, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_filter(&node.inner, &node.expression, context)
    }

    fn process_extend(&self, node: &Extend, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_extend(node, context)
    }

    fn process_select(&self, node: &Select, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_select(node, context)
    }

    fn process_distinct(&self, node: &Distinct, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_distinct(node, context)
    }

    fn process_reduced(&self, node: &Reduced, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_reduced(node, context)
    }

    fn process_order_by(&self, node: &OrderBy, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_order_by(node, context)
    }

    fn process_slice(&self, node: &Slice, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_slice(node, context)
    }

    fn process_group_by(&self, node: &GroupBy, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_group_by(node, context)
    }

    fn process_having(&self, node: &Having, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_filter(&node.inner, &node.expression, context)
    }

    fn process_graph(&self, node: &Graph, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_graph(node, context)
    }

    fn process_service(&self, node: &Service, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_service(node, context)
    }

    fn process_table(&self, node: &Table, _: &mut EvaluationContext) -> Result<Multiset> {
        Ok(Multiset::from_solutions(node.variables.clone(), node.rows.iter().cloned()).or_null())
    }

    fn process_null_operator(&self, _: &NullOperator, _: &mut EvaluationContext) -> Result<Multiset> {
        Ok(Multiset::Null)
    }

    fn process_ask(&self, node: &Ask, context: &mut EvaluationContext) -> Result<Multiset> {
        let inner = self.eval(&node.inner, context)?;
        Ok(if inner.is_empty() {
            Multiset::Null
        } else {
            Multiset::Identity
        })
    }

    fn process_property_path(&self, node: &PathPattern, context: &mut EvaluationContext) -> Result<Multiset> {
        self.eval_path(&node.start, &node.path, &node.end, context)
    }

    fn process_zero_length_path(
        &self,
        node: &PathPattern,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        self.eval_zero_length_path(node, context)
    }

    fn process_zero_or_more_path(
        &self,
        node: &PathPattern,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let path = node.path.clone().zero_or_more();
        self.eval_path(&node.start, &path, &node.end, context)
    }

    fn process_one_or_more_path(
        &self,
        node: &PathPattern,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let path = node.path.clone().one_or_more();
        self.eval_path(&node.start, &path, &node.end, context)
    }

    fn process_negated_property_set(
        &self,
        node: &NegatedPropertySet,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        self.eval_path(&node.start, &node.as_path(), &node.end, context)
    }
}
