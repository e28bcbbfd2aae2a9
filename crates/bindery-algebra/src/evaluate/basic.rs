//! Basic graph patterns, service calls and graph scoping.

use bindery_core::{Multiset, Solution};

use super::QueryEvaluator;
use crate::algebra::{union, Bgp, Graph, Service};
use crate::context::EvaluationContext;
use crate::error::{EvaluationError, Result};
use crate::pattern::{PatternItem, TriplePattern};

impl QueryEvaluator<'_> {
    fn match_pattern(&self, pattern: &TriplePattern, context: &EvaluationContext) -> Result<Multiset> {
        let solutions = self.graph.match_pattern(pattern, context.active_graph())?;
        Ok(Multiset::from_solutions(pattern.variables(), solutions))
    }

    /// Join pattern results left to right. Steps that share no variable with
    /// what came before are cartesian products and run under the remaining
    /// time budget.
    pub(super) fn eval_bgp(&self, node: &Bgp, context: &mut EvaluationContext) -> Result<Multiset> {
        if node.patterns.is_empty() {
            return Ok(Multiset::Identity);
        }
        let mut results = Multiset::Identity;
        for pattern in &node.patterns {
            let step = self.match_pattern(pattern, context)?;
            if step.is_empty() {
                return Ok(Multiset::Null);
            }
            results = if results.is_disjoint_with(&step) {
                results.product_with_timeout(&step, context.remaining_timeout_ms(), context.options())?
            } else {
                results.join(&step, context.options())?
            };
            context.check_timeout()?;
            if results.is_empty() {
                return Ok(Multiset::Null);
            }
        }
        if context.options().trim_temporary_variables {
            results.trim();
        }
        Ok(results)
    }

    /// Depth-first BGP search that stops after `limit` solutions.
    pub(super) fn eval_limited_bgp(
        &self,
        patterns: &[TriplePattern],
        limit: usize,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        if patterns.is_empty() {
            return Ok(Multiset::Identity);
        }
        let mut found = Vec::new();
        if limit > 0 {
            self.search(patterns, Solution::new(), limit, context, &mut found)?;
        }
        let variables = patterns
            .iter()
            .fold(Vec::new(), |acc, p| union(acc, p.variables()));
        let mut results = Multiset::from_solutions(variables, found).or_null();
        if context.options().trim_temporary_variables {
            results.trim();
        }
        Ok(results)
    }

    fn search(
        &self,
        patterns: &[TriplePattern],
        partial: Solution,
        limit: usize,
        context: &EvaluationContext,
        found: &mut Vec<Solution>,
    ) -> Result<()> {
        let Some((first, rest)) = patterns.split_first() else {
            found.push(partial);
            return Ok(());
        };
        let bound = first.bind(&partial);
        for extension in self.graph.match_pattern(&bound, context.active_graph())? {
            if found.len() >= limit || context.timed_out() {
                break;
            }
            self.search(rest, partial.join(&extension), limit, context, found)?;
        }
        context.check_timeout()
    }

    /// Evaluate `inner` against a named graph, or once per named graph when
    /// the name is a variable. The active graph is restored even on failure.
    pub(super) fn eval_graph(&self, node: &Graph, context: &mut EvaluationContext) -> Result<Multiset> {
        match &node.name {
            PatternItem::Term(name) => {
                if !self.graph.has_graph(name)? {
                    return Ok(Multiset::Null);
                }
                let previous = context.set_active_graph(Some(name.clone()));
                let result = self.eval(&node.inner, context);
                context.set_active_graph(previous);
                result
            }
            PatternItem::Variable(var) => {
                let mut out = Multiset::Null;
                for name in self.graph.graph_names()? {
                    let previous = context.set_active_graph(Some(name.clone()));
                    let result = self.eval(&node.inner, context);
                    context.set_active_graph(previous);
                    let inner = result?;

                    let variables = union(inner.variables().to_vec(), [var.clone()]);
                    let rows = inner.into_solutions().into_iter().filter_map(|mut row| {
                        match row.get(var) {
                            Some(existing) if existing != &name => None,
                            _ => {
                                row.add(var.clone(), name.clone());
                                Some(row)
                            }
                        }
                    });
                    let scoped = Multiset::from_solutions(variables, rows);
                    out = out.union(&scoped)?;
                }
                Ok(out.or_null())
            }
        }
    }

    /// SERVICE: delegate to the executor. A silent service that is missing or
    /// fails contributes the Identity multiset.
    pub(super) fn eval_service(&self, node: &Service, context: &mut EvaluationContext) -> Result<Multiset> {
        let Some(services) = self.services else {
            if node.silent {
                tracing::warn!(endpoint = %node.endpoint, "no service executor; SILENT service yields no bindings");
                return Ok(Multiset::Identity);
            }
            return Err(EvaluationError::ServiceUnavailable {
                endpoint: node.endpoint.clone(),
            });
        };
        match services.execute(&node.endpoint, &node.inner, &context.input) {
            Ok(results) => Ok(results),
            Err(err) if node.silent => {
                tracing::warn!(endpoint = %node.endpoint, error = %err, "SILENT service failed");
                Ok(Multiset::Identity)
            }
            Err(source) => Err(EvaluationError::Service {
                endpoint: node.endpoint.clone(),
                source,
            }),
        }
    }
}
