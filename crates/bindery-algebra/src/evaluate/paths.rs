//! Property path evaluation.
//!
//! Paths reduce to (start, end) term pairs:
//!
//! - simple steps (predicate, inverse, sequence, alternative) keep every
//!   derivation, so a pair reachable two ways appears twice
//! - closures (`*`, `+`, `?`) are breadth-first reachability with each pair
//!   reported once
//! - a bound endpoint anchors the search; with both ends unbound every node
//!   of the graph is a candidate start

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use bindery_core::{Multiset, Solution, StopToken, Term, Variable};

use super::QueryEvaluator;
use crate::algebra::{union, PathPattern};
use crate::context::EvaluationContext;
use crate::error::Result;
use crate::path::Path;
use crate::pattern::{PatternItem, TriplePattern};
use crate::source::GraphSource;

const PATH_SUBJECT: &str = "_:path_s";
const PATH_PREDICATE: &str = "_:path_p";
const PATH_OBJECT: &str = "_:path_o";

/// Computes the node pairs connected by a path in one graph.
pub struct PathEvaluator<'a> {
    graph: &'a dyn GraphSource,
    active_graph: Option<&'a Term>,
    stop: &'a StopToken,
}

impl<'a> PathEvaluator<'a> {
    pub fn new(graph: &'a dyn GraphSource, active_graph: Option<&'a Term>, stop: &'a StopToken) -> Self {
        Self {
            graph,
            active_graph,
            stop,
        }
    }

    /// Pairs `(x, y)` such that `path` leads from `x` to `y`, restricted to
    /// the given endpoints.
    pub fn pairs(
        &self,
        path: &Path,
        start: Option<&Term>,
        end: Option<&Term>,
    ) -> anyhow::Result<Vec<(Term, Term)>> {
        match path {
            Path::Predicate(predicate) => self.edges(Some(predicate), start, end),
            Path::Inverse(inner) => Ok(self
                .pairs(inner, end, start)?
                .into_iter()
                .map(|(x, y)| (y, x))
                .collect()),
            Path::Sequence(first, second) => self.sequence(first, second, start, end),
            Path::Alternative(a, b) => {
                let mut out = self.pairs(a, start, end)?;
                out.extend(self.pairs(b, start, end)?);
                Ok(out)
            }
            Path::ZeroOrOne(inner) => {
                let mut out = self.zero_length(start, end)?;
                out.extend(self.pairs(inner, start, end)?);
                Ok(distinct(out))
            }
            Path::ZeroOrMore(inner) => self.closure(inner, start, end, true),
            Path::OneOrMore(inner) => self.closure(inner, start, end, false),
            Path::NegatedSet { forward, inverse } => self.negated(forward, inverse, start, end),
        }
    }

    /// Pairs connecting a node to itself.
    pub fn zero_length(&self, start: Option<&Term>, end: Option<&Term>) -> anyhow::Result<Vec<(Term, Term)>> {
        Ok(match (start, end) {
            (Some(s), Some(e)) if s == e => vec![(s.clone(), s.clone())],
            (Some(_), Some(_)) => Vec::new(),
            (Some(t), None) | (None, Some(t)) => vec![(t.clone(), t.clone())],
            (None, None) => self.all_nodes()?.into_iter().map(|n| (n.clone(), n)).collect(),
        })
    }

    /// One triple-pattern lookup; `predicate == None` matches any predicate.
    fn edges(
        &self,
        predicate: Option<&Term>,
        start: Option<&Term>,
        end: Option<&Term>,
    ) -> anyhow::Result<Vec<(Term, Term)>> {
        Ok(self
            .triples(predicate, start, end)?
            .into_iter()
            .map(|(s, _, o)| (s, o))
            .collect())
    }

    fn triples(
        &self,
        predicate: Option<&Term>,
        start: Option<&Term>,
        end: Option<&Term>,
    ) -> anyhow::Result<Vec<(Term, Term, Term)>> {
        let (s_var, p_var, o_var) = (
            Variable::new(PATH_SUBJECT),
            Variable::new(PATH_PREDICATE),
            Variable::new(PATH_OBJECT),
        );
        let item = |term: Option<&Term>, var: &Variable| match term {
            Some(t) => PatternItem::Term(t.clone()),
            None => PatternItem::Variable(var.clone()),
        };
        let pattern = TriplePattern::new(
            item(start, &s_var),
            item(predicate, &p_var),
            item(end, &o_var),
        );
        let rows = self.graph.match_pattern(&pattern, self.active_graph)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let resolved = (
                pattern.subject.resolve(row),
                pattern.predicate.resolve(row),
                pattern.object.resolve(row),
            );
            if let (Some(s), Some(p), Some(o)) = resolved {
                out.push((s.clone(), p.clone(), o.clone()));
            }
        }
        Ok(out)
    }

    /// Every subject and object in the active graph, in first-seen order.
    fn all_nodes(&self) -> anyhow::Result<Vec<Term>> {
        let mut seen = AHashSet::new();
        let mut out = Vec::new();
        for (s, _, o) in self.triples(None, None, None)? {
            for node in [s, o] {
                if seen.insert(node.clone()) {
                    out.push(node);
                }
            }
        }
        Ok(out)
    }

    fn sequence(
        &self,
        first: &Path,
        second: &Path,
        start: Option<&Term>,
        end: Option<&Term>,
    ) -> anyhow::Result<Vec<(Term, Term)>> {
        let mut out = Vec::new();
        // Expand from whichever end is anchored; middles are looked up once.
        if start.is_none() && end.is_some() {
            let mut cache: AHashMap<Term, Vec<(Term, Term)>> = AHashMap::new();
            for (middle, y) in self.pairs(second, None, end)? {
                if !cache.contains_key(&middle) {
                    let left = self.pairs(first, None, Some(&middle))?;
                    cache.insert(middle.clone(), left);
                }
                if let Some(left) = cache.get(&middle) {
                    out.extend(left.iter().map(|(x, _)| (x.clone(), y.clone())));
                }
            }
        } else {
            let mut cache: AHashMap<Term, Vec<(Term, Term)>> = AHashMap::new();
            for (x, middle) in self.pairs(first, start, None)? {
                if !cache.contains_key(&middle) {
                    let right = self.pairs(second, Some(&middle), end)?;
                    cache.insert(middle.clone(), right);
                }
                if let Some(right) = cache.get(&middle) {
                    out.extend(right.iter().map(|(_, y)| (x.clone(), y.clone())));
                }
            }
        }
        Ok(out)
    }

    fn closure(
        &self,
        step: &Path,
        start: Option<&Term>,
        end: Option<&Term>,
        reflexive: bool,
    ) -> anyhow::Result<Vec<(Term, Term)>> {
        match (start, end) {
            (Some(s), _) => Ok(self
                .reachable(step, s, reflexive, true)?
                .into_iter()
                .filter(|n| end.map_or(true, |e| e == n))
                .map(|n| (s.clone(), n))
                .collect()),
            (None, Some(e)) => Ok(self
                .reachable(step, e, reflexive, false)?
                .into_iter()
                .map(|n| (n, e.clone()))
                .collect()),
            (None, None) => {
                let mut out = Vec::new();
                for node in self.all_nodes()? {
                    if self.stop.should_stop() {
                        tracing::warn!(op = "path", "closure stopped early; results are partial");
                        break;
                    }
                    out.extend(
                        self.reachable(step, &node, reflexive, true)?
                            .into_iter()
                            .map(|n| (node.clone(), n)),
                    );
                }
                Ok(out)
            }
        }
    }

    /// Nodes reachable from `origin` by repeating `step`, walking edges
    /// forwards or backwards.
    fn reachable(&self, step: &Path, origin: &Term, reflexive: bool, forward: bool) -> anyhow::Result<Vec<Term>> {
        let mut visited: AHashSet<Term> = AHashSet::new();
        let mut out = Vec::new();
        if reflexive {
            visited.insert(origin.clone());
            out.push(origin.clone());
        }
        let mut expanded: AHashSet<Term> = AHashSet::new();
        let mut queue = VecDeque::from([origin.clone()]);
        while let Some(node) = queue.pop_front() {
            if self.stop.should_stop() {
                break;
            }
            if !expanded.insert(node.clone()) {
                continue;
            }
            let next: Vec<Term> = if forward {
                self.pairs(step, Some(&node), None)?.into_iter().map(|(_, y)| y).collect()
            } else {
                self.pairs(step, None, Some(&node))?.into_iter().map(|(x, _)| x).collect()
            };
            for n in next {
                if visited.insert(n.clone()) {
                    out.push(n.clone());
                }
                queue.push_back(n);
            }
        }
        Ok(out)
    }

    fn negated(
        &self,
        forward: &[Term],
        inverse: &[Term],
        start: Option<&Term>,
        end: Option<&Term>,
    ) -> anyhow::Result<Vec<(Term, Term)>> {
        let mut out = Vec::new();
        if !forward.is_empty() || inverse.is_empty() {
            out.extend(
                self.triples(None, start, end)?
                    .into_iter()
                    .filter(|(_, p, _)| !forward.contains(p))
                    .map(|(s, _, o)| (s, o)),
            );
        }
        if !inverse.is_empty() {
            out.extend(
                self.triples(None, end, start)?
                    .into_iter()
                    .filter(|(_, p, _)| !inverse.contains(p))
                    .map(|(s, _, o)| (o, s)),
            );
        }
        Ok(out)
    }
}

fn distinct(pairs: Vec<(Term, Term)>) -> Vec<(Term, Term)> {
    let mut seen = AHashSet::new();
    pairs.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

impl QueryEvaluator<'_> {
    pub(super) fn eval_path(
        &self,
        start: &PatternItem,
        path: &Path,
        end: &PatternItem,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let pairs = PathEvaluator::new(self.graph, context.active_graph(), context.stop_token())
            .pairs(path, start.as_term(), end.as_term())?;
        tracing::debug!(op = "path", path = %path, pairs = pairs.len());
        Ok(bind_pairs(start, end, pairs))
    }

    pub(super) fn eval_zero_length_path(
        &self,
        node: &PathPattern,
        context: &mut EvaluationContext,
    ) -> Result<Multiset> {
        let pairs = PathEvaluator::new(self.graph, context.active_graph(), context.stop_token())
            .zero_length(node.start.as_term(), node.end.as_term())?;
        Ok(bind_pairs(&node.start, &node.end, pairs))
    }
}

/// Turn endpoint pairs into solutions over the endpoint variables. A path
/// with no variables is Identity when connected and Null otherwise.
fn bind_pairs(start: &PatternItem, end: &PatternItem, pairs: Vec<(Term, Term)>) -> Multiset {
    let variables = union(
        start.as_variable().into_iter().cloned().collect(),
        end.as_variable().cloned(),
    );
    if variables.is_empty() {
        return if pairs.is_empty() {
            Multiset::Null
        } else {
            Multiset::Identity
        };
    }
    let rows = pairs.into_iter().filter_map(|(x, y)| {
        let mut row = Solution::new();
        if let Some(v) = start.as_variable() {
            row.add(v.clone(), x.clone());
        }
        if let Some(v) = end.as_variable() {
            if row.get(v).is_some_and(|bound| bound != &y) {
                return None;
            }
            row.add(v.clone(), y);
        }
        Some(row)
    });
    Multiset::from_solutions(variables, rows).or_null()
}
