//! Collaborators the evaluator consumes: the graph store and remote services.
//!
//! Backends are heterogeneous, so these traits report failures as
//! `anyhow::Error`; the evaluator wraps them into [`EvaluationError`](crate::EvaluationError).

use bindery_core::{Multiset, Solution, Term};

use crate::algebra::Algebra;
use crate::pattern::TriplePattern;

/// Matches single triple patterns against a dataset.
pub trait GraphSource: Send + Sync {
    /// Bindings for every triple matching `pattern` in `graph`, or in the
    /// default graph when `graph` is `None`.
    fn match_pattern(
        &self,
        pattern: &TriplePattern,
        graph: Option<&Term>,
    ) -> anyhow::Result<Vec<Solution>>;

    /// Names of the named graphs in the dataset.
    fn graph_names(&self) -> anyhow::Result<Vec<Term>>;

    fn has_graph(&self, name: &Term) -> anyhow::Result<bool> {
        Ok(self.graph_names()?.contains(name))
    }
}

/// Executes a SERVICE pattern against a remote endpoint.
pub trait ServiceExecutor: Send + Sync {
    /// `bindings` are the solutions flowing into the SERVICE clause; an
    /// executor may use them to restrict the remote query.
    fn execute(
        &self,
        endpoint: &Term,
        pattern: &Algebra,
        bindings: &Multiset,
    ) -> anyhow::Result<Multiset>;
}
