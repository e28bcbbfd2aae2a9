//! Dataset and source operators: GRAPH, SERVICE, inline data, the empty
//! operator and ASK.

use bindery_core::{Solution, Term, Variable};
use serde::{Deserialize, Serialize};

use super::{union, Algebra};
use crate::optimise::Optimiser;
use crate::pattern::PatternItem;

/// Evaluates `inner` against a named graph, or against every named graph when
/// `name` is a variable (which is then bound to the graph name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub inner: Box<Algebra>,
    pub name: PatternItem,
}

impl Graph {
    pub fn new(inner: Algebra, name: impl Into<PatternItem>) -> Self {
        Self {
            inner: Box::new(inner),
            name: name.into(),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        union(self.inner.variables(), self.name.as_variable().cloned())
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        union(self.inner.fixed_variables(), self.name.as_variable().cloned())
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self {
            inner: Box::new(optimiser.optimise(&self.inner)),
            name: self.name.clone(),
        }
    }
}

/// Delegates `inner` to a remote endpoint through a service executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub inner: Box<Algebra>,
    pub endpoint: Term,
    #[serde(default)]
    pub silent: bool,
}

impl Service {
    pub fn new(inner: Algebra, endpoint: Term, silent: bool) -> Self {
        Self {
            inner: Box::new(inner),
            endpoint,
            silent,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(optimiser.optimise(&self.inner), self.endpoint.clone(), self.silent)
    }
}

/// Inline data (VALUES).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub variables: Vec<Variable>,
    pub rows: Vec<Solution>,
}

impl Table {
    pub fn new(variables: Vec<Variable>, rows: Vec<Solution>) -> Self {
        Self { variables, rows }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    /// Variables bound in every row.
    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables
            .iter()
            .filter(|v| self.rows.iter().all(|row| row.contains(v)))
            .cloned()
            .collect()
    }
}

/// Produces nothing; stands in for a pattern known to have no solutions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NullOperator {
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl NullOperator {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        Vec::new()
    }
}

/// ASK: Identity when `inner` has a solution, Null otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ask {
    pub inner: Box<Algebra>,
}

impl Ask {
    pub fn new(inner: Algebra) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        Vec::new()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(optimiser.optimise(&self.inner))
    }
}
