//! Bags of solutions.
//!
//! `Multiset` is a closed sum over the four storage forms:
//!
//! - `Identity`: the unit of join/product; one empty solution, no variables, immutable
//! - `Null`: the absorbing zero; always empty, immutable
//! - `Ordinary`: general storage supporting add/remove/sort/trim
//! - `Partitioned`: pre-sharded storage written by parallel workers
//!
//! The join algebra over these forms lives in [`crate::join`] and [`crate::product`].

mod ordinary;
mod partitioned;

pub use ordinary::OrdinaryMultiset;
pub use partitioned::{Partition, PartitionedMultiset};

use std::cmp::Ordering;
use std::fmt;

use crate::error::{MultisetError, Result};
use crate::solution::{Solution, SolutionId, EMPTY_SOLUTION};
use crate::term::{Term, Variable};

#[derive(Debug, Clone)]
pub enum Multiset {
    Identity,
    Null,
    Ordinary(OrdinaryMultiset),
    Partitioned(PartitionedMultiset),
}

impl Default for Multiset {
    fn default() -> Self {
        Self::new()
    }
}

impl From<OrdinaryMultiset> for Multiset {
    fn from(value: OrdinaryMultiset) -> Self {
        Multiset::Ordinary(value)
    }
}

impl From<PartitionedMultiset> for Multiset {
    fn from(value: PartitionedMultiset) -> Self {
        Multiset::Partitioned(value)
    }
}

impl Multiset {
    /// An empty ordinary multiset.
    pub fn new() -> Self {
        Multiset::Ordinary(OrdinaryMultiset::new())
    }

    pub fn with_variables(variables: impl IntoIterator<Item = Variable>) -> Self {
        Multiset::Ordinary(OrdinaryMultiset::with_variables(variables))
    }

    /// Seed an ordinary multiset from leaf solutions and their binding variables.
    pub fn from_solutions(
        variables: impl IntoIterator<Item = Variable>,
        solutions: impl IntoIterator<Item = Solution>,
    ) -> Self {
        let mut out = OrdinaryMultiset::with_variables(variables);
        for s in solutions {
            out.add(s);
        }
        Multiset::Ordinary(out)
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Multiset::Identity)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Multiset::Null)
    }

    /// Null, Identity, or an empty ordinary/partitioned multiset never needs indexing.
    pub(crate) fn is_trivially_empty(&self) -> bool {
        self.is_null() || self.is_empty()
    }

    pub fn count(&self) -> usize {
        match self {
            Multiset::Identity => 1,
            Multiset::Null => 0,
            Multiset::Ordinary(m) => m.count(),
            Multiset::Partitioned(m) => m.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Multiset::Identity => false,
            Multiset::Null => true,
            Multiset::Ordinary(m) => m.is_empty(),
            Multiset::Partitioned(m) => m.is_empty(),
        }
    }

    /// Cardinality before any LIMIT/OFFSET was applied.
    pub fn virtual_count(&self) -> usize {
        match self {
            Multiset::Identity => 1,
            Multiset::Null => 0,
            Multiset::Ordinary(m) => m.virtual_count(),
            Multiset::Partitioned(m) => m.virtual_count(),
        }
    }

    pub fn set_virtual_count(&mut self, count: usize) -> Result<()> {
        match self {
            Multiset::Identity => Err(MultisetError::IdentityMutation {
                operation: "set the virtual count of",
            }),
            Multiset::Null => Err(MultisetError::NullMutation {
                operation: "set the virtual count of",
            }),
            Multiset::Ordinary(m) => {
                m.set_virtual_count(count);
                Ok(())
            }
            Multiset::Partitioned(m) => {
                m.set_virtual_count(count);
                Ok(())
            }
        }
    }

    pub fn variables(&self) -> &[Variable] {
        match self {
            Multiset::Identity | Multiset::Null => &[],
            Multiset::Ordinary(m) => m.variables(),
            Multiset::Partitioned(m) => m.variables(),
        }
    }

    pub fn contains_variable(&self, variable: &Variable) -> bool {
        self.variables().contains(variable)
    }

    pub fn contains_variables(&self, variables: &[Variable]) -> bool {
        variables.iter().all(|v| self.contains_variable(v))
    }

    /// No variable name in common (set membership, not sizes).
    pub fn is_disjoint_with(&self, other: &Multiset) -> bool {
        !self.variables().iter().any(|v| other.contains_variable(v))
    }

    /// Variables present in both operands, in left order.
    pub fn shared_variables(&self, other: &Multiset) -> Vec<Variable> {
        self.variables()
            .iter()
            .filter(|v| other.contains_variable(v))
            .cloned()
            .collect()
    }

    pub fn contains_value(&self, variable: &Variable, value: &Term) -> bool {
        match self {
            Multiset::Identity | Multiset::Null => false,
            Multiset::Ordinary(m) => m.contains_value(variable, value),
            Multiset::Partitioned(m) => m.contains_value(variable, value),
        }
    }

    /// Solutions in enumeration order (sort order when one was materialised).
    pub fn solutions(&self) -> Box<dyn Iterator<Item = &Solution> + '_> {
        match self {
            Multiset::Identity => Box::new(std::iter::once(&EMPTY_SOLUTION)),
            Multiset::Null => Box::new(std::iter::empty()),
            Multiset::Ordinary(m) => m.solutions(),
            Multiset::Partitioned(m) => m.solutions(),
        }
    }

    pub fn ids(&self) -> Vec<SolutionId> {
        match self {
            Multiset::Identity => vec![EMPTY_SOLUTION.id()],
            Multiset::Null => Vec::new(),
            Multiset::Ordinary(m) => m.ids(),
            Multiset::Partitioned(m) => m.ids(),
        }
    }

    pub fn get(&self, id: SolutionId) -> Result<&Solution> {
        match self {
            Multiset::Identity if id == EMPTY_SOLUTION.id() => Ok(&EMPTY_SOLUTION),
            Multiset::Identity | Multiset::Null => Err(MultisetError::NoSuchSolution(id)),
            Multiset::Ordinary(m) => m.get(id),
            Multiset::Partitioned(m) => m.get(id),
        }
    }

    /// Add a solution, assigning it a fresh ID. A partitioned multiset is
    /// first converted to ordinary storage.
    pub fn add(&mut self, solution: Solution) -> Result<SolutionId> {
        match self {
            Multiset::Identity => Err(MultisetError::IdentityMutation { operation: "add to" }),
            Multiset::Null => Err(MultisetError::NullMutation { operation: "add to" }),
            Multiset::Ordinary(m) => Ok(m.add(solution)),
            Multiset::Partitioned(_) => {
                let mut ordinary = std::mem::take(self).into_ordinary();
                let id = ordinary.add(solution);
                *self = Multiset::Ordinary(ordinary);
                Ok(id)
            }
        }
    }

    pub fn add_variable(&mut self, variable: Variable) -> Result<()> {
        match self {
            Multiset::Identity => Err(MultisetError::IdentityMutation {
                operation: "add a variable to",
            }),
            Multiset::Null => Err(MultisetError::NullMutation {
                operation: "add a variable to",
            }),
            Multiset::Ordinary(m) => {
                m.add_variable(variable);
                Ok(())
            }
            Multiset::Partitioned(m) => {
                m.add_variable(variable);
                Ok(())
            }
        }
    }

    /// Remove by ID; `Ok(false)` when no such solution was stored.
    pub fn remove(&mut self, id: SolutionId) -> Result<bool> {
        match self {
            Multiset::Identity => Err(MultisetError::IdentityMutation {
                operation: "remove from",
            }),
            Multiset::Null => Err(MultisetError::NullMutation {
                operation: "remove from",
            }),
            Multiset::Ordinary(m) => Ok(m.remove(id)),
            Multiset::Partitioned(m) => Ok(m.remove(id)),
        }
    }

    /// Keep only solutions for which `keep` holds. Identity and Null are left as is.
    pub fn retain(&mut self, keep: impl FnMut(&Solution) -> bool) {
        match self {
            Multiset::Identity | Multiset::Null => {}
            Multiset::Ordinary(m) => m.retain(keep),
            Multiset::Partitioned(m) => m.retain(keep),
        }
    }

    /// Fix the order `variables()` reports. The ordering must name every variable.
    pub fn set_variable_order(&mut self, order: &[Variable]) -> Result<()> {
        match self {
            Multiset::Identity => Err(MultisetError::IdentityMutation {
                operation: "reorder the variables of",
            }),
            Multiset::Null => Err(MultisetError::NullMutation {
                operation: "reorder the variables of",
            }),
            Multiset::Ordinary(m) => m.set_variable_order(order),
            Multiset::Partitioned(m) => m.set_variable_order(order),
        }
    }

    pub fn sort_by(&mut self, compare: impl FnMut(&Solution, &Solution) -> Ordering) {
        match self {
            Multiset::Identity | Multiset::Null => {}
            Multiset::Ordinary(m) => m.sort_by(compare),
            Multiset::Partitioned(m) => m.sort_by(compare),
        }
    }

    /// Drop temporary (`_:`) variables from the universe and every solution.
    pub fn trim(&mut self) {
        match self {
            Multiset::Identity | Multiset::Null => {}
            Multiset::Ordinary(m) => m.trim(),
            Multiset::Partitioned(m) => m.trim(),
        }
    }

    pub fn trim_variable(&mut self, variable: &Variable) {
        match self {
            Multiset::Identity | Multiset::Null => {}
            Multiset::Ordinary(m) => m.trim_variable(variable),
            Multiset::Partitioned(m) => m.trim_variable(variable),
        }
    }

    /// Ordinary storage with the same solutions (in enumeration order) and variables.
    pub fn into_ordinary(self) -> OrdinaryMultiset {
        match self {
            Multiset::Identity => {
                let mut out = OrdinaryMultiset::new();
                out.add(Solution::new());
                out
            }
            Multiset::Null => OrdinaryMultiset::new(),
            Multiset::Ordinary(m) => m,
            Multiset::Partitioned(m) => {
                let variables = m.variables().to_vec();
                let virtual_count = m.virtual_count();
                let mut out = OrdinaryMultiset::with_variables(variables);
                for s in m.into_solutions() {
                    out.add(s);
                }
                out.set_virtual_count(virtual_count);
                out
            }
        }
    }

    pub fn into_solutions(self) -> Vec<Solution> {
        match self {
            Multiset::Identity => vec![Solution::new()],
            Multiset::Null => Vec::new(),
            Multiset::Ordinary(m) => m.into_solutions(),
            Multiset::Partitioned(m) => m.into_solutions(),
        }
    }

    /// `Null` when this multiset holds no solutions, otherwise unchanged.
    pub fn or_null(self) -> Multiset {
        if self.is_empty() {
            Multiset::Null
        } else {
            self
        }
    }
}

impl fmt::Display for Multiset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiset::Identity => write!(f, "Identity"),
            Multiset::Null => write!(f, "Null"),
            _ => {
                writeln!(f, "Multiset({} solutions)", self.count())?;
                for s in self.solutions() {
                    writeln!(f, "  {s}")?;
                }
                Ok(())
            }
        }
    }
}

/// Check `order` is a permutation-with-cover of `current` and return it.
fn validate_variable_order(current: &[Variable], order: &[Variable]) -> Result<Vec<Variable>> {
    if let Some(unknown) = order.iter().find(|v| !current.contains(v)) {
        return Err(MultisetError::UnknownOrderVariable(unknown.name().to_string()));
    }
    let missing: Vec<String> = current
        .iter()
        .filter(|v| !order.contains(v))
        .map(|v| v.name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MultisetError::IncompleteVariableOrder { missing });
    }
    let mut out: Vec<Variable> = Vec::with_capacity(order.len());
    for v in order {
        if !out.contains(v) {
            out.push(v.clone());
        }
    }
    Ok(out)
}
