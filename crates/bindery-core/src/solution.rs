//! A single row of variable bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::term::{Term, Variable};

/// Identity of a solution inside one multiset.
pub type SolutionId = u64;

/// One row of `variable -> term` bindings. A variable absent from the map is unbound.
///
/// Equality and hashing consider only the bindings, never the ID, so two rows
/// from different multisets compare equal when they bind the same values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solution {
    #[serde(default)]
    id: SolutionId,
    bindings: BTreeMap<Variable, Term>,
}

pub(crate) static EMPTY_SOLUTION: Solution = Solution::empty();

impl Solution {
    pub const fn empty() -> Self {
        Self {
            id: 0,
            bindings: BTreeMap::new(),
        }
    }

    pub fn new() -> Self {
        Self::empty()
    }

    pub fn from_bindings<I, V>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (V, Term)>,
        V: Into<Variable>,
    {
        Self {
            id: 0,
            bindings: bindings.into_iter().map(|(v, t)| (v.into(), t)).collect(),
        }
    }

    pub fn id(&self) -> SolutionId {
        self.id
    }

    pub fn set_id(&mut self, id: SolutionId) {
        self.id = id;
    }

    pub(crate) fn with_id(mut self, id: SolutionId) -> Self {
        self.id = id;
        self
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    /// Bind `variable`, replacing any previous value.
    pub fn add(&mut self, variable: Variable, value: Term) -> Option<Term> {
        self.bindings.insert(variable, value)
    }

    /// Bind or unbind `variable`.
    pub fn bind(&mut self, variable: Variable, value: Option<Term>) {
        match value {
            Some(value) => {
                self.bindings.insert(variable, value);
            }
            None => {
                self.bindings.remove(&variable);
            }
        }
    }

    pub fn remove(&mut self, variable: &Variable) -> Option<Term> {
        self.bindings.remove(variable)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn binds_all<'a>(&self, variables: impl IntoIterator<Item = &'a Variable>) -> bool {
        variables.into_iter().all(|v| self.contains(v))
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.keys()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Same bindings under a fresh (zero) ID, ready to be added elsewhere.
    pub fn copy(&self) -> Solution {
        Self {
            id: 0,
            bindings: self.bindings.clone(),
        }
    }

    /// Union of both rows' bindings. Callers establish compatibility first;
    /// on a conflicting value the left side wins.
    pub fn join(&self, other: &Solution) -> Solution {
        let mut bindings = self.bindings.clone();
        for (var, value) in &other.bindings {
            bindings.entry(var.clone()).or_insert_with(|| value.clone());
        }
        Solution { id: 0, bindings }
    }

    /// True when every variable in `variables` is unbound on at least one
    /// side or bound to the same value on both.
    pub fn is_compatible_with(&self, other: &Solution, variables: &[Variable]) -> bool {
        variables.iter().all(|v| match (self.get(v), other.get(v)) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        })
    }

    /// Compatibility for difference: compatible, and at least one of
    /// `variables` bound on both sides (disjoint domains never remove a row).
    pub fn is_minus_compatible_with(&self, other: &Solution, variables: &[Variable]) -> bool {
        let mut shares_binding = false;
        for v in variables {
            if let (Some(a), Some(b)) = (self.get(v), other.get(v)) {
                if a != b {
                    return false;
                }
                shares_binding = true;
            }
        }
        shares_binding
    }

    /// Copy restricted to the given variables.
    pub fn trimmed_to(&self, variables: &[Variable]) -> Solution {
        Solution {
            id: self.id,
            bindings: self
                .bindings
                .iter()
                .filter(|(v, _)| variables.contains(v))
                .map(|(v, t)| (v.clone(), t.clone()))
                .collect(),
        }
    }

    pub(crate) fn retain_variables(&mut self, mut keep: impl FnMut(&Variable) -> bool) {
        self.bindings.retain(|v, _| keep(v));
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.bindings == other.bindings
    }
}

impl Eq for Solution {}

impl Hash for Solution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bindings.hash(state);
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, value)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var} = {value}")?;
        }
        write!(f, "}}")
    }
}
