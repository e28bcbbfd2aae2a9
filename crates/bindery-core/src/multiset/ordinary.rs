//! General-purpose multiset storage.
//!
//! Solutions are keyed by a counter-assigned ID, so natural enumeration order
//! is insertion order. A sort materialises an explicit ID ordering which is
//! kept through removals and extended by later additions.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;

use crate::error::{MultisetError, Result};
use crate::solution::{Solution, SolutionId};
use crate::term::{Term, Variable};

use super::validate_variable_order;

#[derive(Debug, Default)]
pub struct OrdinaryMultiset {
    variables: Vec<Variable>,
    solutions: BTreeMap<SolutionId, Solution>,
    next_id: SolutionId,
    /// Materialised sort order, `None` means insertion order.
    sort_order: Option<Vec<SolutionId>>,
    virtual_count: Option<usize>,
    /// Lazily built `variable -> bound values` sets for `contains_value`.
    value_cache: Mutex<AHashMap<Variable, AHashSet<Term>>>,
}

impl Clone for OrdinaryMultiset {
    fn clone(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            solutions: self.solutions.clone(),
            next_id: self.next_id,
            sort_order: self.sort_order.clone(),
            virtual_count: self.virtual_count,
            value_cache: Mutex::new(AHashMap::new()),
        }
    }
}

impl OrdinaryMultiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variables(variables: impl IntoIterator<Item = Variable>) -> Self {
        let mut out = Self::new();
        for v in variables {
            out.add_variable(v);
        }
        out
    }

    pub fn count(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn contains_variable(&self, variable: &Variable) -> bool {
        self.variables.contains(variable)
    }

    pub fn virtual_count(&self) -> usize {
        self.virtual_count.unwrap_or(self.solutions.len())
    }

    pub fn set_virtual_count(&mut self, count: usize) {
        self.virtual_count = Some(count);
    }

    pub fn is_sorted(&self) -> bool {
        self.sort_order.is_some()
    }

    /// Add a solution under a fresh ID, extending the variable universe with
    /// any variable it binds.
    pub fn add(&mut self, solution: Solution) -> SolutionId {
        self.next_id += 1;
        let id = self.next_id;
        for v in solution.variables() {
            if !self.variables.contains(v) {
                self.variables.push(v.clone());
            }
        }
        self.solutions.insert(id, solution.with_id(id));
        if let Some(order) = self.sort_order.as_mut() {
            order.push(id);
        }
        self.value_cache.get_mut().clear();
        id
    }

    pub fn add_variable(&mut self, variable: Variable) {
        if !self.variables.contains(&variable) {
            self.variables.push(variable);
        }
    }

    pub fn remove(&mut self, id: SolutionId) -> bool {
        let removed = self.solutions.remove(&id).is_some();
        if removed {
            if let Some(order) = self.sort_order.as_mut() {
                order.retain(|&other| other != id);
            }
            self.value_cache.get_mut().clear();
        }
        removed
    }

    /// Keep only the solutions for which `keep` holds, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&Solution) -> bool) {
        let before = self.solutions.len();
        self.solutions.retain(|_, s| keep(s));
        if self.solutions.len() != before {
            if let Some(order) = self.sort_order.as_mut() {
                order.retain(|id| self.solutions.contains_key(id));
            }
            self.value_cache.get_mut().clear();
        }
    }

    pub fn get(&self, id: SolutionId) -> Result<&Solution> {
        self.solutions
            .get(&id)
            .ok_or(MultisetError::NoSuchSolution(id))
    }

    pub fn solutions(&self) -> Box<dyn Iterator<Item = &Solution> + '_> {
        match &self.sort_order {
            Some(order) => Box::new(order.iter().filter_map(|id| self.solutions.get(id))),
            None => Box::new(self.solutions.values()),
        }
    }

    pub fn ids(&self) -> Vec<SolutionId> {
        match &self.sort_order {
            Some(order) => order.clone(),
            None => self.solutions.keys().copied().collect(),
        }
    }

    /// Stable sort; the resulting order is what `solutions()` enumerates.
    pub fn sort_by(&mut self, mut compare: impl FnMut(&Solution, &Solution) -> Ordering) {
        let mut ids = self.ids();
        ids.sort_by(|a, b| match (self.solutions.get(a), self.solutions.get(b)) {
            (Some(x), Some(y)) => compare(x, y),
            _ => Ordering::Equal,
        });
        self.sort_order = Some(ids);
    }

    pub fn set_variable_order(&mut self, order: &[Variable]) -> Result<()> {
        self.variables = validate_variable_order(&self.variables, order)?;
        Ok(())
    }

    /// Remove every temporary (`_:`) variable.
    pub fn trim(&mut self) {
        if !self.variables.iter().any(Variable::is_temporary) {
            return;
        }
        self.variables.retain(|v| !v.is_temporary());
        for s in self.solutions.values_mut() {
            s.retain_variables(|v| !v.is_temporary());
        }
        self.value_cache.get_mut().clear();
    }

    pub fn trim_variable(&mut self, variable: &Variable) {
        self.variables.retain(|v| v != variable);
        for s in self.solutions.values_mut() {
            s.remove(variable);
        }
        self.value_cache.get_mut().remove(variable);
    }

    pub fn contains_value(&self, variable: &Variable, value: &Term) -> bool {
        if !self.contains_variable(variable) {
            return false;
        }
        let mut cache = self.value_cache.lock();
        cache
            .entry(variable.clone())
            .or_insert_with(|| {
                self.solutions
                    .values()
                    .filter_map(|s| s.get(variable).cloned())
                    .collect()
            })
            .contains(value)
    }

    pub fn into_solutions(mut self) -> Vec<Solution> {
        match self.sort_order.take() {
            Some(order) => order
                .into_iter()
                .filter_map(|id| self.solutions.remove(&id))
                .collect(),
            None => self.solutions.into_values().collect(),
        }
    }
}
