//! Pre-sharded multiset for lock-free parallel writers.
//!
//! The ID space is cut into `partitions` contiguous ranges of `partition_size`
//! IDs; `id / partition_size` selects the shard. Each worker takes exclusive
//! (`&mut`) ownership of one [`Partition`] before writing, so no cross-shard
//! synchronisation exists or is needed.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{MultisetError, Result};
use crate::solution::{Solution, SolutionId};
use crate::term::{Term, Variable};

use super::validate_variable_order;

/// One shard: the half-open ID range `[base, base + capacity)`.
#[derive(Debug, Clone)]
pub struct Partition {
    base: SolutionId,
    capacity: usize,
    next_offset: usize,
    solutions: BTreeMap<SolutionId, Solution>,
}

impl Partition {
    fn new(index: usize, capacity: usize) -> Self {
        Self {
            base: (index as SolutionId) * (capacity as SolutionId),
            capacity,
            next_offset: 0,
            solutions: BTreeMap::new(),
        }
    }

    /// Append under the next unused ID of this shard.
    pub fn push(&mut self, solution: Solution) -> Result<SolutionId> {
        if self.next_offset >= self.capacity {
            return Err(MultisetError::PartitionOutOfRange {
                id: self.base + self.next_offset as SolutionId,
                partitions: 1,
                partition_size: self.capacity,
            });
        }
        let id = self.base + self.next_offset as SolutionId;
        self.next_offset += 1;
        self.solutions.insert(id, solution.with_id(id));
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.values()
    }
}

#[derive(Debug, Clone)]
pub struct PartitionedMultiset {
    partitions: Vec<Partition>,
    partition_size: usize,
    variables: Vec<Variable>,
    sort_order: Option<Vec<SolutionId>>,
    virtual_count: Option<usize>,
}

impl PartitionedMultiset {
    pub fn new(partitions: usize, partition_size: usize) -> Self {
        let partition_size = partition_size.max(1);
        Self {
            partitions: (0..partitions)
                .map(|i| Partition::new(i, partition_size))
                .collect(),
            partition_size,
            variables: Vec::new(),
            sort_order: None,
            virtual_count: None,
        }
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_size(&self) -> usize {
        self.partition_size
    }

    /// Disjoint mutable shards, one per writer.
    pub fn partitions_mut(&mut self) -> &mut [Partition] {
        self.sort_order = None;
        &mut self.partitions
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    fn locate(&self, id: SolutionId) -> Result<usize> {
        let index = (id / self.partition_size as SolutionId) as usize;
        if index >= self.partitions.len() {
            return Err(MultisetError::PartitionOutOfRange {
                id,
                partitions: self.partitions.len(),
                partition_size: self.partition_size,
            });
        }
        Ok(index)
    }

    /// Place a solution at an explicit, partition-relative ID.
    pub fn insert_with_id(&mut self, id: SolutionId, solution: Solution) -> Result<()> {
        let index = self.locate(id)?;
        let partition = &mut self.partitions[index];
        if partition.solutions.contains_key(&id) {
            return Err(MultisetError::DuplicateSolutionId(id));
        }
        for v in solution.variables() {
            if !self.variables.contains(v) {
                self.variables.push(v.clone());
            }
        }
        partition.solutions.insert(id, solution.with_id(id));
        let offset = (id - partition.base) as usize + 1;
        partition.next_offset = partition.next_offset.max(offset);
        if let Some(order) = self.sort_order.as_mut() {
            order.push(id);
        }
        Ok(())
    }

    pub fn add_variable(&mut self, variable: Variable) {
        if !self.variables.contains(&variable) {
            self.variables.push(variable);
        }
    }

    /// Re-derive the variable universe from the stored solutions, keeping
    /// already-declared variables first.
    pub fn collect_variables(&mut self) {
        for partition in &self.partitions {
            for s in partition.solutions.values() {
                for v in s.variables() {
                    if !self.variables.contains(v) {
                        self.variables.push(v.clone());
                    }
                }
            }
        }
    }

    pub fn count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Partition::is_empty)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn contains_variable(&self, variable: &Variable) -> bool {
        self.variables.contains(variable)
    }

    pub fn contains_value(&self, variable: &Variable, value: &Term) -> bool {
        self.solutions().any(|s| s.get(variable) == Some(value))
    }

    pub fn virtual_count(&self) -> usize {
        self.virtual_count.unwrap_or_else(|| self.count())
    }

    pub fn set_virtual_count(&mut self, count: usize) {
        self.virtual_count = Some(count);
    }

    pub fn get(&self, id: SolutionId) -> Result<&Solution> {
        let index = self
            .locate(id)
            .map_err(|_| MultisetError::NoSuchSolution(id))?;
        self.partitions[index]
            .solutions
            .get(&id)
            .ok_or(MultisetError::NoSuchSolution(id))
    }

    pub fn remove(&mut self, id: SolutionId) -> bool {
        let Ok(index) = self.locate(id) else {
            return false;
        };
        let removed = self.partitions[index].solutions.remove(&id).is_some();
        if removed {
            if let Some(order) = self.sort_order.as_mut() {
                order.retain(|&other| other != id);
            }
        }
        removed
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Solution) -> bool) {
        for partition in &mut self.partitions {
            partition.solutions.retain(|_, s| keep(s));
        }
        if let Some(order) = self.sort_order.as_mut() {
            let partitions = &self.partitions;
            let size = self.partition_size as SolutionId;
            order.retain(|id| {
                partitions
                    .get((id / size) as usize)
                    .is_some_and(|p| p.solutions.contains_key(id))
            });
        }
    }

    pub fn solutions(&self) -> Box<dyn Iterator<Item = &Solution> + '_> {
        match &self.sort_order {
            Some(order) => Box::new(order.iter().filter_map(|&id| self.get(id).ok())),
            None => Box::new(self.partitions.iter().flat_map(Partition::solutions)),
        }
    }

    pub fn ids(&self) -> Vec<SolutionId> {
        match &self.sort_order {
            Some(order) => order.clone(),
            None => self.solutions().map(Solution::id).collect(),
        }
    }

    pub fn sort_by(&mut self, mut compare: impl FnMut(&Solution, &Solution) -> Ordering) {
        let mut ids = self.ids();
        ids.sort_by(|&a, &b| match (self.get(a), self.get(b)) {
            (Ok(x), Ok(y)) => compare(x, y),
            _ => Ordering::Equal,
        });
        self.sort_order = Some(ids);
    }

    pub fn set_variable_order(&mut self, order: &[Variable]) -> Result<()> {
        self.variables = validate_variable_order(&self.variables, order)?;
        Ok(())
    }

    pub fn trim(&mut self) {
        self.variables.retain(|v| !v.is_temporary());
        for partition in &mut self.partitions {
            for s in partition.solutions.values_mut() {
                s.retain_variables(|v| !v.is_temporary());
            }
        }
    }

    pub fn trim_variable(&mut self, variable: &Variable) {
        self.variables.retain(|v| v != variable);
        for partition in &mut self.partitions {
            for s in partition.solutions.values_mut() {
                s.remove(variable);
            }
        }
    }

    /// Enumeration-ordered solutions, consuming the shards.
    pub fn into_solutions(self) -> Vec<Solution> {
        match self.sort_order {
            Some(order) => {
                let mut partitions = self.partitions;
                let size = self.partition_size as SolutionId;
                order
                    .into_iter()
                    .filter_map(|id| {
                        partitions
                            .get_mut((id / size) as usize)
                            .and_then(|p| p.solutions.remove(&id))
                    })
                    .collect()
            }
            None => self
                .partitions
                .into_iter()
                .flat_map(|p| p.solutions.into_values())
                .collect(),
        }
    }
}
