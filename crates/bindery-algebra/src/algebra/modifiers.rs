//! Unary operators over a single inner pattern: filtering, assignment,
//! projection, duplicate removal, ordering, slicing and grouping.

use bindery_core::Variable;
use serde::{Deserialize, Serialize};

use super::{intersection, union, Algebra};
use crate::aggregate::Aggregate;
use crate::expression::Expression;
use crate::optimise::Optimiser;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub inner: Box<Algebra>,
    pub expression: Expression,
}

impl Filter {
    pub fn new(inner: Algebra, expression: Expression) -> Self {
        Self {
            inner: Box::new(inner),
            expression,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(
            optimiser.optimise(&self.inner),
            optimiser.transform_expression(&self.expression),
        )
    }
}

/// BIND: assigns `expression` to `variable`; an evaluation error leaves it
/// unbound, so the assigned variable is always floating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extend {
    pub inner: Box<Algebra>,
    pub variable: Variable,
    pub expression: Expression,
}

impl Extend {
    pub fn new(inner: Algebra, variable: Variable, expression: Expression) -> Self {
        Self {
            inner: Box::new(inner),
            variable,
            expression,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        union(self.inner.variables(), [self.variable.clone()])
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner
            .fixed_variables()
            .into_iter()
            .filter(|v| v != &self.variable)
            .collect()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(
            optimiser.optimise(&self.inner),
            self.variable.clone(),
            optimiser.transform_expression(&self.expression),
        )
    }
}

/// Projection. `variables: None` is `SELECT *`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub inner: Box<Algebra>,
    #[serde(default)]
    pub variables: Option<Vec<Variable>>,
}

impl Select {
    pub fn new(inner: Algebra, variables: Vec<Variable>) -> Self {
        Self {
            inner: Box::new(inner),
            variables: Some(variables),
        }
    }

    pub fn all(inner: Algebra) -> Self {
        Self {
            inner: Box::new(inner),
            variables: None,
        }
    }

    pub fn is_select_all(&self) -> bool {
        self.variables.is_none()
    }

    /// Projected variables in output order.
    pub fn projection(&self) -> Vec<Variable> {
        match &self.variables {
            Some(vars) => union(Vec::new(), vars.iter().cloned()),
            None => self
                .inner
                .variables()
                .into_iter()
                .filter(|v| !v.is_temporary())
                .collect(),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.projection()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        intersection(self.inner.fixed_variables(), &self.projection())
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self {
            inner: Box::new(optimiser.optimise(&self.inner)),
            variables: self.variables.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distinct {
    pub inner: Box<Algebra>,
}

impl Distinct {
    pub fn new(inner: Algebra) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(optimiser.optimise(&self.inner))
    }
}

/// Permits, but does not require, duplicate elimination; evaluated by
/// dropping adjacent duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reduced {
    pub inner: Box<Algebra>,
}

impl Reduced {
    pub fn new(inner: Algebra) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(optimiser.optimise(&self.inner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortCondition {
    pub expression: Expression,
    #[serde(default)]
    pub descending: bool,
}

impl SortCondition {
    pub fn ascending(expression: Expression) -> Self {
        Self {
            expression,
            descending: false,
        }
    }

    pub fn descending(expression: Expression) -> Self {
        Self {
            expression,
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub inner: Box<Algebra>,
    pub conditions: Vec<SortCondition>,
}

impl OrderBy {
    pub fn new(inner: Algebra, conditions: Vec<SortCondition>) -> Self {
        Self {
            inner: Box::new(inner),
            conditions,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        let conditions = self
            .conditions
            .iter()
            .map(|c| SortCondition {
                expression: optimiser.transform_expression(&c.expression),
                descending: c.descending,
            })
            .collect();
        Self::new(optimiser.optimise(&self.inner), conditions)
    }
}

/// LIMIT/OFFSET. `limit: None` means no limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub inner: Box<Algebra>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl Slice {
    pub fn new(inner: Algebra, limit: Option<usize>, offset: usize) -> Self {
        Self {
            inner: Box::new(inner),
            limit,
            offset,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(optimiser.optimise(&self.inner), self.limit, self.offset)
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// One GROUP BY key, optionally assigned to a variable (`GROUP BY (expr AS ?v)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupKey {
    pub expression: Expression,
    #[serde(default)]
    pub variable: Option<Variable>,
}

impl GroupKey {
    pub fn variable(name: &str) -> Self {
        Self {
            expression: Expression::var(name),
            variable: None,
        }
    }

    pub fn assigned(expression: Expression, variable: Variable) -> Self {
        Self {
            expression,
            variable: Some(variable),
        }
    }

    /// Variable the key value is bound to in each group solution, if any.
    pub fn output_variable(&self) -> Option<&Variable> {
        match (&self.variable, &self.expression) {
            (Some(v), _) => Some(v),
            (None, Expression::Variable(v)) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBinding {
    pub variable: Variable,
    pub aggregate: Aggregate,
}

impl AggregateBinding {
    pub fn new(variable: Variable, aggregate: Aggregate) -> Self {
        Self {
            variable,
            aggregate,
        }
    }
}

/// GROUP BY with its aggregates. No keys and at least one aggregate means one
/// implicit group over the whole input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    pub inner: Box<Algebra>,
    pub keys: Vec<GroupKey>,
    #[serde(default)]
    pub aggregates: Vec<AggregateBinding>,
}

impl GroupBy {
    pub fn new(inner: Algebra, keys: Vec<GroupKey>, aggregates: Vec<AggregateBinding>) -> Self {
        Self {
            inner: Box::new(inner),
            keys,
            aggregates,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        let keys = self.keys.iter().filter_map(GroupKey::output_variable).cloned();
        let aggregates = self.aggregates.iter().map(|a| a.variable.clone());
        union(union(Vec::new(), keys), aggregates)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        let inner_fixed = self.inner.fixed_variables();
        self.keys
            .iter()
            .filter_map(|key| match (&key.expression, key.output_variable()) {
                (Expression::Variable(source), Some(out)) if inner_fixed.contains(source) => {
                    Some(out.clone())
                }
                _ => None,
            })
            .fold(Vec::new(), |acc, v| union(acc, [v]))
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(
            optimiser.optimise(&self.inner),
            self.keys.clone(),
            self.aggregates.clone(),
        )
    }
}

/// HAVING: a filter over group solutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having {
    pub inner: Box<Algebra>,
    pub expression: Expression,
}

impl Having {
    pub fn new(inner: Algebra, expression: Expression) -> Self {
        Self {
            inner: Box::new(inner),
            expression,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        self.inner.variables()
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.inner.fixed_variables()
    }

    pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
        Self::new(
            optimiser.optimise(&self.inner),
            optimiser.transform_expression(&self.expression),
        )
    }
}
