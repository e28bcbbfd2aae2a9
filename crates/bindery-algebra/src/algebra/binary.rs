//! Binary operators: joins, unions, difference and the fused filtered product.

use bindery_core::Variable;
use serde::{Deserialize, Serialize};

use super::{intersection, union, Algebra};
use crate::expression::Expression;
use crate::optimise::Optimiser;

/// `transform`, `transform_lhs` and `transform_rhs` in terms of the node's
/// own `rebuild(lhs, rhs, optimiser)`.
macro_rules! binary_transforms {
    ($($node:ty),* $(,)?) => {
        $(
            impl $node {
                pub fn transform(&self, optimiser: &dyn Optimiser) -> Self {
                    self.rebuild(
                        optimiser.optimise(&self.lhs),
                        optimiser.optimise(&self.rhs),
                        optimiser,
                    )
                }

                pub fn transform_lhs(&self, optimiser: &dyn Optimiser) -> Self {
                    self.rebuild(optimiser.optimise(&self.lhs), (*self.rhs).clone(), optimiser)
                }

                pub fn transform_rhs(&self, optimiser: &dyn Optimiser) -> Self {
                    self.rebuild((*self.lhs).clone(), optimiser.optimise(&self.rhs), optimiser)
                }
            }
        )*
    };
}

binary_transforms!(Join, LeftJoin, Union, AskUnion, LazyUnion, Minus, ExistsJoin, FilteredProduct);

fn both(lhs: &Algebra, rhs: &Algebra) -> Vec<Variable> {
    union(lhs.variables(), rhs.variables())
}

// ============================================================================
// Joins
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
}

impl Join {
    pub fn new(lhs: Algebra, rhs: Algebra) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        union(self.lhs.fixed_variables(), self.rhs.fixed_variables())
    }
}

/// OPTIONAL: every left solution survives, extended by the approved right
/// matches. `filter: None` approves every compatible match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeftJoin {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
    #[serde(default)]
    pub filter: Option<Expression>,
}

impl LeftJoin {
    pub fn new(lhs: Algebra, rhs: Algebra, filter: Option<Expression>) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            filter,
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, optimiser: &dyn Optimiser) -> Self {
        let filter = self
            .filter
            .as_ref()
            .map(|f| optimiser.transform_expression(f));
        Self::new(lhs, rhs, filter)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.lhs.fixed_variables()
    }

    /// Left results may seed the right operand only when no variable the
    /// right side might leave unbound is also produced on the left.
    pub fn can_flow_results_to_rhs(&self) -> bool {
        intersection(self.rhs.floating_variables(), &self.lhs.variables()).is_empty()
    }
}

/// Keeps the left solutions that have (`must_exist`) or lack a compatible
/// right solution; backs FILTER EXISTS / NOT EXISTS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsJoin {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
    pub must_exist: bool,
}

impl ExistsJoin {
    pub fn new(lhs: Algebra, rhs: Algebra, must_exist: bool) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            must_exist,
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs, self.must_exist)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.lhs.fixed_variables()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minus {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
}

impl Minus {
    pub fn new(lhs: Algebra, rhs: Algebra) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.lhs.fixed_variables()
    }
}

/// Cartesian product of two variable-disjoint operands fused with the filter
/// that follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredProduct {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
    pub filter: Expression,
}

impl FilteredProduct {
    pub fn new(lhs: Algebra, rhs: Algebra, filter: Expression) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            filter,
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, optimiser: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs, optimiser.transform_expression(&self.filter))
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        union(self.lhs.fixed_variables(), self.rhs.fixed_variables())
    }
}

// ============================================================================
// Unions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
}

impl Union {
    pub fn new(lhs: Algebra, rhs: Algebra) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        intersection(self.lhs.fixed_variables(), &self.rhs.fixed_variables())
    }
}

/// Union evaluated for existence only: the right side is skipped once the
/// left produced a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskUnion {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
}

impl AskUnion {
    pub fn new(lhs: Algebra, rhs: Algebra) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        intersection(self.lhs.fixed_variables(), &self.rhs.fixed_variables())
    }
}

/// Union that skips the right side once the left reached `required_results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LazyUnion {
    pub lhs: Box<Algebra>,
    pub rhs: Box<Algebra>,
    pub required_results: usize,
}

impl LazyUnion {
    pub fn new(lhs: Algebra, rhs: Algebra, required_results: usize) -> Self {
        Self {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            required_results,
        }
    }

    fn rebuild(&self, lhs: Algebra, rhs: Algebra, _: &dyn Optimiser) -> Self {
        Self::new(lhs, rhs, self.required_results)
    }

    pub fn variables(&self) -> Vec<Variable> {
        both(&self.lhs, &self.rhs)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        intersection(self.lhs.fixed_variables(), &self.rhs.fixed_variables())
    }
}
