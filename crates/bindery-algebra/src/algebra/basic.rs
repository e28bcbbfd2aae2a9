//! Basic graph patterns and their early-stopping variants.

use bindery_core::Variable;
use serde::{Deserialize, Serialize};

use super::union;
use crate::pattern::TriplePattern;

fn pattern_variables(patterns: &[TriplePattern]) -> Vec<Variable> {
    patterns
        .iter()
        .fold(Vec::new(), |acc, p| union(acc, p.variables()))
}

/// A conjunction of triple patterns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bgp {
    pub patterns: Vec<TriplePattern>,
}

impl Bgp {
    pub fn new(patterns: Vec<TriplePattern>) -> Self {
        Self { patterns }
    }

    pub fn variables(&self) -> Vec<Variable> {
        pattern_variables(&self.patterns)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables()
    }
}

/// BGP evaluated only to decide existence: stops at the first solution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AskBgp {
    pub patterns: Vec<TriplePattern>,
}

impl AskBgp {
    pub fn new(patterns: Vec<TriplePattern>) -> Self {
        Self { patterns }
    }

    pub fn variables(&self) -> Vec<Variable> {
        pattern_variables(&self.patterns)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables()
    }
}

/// BGP that stops once `required_results` solutions exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LazyBgp {
    pub patterns: Vec<TriplePattern>,
    pub required_results: usize,
}

impl LazyBgp {
    pub fn new(patterns: Vec<TriplePattern>, required_results: usize) -> Self {
        Self {
            patterns,
            required_results,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        pattern_variables(&self.patterns)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables()
    }
}
