//! Property path operators.

use bindery_core::{Term, Variable};
use serde::{Deserialize, Serialize};

use super::union;
use crate::path::Path;
use crate::pattern::PatternItem;

/// `start path end`. Shared by `PropertyPath` (any path) and the three
/// closure kinds, where `path` is the step being repeated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPattern {
    pub start: PatternItem,
    pub path: Path,
    pub end: PatternItem,
}

impl PathPattern {
    pub fn new(start: impl Into<PatternItem>, path: Path, end: impl Into<PatternItem>) -> Self {
        Self {
            start: start.into(),
            path,
            end: end.into(),
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        endpoint_variables(&self.start, &self.end)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables()
    }
}

/// `start !(p1|...) end`, or with `inverse` the reversed edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegatedPropertySet {
    pub start: PatternItem,
    pub end: PatternItem,
    pub properties: Vec<Term>,
    #[serde(default)]
    pub inverse: bool,
}

impl NegatedPropertySet {
    pub fn new(
        start: impl Into<PatternItem>,
        end: impl Into<PatternItem>,
        properties: Vec<Term>,
        inverse: bool,
    ) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            properties,
            inverse,
        }
    }

    pub fn variables(&self) -> Vec<Variable> {
        endpoint_variables(&self.start, &self.end)
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        self.variables()
    }

    /// The equivalent path expression.
    pub fn as_path(&self) -> Path {
        if self.inverse {
            Path::NegatedSet {
                forward: Vec::new(),
                inverse: self.properties.clone(),
            }
        } else {
            Path::NegatedSet {
                forward: self.properties.clone(),
                inverse: Vec::new(),
            }
        }
    }
}

fn endpoint_variables(start: &PatternItem, end: &PatternItem) -> Vec<Variable> {
    union(
        start.as_variable().into_iter().cloned().collect(),
        end.as_variable().cloned(),
    )
}
