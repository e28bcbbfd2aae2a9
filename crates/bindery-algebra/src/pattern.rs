//! Triple patterns: the leaves matched by the graph source.

use std::fmt;

use bindery_core::{Solution, Term, Variable};
use serde::{Deserialize, Serialize};

/// A pattern position: either a variable or a concrete term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternItem {
    Variable(Variable),
    Term(Term),
}

impl PatternItem {
    pub fn var(name: &str) -> Self {
        PatternItem::Variable(Variable::new(name))
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            PatternItem::Variable(v) => Some(v),
            PatternItem::Term(_) => None,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            PatternItem::Term(t) => Some(t),
            PatternItem::Variable(_) => None,
        }
    }

    /// Replace a variable by its value in `solution`, if bound.
    pub fn bind(&self, solution: &Solution) -> PatternItem {
        match self {
            PatternItem::Variable(v) => match solution.get(v) {
                Some(t) => PatternItem::Term(t.clone()),
                None => self.clone(),
            },
            PatternItem::Term(_) => self.clone(),
        }
    }

    /// Term this position takes under `solution`, if any.
    pub fn resolve<'a>(&'a self, solution: &'a Solution) -> Option<&'a Term> {
        match self {
            PatternItem::Variable(v) => solution.get(v),
            PatternItem::Term(t) => Some(t),
        }
    }
}

impl From<Term> for PatternItem {
    fn from(value: Term) -> Self {
        PatternItem::Term(value)
    }
}

impl From<Variable> for PatternItem {
    fn from(value: Variable) -> Self {
        PatternItem::Variable(value)
    }
}

impl fmt::Display for PatternItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternItem::Variable(v) => write!(f, "{v}"),
            PatternItem::Term(t) => write!(f, "{t}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: PatternItem,
    pub predicate: PatternItem,
    pub object: PatternItem,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<PatternItem>,
        predicate: impl Into<PatternItem>,
        object: impl Into<PatternItem>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    fn items(&self) -> [&PatternItem; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    /// Distinct variables in subject, predicate, object order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out: Vec<Variable> = Vec::new();
        for v in self.items().into_iter().filter_map(PatternItem::as_variable) {
            if !out.contains(v) {
                out.push(v.clone());
            }
        }
        out
    }

    pub fn is_ground(&self) -> bool {
        self.items().iter().all(|i| i.as_term().is_some())
    }

    /// Substitute the variables bound in `solution`.
    pub fn bind(&self, solution: &Solution) -> TriplePattern {
        TriplePattern {
            subject: self.subject.bind(solution),
            predicate: self.predicate.bind(solution),
            object: self.object.bind(solution),
        }
    }

    /// Bindings produced by matching this pattern against one triple, or
    /// `None` when a constant differs or a repeated variable disagrees.
    pub fn match_triple(&self, subject: &Term, predicate: &Term, object: &Term) -> Option<Solution> {
        let mut out = Solution::new();
        for (item, value) in self.items().into_iter().zip([subject, predicate, object]) {
            match item {
                PatternItem::Term(t) => {
                    if t != value {
                        return None;
                    }
                }
                PatternItem::Variable(v) => match out.get(v) {
                    Some(existing) if existing != value => return None,
                    Some(_) => {}
                    None => {
                        out.add(v.clone(), value.clone());
                    }
                },
            }
        }
        Some(out)
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}
