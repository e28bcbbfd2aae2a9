//! Property path expressions.

use std::fmt;

use bindery_core::Term;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "path", content = "args", rename_all = "snake_case")]
pub enum Path {
    Predicate(Term),
    Inverse(Box<Path>),
    Sequence(Box<Path>, Box<Path>),
    Alternative(Box<Path>, Box<Path>),
    ZeroOrMore(Box<Path>),
    OneOrMore(Box<Path>),
    ZeroOrOne(Box<Path>),
    /// `!(p1|...|^q1|...)`: any predicate outside `forward` edges, or any
    /// predicate outside `inverse` traversed backwards.
    NegatedSet { forward: Vec<Term>, inverse: Vec<Term> },
}

impl Path {
    pub fn predicate(iri: &str) -> Self {
        Path::Predicate(Term::iri(iri))
    }

    pub fn inverse(self) -> Self {
        Path::Inverse(Box::new(self))
    }

    pub fn then(self, next: Path) -> Self {
        Path::Sequence(Box::new(self), Box::new(next))
    }

    pub fn or(self, other: Path) -> Self {
        Path::Alternative(Box::new(self), Box::new(other))
    }

    pub fn zero_or_more(self) -> Self {
        Path::ZeroOrMore(Box::new(self))
    }

    pub fn one_or_more(self) -> Self {
        Path::OneOrMore(Box::new(self))
    }

    pub fn zero_or_one(self) -> Self {
        Path::ZeroOrOne(Box::new(self))
    }

    /// Whether the path can match without consuming an edge.
    pub fn is_nullable(&self) -> bool {
        match self {
            Path::ZeroOrMore(_) | Path::ZeroOrOne(_) => true,
            Path::Predicate(_) | Path::NegatedSet { .. } => false,
            Path::Inverse(p) | Path::OneOrMore(p) => p.is_nullable(),
            Path::Sequence(a, b) => a.is_nullable() && b.is_nullable(),
            Path::Alternative(a, b) => a.is_nullable() || b.is_nullable(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Predicate(t) => write!(f, "{t}"),
            Path::Inverse(p) => write!(f, "^({p})"),
            Path::Sequence(a, b) => write!(f, "({a} / {b})"),
            Path::Alternative(a, b) => write!(f, "({a} | {b})"),
            Path::ZeroOrMore(p) => write!(f, "({p})*"),
            Path::OneOrMore(p) => write!(f, "({p})+"),
            Path::ZeroOrOne(p) => write!(f, "({p})?"),
            Path::NegatedSet { forward, inverse } => {
                let items: Vec<String> = forward
                    .iter()
                    .map(ToString::to_string)
                    .chain(inverse.iter().map(|t| format!("^{t}")))
                    .collect();
                write!(f, "!({})", items.join(" | "))
            }
        }
    }
}
