//! Variables and RDF terms as seen by the join engine.
//!
//! Terms are opaque values for joining (structural equality and hashing);
//! only ordering and numeric access interpret them.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

const XSD_INTEGER_FAMILY: &[&str] = &[
    XSD_INTEGER,
    "http://www.w3.org/2001/XMLSchema#int",
    "http://www.w3.org/2001/XMLSchema#long",
    "http://www.w3.org/2001/XMLSchema#short",
    "http://www.w3.org/2001/XMLSchema#byte",
    "http://www.w3.org/2001/XMLSchema#nonNegativeInteger",
    "http://www.w3.org/2001/XMLSchema#positiveInteger",
    "http://www.w3.org/2001/XMLSchema#negativeInteger",
    "http://www.w3.org/2001/XMLSchema#nonPositiveInteger",
    "http://www.w3.org/2001/XMLSchema#unsignedInt",
    "http://www.w3.org/2001/XMLSchema#unsignedLong",
];

/// Prefix marking a variable introduced during translation rather than by the user.
pub const TEMPORARY_VARIABLE_PREFIX: &str = "_:";

// ============================================================================
// Variables
// ============================================================================

/// A query variable name, stored without the leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable(Arc<str>);

impl Variable {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self(Arc::from(name.strip_prefix('?').unwrap_or(name)))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Temporary variables are dropped by `Multiset::trim`.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_VARIABLE_PREFIX)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

impl From<&str> for Variable {
    fn from(name: &str) -> Self {
        Variable::new(name)
    }
}

// ============================================================================
// Terms
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: Arc<str>,
    pub datatype: Arc<str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Iri { iri: Arc<str> },
    BlankNode { id: Arc<str> },
    Literal(Literal),
}

/// Numeric view of a literal, used by comparisons and arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Double(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Integer(i) => i as f64,
            Numeric::Double(d) => d,
        }
    }

    pub fn into_term(self) -> Term {
        match self {
            Numeric::Integer(i) => Term::integer(i),
            Numeric::Double(d) => Term::double(d),
        }
    }

    pub fn partial_cmp_numeric(self, other: Numeric) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Integer(a), Numeric::Integer(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl Term {
    pub fn iri(iri: impl AsRef<str>) -> Self {
        Term::Iri {
            iri: Arc::from(iri.as_ref()),
        }
    }

    pub fn blank(id: impl AsRef<str>) -> Self {
        Term::BlankNode {
            id: Arc::from(id.as_ref()),
        }
    }

    pub fn typed_literal(lexical: impl AsRef<str>, datatype: impl AsRef<str>) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(lexical.as_ref()),
            datatype: Arc::from(datatype.as_ref()),
            language: None,
        })
    }

    pub fn string(value: impl AsRef<str>) -> Self {
        Term::typed_literal(value, XSD_STRING)
    }

    pub fn lang_string(value: impl AsRef<str>, language: impl AsRef<str>) -> Self {
        Term::Literal(Literal {
            lexical: Arc::from(value.as_ref()),
            datatype: Arc::from(RDF_LANG_STRING),
            language: Some(Arc::from(language.as_ref().to_ascii_lowercase().as_str())),
        })
    }

    pub fn integer(value: i64) -> Self {
        Term::typed_literal(value.to_string(), XSD_INTEGER)
    }

    pub fn double(value: f64) -> Self {
        Term::typed_literal(value.to_string(), XSD_DOUBLE)
    }

    pub fn boolean(value: bool) -> Self {
        Term::typed_literal(if value { "true" } else { "false" }, XSD_BOOLEAN)
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri { .. })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode { .. })
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// Numeric value of an xsd numeric literal; `None` for anything else or
    /// an ill-typed lexical form.
    pub fn as_number(&self) -> Option<Numeric> {
        let lit = self.as_literal()?;
        let datatype = lit.datatype.as_ref();
        if XSD_INTEGER_FAMILY.contains(&datatype) {
            return lit.lexical.trim().parse::<i64>().ok().map(Numeric::Integer);
        }
        if datatype == XSD_DECIMAL || datatype == XSD_DOUBLE || datatype == XSD_FLOAT {
            return match lit.lexical.trim() {
                "INF" => Some(Numeric::Double(f64::INFINITY)),
                "-INF" => Some(Numeric::Double(f64::NEG_INFINITY)),
                "NaN" => Some(Numeric::Double(f64::NAN)),
                other => other.parse::<f64>().ok().map(Numeric::Double),
            };
        }
        None
    }

    pub fn as_boolean(&self) -> Option<bool> {
        let lit = self.as_literal()?;
        if lit.datatype.as_ref() != XSD_BOOLEAN {
            return None;
        }
        match lit.lexical.as_ref() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }

    /// Plain or language-tagged string content.
    pub fn as_str(&self) -> Option<&str> {
        let lit = self.as_literal()?;
        match lit.datatype.as_ref() {
            XSD_STRING | RDF_LANG_STRING => Some(&lit.lexical),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Term::BlankNode { .. } => 0,
            Term::Iri { .. } => 1,
            Term::Literal(_) => 2,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri { iri } => write!(f, "<{iri}>"),
            Term::BlankNode { id } => write!(f, "_:{id}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical.escape_default())?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if lit.datatype.as_ref() == XSD_STRING {
                    Ok(())
                } else {
                    write!(f, "^^<{}>", lit.datatype)
                }
            }
        }
    }
}

/// Total order used by ORDER BY: unbound first, then blank nodes, IRIs and
/// literals. Numeric literals compare by value; other literals by lexical
/// form, then datatype, then language.
pub fn compare_for_ordering(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };
    let by_kind = a.kind_rank().cmp(&b.kind_rank());
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (a, b) {
        (Term::Iri { iri: x }, Term::Iri { iri: y }) => x.cmp(y),
        (Term::BlankNode { id: x }, Term::BlankNode { id: y }) => x.cmp(y),
        (Term::Literal(x), Term::Literal(y)) => {
            if let (Some(nx), Some(ny)) = (a.as_number(), b.as_number()) {
                if let Some(ord) = nx.partial_cmp_numeric(ny) {
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
            }
            x.lexical
                .cmp(&y.lexical)
                .then_with(|| x.datatype.cmp(&y.datatype))
                .then_with(|| x.language.cmp(&y.language))
        }
        _ => Ordering::Equal,
    }
}
