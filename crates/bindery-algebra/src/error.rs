//! Evaluation errors.

use bindery_core::{MultisetError, Term, Variable};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvaluationError>;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Multiset(#[from] MultisetError),

    #[error("query evaluation exceeded its time budget of {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("cannot assign to {variable}: it is already bound by the inner pattern")]
    AssignmentConflict { variable: Variable },

    #[error("no service executor is configured for SERVICE {endpoint}")]
    ServiceUnavailable { endpoint: Term },

    #[error("SERVICE {endpoint} failed: {source}")]
    Service {
        endpoint: Term,
        #[source]
        source: anyhow::Error,
    },

    #[error("graph source failed: {0}")]
    Source(#[from] anyhow::Error),
}

/// Failure of a single expression evaluation. Operators recover from these
/// locally (drop the row, leave a variable unbound); they never abort a query.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("variable {0} is unbound")]
    Unbound(Variable),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{name}` expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("aggregate over an empty group")]
    EmptyGroup,

    #[error("{0}")]
    Custom(String),
}
