//! Errors raised by multiset storage and the join engine.
//!
//! Every variant here is a structural misuse (an optimiser or evaluator bug),
//! so callers should treat them as fatal to the current evaluation.

use thiserror::Error;

use crate::solution::SolutionId;

pub type Result<T> = std::result::Result<T, MultisetError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MultisetError {
    #[error("cannot {operation} the identity multiset")]
    IdentityMutation { operation: &'static str },

    #[error("cannot {operation} the null multiset")]
    NullMutation { operation: &'static str },

    #[error("a solution with id {0} does not exist in this multiset")]
    NoSuchSolution(SolutionId),

    #[error("variable ordering is incomplete, missing: {}", missing.join(", "))]
    IncompleteVariableOrder { missing: Vec<String> },

    #[error("variable ordering names `{0}` which is not a variable of this multiset")]
    UnknownOrderVariable(String),

    #[error("solution id {id} is outside the {partitions}x{partition_size} partition layout")]
    PartitionOutOfRange {
        id: SolutionId,
        partitions: usize,
        partition_size: usize,
    },

    #[error("solution id {0} is already present in its partition")]
    DuplicateSolutionId(SolutionId),

    #[error("product worker failed: {0}")]
    Worker(String),
}

/// Failure while testing a candidate row against a join or filter predicate.
///
/// Always recovered locally: the candidate is treated as non-matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("predicate evaluation failed: {0}")]
pub struct PredicateError(pub String);
