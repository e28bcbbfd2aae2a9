//! # bindery-core
//!
//! Solutions, multisets and the join engine behind graph-query algebra evaluation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Multiset  = Identity | Null | Ordinary | Partitioned         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  join · left_join · exists_join · minus_join                  │  hash-partitioned,
//! │  product · product_with_timeout · filtered_product            │  rayon-parallel
//! │  union · merge · filter                                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Solution (id + variable → term bindings)                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Key ideas:
//! - **Absorbing forms first**: Identity/Null/empty operands short-circuit
//!   before any index is built.
//! - **Roaring candidate sets**: the per-variable join index maps values to
//!   `RoaringTreemap`s of solution IDs; probing intersects them.
//! - **Lock-free parallel writes**: products write into a
//!   [`PartitionedMultiset`] whose shards are handed out as disjoint `&mut`.
//! - **Explicit options**: parallelism is driven by [`EvaluationOptions`]
//!   passed into every call.

pub mod error;
pub mod join;
pub mod multiset;
pub mod options;
pub mod product;
pub mod solution;
pub mod stop;
pub mod term;

pub use error::{MultisetError, PredicateError, Result};
pub use join::SolutionPredicate;
pub use multiset::{Multiset, OrdinaryMultiset, Partition, PartitionedMultiset};
pub use options::EvaluationOptions;
pub use solution::{Solution, SolutionId};
pub use stop::StopToken;
pub use term::{compare_for_ordering, Literal, Numeric, Term, Variable};

#[cfg(test)]
mod tests;
