//! # bindery-algebra
//!
//! The operator tree of a graph-query algebra and a reference evaluator that
//! executes it with the `bindery-core` join engine.
//!
//! ## Layers
//!
//! 1. **Tree**: [`Algebra`] and its ~30 node kinds, each reporting
//!    variables, fixed and floating variables
//! 2. **Seams**: [`Optimiser`] rewrites via `transform`, [`AlgebraVisitor`]
//!    and [`AlgebraProcessor`] give passes outside the tree a typed
//!    callback per node kind
//! 3. **Evaluation**: [`QueryEvaluator`] processes the tree over an
//!    [`EvaluationContext`], reading triples from a [`GraphSource`] and
//!    scalar values from an [`ExpressionEvaluator`]
//!
//! ```text
//! Select(Join(Bgp(?s <p> ?o), Bgp(?o <q> ?x)))
//!        │
//!        ▼ QueryEvaluator (AlgebraProcessor)
//!   Bgp → Multiset ─┐
//!   Bgp → Multiset ─┴─ Multiset::join ─ projection ─▶ context.output
//! ```

pub mod aggregate;
pub mod algebra;
pub mod context;
pub mod display;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod optimise;
pub mod path;
pub mod pattern;
pub mod source;
pub mod testing;
pub mod visit;

pub use aggregate::{Aggregate, AggregateFunction};
pub use algebra::{
    AggregateBinding, Algebra, Ask, AskBgp, AskUnion, Bgp, Distinct, ExistsJoin, Extend, Filter,
    FilteredProduct, Graph, GroupBy, GroupKey, Having, Join, LazyBgp, LazyUnion, LeftJoin, Minus,
    NegatedPropertySet, NullOperator, OrderBy, PathPattern, Reduced, Select, Service, Slice,
    SortCondition, Table, Union,
};
pub use context::EvaluationContext;
pub use display::AlgebraFormatter;
pub use error::{EvaluationError, ExpressionError, Result};
pub use evaluate::{PathEvaluator, QueryEvaluator};
pub use expression::{
    ArithmeticOp, CompareOp, CustomFunction, Expression, ExpressionEvaluator, ExpressionPredicate,
    StandardEvaluator,
};
pub use optimise::{AskRewriter, FilteredProductRewriter, LimitRewriter, Optimiser, OptimiserChain};
pub use path::Path;
pub use pattern::{PatternItem, TriplePattern};
pub use source::{GraphSource, ServiceExecutor};
pub use visit::{AlgebraProcessor, AlgebraVisitor};
