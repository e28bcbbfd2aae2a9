//! The operator tree.
//!
//! Every node kind is a small struct owning its operands; [`Algebra`] is the
//! closed sum over them. Nodes are immutable: rewrites go through
//! [`Algebra::transform`], which rebuilds a node of the same kind around
//! optimised operands and keeps every node-specific parameter.
//!
//! Variable classification (`variables`, `fixed_variables`,
//! `floating_variables`) is a pure function of the tree's shape:
//!
//! - *fixed*: bound in every solution the node can produce
//! - *floating*: may be left unbound
//!
//! For most nodes `floating = variables - fixed`. Minus and ExistsJoin are the
//! exception: their right operand's variables are reported by `variables` but
//! never appear in the output, so both fixed and floating follow the left side.

mod basic;
mod binary;
mod dataset;
mod modifiers;
mod paths;

pub use basic::{AskBgp, Bgp, LazyBgp};
pub use binary::{AskUnion, ExistsJoin, FilteredProduct, Join, LazyUnion, LeftJoin, Minus, Union};
pub use dataset::{Ask, Graph, NullOperator, Service, Table};
pub use modifiers::{
    AggregateBinding, Distinct, Extend, Filter, GroupBy, GroupKey, Having, OrderBy, Reduced,
    Select, Slice, SortCondition,
};
pub use paths::{NegatedPropertySet, PathPattern};

use bindery_core::Variable;
use serde::{Deserialize, Serialize};

use crate::optimise::Optimiser;
use crate::pattern::TriplePattern;
use crate::visit::{AlgebraProcessor, AlgebraVisitor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Algebra {
    Bgp(Bgp),
    AskBgp(AskBgp),
    LazyBgp(LazyBgp),
    Join(Join),
    LeftJoin(LeftJoin),
    Union(Union),
    AskUnion(AskUnion),
    LazyUnion(LazyUnion),
    Minus(Minus),
    ExistsJoin(ExistsJoin),
    FilteredProduct(FilteredProduct),
    Filter(Filter),
    Extend(Extend),
    Select(Select),
    Distinct(Distinct),
    Reduced(Reduced),
    OrderBy(OrderBy),
    Slice(Slice),
    GroupBy(GroupBy),
    Having(Having),
    Graph(Graph),
    Service(Service),
    Table(Table),
    NullOperator(NullOperator),
    Ask(Ask),
    PropertyPath(PathPattern),
    ZeroLengthPath(PathPattern),
    ZeroOrMorePath(PathPattern),
    OneOrMorePath(PathPattern),
    NegatedPropertySet(NegatedPropertySet),
}

/// Runs `$body` with `$node` bound to the payload of whichever variant `$self` is.
macro_rules! dispatch {
    ($self:expr, $node:ident => $body:expr) => {
        match $self {
            Algebra::Bgp($node) => $body,
            Algebra::AskBgp($node) => $body,
            Algebra::LazyBgp($node) => $body,
            Algebra::Join($node) => $body,
            Algebra::LeftJoin($node) => $body,
            Algebra::Union($node) => $body,
            Algebra::AskUnion($node) => $body,
            Algebra::LazyUnion($node) => $body,
            Algebra::Minus($node) => $body,
            Algebra::ExistsJoin($node) => $body,
            Algebra::FilteredProduct($node) => $body,
            Algebra::Filter($node) => $body,
            Algebra::Extend($node) => $body,
            Algebra::Select($node) => $body,
            Algebra::Distinct($node) => $body,
            Algebra::Reduced($node) => $body,
            Algebra::OrderBy($node) => $body,
            Algebra::Slice($node) => $body,
            Algebra::GroupBy($node) => $body,
            Algebra::Having($node) => $body,
            Algebra::Graph($node) => $body,
            Algebra::Service($node) => $body,
            Algebra::Table($node) => $body,
            Algebra::NullOperator($node) => $body,
            Algebra::Ask($node) => $body,
            Algebra::PropertyPath($node) => $body,
            Algebra::ZeroLengthPath($node) => $body,
            Algebra::ZeroOrMorePath($node) => $body,
            Algebra::OneOrMorePath($node) => $body,
            Algebra::NegatedPropertySet($node) => $body,
        }
    };
}

impl Algebra {
    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Algebra::Bgp(Bgp::new(patterns))
    }

    /// `Join(lhs, rhs)`, dropping an empty-BGP operand (it is the join unit).
    pub fn join(lhs: Algebra, rhs: Algebra) -> Self {
        if lhs.is_empty_bgp() {
            return rhs;
        }
        if rhs.is_empty_bgp() {
            return lhs;
        }
        Algebra::Join(Join::new(lhs, rhs))
    }

    pub fn is_empty_bgp(&self) -> bool {
        matches!(self, Algebra::Bgp(bgp) if bgp.patterns.is_empty())
    }

    /// Node kind name as used in the textual rendering.
    pub fn name(&self) -> &'static str {
        match self {
            Algebra::Bgp(_) => "Bgp",
            Algebra::AskBgp(_) => "AskBgp",
            Algebra::LazyBgp(_) => "LazyBgp",
            Algebra::Join(_) => "Join",
            Algebra::LeftJoin(_) => "LeftJoin",
            Algebra::Union(_) => "Union",
            Algebra::AskUnion(_) => "AskUnion",
            Algebra::LazyUnion(_) => "LazyUnion",
            Algebra::Minus(_) => "Minus",
            Algebra::ExistsJoin(_) => "ExistsJoin",
            Algebra::FilteredProduct(_) => "FilteredProduct",
            Algebra::Filter(_) => "Filter",
            Algebra::Extend(_) => "Extend",
            Algebra::Select(_) => "Select",
            Algebra::Distinct(_) => "Distinct",
            Algebra::Reduced(_) => "Reduced",
            Algebra::OrderBy(_) => "OrderBy",
            Algebra::Slice(_) => "Slice",
            Algebra::GroupBy(_) => "GroupBy",
            Algebra::Having(_) => "Having",
            Algebra::Graph(_) => "Graph",
            Algebra::Service(_) => "Service",
            Algebra::Table(_) => "Table",
            Algebra::NullOperator(_) => "NullOperator",
            Algebra::Ask(_) => "Ask",
            Algebra::PropertyPath(_) => "PropertyPath",
            Algebra::ZeroLengthPath(_) => "ZeroLengthPath",
            Algebra::ZeroOrMorePath(_) => "ZeroOrMorePath",
            Algebra::OneOrMorePath(_) => "OneOrMorePath",
            Algebra::NegatedPropertySet(_) => "NegatedPropertySet",
        }
    }

    // ========================================================================
    // Variable classification
    // ========================================================================

    /// Every variable the node touches, in first-occurrence order.
    pub fn variables(&self) -> Vec<Variable> {
        dispatch!(self, node => node.variables())
    }

    pub fn fixed_variables(&self) -> Vec<Variable> {
        dispatch!(self, node => node.fixed_variables())
    }

    pub fn floating_variables(&self) -> Vec<Variable> {
        match self {
            Algebra::Minus(node) => node.lhs.floating_variables(),
            Algebra::ExistsJoin(node) => node.lhs.floating_variables(),
            _ => difference(self.variables(), &self.fixed_variables()),
        }
    }

    // ========================================================================
    // Transform
    // ========================================================================

    /// A node of the same kind whose operands are `optimiser`'s rewrite of
    /// this node's operands. Leaves are returned unchanged.
    pub fn transform(&self, optimiser: &dyn Optimiser) -> Algebra {
        match self {
            Algebra::Join(n) => n.transform(optimiser).into(),
            Algebra::LeftJoin(n) => n.transform(optimiser).into(),
            Algebra::Union(n) => n.transform(optimiser).into(),
            Algebra::AskUnion(n) => n.transform(optimiser).into(),
            Algebra::LazyUnion(n) => n.transform(optimiser).into(),
            Algebra::Minus(n) => n.transform(optimiser).into(),
            Algebra::ExistsJoin(n) => n.transform(optimiser).into(),
            Algebra::FilteredProduct(n) => n.transform(optimiser).into(),
            Algebra::Filter(n) => n.transform(optimiser).into(),
            Algebra::Extend(n) => n.transform(optimiser).into(),
            Algebra::Select(n) => n.transform(optimiser).into(),
            Algebra::Distinct(n) => n.transform(optimiser).into(),
            Algebra::Reduced(n) => n.transform(optimiser).into(),
            Algebra::OrderBy(n) => n.transform(optimiser).into(),
            Algebra::Slice(n) => n.transform(optimiser).into(),
            Algebra::GroupBy(n) => n.transform(optimiser).into(),
            Algebra::Having(n) => n.transform(optimiser).into(),
            Algebra::Graph(n) => n.transform(optimiser).into(),
            Algebra::Service(n) => n.transform(optimiser).into(),
            Algebra::Ask(n) => n.transform(optimiser).into(),
            Algebra::Bgp(_)
            | Algebra::AskBgp(_)
            | Algebra::LazyBgp(_)
            | Algebra::Table(_)
            | Algebra::NullOperator(_)
            | Algebra::PropertyPath(_)
            | Algebra::ZeroLengthPath(_)
            | Algebra::ZeroOrMorePath(_)
            | Algebra::OneOrMorePath(_)
            | Algebra::NegatedPropertySet(_) => self.clone(),
        }
    }

    /// Like [`transform`](Self::transform) but only rewrites the left operand
    /// of a binary node. Other nodes transform as usual.
    pub fn transform_lhs(&self, optimiser: &dyn Optimiser) -> Algebra {
        match self {
            Algebra::Join(n) => n.transform_lhs(optimiser).into(),
            Algebra::LeftJoin(n) => n.transform_lhs(optimiser).into(),
            Algebra::Union(n) => n.transform_lhs(optimiser).into(),
            Algebra::AskUnion(n) => n.transform_lhs(optimiser).into(),
            Algebra::LazyUnion(n) => n.transform_lhs(optimiser).into(),
            Algebra::Minus(n) => n.transform_lhs(optimiser).into(),
            Algebra::ExistsJoin(n) => n.transform_lhs(optimiser).into(),
            Algebra::FilteredProduct(n) => n.transform_lhs(optimiser).into(),
            other => other.transform(optimiser),
        }
    }

    pub fn transform_rhs(&self, optimiser: &dyn Optimiser) -> Algebra {
        match self {
            Algebra::Join(n) => n.transform_rhs(optimiser).into(),
            Algebra::LeftJoin(n) => n.transform_rhs(optimiser).into(),
            Algebra::Union(n) => n.transform_rhs(optimiser).into(),
            Algebra::AskUnion(n) => n.transform_rhs(optimiser).into(),
            Algebra::LazyUnion(n) => n.transform_rhs(optimiser).into(),
            Algebra::Minus(n) => n.transform_rhs(optimiser).into(),
            Algebra::ExistsJoin(n) => n.transform_rhs(optimiser).into(),
            Algebra::FilteredProduct(n) => n.transform_rhs(optimiser).into(),
            other => other.transform(optimiser),
        }
    }

    // ========================================================================
    // Double dispatch
    // ========================================================================

    pub fn accept_visitor<V: AlgebraVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Algebra::Bgp(n) => visitor.visit_bgp(n),
            Algebra::AskBgp(n) => visitor.visit_ask_bgp(n),
            Algebra::LazyBgp(n) => visitor.visit_lazy_bgp(n),
            Algebra::Join(n) => visitor.visit_join(n),
            Algebra::LeftJoin(n) => visitor.visit_left_join(n),
            Algebra::Union(n) => visitor.visit_union(n),
            Algebra::AskUnion(n) => visitor.visit_ask_union(n),
            Algebra::LazyUnion(n) => visitor.visit_lazy_union(n),
            Algebra::Minus(n) => visitor.visit_minus(n),
            Algebra::ExistsJoin(n) => visitor.visit_exists_join(n),
            Algebra::FilteredProduct(n) => visitor.visit_filtered_product(n),
            Algebra::Filter(n) => visitor.visit_filter(n),
            Algebra::Extend(n) => visitor.visit_extend(n),
            Algebra::Select(n) => visitor.visit_select(n),
            Algebra::Distinct(n) => visitor.visit_distinct(n),
            Algebra::Reduced(n) => visitor.visit_reduced(n),
            Algebra::OrderBy(n) => visitor.visit_order_by(n),
            Algebra::Slice(n) => visitor.visit_slice(n),
            Algebra::GroupBy(n) => visitor.visit_group_by(n),
            Algebra::Having(n) => visitor.visit_having(n),
            Algebra::Graph(n) => visitor.visit_graph(n),
            Algebra::Service(n) => visitor.visit_service(n),
            Algebra::Table(n) => visitor.visit_table(n),
            Algebra::NullOperator(n) => visitor.visit_null_operator(n),
            Algebra::Ask(n) => visitor.visit_ask(n),
            Algebra::PropertyPath(n) => visitor.visit_property_path(n),
            Algebra::ZeroLengthPath(n) => visitor.visit_zero_length_path(n),
            Algebra::ZeroOrMorePath(n) => visitor.visit_zero_or_more_path(n),
            Algebra::OneOrMorePath(n) => visitor.visit_one_or_more_path(n),
            Algebra::NegatedPropertySet(n) => visitor.visit_negated_property_set(n),
        }
    }

    pub fn accept<P: AlgebraProcessor + ?Sized>(
        &self,
        processor: &P,
        context: &mut P::Context,
    ) -> P::Output {
        match self {
            Algebra::Bgp(n) => processor.process_bgp(n, context),
            Algebra::AskBgp(n) => processor.process_ask_bgp(n, context),
            Algebra::LazyBgp(n) => processor.process_lazy_bgp(n, context),
            Algebra::Join(n) => processor.process_join(n, context),
            Algebra::LeftJoin(n) => processor.process_left_join(n, context),
            Algebra::Union(n) => processor.process_union(n, context),
            Algebra::AskUnion(n) => processor.process_ask_union(n, context),
            Algebra::LazyUnion(n) => processor.process_lazy_union(n, context),
            Algebra::Minus(n) => processor.process_minus(n, context),
            Algebra::ExistsJoin(n) => processor.process_exists_join(n, context),
            Algebra::FilteredProduct(n) => processor.process_filtered_product(n, context),
            Algebra::Filter(n) => processor.process_filter(n, context),
            Algebra::Extend(n) => processor.process_extend(n, context),
            Algebra::Select(n) => processor.process_select(n, context),
            Algebra::Distinct(n) => processor.process_distinct(n, context),
            Algebra::Reduced(n) => processor.process_reduced(n, context),
            Algebra::OrderBy(n) => processor.process_order_by(n, context),
            Algebra::Slice(n) => processor.process_slice(n, context),
            Algebra::GroupBy(n) => processor.process_group_by(n, context),
            Algebra::Having(n) => processor.process_having(n, context),
            Algebra::Graph(n) => processor.process_graph(n, context),
            Algebra::Service(n) => processor.process_service(n, context),
            Algebra::Table(n) => processor.process_table(n, context),
            Algebra::NullOperator(n) => processor.process_null_operator(n, context),
            Algebra::Ask(n) => processor.process_ask(n, context),
            Algebra::PropertyPath(n) => processor.process_property_path(n, context),
            Algebra::ZeroLengthPath(n) => processor.process_zero_length_path(n, context),
            Algebra::ZeroOrMorePath(n) => processor.process_zero_or_more_path(n, context),
            Algebra::OneOrMorePath(n) => processor.process_one_or_more_path(n, context),
            Algebra::NegatedPropertySet(n) => processor.process_negated_property_set(n, context),
        }
    }
}

/// Payload types convert back into the node kind they came from. Path
/// patterns are shared by four kinds and convert explicitly.
macro_rules! impl_into_algebra {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Algebra {
                fn from(node: $variant) -> Self {
                    Algebra::$variant(node)
                }
            }
        )*
    };
}

impl_into_algebra!(
    Bgp,
    AskBgp,
    LazyBgp,
    Join,
    LeftJoin,
    Union,
    AskUnion,
    LazyUnion,
    Minus,
    ExistsJoin,
    FilteredProduct,
    Filter,
    Extend,
    Select,
    Distinct,
    Reduced,
    OrderBy,
    Slice,
    GroupBy,
    Having,
    Graph,
    Service,
    Table,
    NullOperator,
    Ask,
    NegatedPropertySet,
);

// ============================================================================
// Variable-list helpers
// ============================================================================

/// `a ∪ b`, keeping `a`'s order and appending new names from `b`.
pub(crate) fn union(mut a: Vec<Variable>, b: impl IntoIterator<Item = Variable>) -> Vec<Variable> {
    for v in b {
        if !a.contains(&v) {
            a.push(v);
        }
    }
    a
}

pub(crate) fn intersection(a: Vec<Variable>, b: &[Variable]) -> Vec<Variable> {
    a.into_iter().filter(|v| b.contains(v)).collect()
}

pub(crate) fn difference(a: Vec<Variable>, b: &[Variable]) -> Vec<Variable> {
    a.into_iter().filter(|v| !b.contains(v)).collect()
}

#[cfg(test)]
mod tests;
