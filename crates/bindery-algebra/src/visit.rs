//! Double-dispatch seams for passes that live outside the tree.
//!
//! [`AlgebraVisitor`] returns a value per node kind (rendering, translation to
//! another query language). [`AlgebraProcessor`] additionally threads a
//! caller-owned context and is how evaluators plug in; see
//! [`Algebra::accept`](crate::algebra::Algebra::accept).

use crate::algebra::{
    Ask, AskBgp, AskUnion, Bgp, Distinct, ExistsJoin, Extend, Filter, FilteredProduct, Graph,
    GroupBy, Having, Join, LazyBgp, LazyUnion, LeftJoin, Minus, NegatedPropertySet, NullOperator,
    OrderBy, PathPattern, Reduced, Select, Service, Slice, Table, Union,
};

pub trait AlgebraVisitor {
    type Output;

    fn visit_bgp(&mut self, node: &Bgp) -> Self::Output;
    fn visit_ask_bgp(&mut self, node: &AskBgp) -> Self::Output;
    fn visit_lazy_bgp(&mut self, node: &LazyBgp) -> Self::Output;
    fn visit_join(&mut self, node: &Join) -> Self::Output;
    fn visit_left_join(&mut self, node: &LeftJoin) -> Self::Output;
    fn visit_union(&mut self, node: &Union) -> Self::Output;
    fn visit_ask_union(&mut self, node: &AskUnion) -> Self::Output;
    fn visit_lazy_union(&mut self, node: &LazyUnion) -> Self::Output;
    fn visit_minus(&mut self, node: &Minus) -> Self::Output;
    fn visit_exists_join(&mut self, node: &ExistsJoin) -> Self::Output;
    fn visit_filtered_product(&mut self, node: &FilteredProduct) -> Self::Output;
    fn visit_filter(&mut self, node: &Filter) -> Self::Output;
    fn visit_extend(&mut self, node: &Extend) -> Self::Output;
    fn visit_select(&mut self, node: &Select) -> Self::Output;
    fn visit_distinct(&mut self, node: &Distinct) -> Self::Output;
    fn visit_reduced(&mut self, node: &Reduced) -> Self::Output;
    fn visit_order_by(&mut self, node: &OrderBy) -> Self::Output;
    fn visit_slice(&mut self, node: &Slice) -> Self::Output;
    fn visit_group_by(&mut self, node: &GroupBy) -> Self::Output;
    fn visit_having(&mut self, node: &Having) -> Self::Output;
    fn visit_graph(&mut self, node: &Graph) -> Self::Output;
    fn visit_service(&mut self, node: &Service) -> Self::Output;
    fn visit_table(&mut self, node: &Table) -> Self::Output;
    fn visit_null_operator(&mut self, node: &NullOperator) -> Self::Output;
    fn visit_ask(&mut self, node: &Ask) -> Self::Output;
    fn visit_property_path(&mut self, node: &PathPattern) -> Self::Output;
    fn visit_zero_length_path(&mut self, node: &PathPattern) -> Self::Output;
    fn visit_zero_or_more_path(&mut self, node: &PathPattern) -> Self::Output;
    fn visit_one_or_more_path(&mut self, node: &PathPattern) -> Self::Output;
    fn visit_negated_property_set(&mut self, node: &NegatedPropertySet) -> Self::Output;
}

pub trait AlgebraProcessor {
    type Context;
    type Output;

    fn process_bgp(&self, node: &Bgp, context: &mut Self::Context) -> Self::Output;
    fn process_ask_bgp(&self, node: &AskBgp, context: &mut Self::Context) -> Self::Output;
    fn process_lazy_bgp(&self, node: &LazyBgp, context: &mut Self::Context) -> Self::Output;
    fn process_join(&self, node: &Join, context: &mut Self::Context) -> Self::Output;
    fn process_left_join(&self, node: &LeftJoin, context: &mut Self::Context) -> Self::Output;
    fn process_union(&self, node: &Union, context: &mut Self::Context) -> Self::Output;
    fn process_ask_union(&self, node: &AskUnion, context: &mut Self::Context) -> Self::Output;
    fn process_lazy_union(&self, node: &LazyUnion, context: &mut Self::Context) -> Self::Output;
    fn process_minus(&self, node: &Minus, context: &mut Self::Context) -> Self::Output;
    fn process_exists_join(&self, node: &ExistsJoin, context: &mut Self::Context) -> Self::Output;
    fn process_filtered_product(
        &self,
        node: &FilteredProduct,
        context: &mut Self::Context,
    ) -> Self::Output;
    fn process_filter(&self, node: &Filter, context: &mut Self::Context) -> Self::Output;
    fn process_extend(&self, node: &Extend, context: &mut Self::Context) -> Self::Output;
    fn process_select(&self, node: &Select, context: &mut Self::Context) -> Self::Output;
    fn process_distinct(&self, node: &Distinct, context: &mut Self::Context) -> Self::Output;
    fn process_reduced(&self, node: &Reduced, context: &mut Self::Context) -> Self::Output;
    fn process_order_by(&self, node: &OrderBy, context: &mut Self::Context) -> Self::Output;
    fn process_slice(&self, node: &Slice, context: &mut Self::Context) -> Self::Output;
    fn process_group_by(&self, node: &GroupBy, context: &mut Self::Context) -> Self::Output;
    fn process_having(&self, node: &Having, context: &mut Self::Context) -> Self::Output;
    fn process_graph(&self, node: &Graph, context: &mut Self::Context) -> Self::Output;
    fn process_service(&self, node: &Service, context: &mut Self::Context) -> Self::Output;
    fn process_table(&self, node: &Table, context: &mut Self::Context) -> Self::Output;
    fn process_null_operator(&self, node: &NullOperator, context: &mut Self::Context) -> Self::Output;
    fn process_ask(&self, node: &Ask, context: &mut Self::Context) -> Self::Output;
    fn process_property_path(&self, node: &PathPattern, context: &mut Self::Context) -> Self::Output;
    fn process_zero_length_path(&self, node: &PathPattern, context: &mut Self::Context) -> Self::Output;
    fn process_zero_or_more_path(&self, node: &PathPattern, context: &mut Self::Context) -> Self::Output;
    fn process_one_or_more_path(&self, node: &PathPattern, context: &mut Self::Context) -> Self::Output;
    fn process_negated_property_set(
        &self,
        node: &NegatedPropertySet,
        context: &mut Self::Context,
    ) -> Self::Output;
}
