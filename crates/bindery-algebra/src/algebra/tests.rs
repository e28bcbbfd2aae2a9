use super::*;
use crate::aggregate::{Aggregate, AggregateFunction};
use crate::expression::{CompareOp, Expression};
use crate::path::Path;
use crate::pattern::PatternItem;
use bindery_core::{Solution, Term};

fn v(name: &str) -> Variable {
    Variable::new(name)
}

fn vars(names: &[&str]) -> Vec<Variable> {
    names.iter().map(|n| v(n)).collect()
}

fn tp(s: &str, p: &str, o: &str) -> TriplePattern {
    let item = |x: &str| match x.strip_prefix('?') {
        Some(name) => PatternItem::var(name),
        None => PatternItem::Term(Term::iri(x)),
    };
    TriplePattern::new(item(s), item(p), item(o))
}

fn bgp(patterns: &[(&str, &str, &str)]) -> Algebra {
    Algebra::bgp(patterns.iter().map(|(s, p, o)| tp(s, p, o)).collect())
}

/// Replaces every Bgp by a NullOperator over the same variables.
struct NullifyBgps;

impl Optimiser for NullifyBgps {
    fn optimise(&self, algebra: &Algebra) -> Algebra {
        match algebra {
            Algebra::Bgp(b) => Algebra::NullOperator(NullOperator::new(b.variables())),
            other => other.transform(self),
        }
    }
}

// ============================================================================
// Variable classification
// ============================================================================

#[test]
fn test_bgp_variables_are_fixed_in_first_occurrence_order() {
    let node = bgp(&[("?s", "http://ex/p", "?o"), ("?o", "http://ex/q", "?s")]);
    assert_eq!(node.variables(), vars(&["s", "o"]));
    assert_eq!(node.fixed_variables(), vars(&["s", "o"]));
    assert!(node.floating_variables().is_empty());
}

#[test]
fn test_left_join_rhs_only_variables_float() {
    let node = Algebra::LeftJoin(LeftJoin::new(
        bgp(&[("?s", "http://ex/p", "?o")]),
        bgp(&[("?s", "http://ex/q", "?x")]),
        None,
    ));
    assert_eq!(node.variables(), vars(&["s", "o", "x"]));
    assert_eq!(node.fixed_variables(), vars(&["s", "o"]));
    assert_eq!(node.floating_variables(), vars(&["x"]));
}

#[test]
fn test_union_fixes_only_shared_fixed_variables() {
    let node = Algebra::Union(Union::new(
        bgp(&[("?s", "http://ex/p", "?a")]),
        bgp(&[("?s", "http://ex/q", "?b")]),
    ));
    assert_eq!(node.variables(), vars(&["s", "a", "b"]));
    assert_eq!(node.fixed_variables(), vars(&["s"]));
    assert_eq!(node.floating_variables(), vars(&["a", "b"]));
}

#[test]
fn test_minus_and_exists_follow_left_operand() {
    let lhs = bgp(&[("?s", "http://ex/p", "?o")]);
    let rhs = bgp(&[("?s", "http://ex/q", "?x")]);
    for node in [
        Algebra::Minus(Minus::new(lhs.clone(), rhs.clone())),
        Algebra::ExistsJoin(ExistsJoin::new(lhs.clone(), rhs.clone(), false)),
    ] {
        assert_eq!(node.variables(), vars(&["s", "o", "x"]), "{}", node.name());
        assert_eq!(node.fixed_variables(), vars(&["s", "o"]));
        assert!(node.floating_variables().is_empty());
    }
}

#[test]
fn test_extend_assigned_variable_floats() {
    let node = Algebra::Extend(Extend::new(
        bgp(&[("?s", "http://ex/p", "?o")]),
        v("len"),
        Expression::call("strlen", vec![Expression::var("o")]),
    ));
    assert_eq!(node.variables(), vars(&["s", "o", "len"]));
    assert_eq!(node.fixed_variables(), vars(&["s", "o"]));
    assert_eq!(node.floating_variables(), vars(&["len"]));
}

#[test]
fn test_select_restricts_to_projection() {
    let inner = Algebra::LeftJoin(LeftJoin::new(
        bgp(&[("?s", "http://ex/p", "?o")]),
        bgp(&[("?s", "http://ex/q", "?x")]),
        None,
    ));
    let node = Algebra::Select(Select::new(inner, vars(&["x", "s", "missing"])));
    assert_eq!(node.variables(), vars(&["x", "s", "missing"]));
    assert_eq!(node.fixed_variables(), vars(&["s"]));
}

#[test]
fn test_group_by_keys_fixed_only_when_fixed_inside() {
    let inner = Algebra::LeftJoin(LeftJoin::new(
        bgp(&[("?s", "http://ex/p", "?o")]),
        bgp(&[("?s", "http://ex/q", "?x")]),
        None,
    ));
    let node = Algebra::GroupBy(GroupBy::new(
        inner,
        vec![GroupKey::variable("s"), GroupKey::variable("x")],
        vec![AggregateBinding::new(v("n"), Aggregate::count_all())],
    ));
    assert_eq!(node.variables(), vars(&["s", "x", "n"]));
    assert_eq!(node.fixed_variables(), vars(&["s"]));
    assert_eq!(node.floating_variables(), vars(&["x", "n"]));
}

#[test]
fn test_graph_variable_is_fixed() {
    let node = Algebra::Graph(Graph::new(bgp(&[("?s", "http://ex/p", "?o")]), v("g")));
    assert_eq!(node.variables(), vars(&["s", "o", "g"]));
    assert_eq!(node.fixed_variables(), vars(&["s", "o", "g"]));
}

#[test]
fn test_table_fixes_variables_bound_in_every_row() {
    let rows = vec![
        Solution::from_bindings([(v("a"), Term::integer(1)), (v("b"), Term::integer(2))]),
        Solution::from_bindings([(v("a"), Term::integer(3))]),
    ];
    let node = Algebra::Table(Table::new(vars(&["a", "b"]), rows));
    assert_eq!(node.fixed_variables(), vars(&["a"]));
    assert_eq!(node.floating_variables(), vars(&["b"]));
}

#[test]
fn test_ask_and_null_operator_classification() {
    let ask = Algebra::Ask(Ask::new(bgp(&[("?s", "http://ex/p", "?o")])));
    assert!(ask.variables().is_empty());

    let null = Algebra::NullOperator(NullOperator::new(vars(&["a"])));
    assert_eq!(null.variables(), vars(&["a"]));
    assert!(null.fixed_variables().is_empty());
}

#[test]
fn test_path_endpoints_are_fixed() {
    let node = Algebra::ZeroOrMorePath(PathPattern::new(
        v("a"),
        Path::predicate("http://ex/knows"),
        Term::iri("http://ex/bob"),
    ));
    assert_eq!(node.variables(), vars(&["a"]));
    assert_eq!(node.fixed_variables(), vars(&["a"]));
}

// ============================================================================
// Constructors and transform
// ============================================================================

#[test]
fn test_join_constructor_drops_empty_bgp() {
    let pattern = bgp(&[("?s", "http://ex/p", "?o")]);
    assert_eq!(Algebra::join(Algebra::bgp(vec![]), pattern.clone()), pattern);
    assert_eq!(Algebra::join(pattern.clone(), Algebra::bgp(vec![])), pattern);
    assert!(matches!(
        Algebra::join(pattern.clone(), pattern),
        Algebra::Join(_)
    ));
}

#[test]
fn test_transform_rewrites_operands_and_keeps_parameters() {
    let filter = Expression::compare(
        CompareOp::Gt,
        Expression::var("o"),
        Expression::constant(Term::integer(3)),
    );
    let tree = Algebra::Slice(Slice::new(
        Algebra::Filter(Filter::new(
            Algebra::join(
                bgp(&[("?s", "http://ex/p", "?o")]),
                bgp(&[("?s", "http://ex/q", "?x")]),
            ),
            filter.clone(),
        )),
        Some(5),
        2,
    ));

    let out = NullifyBgps.optimise(&tree);
    let Algebra::Slice(slice) = &out else {
        panic!("expected Slice, got {}", out.name());
    };
    assert_eq!((slice.limit, slice.offset), (Some(5), 2));
    let Algebra::Filter(f) = slice.inner.as_ref() else {
        panic!("expected Filter");
    };
    assert_eq!(f.expression, filter);
    let Algebra::Join(join) = f.inner.as_ref() else {
        panic!("expected Join");
    };
    assert!(matches!(join.lhs.as_ref(), Algebra::NullOperator(_)));
    assert!(matches!(join.rhs.as_ref(), Algebra::NullOperator(_)));
}

#[test]
fn test_transform_lhs_and_rhs_touch_one_side() {
    let tree = Algebra::LeftJoin(LeftJoin::new(
        bgp(&[("?s", "http://ex/p", "?o")]),
        bgp(&[("?s", "http://ex/q", "?x")]),
        Some(Expression::bound("x")),
    ));

    let Algebra::LeftJoin(lhs_only) = tree.transform_lhs(&NullifyBgps) else {
        panic!("expected LeftJoin");
    };
    assert!(matches!(lhs_only.lhs.as_ref(), Algebra::NullOperator(_)));
    assert!(matches!(lhs_only.rhs.as_ref(), Algebra::Bgp(_)));
    assert_eq!(lhs_only.filter, Some(Expression::bound("x")));

    let Algebra::LeftJoin(rhs_only) = tree.transform_rhs(&NullifyBgps) else {
        panic!("expected LeftJoin");
    };
    assert!(matches!(rhs_only.lhs.as_ref(), Algebra::Bgp(_)));
    assert!(matches!(rhs_only.rhs.as_ref(), Algebra::NullOperator(_)));
}

#[test]
fn test_transform_leaves_are_unchanged() {
    let leaf = Algebra::Table(Table::new(vars(&["a"]), vec![]));
    assert_eq!(leaf.transform(&NullifyBgps), leaf);
}

// ============================================================================
// Dispatch, rendering and serde
// ============================================================================

struct KindCounter {
    joins: usize,
    leaves: usize,
}

impl crate::visit::AlgebraVisitor for KindCounter {
    type Output = ();

    fn visit_bgp(&mut self, _: &Bgp) {
        self.leaves += 1;
    }
    fn visit_ask_bgp(&mut self, _: &AskBgp) {}
    fn visit_lazy_bgp(&mut self, _: &LazyBgp) {}
    fn visit_join(&mut self, node: &Join) {
        self.joins += 1;
        node.lhs.accept_visitor(self);
        node.rhs.accept_visitor(self);
    }
    fn visit_left_join(&mut self, _: &LeftJoin) {}
    fn visit_union(&mut self, _: &Union) {}
    fn visit_ask_union(&mut self, _: &AskUnion) {}
    fn visit_lazy_union(&mut self, _: &LazyUnion) {}
    fn visit_minus(&mut self, _: &Minus) {}
    fn visit_exists_join(&mut self, _: &ExistsJoin) {}
    fn visit_filtered_product(&mut self, _: &FilteredProduct) {}
    fn visit_filter(&mut self, _: &Filter) {}
    fn visit_extend(&mut self, _: &Extend) {}
    fn visit_select(&mut self, _: &Select) {}
    fn visit_distinct(&mut self, _: &Distinct) {}
    fn visit_reduced(&mut self, _: &Reduced) {}
    fn visit_order_by(&mut self, _: &OrderBy) {}
    fn visit_slice(&mut self, _: &Slice) {}
    fn visit_group_by(&mut self, _: &GroupBy) {}
    fn visit_having(&mut self, _: &Having) {}
    fn visit_graph(&mut self, _: &Graph) {}
    fn visit_service(&mut self, _: &Service) {}
    fn visit_table(&mut self, _: &Table) {}
    fn visit_null_operator(&mut self, _: &NullOperator) {}
    fn visit_ask(&mut self, _: &Ask) {}
    fn visit_property_path(&mut self, _: &PathPattern) {}
    fn visit_zero_length_path(&mut self, _: &PathPattern) {}
    fn visit_zero_or_more_path(&mut self, _: &PathPattern) {}
    fn visit_one_or_more_path(&mut self, _: &PathPattern) {}
    fn visit_negated_property_set(&mut self, _: &NegatedPropertySet) {}
}

#[test]
fn test_visitor_reaches_matching_callbacks() {
    let tree = Algebra::join(
        Algebra::join(
            bgp(&[("?a", "http://ex/p", "?b")]),
            bgp(&[("?b", "http://ex/p", "?c")]),
        ),
        bgp(&[("?c", "http://ex/p", "?d")]),
    );
    let mut counter = KindCounter { joins: 0, leaves: 0 };
    tree.accept_visitor(&mut counter);
    assert_eq!((counter.joins, counter.leaves), (2, 3));
}

#[test]
fn test_display_renders_nested_nodes() {
    let tree = Algebra::join(
        bgp(&[("?s", "http://ex/p", "?o")]),
        Algebra::Distinct(Distinct::new(bgp(&[("?o", "http://ex/q", "?x")]))),
    );
    assert_eq!(
        tree.to_string(),
        "Join(Bgp(?s <http://ex/p> ?o), Distinct(Bgp(?o <http://ex/q> ?x)))"
    );
}

#[test]
fn test_tree_serde_roundtrip_is_tagged_by_op() {
    let tree = Algebra::Select(Select::new(
        Algebra::GroupBy(GroupBy::new(
            Algebra::LeftJoin(LeftJoin::new(
                bgp(&[("?s", "http://ex/p", "?o")]),
                Algebra::OneOrMorePath(PathPattern::new(
                    v("o"),
                    Path::predicate("http://ex/next"),
                    v("x"),
                )),
                Some(Expression::bound("x")),
            )),
            vec![GroupKey::variable("s")],
            vec![AggregateBinding::new(
                v("total"),
                Aggregate::new(AggregateFunction::Sum, Expression::var("o")),
            )],
        )),
        vars(&["s", "total"]),
    ));

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["op"], "select");
    assert_eq!(json["inner"]["op"], "group_by");

    let back: Algebra = serde_json::from_value(json).unwrap();
    assert_eq!(back, tree);
}
