//! Tree rewriting.
//!
//! An [`Optimiser`] maps a node to its rewrite; the usual shape is "match the
//! nodes you care about, otherwise `algebra.transform(self)`" so the rewrite
//! recurses through every operand while the node kinds it doesn't know keep
//! their parameters.

use crate::algebra::{
    Algebra, Ask, AskBgp, AskUnion, Extend, Filter, FilteredProduct, Join, LazyBgp, LazyUnion,
    Select,
};
use crate::expression::Expression;

pub trait Optimiser {
    fn optimise(&self, algebra: &Algebra) -> Algebra;

    /// Rewrite hook for the expressions carried by LeftJoin, FilteredProduct,
    /// Filter, Extend, Having and OrderBy.
    fn transform_expression(&self, expression: &Expression) -> Expression {
        expression.clone()
    }
}

/// Applies each optimiser in turn.
#[derive(Default)]
pub struct OptimiserChain {
    optimisers: Vec<Box<dyn Optimiser + Send + Sync>>,
}

impl OptimiserChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, optimiser: impl Optimiser + Send + Sync + 'static) -> Self {
        self.optimisers.push(Box::new(optimiser));
        self
    }

    /// ASK, LIMIT and filtered-product rewrites.
    pub fn standard() -> Self {
        Self::new()
            .with(FilteredProductRewriter)
            .with(AskRewriter)
            .with(LimitRewriter)
    }
}

impl Optimiser for OptimiserChain {
    fn optimise(&self, algebra: &Algebra) -> Algebra {
        self.optimisers
            .iter()
            .fold(algebra.clone(), |current, optimiser| optimiser.optimise(&current))
    }
}

// ============================================================================
// ASK
// ============================================================================

/// Below an `Ask`, swaps Bgp/Union for the variants that stop at the first
/// solution. Only a chain of unions is rewritten: one solution from each
/// side of a join would not be enough to decide the join.
#[derive(Debug, Default, Clone, Copy)]
pub struct AskRewriter;

impl AskRewriter {
    fn rewrite_under_ask(&self, algebra: &Algebra) -> Algebra {
        match algebra {
            Algebra::Bgp(bgp) => Algebra::AskBgp(AskBgp::new(bgp.patterns.clone())),
            Algebra::Union(u) => Algebra::AskUnion(AskUnion::new(
                self.rewrite_under_ask(&u.lhs),
                self.rewrite_under_ask(&u.rhs),
            )),
            other => self.optimise(other),
        }
    }
}

impl Optimiser for AskRewriter {
    fn optimise(&self, algebra: &Algebra) -> Algebra {
        match algebra {
            Algebra::Ask(ask) => Algebra::Ask(Ask::new(self.rewrite_under_ask(&ask.inner))),
            other => other.transform(self),
        }
    }
}

// ============================================================================
// LIMIT
// ============================================================================

/// Below a `Slice` with a limit, swaps Bgp/Union for the lazy variants that
/// stop after `limit + offset` solutions. Passes only through projection and
/// assignment: anything that filters, orders, deduplicates or groups needs the
/// full input.
#[derive(Debug, Default, Clone, Copy)]
pub struct LimitRewriter;

impl LimitRewriter {
    fn rewrite_lazy(&self, algebra: &Algebra, required: usize) -> Algebra {
        match algebra {
            Algebra::Bgp(bgp) => Algebra::LazyBgp(LazyBgp::new(bgp.patterns.clone(), required)),
            Algebra::Union(u) => Algebra::LazyUnion(LazyUnion::new(
                self.rewrite_lazy(&u.lhs, required),
                self.rewrite_lazy(&u.rhs, required),
                required,
            )),
            Algebra::Select(select) => Algebra::Select(Select {
                inner: Box::new(self.rewrite_lazy(&select.inner, required)),
                variables: select.variables.clone(),
            }),
            Algebra::Extend(extend) => Algebra::Extend(Extend::new(
                self.rewrite_lazy(&extend.inner, required),
                extend.variable.clone(),
                extend.expression.clone(),
            )),
            other => self.optimise(other),
        }
    }
}

impl Optimiser for LimitRewriter {
    fn optimise(&self, algebra: &Algebra) -> Algebra {
        match algebra {
            Algebra::Slice(slice) => match slice.limit {
                Some(limit) => {
                    let required = limit.saturating_add(slice.offset);
                    let mut out = slice.clone();
                    out.inner = Box::new(self.rewrite_lazy(&slice.inner, required));
                    Algebra::Slice(out)
                }
                None => algebra.transform(self),
            },
            other => other.transform(self),
        }
    }
}

// ============================================================================
// Filtered product
// ============================================================================

/// `Filter(Join(L, R), e)` with variable-disjoint `L` and `R` becomes
/// `FilteredProduct(L, R, e)`, so the unfiltered product is never built.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilteredProductRewriter;

impl Optimiser for FilteredProductRewriter {
    fn optimise(&self, algebra: &Algebra) -> Algebra {
        if let Algebra::Filter(Filter { inner, expression }) = algebra {
            if let Algebra::Join(Join { lhs, rhs }) = inner.as_ref() {
                let lhs_vars = lhs.variables();
                if rhs.variables().iter().all(|v| !lhs_vars.contains(v)) {
                    return Algebra::FilteredProduct(FilteredProduct::new(
                        self.optimise(lhs),
                        self.optimise(rhs),
                        expression.clone(),
                    ));
                }
            }
        }
        algebra.transform(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Bgp, Distinct, OrderBy, Slice, SortCondition, Union};
    use crate::expression::CompareOp;
    use crate::pattern::{PatternItem, TriplePattern};
    use bindery_core::Term;

    fn bgp(subject: &str, predicate: &str, object: &str) -> Algebra {
        Algebra::Bgp(Bgp::new(vec![TriplePattern::new(
            PatternItem::var(subject),
            Term::iri(predicate),
            PatternItem::var(object),
        )]))
    }

    fn gt(var: &str, value: i64) -> Expression {
        Expression::compare(
            CompareOp::Gt,
            Expression::var(var),
            Expression::constant(Term::integer(value)),
        )
    }

    // ============================================================================
    // AskRewriter
    // ============================================================================

    #[test]
    fn test_ask_rewrites_bgp_and_union_chain() {
        let tree = Algebra::Ask(Ask::new(Algebra::Union(Union::new(
            bgp("s", "http://ex/p", "o"),
            bgp("s", "http://ex/q", "o"),
        ))));
        let out = AskRewriter.optimise(&tree);

        let Algebra::Ask(ask) = out else {
            panic!("expected Ask");
        };
        let Algebra::AskUnion(union) = ask.inner.as_ref() else {
            panic!("expected AskUnion, got {}", ask.inner.name());
        };
        assert!(matches!(union.lhs.as_ref(), Algebra::AskBgp(_)));
        assert!(matches!(union.rhs.as_ref(), Algebra::AskBgp(_)));
    }

    #[test]
    fn test_ask_does_not_rewrite_join_operands() {
        let tree = Algebra::Ask(Ask::new(Algebra::join(
            bgp("s", "http://ex/p", "o"),
            bgp("o", "http://ex/q", "x"),
        )));
        let out = AskRewriter.optimise(&tree);
        let Algebra::Ask(ask) = out else {
            panic!("expected Ask");
        };
        let Algebra::Join(join) = ask.inner.as_ref() else {
            panic!("expected Join");
        };
        assert!(matches!(join.lhs.as_ref(), Algebra::Bgp(_)));
        assert!(matches!(join.rhs.as_ref(), Algebra::Bgp(_)));
    }

    #[test]
    fn test_ask_rewriter_ignores_trees_without_ask() {
        let tree = bgp("s", "http://ex/p", "o");
        assert_eq!(AskRewriter.optimise(&tree), tree);
    }

    // ============================================================================
    // LimitRewriter
    // ============================================================================

    #[test]
    fn test_limit_reaches_bgp_through_projection() {
        let tree = Algebra::Slice(Slice::new(
            Algebra::Select(Select::new(bgp("s", "http://ex/p", "o"), vec!["s".into()])),
            Some(10),
            5,
        ));
        let out = LimitRewriter.optimise(&tree);

        let Algebra::Slice(slice) = out else {
            panic!("expected Slice");
        };
        let Algebra::Select(select) = slice.inner.as_ref() else {
            panic!("expected Select");
        };
        let Algebra::LazyBgp(lazy) = select.inner.as_ref() else {
            panic!("expected LazyBgp, got {}", select.inner.name());
        };
        assert_eq!(lazy.required_results, 15);
    }

    #[test]
    fn test_limit_stops_at_order_by_and_distinct() {
        for inner in [
            Algebra::OrderBy(OrderBy::new(
                bgp("s", "http://ex/p", "o"),
                vec![SortCondition::ascending(Expression::var("o"))],
            )),
            Algebra::Distinct(Distinct::new(bgp("s", "http://ex/p", "o"))),
        ] {
            let tree = Algebra::Slice(Slice::new(inner.clone(), Some(1), 0));
            let Algebra::Slice(slice) = LimitRewriter.optimise(&tree) else {
                panic!("expected Slice");
            };
            assert_eq!(slice.inner.as_ref(), &inner);
        }
    }

    #[test]
    fn test_limit_without_bound_leaves_tree_alone() {
        let tree = Algebra::Slice(Slice::new(bgp("s", "http://ex/p", "o"), None, 3));
        assert_eq!(LimitRewriter.optimise(&tree), tree);
    }

    #[test]
    fn test_limit_rewrites_union_to_lazy_union() {
        let tree = Algebra::Slice(Slice::new(
            Algebra::Union(Union::new(
                bgp("s", "http://ex/p", "o"),
                bgp("s", "http://ex/q", "o"),
            )),
            Some(2),
            0,
        ));
        let Algebra::Slice(slice) = LimitRewriter.optimise(&tree) else {
            panic!("expected Slice");
        };
        let Algebra::LazyUnion(union) = slice.inner.as_ref() else {
            panic!("expected LazyUnion");
        };
        assert_eq!(union.required_results, 2);
        assert!(matches!(union.lhs.as_ref(), Algebra::LazyBgp(_)));
    }

    // ============================================================================
    // FilteredProductRewriter
    // ============================================================================

    #[test]
    fn test_filter_over_disjoint_join_becomes_filtered_product() {
        let tree = Algebra::Filter(Filter::new(
            Algebra::join(bgp("a", "http://ex/p", "b"), bgp("c", "http://ex/q", "d")),
            gt("b", 1),
        ));
        let Algebra::FilteredProduct(product) = FilteredProductRewriter.optimise(&tree) else {
            panic!("expected FilteredProduct");
        };
        assert_eq!(product.filter, gt("b", 1));
        assert_eq!(product.variables(), vec!["a".into(), "b".into(), "c".into(), "d".into()]);
    }

    #[test]
    fn test_filter_over_shared_join_is_kept() {
        let tree = Algebra::Filter(Filter::new(
            Algebra::join(bgp("a", "http://ex/p", "b"), bgp("b", "http://ex/q", "d")),
            gt("b", 1),
        ));
        assert_eq!(FilteredProductRewriter.optimise(&tree), tree);
    }

    #[test]
    fn test_standard_chain_applies_every_rewrite() {
        let tree = Algebra::Slice(Slice::new(
            Algebra::Filter(Filter::new(
                Algebra::join(bgp("a", "http://ex/p", "b"), bgp("c", "http://ex/q", "d")),
                gt("b", 1),
            )),
            Some(1),
            0,
        ));
        let Algebra::Slice(slice) = OptimiserChain::standard().optimise(&tree) else {
            panic!("expected Slice");
        };
        // The limit does not pass through the fused filter.
        let Algebra::FilteredProduct(product) = slice.inner.as_ref() else {
            panic!("expected FilteredProduct, got {}", slice.inner.name());
        };
        assert!(matches!(product.lhs.as_ref(), Algebra::Bgp(_)));
    }

    struct RewriteVariables;

    impl Optimiser for RewriteVariables {
        fn optimise(&self, algebra: &Algebra) -> Algebra {
            algebra.transform(self)
        }

        fn transform_expression(&self, expression: &Expression) -> Expression {
            match expression {
                Expression::Variable(_) => Expression::bound("rewritten"),
                other => other.clone(),
            }
        }
    }

    #[test]
    fn test_transform_expression_hook_applies_to_filters() {
        let tree = Algebra::Filter(Filter::new(bgp("s", "http://ex/p", "o"), Expression::var("o")));
        let Algebra::Filter(filter) = RewriteVariables.optimise(&tree) else {
            panic!("expected Filter");
        };
        assert_eq!(filter.expression, Expression::bound("rewritten"));
    }
}
