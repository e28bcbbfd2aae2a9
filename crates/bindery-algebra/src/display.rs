//! Textual rendering of operator trees, e.g. `Join(Bgp(?s <p> ?o), Bgp(...))`.

use std::fmt;

use crate::algebra::{
    Algebra, Ask, AskBgp, AskUnion, Bgp, Distinct, ExistsJoin, Extend, Filter, FilteredProduct,
    Graph, GroupBy, Having, Join, LazyBgp, LazyUnion, LeftJoin, Minus, NegatedPropertySet,
    NullOperator, OrderBy, PathPattern, Reduced, Select, Service, Slice, Table, Union,
};
use crate::pattern::TriplePattern;
use crate::visit::AlgebraVisitor;

/// Renders one node and, recursively, its operands.
#[derive(Debug, Default)]
pub struct AlgebraFormatter;

impl AlgebraFormatter {
    pub fn format(algebra: &Algebra) -> String {
        algebra.accept_visitor(&mut AlgebraFormatter)
    }

    fn patterns(name: &str, patterns: &[TriplePattern]) -> String {
        let rendered: Vec<String> = patterns.iter().map(ToString::to_string).collect();
        format!("{name}({})", rendered.join(" . "))
    }

    fn binary(&mut self, name: &str, lhs: &Algebra, rhs: &Algebra) -> String {
        let lhs = lhs.accept_visitor(self);
        let rhs = rhs.accept_visitor(self);
        format!("{name}({lhs}, {rhs})")
    }

    fn path(name: &str, node: &PathPattern) -> String {
        format!("{name}({} {} {})", node.start, node.path, node.end)
    }
}

fn join_display<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(separator)
}

impl AlgebraVisitor for AlgebraFormatter {
    type Output = String;

    fn visit_bgp(&mut self, node: &Bgp) -> String {
        Self::patterns("Bgp", &node.patterns)
    }

    fn visit_ask_bgp(&mut self, node: &AskBgp) -> String {
        Self::patterns("AskBgp", &node.patterns)
    }

    fn visit_lazy_bgp(&mut self, node: &LazyBgp) -> String {
        let rendered = Self::patterns("LazyBgp", &node.patterns);
        format!("{rendered}[{}]", node.required_results)
    }

    fn visit_join(&mut self, node: &Join) -> String {
        self.binary("Join", &node.lhs, &node.rhs)
    }

    fn visit_left_join(&mut self, node: &LeftJoin) -> String {
        let lhs = node.lhs.accept_visitor(self);
        let rhs = node.rhs.accept_visitor(self);
        match &node.filter {
            Some(filter) => format!("LeftJoin({lhs}, {rhs}, {filter})"),
            None => format!("LeftJoin({lhs}, {rhs})"),
        }
    }

    fn visit_union(&mut self, node: &Union) -> String {
        self.binary("Union", &node.lhs, &node.rhs)
    }

    fn visit_ask_union(&mut self, node: &AskUnion) -> String {
        self.binary("AskUnion", &node.lhs, &node.rhs)
    }

    fn visit_lazy_union(&mut self, node: &LazyUnion) -> String {
        let rendered = self.binary("LazyUnion", &node.lhs, &node.rhs);
        format!("{rendered}[{}]", node.required_results)
    }

    fn visit_minus(&mut self, node: &Minus) -> String {
        self.binary("Minus", &node.lhs, &node.rhs)
    }

    fn visit_exists_join(&mut self, node: &ExistsJoin) -> String {
        let name = if node.must_exist { "Exists" } else { "NotExists" };
        self.binary(name, &node.lhs, &node.rhs)
    }

    fn visit_filtered_product(&mut self, node: &FilteredProduct) -> String {
        let lhs = node.lhs.accept_visitor(self);
        let rhs = node.rhs.accept_visitor(self);
        format!("FilteredProduct({lhs}, {rhs}, {})", node.filter)
    }

    fn visit_filter(&mut self, node: &Filter) -> String {
        format!("Filter({}, {})", node.inner.accept_visitor(self), node.expression)
    }

    fn visit_extend(&mut self, node: &Extend) -> String {
        format!(
            "Extend({}, {} := {})",
            node.inner.accept_visitor(self),
            node.variable,
            node.expression
        )
    }

    fn visit_select(&mut self, node: &Select) -> String {
        let inner = node.inner.accept_visitor(self);
        match &node.variables {
            Some(vars) => format!("Select({inner}, {})", join_display(vars, " ")),
            None => format!("Select({inner}, *)"),
        }
    }

    fn visit_distinct(&mut self, node: &Distinct) -> String {
        format!("Distinct({})", node.inner.accept_visitor(self))
    }

    fn visit_reduced(&mut self, node: &Reduced) -> String {
        format!("Reduced({})", node.inner.accept_visitor(self))
    }

    fn visit_order_by(&mut self, node: &OrderBy) -> String {
        let conditions: Vec<String> = node
            .conditions
            .iter()
            .map(|c| {
                if c.descending {
                    format!("DESC({})", c.expression)
                } else {
                    format!("ASC({})", c.expression)
                }
            })
            .collect();
        format!("OrderBy({}, {})", node.inner.accept_visitor(self), conditions.join(" "))
    }

    fn visit_slice(&mut self, node: &Slice) -> String {
        let limit = node.limit.map_or_else(|| "*".to_string(), |l| l.to_string());
        format!(
            "Slice({}, limit={limit}, offset={})",
            node.inner.accept_visitor(self),
            node.offset
        )
    }

    fn visit_group_by(&mut self, node: &GroupBy) -> String {
        let keys: Vec<String> = node
            .keys
            .iter()
            .map(|k| match &k.variable {
                Some(var) => format!("({} AS {var})", k.expression),
                None => k.expression.to_string(),
            })
            .collect();
        let aggregates: Vec<String> = node
            .aggregates
            .iter()
            .map(|a| format!("({} AS {})", a.aggregate, a.variable))
            .collect();
        format!(
            "GroupBy({}, [{}], [{}])",
            node.inner.accept_visitor(self),
            keys.join(" "),
            aggregates.join(" ")
        )
    }

    fn visit_having(&mut self, node: &Having) -> String {
        format!("Having({}, {})", node.inner.accept_visitor(self), node.expression)
    }

    fn visit_graph(&mut self, node: &Graph) -> String {
        format!("Graph({}, {})", node.name, node.inner.accept_visitor(self))
    }

    fn visit_service(&mut self, node: &Service) -> String {
        let silent = if node.silent { " SILENT" } else { "" };
        format!("Service{silent}({}, {})", node.endpoint, node.inner.accept_visitor(self))
    }

    fn visit_table(&mut self, node: &Table) -> String {
        format!(
            "Table({}; {} rows)",
            join_display(&node.variables, " "),
            node.rows.len()
        )
    }

    fn visit_null_operator(&mut self, node: &NullOperator) -> String {
        format!("NullOperator({})", join_display(&node.variables, " "))
    }

    fn visit_ask(&mut self, node: &Ask) -> String {
        format!("Ask({})", node.inner.accept_visitor(self))
    }

    fn visit_property_path(&mut self, node: &PathPattern) -> String {
        Self::path("PropertyPath", node)
    }

    fn visit_zero_length_path(&mut self, node: &PathPattern) -> String {
        Self::path("ZeroLengthPath", node)
    }

    fn visit_zero_or_more_path(&mut self, node: &PathPattern) -> String {
        Self::path("ZeroOrMorePath", node)
    }

    fn visit_one_or_more_path(&mut self, node: &PathPattern) -> String {
        Self::path("OneOrMorePath", node)
    }

    fn visit_negated_property_set(&mut self, node: &NegatedPropertySet) -> String {
        format!("NegatedPropertySet({} {} {})", node.start, node.as_path(), node.end)
    }
}

impl fmt::Display for Algebra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&AlgebraFormatter::format(self))
    }
}
