//! Integration tests for the complete evaluation pipeline
//!
//! These tests drive both crates together:
//! - Operator tree → Optimiser chain → QueryEvaluator → Multiset
//! - JSON options and JSON operator trees
//! - Time budgets with and without partial results
//!
//! Run with: cargo test --test integration_tests

use std::thread;
use std::time::Duration;

use bindery_algebra::testing::MemoryGraph;
use bindery_algebra::{
    Algebra, Ask, Bgp, CompareOp, EvaluationContext, EvaluationError, Expression, Filter,
    GraphSource, LeftJoin, Optimiser, OptimiserChain, OrderBy, PatternItem, QueryEvaluator,
    Select, Slice, SortCondition, StandardEvaluator, TriplePattern, Union,
};
use bindery_core::{EvaluationOptions, Multiset, Solution, Term, Variable};

const KNOWS: &str = "http://ex/knows";
const AGE: &str = "http://ex/age";
const NAME: &str = "http://ex/name";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn ex(name: &str) -> Term {
    Term::iri(format!("http://ex/{name}"))
}

fn pattern(s: &str, p: &str, o: &str) -> TriplePattern {
    TriplePattern::new(PatternItem::var(s), Term::iri(p), PatternItem::var(o))
}

fn bgp(s: &str, p: &str, o: &str) -> Algebra {
    Algebra::Bgp(Bgp::new(vec![pattern(s, p, o)]))
}

fn older_than(var: &str, age: i64) -> Expression {
    Expression::compare(
        CompareOp::Gt,
        Expression::var(var),
        Expression::constant(Term::integer(age)),
    )
}

fn people() -> MemoryGraph {
    let mut graph = MemoryGraph::new();
    for (s, o) in [("alice", "bob"), ("bob", "carol"), ("carol", "dave")] {
        graph.insert(ex(s), Term::iri(KNOWS), ex(o));
    }
    for (s, age) in [("alice", 30), ("bob", 25), ("carol", 40)] {
        graph.insert(ex(s), Term::iri(AGE), Term::integer(age));
    }
    for (s, name) in [("alice", "Alice"), ("bob", "Bob")] {
        graph.insert(ex(s), Term::iri(NAME), Term::string(name));
    }
    graph
}

/// Order-insensitive rendering of a result, for comparing evaluations.
fn rows(results: &Multiset) -> Vec<String> {
    let mut out: Vec<String> = results
        .solutions()
        .map(|s| {
            let mut parts: Vec<String> = s.bindings().map(|(v, t)| format!("{v}={t}")).collect();
            parts.sort();
            parts.join(" ")
        })
        .collect();
    out.sort();
    out
}

fn column(results: &Multiset, name: &str) -> Vec<Option<Term>> {
    let var = Variable::new(name);
    results.solutions().map(|s| s.get(&var).cloned()).collect()
}

// ============================================================================
// End-to-end queries
// ============================================================================

/// SELECT ?p ?name WHERE { ?p age ?a FILTER(?a > 26) OPTIONAL { ?p name ?name } }
/// ORDER BY DESC(?a) LIMIT 2
fn oldest_with_names() -> Algebra {
    let filtered = Algebra::Filter(Filter::new(bgp("p", AGE, "a"), older_than("a", 26)));
    let optional = Algebra::LeftJoin(LeftJoin::new(filtered, bgp("p", NAME, "name"), None));
    let ordered = Algebra::OrderBy(OrderBy::new(
        optional,
        vec![SortCondition::descending(Expression::var("a"))],
    ));
    Algebra::Select(Select::new(
        Algebra::Slice(Slice::new(ordered, Some(2), 0)),
        vec!["p".into(), "name".into()],
    ))
}

#[test]
fn test_end_to_end_query() {
    init_tracing();
    let graph = people();
    let expressions = StandardEvaluator::new();
    let results = QueryEvaluator::new(&graph, &expressions)
        .run(&oldest_with_names(), EvaluationOptions::serial())
        .unwrap();

    assert_eq!(results.variables(), &[Variable::new("p"), Variable::new("name")]);
    assert_eq!(column(&results, "p"), vec![Some(ex("carol")), Some(ex("alice"))]);
    assert_eq!(column(&results, "name"), vec![None, Some(Term::string("Alice"))]);
}

#[test]
fn test_optimised_tree_gives_same_answers() {
    init_tracing();
    let graph = people();
    let expressions = StandardEvaluator::new();
    let evaluator = QueryEvaluator::new(&graph, &expressions);
    let chain = OptimiserChain::standard();

    let trees = [
        // Disjoint join under a filter: fused into a filtered product.
        Algebra::Filter(Filter::new(
            Algebra::join(bgp("x", AGE, "a"), bgp("y", NAME, "n")),
            older_than("a", 26),
        )),
        // Limit pushed into the pattern.
        Algebra::Slice(Slice::new(
            Algebra::Select(Select::new(bgp("s", KNOWS, "o"), vec!["s".into()])),
            Some(2),
            0,
        )),
        oldest_with_names(),
    ];
    for tree in trees {
        let optimised = chain.optimise(&tree);
        let plain = evaluator.run(&tree, EvaluationOptions::serial()).unwrap();
        let fast = evaluator.run(&optimised, EvaluationOptions::serial()).unwrap();
        assert_eq!(plain.count(), fast.count(), "{tree} vs {optimised}");
        if !matches!(tree, Algebra::Slice(_)) {
            assert_eq!(rows(&plain), rows(&fast), "{tree} vs {optimised}");
        }
    }
}

#[test]
fn test_ask_over_union_after_rewrite() {
    let graph = people();
    let expressions = StandardEvaluator::new();
    let evaluator = QueryEvaluator::new(&graph, &expressions);

    let tree = Algebra::Ask(Ask::new(Algebra::Union(Union::new(
        bgp("x", "http://ex/missing", "y"),
        bgp("x", KNOWS, "y"),
    ))));
    let optimised = OptimiserChain::standard().optimise(&tree);
    let result = evaluator.run(&optimised, EvaluationOptions::serial()).unwrap();
    assert!(matches!(result, Multiset::Identity));

    let nothing = Algebra::Ask(Ask::new(bgp("x", "http://ex/missing", "y")));
    let result = evaluator
        .run(&OptimiserChain::standard().optimise(&nothing), EvaluationOptions::serial())
        .unwrap();
    assert!(matches!(result, Multiset::Null));
}

#[test]
fn test_parallel_and_serial_evaluation_agree() {
    init_tracing();
    let mut graph = MemoryGraph::new();
    for i in 0..120 {
        graph.insert(ex(&format!("n{i}")), Term::iri(AGE), Term::integer(i % 50));
        graph.insert(ex(&format!("n{i}")), Term::iri(KNOWS), ex(&format!("n{}", (i + 1) % 120)));
    }
    let expressions = StandardEvaluator::new();
    let evaluator = QueryEvaluator::new(&graph, &expressions);
    let tree = Algebra::Filter(Filter::new(
        Algebra::join(bgp("x", KNOWS, "y"), bgp("y", AGE, "a")),
        older_than("a", 10),
    ));

    let serial = evaluator.run(&tree, EvaluationOptions::serial()).unwrap();
    let parallel = evaluator
        .run(
            &tree,
            EvaluationOptions {
                min_parallel_size: 2,
                ..EvaluationOptions::default()
            },
        )
        .unwrap();
    assert_eq!(rows(&serial), rows(&parallel));
    assert!(serial.count() > 0);
}

// ============================================================================
// Configuration and serialization
// ============================================================================

#[test]
fn test_options_from_json_fill_defaults() {
    let options =
        EvaluationOptions::from_json_str(r#"{ "parallel_enabled": false, "timeout_ms": 250 }"#)
            .unwrap();
    assert!(!options.parallel_enabled);
    assert_eq!(options.timeout_ms, 250);
    assert_eq!(options.min_parallel_size, EvaluationOptions::default().min_parallel_size);
    assert!(options.trim_temporary_variables);
    assert!(!options.partial_results_on_timeout);

    assert!(EvaluationOptions::from_json_str("{ \"timeout_ms\": -1 }").is_err());
}

#[test]
fn test_tree_survives_json_round_trip() {
    let tree = oldest_with_names();
    let json = serde_json::to_string(&tree).unwrap();
    let back: Algebra = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);

    let graph = people();
    let expressions = StandardEvaluator::new();
    let evaluator = QueryEvaluator::new(&graph, &expressions);
    let a = evaluator.run(&tree, EvaluationOptions::serial()).unwrap();
    let b = evaluator.run(&back, EvaluationOptions::serial()).unwrap();
    assert_eq!(rows(&a), rows(&b));
}

// ============================================================================
// Time budgets
// ============================================================================

/// A store that takes a while to answer each pattern.
struct SlowGraph {
    inner: MemoryGraph,
    delay: Duration,
}

impl GraphSource for SlowGraph {
    fn match_pattern(
        &self,
        pattern: &TriplePattern,
        graph: Option<&Term>,
    ) -> anyhow::Result<Vec<Solution>> {
        thread::sleep(self.delay);
        self.inner.match_pattern(pattern, graph)
    }

    fn graph_names(&self) -> anyhow::Result<Vec<Term>> {
        self.inner.graph_names()
    }
}

fn slow_people() -> SlowGraph {
    SlowGraph {
        inner: people(),
        delay: Duration::from_millis(30),
    }
}

#[test]
fn test_timeout_fails_without_partial_results() {
    init_tracing();
    let graph = slow_people();
    let expressions = StandardEvaluator::new();
    let err = QueryEvaluator::new(&graph, &expressions)
        .run(&bgp("p", AGE, "a"), EvaluationOptions::serial().with_timeout_ms(5))
        .unwrap_err();
    assert!(matches!(err, EvaluationError::Timeout { timeout_ms: 5 }));
}

#[test]
fn test_timeout_returns_partial_results_when_asked() {
    init_tracing();
    let graph = slow_people();
    let expressions = StandardEvaluator::new();
    let options = EvaluationOptions {
        partial_results_on_timeout: true,
        ..EvaluationOptions::serial().with_timeout_ms(5)
    };
    let mut context = EvaluationContext::new(options);
    QueryEvaluator::new(&graph, &expressions)
        .evaluate(&bgp("p", AGE, "a"), &mut context)
        .unwrap();

    assert!(context.timed_out());
    // The single pattern finished before the deadline was noticed.
    assert_eq!(context.take_output().count(), 3);
}
