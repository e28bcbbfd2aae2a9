use std::time::{Duration, Instant};

use bindery_core::{EvaluationOptions, Multiset, Solution, Term, Variable};

fn column(name: &str, n: i64) -> Multiset {
    let var = Variable::new(name);
    Multiset::from_solutions(
        [var.clone()],
        (0..n).map(|i| Solution::from_bindings([(var.clone(), Term::integer(i))])),
    )
}

#[test]
fn test_product_with_timeout_returns_whole_outer_rows() {
    // 8M combined rows: far more than fits in the wait bound.
    let left = column("x", 4000);
    let right = column("y", 2000);
    let opts = EvaluationOptions::serial();

    let started = Instant::now();
    let out = left.product_with_timeout(&right, 1, &opts).unwrap();
    let elapsed = started.elapsed();

    // Cut between outer rows: never a split row, and never the whole product.
    assert!(out.count() < 4000 * 2000);
    assert_eq!(out.count() % 2000, 0);
    // Overrun is bounded by the outer row in flight when the wait expired.
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
}

#[test]
fn test_product_with_generous_timeout_is_complete() {
    let left = column("x", 20);
    let right = column("y", 10);
    let out = left
        .product_with_timeout(&right, 10_000, &EvaluationOptions::default())
        .unwrap();
    assert_eq!(out.count(), 200);
}

#[test]
fn test_product_with_timeout_short_circuits_absorbing_forms() {
    let left = column("x", 3);
    assert!(left
        .clone()
        .product_with_timeout(&Multiset::Null, 50, &EvaluationOptions::default())
        .unwrap()
        .is_null());
    assert_eq!(
        left.product_with_timeout(&Multiset::Identity, 50, &EvaluationOptions::default())
            .unwrap()
            .count(),
        3
    );
}
