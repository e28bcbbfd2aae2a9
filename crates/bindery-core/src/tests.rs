//! Join engine tests over small hand-built multisets

use super::*;

fn var(name: &str) -> Variable {
    Variable::new(name)
}

fn row(bindings: &[(&str, i64)]) -> Solution {
    Solution::from_bindings(bindings.iter().map(|(v, n)| (*v, Term::integer(*n))))
}

fn bag(variables: &[&str], rows: &[&[(&str, i64)]]) -> Multiset {
    Multiset::from_solutions(
        variables.iter().map(|v| var(v)),
        rows.iter().map(|r| row(r)),
    )
}

/// Solutions as a sorted list of binding rows, ignoring IDs and order.
fn rows_of(m: &Multiset) -> Vec<Solution> {
    let mut rows: Vec<Solution> = m.solutions().cloned().collect();
    rows.sort_by_key(|s| s.to_string());
    rows
}

fn serial() -> EvaluationOptions {
    EvaluationOptions::serial()
}

fn always(_: &Solution) -> std::result::Result<bool, PredicateError> {
    Ok(true)
}

// ============================================================================
// Join
// ============================================================================

#[test]
fn test_join_matches_on_shared_variable() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["x", "y"], &[&[("x", 1), ("y", 2)], &[("x", 3), ("y", 4)]]);

    let joined = a.join(&b, &serial()).unwrap();

    assert_eq!(rows_of(&joined), vec![row(&[("x", 1), ("y", 2)])]);
    assert_eq!(joined.variables(), &[var("x"), var("y")]);
}

#[test]
fn test_join_absorbing_forms() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);

    let with_identity = a.clone().join(&Multiset::Identity, &serial()).unwrap();
    assert_eq!(rows_of(&with_identity), rows_of(&a));

    assert!(a.clone().join(&Multiset::Null, &serial()).unwrap().is_null());
    assert!(a.clone().join(&Multiset::new(), &serial()).unwrap().is_null());
    assert_eq!(
        rows_of(&Multiset::Identity.join(&a, &serial()).unwrap()),
        rows_of(&a)
    );
    assert!(Multiset::Null.join(&a, &serial()).unwrap().is_null());
}

#[test]
fn test_join_treats_unbound_as_wildcard() {
    let mut a = bag(&["x", "y"], &[&[("x", 1), ("y", 5)]]);
    a.add(row(&[("x", 2)])).unwrap();
    let b = bag(&["x", "y"], &[&[("x", 2), ("y", 7)], &[("y", 5)]]);

    let joined = a.join(&b, &serial()).unwrap();

    // (x=1,y=5) ⋈ (y=5); (x=2) ⋈ (x=2,y=7); (x=2) ⋈ (y=5)
    assert_eq!(
        rows_of(&joined),
        {
            let mut expected = vec![
                row(&[("x", 1), ("y", 5)]),
                row(&[("x", 2), ("y", 7)]),
                row(&[("x", 2), ("y", 5)]),
            ];
            expected.sort_by_key(|s| s.to_string());
            expected
        }
    );
}

#[test]
fn test_join_of_disjoint_operands_is_a_product() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    let b = bag(&["y"], &[&[("y", 10)], &[("y", 20)], &[("y", 30)]]);

    let joined = a.clone().join(&b, &serial()).unwrap();
    let product = a.product(&b, &serial()).unwrap();

    assert_eq!(joined.count(), 6);
    assert_eq!(rows_of(&joined), rows_of(&product));
}

#[test]
fn test_parallel_join_matches_serial_join() {
    let left_rows: Vec<Vec<(&str, i64)>> = (0..200).map(|i| vec![("x", i % 17), ("a", i)]).collect();
    let right_rows: Vec<Vec<(&str, i64)>> = (0..150).map(|i| vec![("x", i % 13), ("b", i)]).collect();
    let left = bag(
        &["x", "a"],
        &left_rows.iter().map(Vec::as_slice).collect::<Vec<_>>(),
    );
    let right = bag(
        &["x", "b"],
        &right_rows.iter().map(Vec::as_slice).collect::<Vec<_>>(),
    );
    let parallel = EvaluationOptions {
        min_parallel_size: 2,
        ..EvaluationOptions::default()
    };

    let p = left.clone().join(&right, &parallel).unwrap();
    let s = left.join(&right, &serial()).unwrap();

    assert_eq!(rows_of(&p), rows_of(&s));
}

// ============================================================================
// LeftJoin
// ============================================================================

#[test]
fn test_left_join_scenario() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["x", "y"], &[&[("x", 1), ("y", 2)], &[("x", 3), ("y", 4)]]);

    let joined = a.left_join(&b, &always, &serial()).unwrap();
    assert_eq!(rows_of(&joined), vec![row(&[("x", 1), ("y", 2)])]);

    let a_prime = bag(&["x"], &[&[("x", 9)]]);
    let outer = a_prime.left_join(&b, &always, &serial()).unwrap();
    assert_eq!(rows_of(&outer), vec![row(&[("x", 9)])]);
    assert!(outer.contains_variable(&var("y")));
}

#[test]
fn test_left_join_rejected_matches_keep_left_row() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["x", "y"], &[&[("x", 1), ("y", 2)], &[("x", 1), ("y", 3)]]);
    let y = var("y");
    let only_three = |s: &Solution| -> std::result::Result<bool, PredicateError> {
        Ok(s.get(&y) == Some(&Term::integer(3)))
    };

    let joined = a.clone().left_join(&b, &only_three, &serial()).unwrap();
    assert_eq!(rows_of(&joined), vec![row(&[("x", 1), ("y", 3)])]);

    let never = |_: &Solution| -> std::result::Result<bool, PredicateError> { Ok(false) };
    let none = a.left_join(&b, &never, &serial()).unwrap();
    assert_eq!(rows_of(&none), vec![row(&[("x", 1)])]);
}

#[test]
fn test_left_join_predicate_failure_adds_standalone_copy() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["x", "y"], &[&[("x", 1), ("y", 2)], &[("x", 1), ("y", 3)]]);
    let y = var("y");
    let flaky = |s: &Solution| -> std::result::Result<bool, PredicateError> {
        if s.get(&y) == Some(&Term::integer(3)) {
            Err(PredicateError("type error".into()))
        } else {
            Ok(true)
        }
    };

    let joined = a.left_join(&b, &flaky, &serial()).unwrap();

    let mut expected = vec![row(&[("x", 1), ("y", 2)]), row(&[("x", 1)])];
    expected.sort_by_key(|s| s.to_string());
    assert_eq!(rows_of(&joined), expected);
}

#[test]
fn test_left_join_disjoint_is_filtered_product() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    let b = bag(&["y"], &[&[("y", 1)]]);
    let x = var("x");
    let y = var("y");
    let same = |s: &Solution| -> std::result::Result<bool, PredicateError> {
        Ok(s.get(&x) == s.get(&y))
    };

    let joined = a.left_join(&b, &same, &serial()).unwrap();

    assert_eq!(
        rows_of(&joined),
        vec![row(&[("x", 1), ("y", 1)]), row(&[("x", 2)])]
    );
}

#[test]
fn test_left_join_with_empty_right_returns_left() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    assert_eq!(
        rows_of(&a.clone().left_join(&Multiset::Null, &always, &serial()).unwrap()),
        rows_of(&a)
    );
    assert_eq!(
        rows_of(&a.clone().left_join(&Multiset::new(), &always, &serial()).unwrap()),
        rows_of(&a)
    );
    assert!(Multiset::Null
        .left_join(&a, &always, &serial())
        .unwrap()
        .is_null());
}

// ============================================================================
// ExistsJoin / MinusJoin
// ============================================================================

#[test]
fn test_exists_join_partitions_left() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)], &[("x", 3)]]);
    let b = bag(&["x"], &[&[("x", 2)], &[("x", 5)]]);

    let present = a.clone().exists_join(&b, true, &serial()).unwrap();
    let absent = a.exists_join(&b, false, &serial()).unwrap();

    assert_eq!(rows_of(&present), vec![row(&[("x", 2)])]);
    assert_eq!(rows_of(&absent), vec![row(&[("x", 1)]), row(&[("x", 3)])]);
}

#[test]
fn test_exists_join_absorbing_forms() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let disjoint = bag(&["y"], &[&[("y", 1)]]);

    assert!(a.clone().exists_join(&Multiset::Null, true, &serial()).unwrap().is_null());
    assert_eq!(
        a.clone().exists_join(&Multiset::Null, false, &serial()).unwrap().count(),
        1
    );
    assert_eq!(
        a.clone().exists_join(&Multiset::Identity, true, &serial()).unwrap().count(),
        1
    );
    assert_eq!(a.clone().exists_join(&disjoint, true, &serial()).unwrap().count(), 1);
    assert!(a.exists_join(&disjoint, false, &serial()).unwrap().is_null());
}

#[test]
fn test_exists_join_all_matched_short_circuits() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    let b = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    assert!(a.clone().exists_join(&b, false, &serial()).unwrap().is_null());
    assert_eq!(a.exists_join(&b, true, &serial()).unwrap().count(), 2);
}

#[test]
fn test_minus_join_removes_compatible_rows() {
    let a = bag(&["x", "y"], &[&[("x", 1), ("y", 1)], &[("x", 2), ("y", 2)]]);
    let b = bag(&["x"], &[&[("x", 1)]]);

    let out = a.minus_join(&b, &serial()).unwrap();

    assert_eq!(rows_of(&out), vec![row(&[("x", 2), ("y", 2)])]);
}

#[test]
fn test_minus_join_requires_a_shared_binding() {
    let mut a = bag(&["x", "y"], &[&[("x", 1)]]);
    a.add(row(&[("y", 4)])).unwrap();
    let b = bag(&["x"], &[&[("x", 1)]]);

    let out = a.minus_join(&b, &serial()).unwrap();

    // (y=4) shares no bound variable with (x=1), so it survives.
    assert_eq!(rows_of(&out), vec![row(&[("y", 4)])]);
}

#[test]
fn test_minus_join_disjoint_and_absorbing() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let disjoint = bag(&["y"], &[&[("y", 1)]]);

    assert_eq!(a.clone().minus_join(&disjoint, &serial()).unwrap().count(), 1);
    assert_eq!(a.clone().minus_join(&Multiset::Null, &serial()).unwrap().count(), 1);
    assert_eq!(a.clone().minus_join(&Multiset::Identity, &serial()).unwrap().count(), 1);
    assert!(a.clone().minus_join(&a, &serial()).unwrap().is_null());
}

// ============================================================================
// Product / Union / Merge / Filter
// ============================================================================

#[test]
fn test_product_ids_follow_partition_layout() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)], &[("x", 3)]]);
    let b = bag(&["y"], &[&[("y", 1)], &[("y", 2)]]);

    let product = a.product(&b, &serial()).unwrap();

    let Multiset::Partitioned(p) = &product else {
        panic!("product should be partitioned");
    };
    assert_eq!(p.partition_count(), 3);
    assert_eq!(p.partition_size(), 2);
    assert_eq!(product.ids(), vec![0, 1, 2, 3, 4, 5]);
    let first = product.get(2).unwrap();
    assert_eq!(first, &row(&[("x", 2), ("y", 1)]));
}

#[test]
fn test_product_keeps_left_bindings_when_right_is_larger() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["y"], &[&[("y", 1)], &[("y", 2)]]);

    let product = a.product(&b, &serial()).unwrap();

    assert_eq!(product.variables(), &[var("x"), var("y")]);
    assert_eq!(
        rows_of(&product),
        vec![row(&[("x", 1), ("y", 1)]), row(&[("x", 1), ("y", 2)])]
    );
}

#[test]
fn test_identity_with_empty_operand_is_null() {
    let empty = Multiset::new();
    assert!(empty.is_empty() && !empty.is_null());

    assert!(Multiset::Identity.join(&empty, &serial()).unwrap().is_null());
    assert!(empty.clone().join(&Multiset::Identity, &serial()).unwrap().is_null());
    assert!(Multiset::Identity.product(&empty, &serial()).unwrap().is_null());
    assert!(empty
        .clone()
        .product_with_timeout(&Multiset::Identity, 50, &serial())
        .unwrap()
        .is_null());
}

#[test]
fn test_product_with_zero_timeout_is_plain_product() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    let b = bag(&["y"], &[&[("y", 1)]]);
    let bounded = a.clone().product_with_timeout(&b, 0, &serial()).unwrap();
    assert_eq!(rows_of(&bounded), rows_of(&a.product(&b, &serial()).unwrap()));
}

#[test]
fn test_union_appends_copies() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(&["y"], &[&[("y", 2)], &[("y", 3)]]);

    let u = a.union(&b).unwrap();

    assert_eq!(u.count(), 3);
    assert_eq!(u.variables(), &[var("x"), var("y")]);
    assert_eq!(Multiset::Null.union(&b).unwrap().count(), 2);
    assert_eq!(Multiset::Identity.union(&b).unwrap().count(), 3);
}

#[test]
fn test_merge_suppresses_duplicates_after_trimming() {
    let a = bag(&["x"], &[&[("x", 1)]]);
    let b = bag(
        &["x", "z"],
        &[&[("x", 1), ("z", 9)], &[("x", 2), ("z", 9)], &[("x", 2)]],
    );

    let merged = a.merge(&b).unwrap();

    assert_eq!(rows_of(&merged), vec![row(&[("x", 1)]), row(&[("x", 2)])]);
    assert_eq!(merged.variables(), &[var("x")]);
}

#[test]
fn test_filter_on_identity_and_rows() {
    let x = var("x");
    let positive = |s: &Solution| -> std::result::Result<bool, PredicateError> {
        match s.get(&x).and_then(Term::as_number) {
            Some(n) => Ok(n.as_f64() > 1.0),
            None => Err(PredicateError("unbound".into())),
        }
    };

    assert!(Multiset::Identity.filter(&positive, &serial()).unwrap().is_null());

    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)], &[("x", 3)]]);
    let kept = a.filter(&positive, &serial()).unwrap();
    assert_eq!(rows_of(&kept), vec![row(&[("x", 2)]), row(&[("x", 3)])]);
}

#[test]
fn test_filtered_product_only_materialises_passing_rows() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)]]);
    let b = bag(&["y"], &[&[("y", 1)], &[("y", 2)]]);
    let x = var("x");
    let y = var("y");
    let equal = |s: &Solution| -> std::result::Result<bool, PredicateError> {
        Ok(s.get(&x) == s.get(&y))
    };

    let out = a.filtered_product(&b, &equal, &serial(), None).unwrap();

    assert_eq!(out.count(), 2);
    assert_eq!(
        rows_of(&out),
        vec![row(&[("x", 1), ("y", 1)]), row(&[("x", 2), ("y", 2)])]
    );
}

#[test]
fn test_filtered_product_stops_between_outer_rows() {
    let a = bag(&["x"], &[&[("x", 1)], &[("x", 2)], &[("x", 3)]]);
    let b = bag(&["y"], &[&[("y", 1)]]);
    let stop = StopToken::new();
    stop.stop();

    let out = a.filtered_product(&b, &always, &serial(), Some(&stop)).unwrap();

    assert!(out.is_empty());
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_options_from_json_fill_defaults() {
    let opts = EvaluationOptions::from_json_str(r#"{"timeout_ms": 250}"#).unwrap();
    assert_eq!(opts.timeout_ms, 250);
    assert!(opts.parallel_enabled);
    assert_eq!(opts.min_parallel_size, EvaluationOptions::default().min_parallel_size);
    assert!(!EvaluationOptions::serial().should_parallelise(1_000));
}

#[test]
fn test_stop_token_is_one_way_and_shared() {
    let token = StopToken::new();
    let clone = token.clone();
    assert!(!clone.should_stop());
    token.stop();
    assert!(clone.should_stop());
    assert!(StopToken::with_deadline(Some(std::time::Instant::now())).should_stop());
}
