use bindery_core::{EvaluationOptions, Multiset, PartitionedMultiset, PredicateError, Solution, Term, Variable};
use proptest::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;

type Row = Vec<Option<i64>>;

fn build(vars: &[&str], rows: &[Row]) -> Multiset {
    let variables: Vec<Variable> = vars.iter().map(|v| Variable::new(v)).collect();
    let solutions = rows.iter().map(|row| {
        Solution::from_bindings(
            variables
                .iter()
                .zip(row)
                .filter_map(|(v, value)| value.map(|n| (v.clone(), Term::integer(n)))),
        )
    });
    Multiset::from_solutions(variables.clone(), solutions)
}

fn arb_rows(width: usize) -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(prop::collection::vec(prop::option::of(0i64..3), width), 0..8)
}

fn sorted(mut rows: Vec<Solution>) -> Vec<String> {
    rows.sort_by_key(|s| s.to_string());
    rows.into_iter().map(|s| s.to_string()).collect()
}

fn rows_of(m: &Multiset) -> Vec<String> {
    sorted(m.solutions().cloned().collect())
}

fn shared(a: &Multiset, b: &Multiset) -> Vec<Variable> {
    a.shared_variables(b)
}

fn naive_join(a: &Multiset, b: &Multiset) -> Vec<String> {
    let vars = shared(a, b);
    let mut out = Vec::new();
    for x in a.solutions() {
        for y in b.solutions() {
            if x.is_compatible_with(y, &vars) {
                out.push(x.join(y));
            }
        }
    }
    sorted(out)
}

fn naive_left_join(a: &Multiset, b: &Multiset) -> Vec<String> {
    let vars = shared(a, b);
    let mut out = Vec::new();
    for x in a.solutions() {
        let matches: Vec<Solution> = b
            .solutions()
            .filter(|y| x.is_compatible_with(y, &vars))
            .map(|y| x.join(y))
            .collect();
        if matches.is_empty() {
            out.push(x.clone());
        } else {
            out.extend(matches);
        }
    }
    sorted(out)
}

fn naive_minus(a: &Multiset, b: &Multiset) -> Vec<String> {
    let vars = shared(a, b);
    sorted(
        a.solutions()
            .filter(|x| !b.solutions().any(|y| x.is_minus_compatible_with(y, &vars)))
            .cloned()
            .collect(),
    )
}

fn always(_: &Solution) -> Result<bool, PredicateError> {
    Ok(true)
}

fn options() -> EvaluationOptions {
    // Small threshold so the parallel paths get exercised too.
    EvaluationOptions {
        min_parallel_size: 3,
        ..EvaluationOptions::default()
    }
}

proptest! {
    #[test]
    fn join_with_identity_and_null(rows in arb_rows(2)) {
        let a = build(&["x", "y"], &rows);
        let with_identity = a.clone().join(&Multiset::Identity, &options()).unwrap();
        prop_assert_eq!(rows_of(&with_identity), rows_of(&a));
        prop_assert!(a.clone().join(&Multiset::Null, &options()).unwrap().is_null());
        let product_identity = a.clone().product(&Multiset::Identity, &options()).unwrap();
        prop_assert_eq!(rows_of(&product_identity), rows_of(&a));
        prop_assert!(a.product(&Multiset::Null, &options()).unwrap().is_null());
    }

    #[test]
    fn join_matches_nested_loop(left in arb_rows(2), right in arb_rows(2)) {
        let a = build(&["x", "y"], &left);
        let b = build(&["y", "z"], &right);
        let expected = naive_join(&a, &b);
        let joined = a.join(&b, &options()).unwrap();
        prop_assert_eq!(rows_of(&joined), expected);
    }

    #[test]
    fn disjoint_join_is_product(left in arb_rows(1), right in arb_rows(1)) {
        let a = build(&["x"], &left);
        let b = build(&["z"], &right);
        let joined = a.clone().join(&b, &options()).unwrap();
        let product = a.product(&b, &options()).unwrap();
        prop_assert_eq!(rows_of(&joined), rows_of(&product));
    }

    #[test]
    fn left_join_keeps_every_left_row(left in arb_rows(2), right in arb_rows(2)) {
        let a = build(&["x", "y"], &left);
        let b = build(&["y", "z"], &right);
        let expected = naive_left_join(&a, &b);
        let joined = a.clone().left_join(&b, &always, &options()).unwrap();
        prop_assert!(joined.count() >= a.count());
        prop_assert_eq!(rows_of(&joined), expected);
    }

    #[test]
    fn minus_never_grows(left in arb_rows(2), right in arb_rows(2)) {
        let a = build(&["x", "y"], &left);
        let b = build(&["y", "z"], &right);
        let expected = naive_minus(&a, &b);
        let before = a.count();
        let out = a.minus_join(&b, &options()).unwrap();
        prop_assert!(out.count() <= before);
        prop_assert_eq!(rows_of(&out), expected);
    }

    #[test]
    fn exists_partitions_left(left in arb_rows(2), right in arb_rows(2)) {
        let a = build(&["x", "y"], &left);
        let b = build(&["y", "z"], &right);
        let present = a.clone().exists_join(&b, true, &options()).unwrap();
        let absent = a.clone().exists_join(&b, false, &options()).unwrap();
        let mut both: Vec<Solution> = present.solutions().cloned().collect();
        both.extend(absent.solutions().cloned());
        prop_assert_eq!(sorted(both), rows_of(&a));
    }

    #[test]
    fn partitioned_writers_never_lose_rows(
        fills in prop::collection::vec(0usize..6, 1..24),
        size in 5usize..8,
    ) {
        let mut p = PartitionedMultiset::new(fills.len(), size);
        p.partitions_mut()
            .par_iter_mut()
            .zip(fills.par_iter())
            .for_each(|(partition, &n)| {
                for i in 0..n {
                    partition
                        .push(Solution::from_bindings([("x", Term::integer(i as i64))]))
                        .unwrap();
                }
            });

        let per_shard: usize = p.partitions().iter().map(|s| s.len()).sum();
        prop_assert_eq!(p.count(), fills.iter().sum::<usize>());
        prop_assert_eq!(p.count(), per_shard);
        let ids: HashSet<u64> = p.ids().into_iter().collect();
        prop_assert_eq!(ids.len(), p.count());
        for id in ids {
            prop_assert_eq!(p.get(id).unwrap().id(), id);
        }
    }
}
