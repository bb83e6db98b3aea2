use dshape::{
    Binding, Bindings, CoercionTable, CostModel, MatchOutcome, Solver, matches_datashape_pattern,
    parser::{dshape, signature},
    types::{Tuple, Type, TypeVar},
};

fn args(srcs: &[&str]) -> Tuple {
    srcs.iter().map(|src| dshape(src).unwrap()).collect()
}

fn resolve(argtypes: &[&str], sig: &str) -> (String, f64) {
    let table = CoercionTable::with_default_rules(CostModel::default());
    let outcome = Solver::new(&table)
        .match_argtypes_to_signature(&args(argtypes), &signature(sig).unwrap(), None, f64::INFINITY)
        .unwrap();
    let (resolved, cost) = outcome.into_matched().unwrap();
    (resolved.to_string(), cost)
}

#[test]
fn concrete_signature() {
    let (resolved, cost) = resolve(&["int32", "int32"], "(int32, int32) -> int32");
    assert_eq!(resolved, "(int32, int32) -> int32");
    assert_eq!(cost, 0.0);
}

#[test]
fn ellipsis_with_fixed_tail() {
    let (resolved, cost) = resolve(&["5 * 4 * 3 * int32"], "(A... * 3 * int32) -> A... * int32");
    assert_eq!(resolved, "(5 * 4 * 3 * int32) -> 5 * 4 * int32");
    assert_eq!(cost, 0.25);
}

#[test]
fn anonymous_ellipsis_keeps_argument_dims() {
    let (resolved, _) = resolve(&["2 * 7 * float32"], "(... * float64) -> float64");
    assert_eq!(resolved, "(2 * 7 * float64) -> float64");
}

#[test]
fn reduction_signature() {
    let (resolved, cost) = resolve(&["10 * float32"], "(N * T) -> T");
    assert_eq!(resolved, "(10 * float32) -> float32");
    assert_eq!(cost, 0.125);
}

#[test]
fn matrix_multiply_shapes() {
    let sig = "(M * K * T, K * N * T) -> M * N * T";
    let (resolved, _) = resolve(&["3 * 4 * float64", "4 * 5 * float64"], sig);
    assert_eq!(resolved, "(3 * 4 * float64, 4 * 5 * float64) -> 3 * 5 * float64");

    let table = CoercionTable::with_default_rules(CostModel::default());
    let err = Solver::new(&table)
        .match_argtypes_to_signature(
            &args(&["3 * 4 * float64", "2 * 5 * float64"]),
            &signature(sig).unwrap(),
            None,
            f64::INFINITY,
        )
        .unwrap_err();
    assert!(err.is_unification());
}

#[test]
fn measure_promotion_with_options() {
    let (resolved, _) = resolve(&["?int8", "int16"], "(T, T) -> T");
    assert_eq!(resolved, "(?int16, ?int16) -> ?int16");
}

#[test]
fn records_match_as_a_whole() {
    let (resolved, cost) = resolve(&["var * {x: int32}"], "(var * T) -> T");
    assert_eq!(resolved, "(var * {x: int32}) -> {x: int32}");
    assert_eq!(cost, 0.125);

    let (_, cost) = resolve(&["3 * {x: int32}"], "(3 * {x: int64}) -> bool");
    assert_eq!(cost, 1.0);
}

#[test]
fn broadcasting_cost_in_signature() {
    let (resolved, cost) = resolve(&["1 * int32", "10 * int32"], "(10 * int32, 1 * int32) -> int32");
    assert_eq!(resolved, "(10 * int32, 1 * int32) -> int32");
    assert_eq!(cost, 0.1);
}

#[test]
fn resolver_receives_bindings() {
    let table = CoercionTable::with_default_rules(CostModel::default());
    let widen = |symbol: &TypeVar, bindings: &Bindings| -> Option<Binding> {
        if symbol.symbol() != "R" {
            return None;
        }
        let input = TypeVar::new("T").ok()?;
        match bindings.get(&input)? {
            Binding::Measure(_) => Some(Binding::Measure(dshape("float64").ok()?.into())),
            _ => None,
        }
    };
    let outcome = Solver::new(&table)
        .match_argtypes_to_signature(
            &args(&["A * int32"]),
            &signature("(A * T) -> B... * R").unwrap(),
            Some(&widen),
            f64::INFINITY,
        );
    // `B...` stays unresolved
    assert!(outcome.unwrap_err().is_unresolved_symbol());

    let outcome = Solver::new(&table)
        .match_argtypes_to_signature(
            &args(&["3 * int32"]),
            &signature("(N * T) -> N * R").unwrap(),
            Some(&widen),
            f64::INFINITY,
        )
        .unwrap();
    let (resolved, _) = outcome.into_matched().unwrap();
    assert_eq!(resolved.to_string(), "(3 * int32) -> 3 * float64");
}

#[test]
fn pruning_reports_cost() {
    let table = CoercionTable::with_default_rules(CostModel::default());
    let outcome = Solver::new(&table)
        .match_argtypes_to_signature(
            &args(&["int8", "int8"]),
            &signature("(int64, int8) -> int8").unwrap(),
            None,
            1.0,
        )
        .unwrap();
    assert!(matches!(outcome, MatchOutcome::Pruned { cost } if cost == 3.0));
}

#[test]
fn datashape_patterns() {
    let concrete = dshape("10 * 3 * float32").unwrap();
    assert!(matches_datashape_pattern(&concrete, &dshape("... * float32").unwrap()));
    assert!(matches_datashape_pattern(&concrete, &dshape("N * 3 * T").unwrap()));
    assert!(matches_datashape_pattern(&concrete, &dshape("A... * T : floating").unwrap()));
    assert!(!matches_datashape_pattern(&concrete, &dshape("A... * T : integral").unwrap()));
    assert!(!matches_datashape_pattern(&concrete, &dshape("N * T").unwrap()));
    assert!(!matches_datashape_pattern(&concrete, &dshape("10 * 3 * int32").unwrap()));
}

#[test]
fn concrete_typevar_dimension_in_argument() {
    let table = CoercionTable::with_default_rules(CostModel::default());
    let argtypes = Tuple::new(vec![dshape("N * int32").unwrap()]);
    let outcome = Solver::new(&table)
        .match_argtypes_to_signature(
            &argtypes,
            &signature("(3 * int32) -> int32").unwrap(),
            None,
            f64::INFINITY,
        )
        .unwrap();
    assert_eq!(outcome.cost(), 0.0);
    assert!(Type::from(dshape("N * int32").unwrap()).is_data_shape());
}
