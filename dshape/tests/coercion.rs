use dshape::{
    CoercionTable, CostModel, coercion_cost,
    parser::dshape,
    types::{CType, Type},
};

fn ty(src: &str) -> Type {
    dshape(src).unwrap().into()
}

fn cost(src: &str, dst: &str) -> f64 {
    coercion_cost(&ty(src), &ty(dst)).unwrap()
}

#[test]
fn reflexivity_for_every_scalar() {
    for scalar in CType::ALL {
        assert_eq!(coercion_cost(&scalar.into(), &scalar.into()).unwrap(), 0.0, "{}", scalar);
    }

    let table = CoercionTable::with_default_rules(CostModel::default());
    for (src, dst, cost) in table.entries() {
        if src == dst {
            assert_eq!(cost, 0.0);
        }
    }
}

#[test]
fn monotonic_widening() {
    let to16 = cost("int8", "int16");
    let to32 = cost("int8", "int32");
    let to64 = cost("int8", "int64");
    assert!(to64 > to32 && to32 > to16 && to16 > 0.0);
}

#[test]
fn transitivity_bound() {
    let mut table = CoercionTable::new();
    table.add_coercion(CType::DATE, CType::DATETIME, 2.0, true).unwrap();
    table.add_coercion(CType::DATETIME, CType::STRING, 3.0, true).unwrap();
    let derived = table.scalar_cost(CType::DATE, CType::STRING).unwrap();
    assert!(derived <= 5.0);

    let default = CoercionTable::with_default_rules(CostModel::default());
    for (a, b, ab) in default.entries() {
        for (c, d, bd) in default.entries() {
            if b == c {
                let ad = default.scalar_cost(a, d).unwrap();
                assert!(ad <= ab + bd + 1e-9, "{} -> {} -> {}", a, b, d);
            }
        }
    }
}

#[test]
fn narrowing_rejected() {
    let err = coercion_cost(&CType::FLOAT32.into(), &CType::INT32.into()).unwrap_err();
    assert!(err.is_coercion());
    assert_eq!(err.to_string(), "Cannot broadcast/coerce `float32` to `int32`.");
}

#[test]
fn bool_never_widens() {
    assert!(coercion_cost(&CType::BOOL.into(), &CType::INT64.into()).is_err());
    assert!(cost("float64", "bool") >= 1000.0);
}

#[test]
fn unit_dimension_broadcast_is_symmetric() {
    let forward = cost("1 * int32", "10 * int32");
    let backward = cost("10 * int32", "1 * int32");
    assert!(forward > 0.0);
    assert_eq!(forward, backward);
    assert!(coercion_cost(&ty("3 * int32"), &ty("5 * int32")).is_err());
}

#[test]
fn fixed_and_var_dimensions() {
    assert_eq!(cost("var * int32", "var * int32"), 0.0);
    assert_eq!(cost("3 * int32", "var * int32"), 0.1);
    assert_eq!(cost("var * int32", "3 * int32"), 0.1);
}

#[test]
fn leading_dimensions_may_be_added_not_removed() {
    assert_eq!(cost("int32", "1 * int32"), 0.1);
    assert_eq!(cost("int32", "3 * int32"), 0.2);
    assert_eq!(cost("3 * int32", "2 * 3 * int64"), 1.2);
    assert!(coercion_cost(&ty("2 * 3 * int32"), &ty("3 * int32")).is_err());
}

#[test]
fn datashape_with_ellipsis_destination() {
    assert_eq!(cost("4 * 3 * int32", "... * 3 * int32"), 0.2);
    let repeated = cost(
        "(4 * int32, 4 * int32)",
        "(A... * int32, A... * int32)",
    );
    assert_eq!(repeated, 0.2);
}

#[test]
fn typevar_sightings_within_one_datashape() {
    // first `T` costs 0.1, the second sighting is free
    assert_eq!(cost("3 * 3 * int32", "T * T * int32"), 0.1);
    assert_eq!(cost("T * int32", "3 * int32"), 0.0);
}

#[test]
fn records_and_tuples() {
    assert_eq!(cost("{x: int32, y: float32}", "{x: int64, y: float64}"), 2.0);
    assert!(coercion_cost(&ty("{x: int32}"), &ty("{y: int32}")).is_err());
    assert!(coercion_cost(&ty("{x: int32, y: int32}"), &ty("{y: int32, x: int32}")).is_err());
    assert_eq!(cost("(int8, 2 * float32)", "(int16, 2 * float64)"), 2.0);
    assert!(coercion_cost(&ty("(int8, int8)"), &ty("(int8)")).is_err());
}

#[test]
fn idempotent_and_decreasing_registration() {
    let mut table = CoercionTable::new();
    table.add_coercion(CType::INT8, CType::STRING, 4.0, true).unwrap();
    table.add_coercion(CType::INT8, CType::STRING, 4.0, true).unwrap();
    assert_eq!(table.scalar_cost(CType::INT8, CType::STRING), Some(4.0));

    table.add_coercion(CType::INT8, CType::STRING, 6.0, true).unwrap();
    assert_eq!(table.scalar_cost(CType::INT8, CType::STRING), Some(4.0));

    table.add_coercion(CType::INT8, CType::STRING, 2.5, true).unwrap();
    assert_eq!(table.scalar_cost(CType::INT8, CType::STRING), Some(2.5));
}

#[test]
fn custom_cost_model() {
    let model = CostModel {
        broadcast: 0.5,
        bool_sink: 10.0,
        ..CostModel::default()
    };
    let table = CoercionTable::with_default_rules(model);
    assert_eq!(table.coercion_cost(&ty("1 * int32"), &ty("4 * int32")).unwrap(), 0.5);
    assert_eq!(table.scalar_cost(CType::INT8, CType::BOOL), Some(10.0));
}
