use dshape::{
    Type,
    parser::{dshape, signature},
    types::{CType, TypeSet, scalar::registered_names},
    validation::validate,
};

#[test]
fn display_round_trips() {
    let sources = [
        "int32",
        "3 * 4 * float64",
        "var * string",
        "10 * var * {name: string, amount: ?float64}",
        "(int32, 3 * float32)",
        "A... * T",
        "... * 3 * int32",
        "N * T : numeric",
        "(A... * int64, A... * int64) -> A... * int64",
        "3 * complex[float64]",
        "var * (int8, {x: bytes}) -> bool",
    ];
    for src in sources {
        let ds = dshape(src).unwrap();
        assert_eq!(ds.to_string(), src);
        assert_eq!(dshape(&ds.to_string()).unwrap(), ds);
    }
}

#[test]
fn aliases_resolve_to_canonical_scalars() {
    assert_eq!(dshape("int").unwrap().measure(), &CType::INT32.into());
    assert_eq!(dshape("double").unwrap().measure(), &CType::FLOAT64.into());
    assert_eq!(dshape("complex").unwrap().to_string(), "complex[float64]");
    assert_eq!(dshape("complex64").unwrap().to_string(), "complex[float32]");
    for (name, scalar) in registered_names() {
        assert_eq!(dshape(name).unwrap().measure(), &Type::CType(scalar), "{}", name);
    }
}

#[test]
fn whitespace_is_insignificant() {
    let spaced = dshape("  3 *var*  { x :int32 ,y: float64 , } ").unwrap();
    assert_eq!(spaced.to_string(), "3 * var * {x: int32, y: float64}");
}

#[test]
fn every_typeset_parses() {
    for set in TypeSet::all() {
        let ds = dshape(&format!("T : {}", set)).unwrap();
        assert_eq!(ds.measure(), &Type::implements("T", set).unwrap());
    }
}

#[test]
fn signature_parsing() {
    let func = signature("(M * K * T, K * N * T) -> M * N * T").unwrap();
    assert_eq!(func.argtypes().len(), 2);
    assert_eq!(func.restype().to_string(), "M * N * T");
    let free: Vec<_> = Type::from(func).free().iter().map(|tv| tv.to_string()).collect();
    assert_eq!(free, vec!["M", "K", "T", "N"]);
}

#[test]
fn syntax_errors_are_reported() {
    for src in ["", "3 *", "* int32", "{x int32}", "(int32", "3 * foo", "Ab... * ..."] {
        assert!(dshape(src).is_err(), "`{}` should not parse", src);
    }
    let err = dshape("3 * int33").unwrap_err();
    assert!(err.to_string().starts_with("Invalid datashape syntax"));
}

#[test]
fn validation_failures() {
    assert!(dshape("A... * 3 * B... * int32").unwrap_err().is_validation());
    assert!(dshape("T : floating * int32").unwrap_err().is_validation());
    assert!(dshape("{x: ... * ... * int32}").unwrap_err().is_validation());
    assert!(validate(&dshape("A... * 3 * int32").unwrap()).is_ok());
}
