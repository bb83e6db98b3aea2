//! Cost model loading from `DSHAPE_COST_MODEL`.
//!
//! Kept in its own test binary with a single test: it writes the process
//! environment, which nothing else may read concurrently.
use dshape::{
    CostModel, coercion_cost,
    config::ENV_COST_MODEL_PATH,
    parser::dshape,
    types::Type,
};

fn set_env(value: &std::path::Path) {
    unsafe { std::env::set_var(ENV_COST_MODEL_PATH, value) };
}

fn clear_env() {
    unsafe { std::env::remove_var(ENV_COST_MODEL_PATH) };
}

#[test]
fn cost_model_follows_environment() {
    let dir = std::env::temp_dir().join(format!("dshape-env-{}", std::process::id()));
    let path = dir.join("costs.toml");
    let custom = CostModel {
        broadcast: 0.5,
        ..CostModel::default()
    };
    custom.save_to_toml(&path).unwrap();

    clear_env();
    assert_eq!(CostModel::from_env().unwrap(), CostModel::default());

    set_env(&path);
    assert_eq!(CostModel::from_env().unwrap(), custom);
    assert_eq!(CostModel::from_env_or_default(), custom);

    // the global table is built on first use, from the variable as set right now
    let src: Type = dshape("1 * int32").unwrap().into();
    let dst: Type = dshape("4 * int32").unwrap().into();
    assert_eq!(coercion_cost(&src, &dst).unwrap(), 0.5);

    set_env(&dir.join("missing.toml"));
    assert!(CostModel::from_env().unwrap_err().is_io());
    assert_eq!(CostModel::from_env_or_default(), CostModel::default());

    std::fs::write(&path, "broadcast = [1, 2]").unwrap();
    set_env(&path);
    assert!(CostModel::from_env().unwrap_err().is_config_parse());
    assert_eq!(CostModel::from_env_or_default(), CostModel::default());

    clear_env();
    let _ = std::fs::remove_dir_all(&dir);
}
