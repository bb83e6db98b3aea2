//! Datashape types: a small language describing the dimensions and element
//! type of array-like data, with coercion costs between types and
//! minimum-cost overload resolution over polymorphic signatures.
//!
//! ```rust
//! use dshape::{OverloadResolver, parser::dshape, types::Tuple};
//!
//! let add = OverloadResolver::new("add");
//! add.extend_overloads_from_str([
//!     "(A... * int64, A... * int64) -> A... * int64",
//!     "(A... * float64, A... * float64) -> A... * float64",
//! ])
//! .unwrap();
//!
//! let argtypes: Tuple = [dshape("10 * int32").unwrap(), dshape("10 * float32").unwrap()]
//!     .into_iter()
//!     .collect();
//! let (index, resolved) = add.resolve_overload(&argtypes, None).unwrap();
//! assert_eq!(index, 1);
//! assert_eq!(resolved.to_string(), "(10 * float64, 10 * float64) -> 10 * float64");
//! ```
pub mod coercion;
pub mod config;
pub mod error;
pub mod overload;
pub mod parser;
pub mod promotion;
pub mod solver;
pub mod types;
pub mod validation;

pub use coercion::{CoercionTable, coercion_cost, dim_coercion_cost, dtype_coercion_cost};
pub use config::CostModel;
pub use error::{DataShapeError, DsResult};
pub use overload::{Dispatcher, Overload, OverloadResolver};
pub use solver::{
    Binding, Bindings, MatchOutcome, Solver, TypeVarResolver, match_argtypes_to_signature,
    matches_datashape_pattern,
};
pub use types::{DataShape, Function, Type};
