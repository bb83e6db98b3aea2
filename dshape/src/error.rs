//! Errors emitted while building, parsing, coercing and resolving datashapes.
//!
//! The variants follow four families:
//! - contract violations (wrong arity, wrong term kind, malformed signatures). These
//!   point at a bug in the caller or in a signature and are never retried;
//! - [`DataShapeError::Coercion`] and [`DataShapeError::Unification`], which are
//!   recoverable: the overload resolver swallows them per candidate and moves on;
//! - overload selection failures (no match, ambiguity);
//! - front-end and configuration failures (syntax, validation, I/O, TOML).
use strum::EnumIs;
use thiserror::Error;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq, EnumIs, Error)]
pub enum DataShapeError {
    /// The number of arguments does not match the number of parameters of a signature.
    #[error("Cannot match signature `{signature}`, expected {expected} arguments, got {got}.")]
    ArityMismatch {
        signature: String,
        expected: usize,
        got: usize,
    },

    /// Argument types must be a tuple of datashapes.
    #[error("Invalid argument types `{0}`: expected a tuple of datashapes.")]
    InvalidArgtypes(String),

    /// A signature must be a function type.
    #[error("Invalid signature `{0}`: only function signatures are allowed.")]
    InvalidSignature(String),

    /// A term was constructed with parameters of the wrong kind.
    #[error("Invalid datashape construction: {0}")]
    InvalidConstruction(String),

    /// Type variable symbols must begin with an uppercase letter.
    #[error("TypeVar symbol `{0}` does not begin with a capital letter.")]
    InvalidTypeVar(String),

    /// `subarray` was asked to remove more dimensions than available.
    #[error(
        "Not enough dimensions in data shape `{datashape}` to remove {requested} leading dimensions."
    )]
    NotEnoughDimensions { datashape: String, requested: usize },

    /// A type variable symbol was used with two different kinds in one signature.
    #[error("DataShape typevar `{symbol}` has been used as both a {first} and a {second}.")]
    AmbiguousTypeVar {
        symbol: String,
        first: &'static str,
        second: &'static str,
    },

    /// The return type of a signature mentions a symbol the inputs do not bind.
    #[error("Unresolved type variable `{symbol}` in the return type of `{signature}`.")]
    UnresolvedSymbol { symbol: String, signature: String },

    /// Coercion costs must be nonnegative.
    #[error("Raw coercion costs must be nonnegative, got {cost} for `{src}` -> `{dst}`.")]
    InvalidCost { src: String, dst: String, cost: f64 },

    /// No conversion path between two types.
    #[error("Cannot broadcast/coerce `{src}` to `{dst}`.")]
    Coercion { src: Box<Type>, dst: Box<Type> },

    /// Type variable bindings are mutually inconsistent.
    #[error("Unification failed: {0}")]
    Unification(String),

    /// Every candidate was rejected.
    #[error("{name}: no overload matches for argtypes {argtypes}")]
    NoMatchingOverload { name: String, argtypes: String },

    /// Several candidates tie at the lowest cost.
    #[error("{name}: ambiguous overload for argtypes {argtypes}\nambiguous candidates:\n{}", .candidates.iter().map(|c| format!("    {c}")).collect::<Vec<_>>().join("\n"))]
    AmbiguousOverload {
        name: String,
        argtypes: String,
        candidates: Vec<String>,
    },

    /// A datashape is syntactically valid but malformed.
    #[error("Malformed datashape: {0}")]
    Validation(String),

    /// Parser diagnostics, one entry per error.
    #[error("Invalid datashape syntax:\n{}", .0.join("\n"))]
    Syntax(Vec<String>),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to parse cost model file '{file}': {message}")]
    ConfigParse { file: String, message: String },
}

impl DataShapeError {
    /// Build a [`DataShapeError::Coercion`] for the pair `src -> dst`.
    pub fn coercion(src: &Type, dst: &Type) -> Self {
        DataShapeError::Coercion {
            src: Box::new(src.clone()),
            dst: Box::new(dst.clone()),
        }
    }

    /// Whether the overload resolver may swallow this error and try the next candidate.
    pub fn is_recoverable(&self) -> bool {
        self.is_coercion() || self.is_unification()
    }
}

pub type DsResult<T> = Result<T, DataShapeError>;
