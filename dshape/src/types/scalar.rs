//! Scalar (measure) types.
//!
//! Every scalar is a [`CType`] singleton identified by its canonical name. The
//! canonical instances are associated constants (`CType::INT32`, ...) and a
//! process-wide name registry, built once on first use and never mutated
//! afterwards, maps spellings (including aliases such as `int` or `real`) to them.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use strum::EnumIs;

/// Family a scalar belongs to. Drives numeric promotion and the default coercion rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum ScalarKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Complex,
    /// Character data: `string`, `bytes`, `json`.
    Text,
    /// `date`, `time`, `datetime`, `timedelta`.
    Temporal,
    /// `void` and `object`.
    Opaque,
}

/// A concrete scalar type with a fixed memory footprint.
///
/// Equality and hashing only depend on the fields, and since every value is one of the
/// canonical constants below, two `CType`s are equal iff their names are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CType {
    name: &'static str,
    itemsize: usize,
    alignment: usize,
    kind: ScalarKind,
}

impl CType {
    const fn new(name: &'static str, itemsize: usize, alignment: usize, kind: ScalarKind) -> Self {
        Self {
            name,
            itemsize,
            alignment,
            kind,
        }
    }

    pub const BOOL: Self = Self::new("bool", 1, 1, ScalarKind::Bool);

    pub const INT8: Self = Self::new("int8", 1, 1, ScalarKind::Signed);
    pub const INT16: Self = Self::new("int16", 2, 2, ScalarKind::Signed);
    pub const INT32: Self = Self::new("int32", 4, 4, ScalarKind::Signed);
    pub const INT64: Self = Self::new("int64", 8, 8, ScalarKind::Signed);

    pub const UINT8: Self = Self::new("uint8", 1, 1, ScalarKind::Unsigned);
    pub const UINT16: Self = Self::new("uint16", 2, 2, ScalarKind::Unsigned);
    pub const UINT32: Self = Self::new("uint32", 4, 4, ScalarKind::Unsigned);
    pub const UINT64: Self = Self::new("uint64", 8, 8, ScalarKind::Unsigned);

    pub const FLOAT16: Self = Self::new("float16", 2, 2, ScalarKind::Float);
    pub const FLOAT32: Self = Self::new("float32", 4, 4, ScalarKind::Float);
    pub const FLOAT64: Self = Self::new("float64", 8, 8, ScalarKind::Float);

    pub const COMPLEX64: Self = Self::new("complex[float32]", 8, 4, ScalarKind::Complex);
    pub const COMPLEX128: Self = Self::new("complex[float64]", 16, 8, ScalarKind::Complex);

    pub const STRING: Self = Self::new("string", 16, 8, ScalarKind::Text);
    pub const BYTES: Self = Self::new("bytes", 16, 8, ScalarKind::Text);
    pub const JSON: Self = Self::new("json", 16, 8, ScalarKind::Text);

    pub const DATE: Self = Self::new("date", 4, 4, ScalarKind::Temporal);
    pub const TIME: Self = Self::new("time", 8, 8, ScalarKind::Temporal);
    pub const DATETIME: Self = Self::new("datetime", 8, 8, ScalarKind::Temporal);
    pub const TIMEDELTA: Self = Self::new("timedelta", 8, 8, ScalarKind::Temporal);

    pub const VOID: Self = Self::new("void", 0, 1, ScalarKind::Opaque);
    pub const OBJECT: Self = Self::new("object", 8, 8, ScalarKind::Opaque);

    /// Every canonical scalar, in registration order.
    pub const ALL: [CType; 23] = [
        Self::BOOL,
        Self::INT8,
        Self::INT16,
        Self::INT32,
        Self::INT64,
        Self::UINT8,
        Self::UINT16,
        Self::UINT32,
        Self::UINT64,
        Self::FLOAT16,
        Self::FLOAT32,
        Self::FLOAT64,
        Self::COMPLEX64,
        Self::COMPLEX128,
        Self::STRING,
        Self::BYTES,
        Self::JSON,
        Self::DATE,
        Self::TIME,
        Self::DATETIME,
        Self::TIMEDELTA,
        Self::VOID,
        Self::OBJECT,
    ];

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size in bytes of one element.
    #[inline]
    pub const fn itemsize(&self) -> usize {
        self.itemsize
    }

    #[inline]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline]
    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Returns `true` for booleans, integers, floats and complex numbers.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self.kind,
            ScalarKind::Bool
                | ScalarKind::Signed
                | ScalarKind::Unsigned
                | ScalarKind::Float
                | ScalarKind::Complex
        )
    }

    /// Number of value bits (for complex numbers, the bits of one component).
    pub const fn bits(&self) -> usize {
        match self.kind {
            ScalarKind::Complex => self.itemsize * 4,
            _ => self.itemsize * 8,
        }
    }

    /// Look up a scalar by name or alias in the process-wide registry.
    ///
    /// ```rust
    /// # use dshape::types::scalar::CType;
    /// assert_eq!(CType::from_name("int"), Some(CType::INT32));
    /// assert_eq!(CType::from_name("complex[float32]"), Some(CType::COMPLEX64));
    /// assert_eq!(CType::from_name("int33"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<CType> {
        REGISTRY.get(name).copied()
    }

    /// Signed integer with the given number of bits, if one exists.
    pub fn signed(bits: usize) -> Option<CType> {
        match bits {
            8 => Some(Self::INT8),
            16 => Some(Self::INT16),
            32 => Some(Self::INT32),
            64 => Some(Self::INT64),
            _ => None,
        }
    }

    /// Floating point type with the given number of bits, if one exists.
    pub fn float(bits: usize) -> Option<CType> {
        match bits {
            16 => Some(Self::FLOAT16),
            32 => Some(Self::FLOAT32),
            64 => Some(Self::FLOAT64),
            _ => None,
        }
    }

    /// Complex type whose components have the given number of bits.
    pub fn complex(component_bits: usize) -> Option<CType> {
        match component_bits {
            16 | 32 => Some(Self::COMPLEX64),
            64 => Some(Self::COMPLEX128),
            _ => None,
        }
    }
}

impl std::fmt::Display for CType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

static REGISTRY: Lazy<BTreeMap<&'static str, CType>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, CType> =
        CType::ALL.iter().map(|ty| (ty.name(), *ty)).collect();

    registry.extend([
        ("int", CType::INT32),
        ("intptr", CType::INT64),
        ("uintptr", CType::UINT64),
        ("half", CType::FLOAT16),
        ("single", CType::FLOAT32),
        ("double", CType::FLOAT64),
        ("real", CType::FLOAT64),
        ("complex", CType::COMPLEX128),
        ("complex64", CType::COMPLEX64),
        ("complex128", CType::COMPLEX128),
    ]);
    registry
});

/// Iterate over every registered spelling and the scalar it resolves to.
pub fn registered_names() -> impl Iterator<Item = (&'static str, CType)> {
    REGISTRY.iter().map(|(name, ty)| (*name, *ty))
}
