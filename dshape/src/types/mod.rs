//! Datashape type terms.
//!
//! A datashape is a list of dimensions followed by one measure, written
//! `3 * var * int32`. Every term is a variant of the closed sum type [`Type`];
//! equality, ordering and hashing are structural.
//!
//! A single dimension or measure is also accepted wherever a datashape is
//! expected: a one-parameter [`DataShape`] and its sole parameter are
//! interchangeable, and [`Type::launder`] / [`From<DataShape> for Type`]
//! collapse the former into the latter.
use strum::EnumIs;

use crate::error::{DataShapeError, DsResult};

pub mod aggregate;
pub mod scalar;
pub mod typeset;

pub use aggregate::{Record, Tuple};
pub use scalar::{CType, ScalarKind};
pub use typeset::TypeSet;

/// A named free variable. Symbols start with an uppercase ASCII letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeVar(String);

impl TypeVar {
    /// ```rust
    /// # use dshape::types::TypeVar;
    /// assert!(TypeVar::new("T").is_ok());
    /// assert!(TypeVar::new("t").is_err());
    /// ```
    pub fn new(symbol: impl Into<String>) -> DsResult<Self> {
        let symbol = symbol.into();
        let mut chars = symbol.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_uppercase())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(symbol))
        } else {
            Err(DataShapeError::InvalidTypeVar(symbol))
        }
    }

    #[inline]
    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TypeVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Syntactic category of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum Kind {
    /// `Fixed` or `Var`.
    Dimension,
    /// `...` or `A...`; may only appear among the dimensions.
    Ellipsis,
    /// Scalars, records, tuples, options and functions.
    Measure,
    /// Type variables (plain or constrained) stand in either position.
    Free,
    /// A datashape with at least one dimension.
    Shape,
}

/// A type term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
pub enum Type {
    /// Scalar measure.
    CType(CType),
    /// Dimension of exactly `n` elements.
    Fixed(u64),
    /// Dimension of unknown length.
    Var,
    TypeVar(TypeVar),
    /// Run of zero or more dimensions, optionally captured under a name.
    Ellipsis(Option<TypeVar>),
    /// Measure type variable restricted to a [`TypeSet`] (`A : floating`).
    Implements { typevar: TypeVar, typeset: TypeSet },
    Record(Record),
    Tuple(Tuple),
    /// Nullable measure (`?int32`).
    Option(Box<Type>),
    Function(Function),
    /// Datashape with at least one dimension. One-parameter datashapes never appear here.
    DataShape(DataShape),
}

impl Type {
    /// Type variable term. Fails when `symbol` is not capitalized.
    pub fn typevar(symbol: &str) -> DsResult<Type> {
        TypeVar::new(symbol).map(Type::TypeVar)
    }

    /// `...` when `symbol` is `None`, `A...` otherwise.
    pub fn ellipsis(symbol: Option<&str>) -> DsResult<Type> {
        symbol
            .map(TypeVar::new)
            .transpose()
            .map(Type::Ellipsis)
    }

    pub fn implements(symbol: &str, typeset: TypeSet) -> DsResult<Type> {
        Ok(Type::Implements {
            typevar: TypeVar::new(symbol)?,
            typeset,
        })
    }

    /// Nullable version of a measure. `??T` collapses to `?T`.
    pub fn option(inner: Type) -> DsResult<Type> {
        let inner = inner.launder();
        match inner.kind() {
            Kind::Measure | Kind::Free => {}
            _ => {
                return Err(DataShapeError::InvalidConstruction(format!(
                    "option expects a measure, got `{}`",
                    inner
                )));
            }
        }
        Ok(match inner {
            Type::Option(_) => inner,
            other => Type::Option(Box::new(other)),
        })
    }

    /// Collapse a one-parameter datashape into its sole parameter.
    pub fn launder(self) -> Type {
        match self {
            Type::DataShape(DataShape { mut parameters }) if parameters.len() == 1 => {
                parameters.swap_remove(0)
            }
            other => other,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Fixed(_) | Type::Var => Kind::Dimension,
            Type::Ellipsis(_) => Kind::Ellipsis,
            Type::TypeVar(_) | Type::Implements { .. } => Kind::Free,
            Type::CType(_)
            | Type::Record(_)
            | Type::Tuple(_)
            | Type::Option(_)
            | Type::Function(_) => Kind::Measure,
            Type::DataShape(ds) if ds.parameters.len() == 1 => ds.parameters[0].kind(),
            Type::DataShape(_) => Kind::Shape,
        }
    }

    /// Whether this term can sit in dimension position.
    #[inline]
    pub fn is_dimension_like(&self) -> bool {
        matches!(self.kind(), Kind::Dimension | Kind::Ellipsis | Kind::Free)
    }

    /// `Fixed(1)`, the broadcastable dimension.
    #[inline]
    pub fn is_unit_dim(&self) -> bool {
        matches!(self, Type::Fixed(1))
    }

    pub fn as_ctype(&self) -> Option<CType> {
        match self {
            Type::CType(ty) => Some(*ty),
            _ => None,
        }
    }

    pub fn as_typevar(&self) -> Option<&TypeVar> {
        match self {
            Type::TypeVar(tv) => Some(tv),
            _ => None,
        }
    }

    /// Every type variable mentioned by the term, in order of first appearance.
    pub fn free(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_free(&mut out);
        out
    }

    /// Whether a `var` dimension or an ellipsis appears anywhere in the term, nested
    /// records, tuples and functions included.
    pub fn has_var_dim(&self) -> bool {
        match self {
            Type::Var | Type::Ellipsis(_) => true,
            Type::Record(record) => record.types().any(Type::has_var_dim),
            Type::Tuple(tuple) => tuple.dshapes().iter().any(DataShape::has_var_dim),
            Type::Option(inner) => inner.has_var_dim(),
            Type::Function(func) => func.parameters().iter().any(DataShape::has_var_dim),
            Type::DataShape(ds) => ds.has_var_dim(),
            _ => false,
        }
    }

    fn collect_free(&self, out: &mut Vec<TypeVar>) {
        match self {
            Type::CType(_) | Type::Fixed(_) | Type::Var | Type::Ellipsis(None) => {}
            Type::TypeVar(tv) | Type::Ellipsis(Some(tv)) | Type::Implements { typevar: tv, .. } => {
                if !out.contains(tv) {
                    out.push(tv.clone());
                }
            }
            Type::Record(record) => record.types().for_each(|ty| ty.collect_free(out)),
            Type::Tuple(tuple) => tuple
                .dshapes()
                .iter()
                .for_each(|ds| ds.collect_free(out)),
            Type::Option(inner) => inner.collect_free(out),
            Type::Function(func) => func
                .parameters()
                .iter()
                .for_each(|ds| ds.collect_free(out)),
            Type::DataShape(ds) => ds.collect_free(out),
        }
    }
}

macro_rules! type_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Type {
                fn from(value: $ty) -> Self {
                    Type::$variant(value)
                }
            }
        )*
    };
}

type_from! {
    CType => CType,
    TypeVar => TypeVar,
    Record => Record,
    Tuple => Tuple,
    Function => Function,
}

impl From<DataShape> for Type {
    fn from(value: DataShape) -> Self {
        Type::DataShape(value).launder()
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::CType(ty) => write!(f, "{}", ty),
            Type::Fixed(n) => write!(f, "{}", n),
            Type::Var => write!(f, "var"),
            Type::TypeVar(tv) => write!(f, "{}", tv),
            Type::Ellipsis(None) => write!(f, "..."),
            Type::Ellipsis(Some(tv)) => write!(f, "{}...", tv),
            Type::Implements { typevar, typeset } => write!(f, "{} : {}", typevar, typeset),
            Type::Record(record) => write!(f, "{}", record),
            Type::Tuple(tuple) => write!(f, "{}", tuple),
            Type::Option(inner) => write!(f, "?{}", inner),
            Type::Function(func) => write!(f, "{}", func),
            Type::DataShape(ds) => write!(f, "{}", ds),
        }
    }
}

/// Dimensions followed by a measure.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DataShape {
    parameters: Vec<Type>,
}

impl DataShape {
    /// Build a datashape, checking that every parameter but the last can sit in dimension
    /// position and that the last one is not a plain dimension.
    ///
    /// A multi-dimensional datashape in last position is spliced in, so `3 * (4 * int32)`
    /// builds `3 * 4 * int32`.
    pub fn new(parameters: Vec<Type>) -> DsResult<Self> {
        let mut flat: Vec<Type> = Vec::with_capacity(parameters.len());
        let count = parameters.len();
        for (i, param) in parameters.into_iter().enumerate() {
            match param.launder() {
                Type::DataShape(inner) if i + 1 == count => flat.extend(inner.parameters),
                Type::DataShape(inner) => {
                    return Err(DataShapeError::InvalidConstruction(format!(
                        "datashape `{}` cannot be used as a dimension",
                        inner
                    )));
                }
                other => flat.push(other),
            }
        }

        let Some((measure, dims)) = flat.split_last() else {
            return Err(DataShapeError::InvalidConstruction(
                "a datashape needs at least one parameter".to_string(),
            ));
        };
        if !dims.is_empty() && measure.kind() == Kind::Dimension {
            return Err(DataShapeError::InvalidConstruction(format!(
                "the last parameter of a datashape must be a measure, got `{}`",
                measure
            )));
        }
        if let Some(bad) = dims.iter().find(|dim| !dim.is_dimension_like()) {
            return Err(DataShapeError::InvalidConstruction(format!(
                "only the last parameter of a datashape may be a measure, got `{}`",
                bad
            )));
        }

        Ok(Self { parameters: flat })
    }

    /// Prepend `dims` to `measure`.
    pub fn from_parts(dims: impl IntoIterator<Item = Type>, measure: Type) -> DsResult<Self> {
        let mut parameters: Vec<Type> = dims.into_iter().collect();
        parameters.push(measure);
        Self::new(parameters)
    }

    #[inline]
    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    /// Leading dimensions.
    #[inline]
    pub fn shape(&self) -> &[Type] {
        &self.parameters[..self.parameters.len() - 1]
    }

    /// Trailing measure.
    #[inline]
    pub fn measure(&self) -> &Type {
        &self.parameters[self.parameters.len() - 1]
    }

    /// Number of dimensions. An ellipsis counts as one.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.parameters.len() - 1
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Always `false`: a datashape holds at least its measure.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Index of the ellipsis among the dimensions, if any.
    pub fn ellipsis_position(&self) -> Option<usize> {
        self.shape().iter().position(Type::is_ellipsis)
    }

    /// Drop the `leading` first dimensions.
    ///
    /// ```rust
    /// # use dshape::parser::dshape;
    /// let ds = dshape("3 * var * int32").unwrap();
    /// assert_eq!(ds.subarray(1).unwrap().to_string(), "var * int32");
    /// assert!(ds.subarray(3).is_err());
    /// ```
    pub fn subarray(&self, leading: usize) -> DsResult<DataShape> {
        if leading > self.ndim() {
            return Err(DataShapeError::NotEnoughDimensions {
                datashape: self.to_string(),
                requested: leading,
            });
        }
        Ok(Self {
            parameters: self.parameters[leading..].to_vec(),
        })
    }

    pub fn free(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_free(&mut out);
        out
    }

    fn collect_free(&self, out: &mut Vec<TypeVar>) {
        for param in &self.parameters {
            param.collect_free(out);
        }
    }

    /// See [`Type::has_var_dim`].
    pub fn has_var_dim(&self) -> bool {
        self.parameters.iter().any(Type::has_var_dim)
    }
}

/// Concatenate datashapes along their first dimension.
///
/// Every leading dimension must be fixed, and what follows it must be identical across all
/// inputs. A single datashape is returned unchanged.
///
/// ```rust
/// # use dshape::{parser::dshapes, types::cat_dshapes};
/// let parts = dshapes(["5 * 3 * int32", "2 * 3 * int32"]).unwrap();
/// assert_eq!(cat_dshapes(&parts).unwrap().to_string(), "7 * 3 * int32");
/// ```
pub fn cat_dshapes(dshapes: &[DataShape]) -> DsResult<DataShape> {
    let Some((first, rest)) = dshapes.split_first() else {
        return Err(DataShapeError::InvalidConstruction(
            "cannot concatenate an empty list of datashapes".to_string(),
        ));
    };
    if rest.is_empty() {
        return Ok(first.clone());
    }

    let leading = |ds: &DataShape| match ds.shape().first() {
        Some(Type::Fixed(n)) => Ok(*n),
        _ => Err(DataShapeError::InvalidConstruction(format!(
            "datashape `{}` needs a fixed leading dimension to be concatenated",
            ds
        ))),
    };

    let mut total = leading(first)?;
    let inner = first.subarray(1)?;
    for ds in rest {
        total = total.checked_add(leading(ds)?).ok_or_else(|| {
            DataShapeError::InvalidConstruction("concatenated dimension overflows".to_string())
        })?;
        let other = ds.subarray(1)?;
        if other != inner {
            return Err(DataShapeError::InvalidConstruction(format!(
                "datashapes to concatenate must match after the first dimension (`{}` vs `{}`)",
                inner, other
            )));
        }
    }

    DataShape::from_parts(
        std::iter::once(Type::Fixed(total)).chain(inner.shape().iter().cloned()),
        inner.measure().clone(),
    )
}

impl From<Type> for DataShape {
    /// Wrap a term as a datashape. A single dimension or measure becomes a one-parameter
    /// pseudo-datashape.
    fn from(value: Type) -> Self {
        match value {
            Type::DataShape(ds) => ds,
            other => Self {
                parameters: vec![other],
            },
        }
    }
}

impl From<CType> for DataShape {
    fn from(value: CType) -> Self {
        Type::CType(value).into()
    }
}

impl std::fmt::Display for DataShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, " * ")?;
            }
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

/// Function signature: argument datashapes followed by the result datashape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Function {
    parameters: Vec<DataShape>,
}

impl Function {
    pub fn new(argtypes: impl IntoIterator<Item = DataShape>, restype: DataShape) -> Self {
        let mut parameters: Vec<DataShape> = argtypes.into_iter().collect();
        parameters.push(restype);
        Self { parameters }
    }

    /// Arguments then result. Fails on an empty list.
    pub fn from_parameters(parameters: Vec<DataShape>) -> DsResult<Self> {
        if parameters.is_empty() {
            return Err(DataShapeError::InvalidConstruction(
                "a function needs at least a return type".to_string(),
            ));
        }
        Ok(Self { parameters })
    }

    #[inline]
    pub fn parameters(&self) -> &[DataShape] {
        &self.parameters
    }

    #[inline]
    pub fn argtypes(&self) -> &[DataShape] {
        &self.parameters[..self.parameters.len() - 1]
    }

    #[inline]
    pub fn restype(&self) -> &DataShape {
        &self.parameters[self.parameters.len() - 1]
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.parameters.len() - 1
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, arg) in self.argtypes().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ") -> {}", self.restype())
    }
}
