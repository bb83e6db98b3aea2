//! Aggregate measures
//!
//! - `Record`: an ordered list of named fields; field order is significant for
//!   equality and printing.
//! - `Tuple`: an ordered, fixed-arity product of datashapes.
//!
//! Both are opaque to the equation matcher: a record or tuple measure only
//! matches as a whole.
use crate::{
    error::{DataShapeError, DsResult},
    types::{DataShape, Kind, Type},
};

/// Rewrite a field name into an identifier-safe form.
///
/// Characters outside `[A-Za-z0-9_]` become `_`, and a name that is empty or starts with a
/// digit is prefixed with `_`.
///
/// ```rust
/// # use dshape::types::aggregate::normalize_field_name;
/// assert_eq!(normalize_field_name("amount"), "amount");
/// assert_eq!(normalize_field_name("first name"), "first_name");
/// assert_eq!(normalize_field_name("0x"), "_0x");
/// ```
pub fn normalize_field_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if out.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Record type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
    fields: Vec<(String, Type)>,
}

impl Record {
    /// Build a record from `(name, type)` pairs. Names are normalized; a field holding a bare
    /// dimension is rejected.
    pub fn new<S: AsRef<str>>(fields: impl IntoIterator<Item = (S, Type)>) -> DsResult<Self> {
        let mut out = Vec::new();
        for (name, ty) in fields {
            let name = normalize_field_name(name.as_ref());
            let ty = ty.launder();
            if ty.kind() == Kind::Dimension {
                return Err(DataShapeError::InvalidConstruction(format!(
                    "record field `{}` must hold a datashape, not the dimension `{}`",
                    name, ty
                )));
            }
            if out.iter().any(|(existing, _)| existing == &name) {
                return Err(DataShapeError::InvalidConstruction(format!(
                    "duplicate record field `{}`",
                    name
                )));
            }
            out.push((name, ty));
        }
        Ok(Self { fields: out })
    }

    pub fn fields(&self) -> &[(String, Type)] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.fields.iter().map(|(_, ty)| ty)
    }

    /// Type of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn map_types(&self, mut f: impl FnMut(&Type) -> DsResult<Type>) -> DsResult<Self> {
        let fields = self
            .fields
            .iter()
            .map(|(name, ty)| Ok((name.clone(), f(ty)?.launder())))
            .collect::<DsResult<Vec<_>>>()?;
        Ok(Self { fields })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (name, ty)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
        }
        write!(f, "}}")
    }
}

/// Tuple type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tuple {
    dshapes: Vec<DataShape>,
}

impl Tuple {
    pub fn new(dshapes: Vec<DataShape>) -> Self {
        Self { dshapes }
    }

    pub fn dshapes(&self) -> &[DataShape] {
        &self.dshapes
    }

    pub fn len(&self) -> usize {
        self.dshapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dshapes.is_empty()
    }
}

impl FromIterator<DataShape> for Tuple {
    fn from_iter<T: IntoIterator<Item = DataShape>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Tuple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, ds) in self.dshapes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", ds)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::scalar::CType;

    #[test]
    fn record_normalizes_and_keeps_order() {
        let rec = Record::new([
            ("b field", Type::from(CType::INT32)),
            ("a", Type::from(CType::STRING)),
        ])
        .unwrap();
        assert_eq!(rec.names().collect::<Vec<_>>(), vec!["b_field", "a"]);
        assert_eq!(rec.to_string(), "{b_field: int32, a: string}");
        assert_eq!(rec.get("a"), Some(&Type::from(CType::STRING)));
    }

    #[test]
    fn record_order_is_significant() {
        let ab = Record::new([("a", CType::INT32.into()), ("b", CType::INT64.into())]).unwrap();
        let ba = Record::new([("b", CType::INT64.into()), ("a", CType::INT32.into())]).unwrap();
        assert_ne!(ab, ba);
    }

    #[test]
    fn record_rejects_dimension_field() {
        let err = Record::new([("x", Type::Fixed(3))]).unwrap_err();
        assert!(err.is_invalid_construction());
    }
}
