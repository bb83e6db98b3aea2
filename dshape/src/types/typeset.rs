//! Named sets of scalar types, used to constrain a measure type variable
//! (`A : floating`).
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::types::scalar::{CType, ScalarKind};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum TypeSet {
    Boolean,
    Signed,
    Unsigned,
    Integral,
    Floating,
    Complexes,
    Numeric,
    Scalar,
}

impl TypeSet {
    /// Membership test on a scalar.
    pub fn contains(&self, ty: &CType) -> bool {
        let kind = ty.kind();
        match self {
            TypeSet::Boolean => kind.is_bool(),
            TypeSet::Signed => kind.is_signed(),
            TypeSet::Unsigned => kind.is_unsigned(),
            TypeSet::Integral => kind.is_signed() || kind.is_unsigned(),
            TypeSet::Floating => kind.is_float(),
            TypeSet::Complexes => kind.is_complex(),
            TypeSet::Numeric => ty.is_numeric() && kind != ScalarKind::Bool,
            TypeSet::Scalar => ty.is_numeric(),
        }
    }

    /// The members of the set, in registration order.
    pub fn types(&self) -> impl Iterator<Item = CType> + '_ {
        CType::ALL.into_iter().filter(move |ty| self.contains(ty))
    }

    pub fn len(&self) -> usize {
        self.types().count()
    }

    /// Look up a set by its lowercase name.
    pub fn from_name(name: &str) -> Option<TypeSet> {
        name.parse().ok()
    }

    /// All the named sets.
    pub fn all() -> impl Iterator<Item = TypeSet> {
        TypeSet::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typeset_membership() {
        assert!(TypeSet::Floating.contains(&CType::FLOAT32));
        assert!(!TypeSet::Floating.contains(&CType::INT32));
        assert!(TypeSet::Integral.contains(&CType::UINT8));
        assert!(!TypeSet::Numeric.contains(&CType::BOOL));
        assert!(TypeSet::Scalar.contains(&CType::BOOL));
        assert_eq!(TypeSet::Floating.len(), 3);
        assert_eq!(TypeSet::Complexes.len(), 2);
    }

    #[test]
    fn typeset_names_round_trip() {
        for set in TypeSet::all() {
            assert_eq!(TypeSet::from_name(&set.to_string()), Some(set));
        }
        assert_eq!(TypeSet::from_name("floats"), None);
    }
}
