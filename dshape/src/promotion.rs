//! Broadcasting of dimensions and promotion of measures.
//!
//! Both are used to collapse the values a type variable was bound to across
//! argument positions into one value.
use crate::{
    error::{DataShapeError, DsResult},
    types::{CType, ScalarKind, Type},
};

/// Broadcast two dimensions.
///
/// `1` yields to anything, equal dimensions stay, `var` yields to a fixed size.
pub fn broadcast_dims(a: &Type, b: &Type) -> DsResult<Type> {
    match (a, b) {
        _ if a == b => Ok(a.clone()),
        (Type::Fixed(1), other) | (other, Type::Fixed(1)) => Ok(other.clone()),
        (Type::Var, Type::Fixed(n)) | (Type::Fixed(n), Type::Var) => Ok(Type::Fixed(*n)),
        _ => Err(DataShapeError::Unification(format!(
            "cannot broadcast dimensions `{}` and `{}`",
            a, b
        ))),
    }
}

/// Broadcast two lists of dimensions, aligned on the right.
///
/// ```rust
/// # use dshape::{promotion::broadcast_dim_lists, types::Type};
/// let out = broadcast_dim_lists(&[Type::Fixed(1), Type::Fixed(3)], &[Type::Fixed(5), Type::Fixed(4), Type::Fixed(1)]).unwrap();
/// assert_eq!(out, vec![Type::Fixed(5), Type::Fixed(4), Type::Fixed(3)]);
/// ```
pub fn broadcast_dim_lists(a: &[Type], b: &[Type]) -> DsResult<Vec<Type>> {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let offset = long.len() - short.len();

    let mut out = long[..offset].to_vec();
    for (x, y) in long[offset..].iter().zip(short) {
        out.push(broadcast_dims(x, y)?);
    }
    Ok(out)
}

/// Bits a float needs to hold every value of an integer with `bits` bits.
fn float_bits_for_int(bits: usize) -> usize {
    match bits {
        0..=8 => 16,
        9..=16 => 32,
        _ => 64,
    }
}

fn component_bits(ty: CType) -> usize {
    match ty.kind() {
        ScalarKind::Signed | ScalarKind::Unsigned => float_bits_for_int(ty.bits()),
        _ => ty.bits(),
    }
}

/// Smallest scalar both `a` and `b` convert to without loss, following the usual numeric
/// promotion rules. `None` for non-numeric mismatches.
///
/// ```rust
/// # use dshape::{promotion::promote_scalars, types::CType};
/// assert_eq!(promote_scalars(CType::INT32, CType::FLOAT32), Some(CType::FLOAT64));
/// assert_eq!(promote_scalars(CType::UINT8, CType::INT8), Some(CType::INT16));
/// assert_eq!(promote_scalars(CType::STRING, CType::INT8), None);
/// ```
pub fn promote_scalars(a: CType, b: CType) -> Option<CType> {
    use ScalarKind::*;

    if a == b {
        return Some(a);
    }
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }

    match (a.kind(), b.kind()) {
        (Bool, _) => Some(b),
        (_, Bool) => Some(a),
        (ka, kb) if ka == kb => Some(if a.bits() >= b.bits() { a } else { b }),
        (Signed, Unsigned) | (Unsigned, Signed) => {
            let (signed, unsigned) = if a.kind() == Signed { (a, b) } else { (b, a) };
            if signed.bits() > unsigned.bits() {
                Some(signed)
            } else {
                CType::signed(unsigned.bits() * 2).or(Some(CType::FLOAT64))
            }
        }
        (Float, Signed | Unsigned) | (Signed | Unsigned, Float) => {
            CType::float(component_bits(a).max(component_bits(b)))
        }
        (Complex, _) | (_, Complex) => CType::complex(component_bits(a).max(component_bits(b))),
        _ => None,
    }
}

/// Wrap `promoted` in an option when either input was optional.
pub fn optionify(a: &Type, b: &Type, promoted: Type) -> Type {
    if (a.is_option() || b.is_option()) && !promoted.is_option() {
        Type::Option(Box::new(promoted))
    } else {
        promoted
    }
}

/// Promote two measures to a common measure.
pub fn promote(a: &Type, b: &Type) -> DsResult<Type> {
    if a == b {
        return Ok(a.clone());
    }

    let unwrap = |ty: &Type| -> Type {
        match ty {
            Type::Option(inner) => (**inner).clone(),
            other => other.clone(),
        }
    };
    let (inner_a, inner_b) = (unwrap(a), unwrap(b));

    let promoted = match (&inner_a, &inner_b) {
        _ if inner_a == inner_b => inner_a.clone(),
        (Type::CType(x), Type::CType(y)) => promote_scalars(*x, *y)
            .map(Type::CType)
            .ok_or_else(|| {
                DataShapeError::Unification(format!("cannot promote `{}` and `{}`", a, b))
            })?,
        _ => {
            return Err(DataShapeError::Unification(format!(
                "cannot promote `{}` and `{}`",
                a, b
            )));
        }
    };
    Ok(optionify(a, b, promoted))
}
