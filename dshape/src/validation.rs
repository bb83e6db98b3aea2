//! Well-formedness checks that construction alone does not enforce.
use crate::{
    error::{DataShapeError, DsResult},
    types::{DataShape, Type},
};

/// Validate a datashape and every datashape nested in its measure.
///
/// Rejects:
/// - more than one ellipsis among the dimensions;
/// - an ellipsis in measure position;
/// - a type set constraint (`A : floating`) anywhere but the trailing measure.
pub fn validate(ds: &DataShape) -> DsResult<()> {
    let ellipses = ds.shape().iter().filter(|dim| dim.is_ellipsis()).count();
    if ellipses > 1 {
        return Err(DataShapeError::Validation(format!(
            "can use at most one ellipsis, got {} in `{}`",
            ellipses, ds
        )));
    }

    if ds.measure().is_ellipsis() {
        return Err(DataShapeError::Validation(format!(
            "measure may not be an ellipsis in `{}`",
            ds
        )));
    }

    if let Some(constraint) = ds.shape().iter().find(|dim| dim.is_implements()) {
        return Err(DataShapeError::Validation(format!(
            "type constraint `{}` may only appear in the measure of `{}`",
            constraint, ds
        )));
    }

    validate_measure(ds.measure())
}

fn validate_measure(measure: &Type) -> DsResult<()> {
    match measure {
        Type::Record(record) => record
            .types()
            .try_for_each(|ty| validate(&DataShape::from(ty.clone()))),
        Type::Tuple(tuple) => tuple.dshapes().iter().try_for_each(validate),
        Type::Function(func) => func.parameters().iter().try_for_each(validate),
        Type::Option(inner) => validate_measure(inner),
        _ => Ok(()),
    }
}
