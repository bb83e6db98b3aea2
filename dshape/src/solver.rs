//! Matching argument types against polymorphic signatures.
//!
//! Matching one call happens in three steps:
//! 1. every `(argument, parameter)` pair is split into elementary equations by
//!    [`match_equation`];
//! 2. each equation either binds a type variable or is priced with the
//!    coercion table; the cost of the whole match is the **maximum** equation
//!    cost, and a match whose cost exceeds the cutoff is abandoned early;
//! 3. the values bound to each variable are merged (broadcast for ellipses,
//!    equality for plain dimensions, promotion for measures) and substituted
//!    back into the signature.
use std::collections::BTreeMap;

use log::{debug, trace};
use strum::EnumIs;

use crate::{
    coercion::{self, CoercionTable},
    error::{DataShapeError, DsResult},
    promotion::{broadcast_dim_lists, promote},
    types::{DataShape, Function, Tuple, Type, TypeVar},
};

/// One elementary equation between a concrete sub-term and a signature sub-term.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Equation {
    /// A dimension or the measure, paired one to one.
    Term(Type, Type),
    /// The run of concrete dimensions absorbed by an ellipsis, with the ellipsis name.
    Ellipsis(Vec<Type>, Option<TypeVar>),
}

/// Split `src` against `dst` into one equation per parameter of `dst`.
///
/// Dimensions are paired from the left until `dst` reaches its ellipsis, then from the right;
/// the ellipsis absorbs whatever remains in the middle. The last equation always pairs the
/// two measures. Record and tuple measures are not decomposed further.
///
/// ```rust
/// # use dshape::{parser::dshape, solver::{match_equation, Equation}, types::Type};
/// let eqs = match_equation(&dshape("5 * 4 * 3 * int32").unwrap(), &dshape("A... * 3 * T").unwrap()).unwrap();
/// assert_eq!(eqs.len(), 3);
/// assert!(matches!(&eqs[0], Equation::Ellipsis(dims, Some(_)) if dims == &[Type::Fixed(5), Type::Fixed(4)]));
/// ```
pub fn match_equation(src: &DataShape, dst: &DataShape) -> DsResult<Vec<Equation>> {
    let (sdims, ddims) = (src.shape(), dst.shape());

    let mut left = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < sdims.len() && j < ddims.len() && !ddims[j].is_ellipsis() {
        left.push(Equation::Term(sdims[i].clone(), ddims[j].clone()));
        i += 1;
        j += 1;
    }

    let mut right = Vec::new();
    let (mut si, mut dj) = (sdims.len(), ddims.len());
    while si > i && dj > j && !ddims[dj - 1].is_ellipsis() {
        right.push(Equation::Term(sdims[si - 1].clone(), ddims[dj - 1].clone()));
        si -= 1;
        dj -= 1;
    }

    let mut equations = left;
    if dj == j + 1 {
        match &ddims[j] {
            Type::Ellipsis(tv) => equations.push(Equation::Ellipsis(sdims[i..si].to_vec(), tv.clone())),
            _ => return Err(shape_mismatch(src, dst)),
        }
    } else if !(dj == j && si == i) {
        return Err(shape_mismatch(src, dst));
    }
    equations.extend(right.into_iter().rev());
    equations.push(Equation::Term(src.measure().clone(), dst.measure().clone()));
    Ok(equations)
}

fn shape_mismatch(src: &DataShape, dst: &DataShape) -> DataShapeError {
    DataShapeError::coercion(&Type::from(src.clone()), &Type::from(dst.clone()))
}

/// Final value of a type variable.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Binding {
    /// Plain dimension variable (`N`).
    Dim(Type),
    /// Ellipsis variable (`A...`).
    Dims(Vec<Type>),
    /// Measure variable (`T`, `T : floating`).
    Measure(Type),
}

pub type Bindings = BTreeMap<TypeVar, Binding>;

/// Supplies values for symbols of a return type that the arguments do not bind.
pub trait TypeVarResolver {
    fn resolve(&self, symbol: &TypeVar, bindings: &Bindings) -> Option<Binding>;
}

impl<F> TypeVarResolver for F
where
    F: Fn(&TypeVar, &Bindings) -> Option<Binding>,
{
    fn resolve(&self, symbol: &TypeVar, bindings: &Bindings) -> Option<Binding> {
        self(symbol, bindings)
    }
}

/// Result of matching one signature.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum MatchOutcome {
    /// The signature matched; all its symbols have been substituted.
    Matched { signature: Function, cost: f64 },
    /// The cost exceeded the cutoff and matching stopped early.
    Pruned { cost: f64 },
}

impl MatchOutcome {
    pub fn cost(&self) -> f64 {
        match self {
            MatchOutcome::Matched { cost, .. } | MatchOutcome::Pruned { cost } => *cost,
        }
    }

    pub fn into_matched(self) -> Option<(Function, f64)> {
        match self {
            MatchOutcome::Matched { signature, cost } => Some((signature, cost)),
            MatchOutcome::Pruned { .. } => None,
        }
    }
}

/// Values captured for each symbol while processing equations.
#[derive(Default)]
struct Captures {
    dims: BTreeMap<TypeVar, Vec<Type>>,
    ellipses: BTreeMap<TypeVar, Vec<Vec<Type>>>,
    dtypes: BTreeMap<TypeVar, Vec<Type>>,
    /// Dimensions absorbed by the ellipsis of each argument, if it has one.
    per_argument: Vec<Option<Vec<Type>>>,
}

impl Captures {
    fn into_bindings(self) -> DsResult<Bindings> {
        let mut bindings = Bindings::new();

        for (tv, lists) in self.ellipses {
            let Some((first, rest)) = lists.split_first() else {
                continue;
            };
            let mut dims = first.clone();
            for other in rest {
                dims = broadcast_dim_lists(&dims, other)?;
            }
            bindings.insert(tv, Binding::Dims(dims));
        }

        for (tv, values) in self.dims {
            let Some((first, rest)) = values.split_first() else {
                continue;
            };
            if let Some(other) = rest.iter().find(|value| *value != first) {
                return Err(DataShapeError::Unification(format!(
                    "type variable `{}` bound to both `{}` and `{}`",
                    tv, first, other
                )));
            }
            bindings.insert(tv, Binding::Dim(first.clone()));
        }

        for (tv, values) in self.dtypes {
            let Some((first, rest)) = values.split_first() else {
                continue;
            };
            let mut dtype = first.clone();
            for other in rest {
                dtype = promote(&dtype, other)?;
            }
            bindings.insert(tv, Binding::Measure(dtype));
        }

        Ok(bindings)
    }
}

fn record_kind<'s>(
    kinds: &mut BTreeMap<&'s TypeVar, &'static str>,
    tv: &'s TypeVar,
    kind: &'static str,
) -> DsResult<()> {
    match kinds.insert(tv, kind) {
        Some(previous) if previous != kind => Err(DataShapeError::AmbiguousTypeVar {
            symbol: tv.to_string(),
            first: previous,
            second: kind,
        }),
        _ => Ok(()),
    }
}

/// Reject a symbol used as more than one of dimension, ellipsis and measure.
fn check_symbol_kinds(signature: &Function) -> DsResult<()> {
    let mut kinds = BTreeMap::new();

    for ds in signature.parameters() {
        for dim in ds.shape() {
            if let Some(tv) = dim.as_typevar() {
                record_kind(&mut kinds, tv, "dimension")?;
            } else if let Type::Ellipsis(Some(tv)) = dim {
                record_kind(&mut kinds, tv, "ellipsis")?;
            }
        }
        if let Type::TypeVar(tv) | Type::Implements { typevar: tv, .. } = ds.measure() {
            record_kind(&mut kinds, tv, "measure")?;
        }
    }
    Ok(())
}

/// Substitutes bindings into signature terms.
struct Substitution<'b> {
    bindings: &'b Bindings,
    signature: &'b Function,
    /// Fail on unbound symbols instead of leaving them in place.
    strict: bool,
}

impl Substitution<'_> {
    fn unresolved(&self, symbol: &str) -> DataShapeError {
        DataShapeError::UnresolvedSymbol {
            symbol: symbol.to_string(),
            signature: self.signature.to_string(),
        }
    }

    fn datashape(&self, ds: &DataShape, captured: Option<&[Type]>) -> DsResult<DataShape> {
        let mut parameters = Vec::with_capacity(ds.len());

        for dim in ds.shape() {
            match dim {
                Type::Ellipsis(tv) => {
                    if let Some(dims) = captured {
                        parameters.extend(dims.iter().cloned());
                        continue;
                    }
                    match tv.as_ref().and_then(|tv| self.bindings.get(tv)) {
                        Some(Binding::Dims(dims)) => parameters.extend(dims.iter().cloned()),
                        _ if self.strict => {
                            let symbol = tv.as_ref().map_or("...", |tv| tv.symbol());
                            return Err(self.unresolved(symbol));
                        }
                        _ => parameters.push(dim.clone()),
                    }
                }
                Type::TypeVar(tv) => match self.bindings.get(tv) {
                    Some(Binding::Dim(value)) => parameters.push(value.clone()),
                    _ if self.strict => return Err(self.unresolved(tv.symbol())),
                    _ => parameters.push(dim.clone()),
                },
                other => parameters.push(other.clone()),
            }
        }

        parameters.push(self.measure(ds.measure())?);
        DataShape::new(parameters)
    }

    fn measure(&self, ty: &Type) -> DsResult<Type> {
        match ty {
            Type::TypeVar(tv) | Type::Implements { typevar: tv, .. } => {
                match self.bindings.get(tv) {
                    Some(Binding::Measure(value)) => Ok(value.clone()),
                    _ if self.strict => Err(self.unresolved(tv.symbol())),
                    _ => Ok(ty.clone()),
                }
            }
            Type::Record(record) => record
                .map_types(|field| self.nested(field))
                .map(Type::Record),
            Type::Tuple(tuple) => tuple
                .dshapes()
                .iter()
                .map(|ds| self.datashape(ds, None))
                .collect::<DsResult<Tuple>>()
                .map(Type::Tuple),
            Type::Option(inner) => Type::option(self.measure(inner)?),
            Type::Function(func) => func
                .parameters()
                .iter()
                .map(|ds| self.datashape(ds, None))
                .collect::<DsResult<Vec<_>>>()
                .and_then(Function::from_parameters)
                .map(Type::Function),
            Type::DataShape(ds) => self.datashape(ds, None).map(Type::from),
            other => Ok(other.clone()),
        }
    }

    fn nested(&self, ty: &Type) -> DsResult<Type> {
        match ty {
            Type::DataShape(ds) => self.datashape(ds, None).map(Type::from),
            other => self.measure(other),
        }
    }
}

/// Signature matcher over a coercion table.
#[derive(Debug, Clone, Copy)]
pub struct Solver<'t> {
    table: &'t CoercionTable,
}

impl Default for Solver<'static> {
    fn default() -> Self {
        Self::new(coercion::global())
    }
}

impl<'t> Solver<'t> {
    pub fn new(table: &'t CoercionTable) -> Self {
        Self { table }
    }

    #[inline]
    pub fn table(&self) -> &'t CoercionTable {
        self.table
    }

    fn dim_equation_cost(&self, src: Type, dst: Type, captures: &mut Captures) -> DsResult<f64> {
        if let Type::TypeVar(tv) = &dst {
            captures.dims.entry(tv.clone()).or_default().push(src);
            return Ok(self.table.cost_model().dim_typevar);
        }
        let cost = self.table.dim_coercion_cost(&src, &dst);
        if cost.is_infinite() {
            return Err(DataShapeError::coercion(&src, &dst));
        }
        Ok(cost)
    }

    fn measure_equation_cost(
        &self,
        src: Type,
        dst: Type,
        captures: &mut Captures,
    ) -> DsResult<f64> {
        match &dst {
            Type::TypeVar(tv) => {
                captures.dtypes.entry(tv.clone()).or_default().push(src);
                Ok(self.table.cost_model().dtype_typevar)
            }
            Type::Implements { typevar, typeset } => match src.as_ctype() {
                Some(ty) if typeset.contains(&ty) => {
                    captures.dtypes.entry(typevar.clone()).or_default().push(src);
                    Ok(self.table.cost_model().dtype_typevar)
                }
                _ => Err(DataShapeError::coercion(&src, &dst)),
            },
            _ => {
                let cost = self.table.dtype_coercion_cost(&src, &dst);
                if cost.is_infinite() {
                    return Err(DataShapeError::coercion(&src, &dst));
                }
                Ok(cost)
            }
        }
    }

    /// Match concrete argument types against a signature.
    ///
    /// Returns the signature with every symbol substituted and the cost of the match, or
    /// [`MatchOutcome::Pruned`] as soon as the cost exceeds `cutoff`. Symbols of the return
    /// type that the arguments leave unbound are offered to `resolver`.
    pub fn match_argtypes_to_signature(
        &self,
        argtypes: &Tuple,
        signature: &Function,
        resolver: Option<&dyn TypeVarResolver>,
        cutoff: f64,
    ) -> DsResult<MatchOutcome> {
        if argtypes.len() != signature.arity() {
            return Err(DataShapeError::ArityMismatch {
                signature: signature.to_string(),
                expected: signature.arity(),
                got: argtypes.len(),
            });
        }

        let mut captures = Captures::default();
        let mut max_cost = 0.0f64;

        for (arg, param) in argtypes.dshapes().iter().zip(signature.argtypes()) {
            let equations = match_equation(arg, param)?;
            let count = equations.len();
            let mut captured = None;

            for (i, equation) in equations.into_iter().enumerate() {
                let cost = match equation {
                    Equation::Ellipsis(dims, tv) => {
                        if let Some(tv) = tv {
                            captures.ellipses.entry(tv).or_default().push(dims.clone());
                        }
                        captured = Some(dims);
                        self.table.cost_model().ellipsis
                    }
                    Equation::Term(src, dst) if i + 1 == count => {
                        self.measure_equation_cost(src, dst, &mut captures)?
                    }
                    Equation::Term(src, dst) => self.dim_equation_cost(src, dst, &mut captures)?,
                };
                trace!("`{}` against `{}`: equation {} costs {}", arg, param, i, cost);

                max_cost = max_cost.max(cost);
                if max_cost > cutoff {
                    debug!(
                        "Pruned `{}` at cost {} (cutoff {})",
                        signature, max_cost, cutoff
                    );
                    return Ok(MatchOutcome::Pruned { cost: max_cost });
                }
            }
            captures.per_argument.push(captured);
        }

        check_symbol_kinds(signature)?;

        let per_argument = std::mem::take(&mut captures.per_argument);
        let mut bindings = captures.into_bindings()?;

        if let Some(resolver) = resolver {
            for symbol in signature.restype().free() {
                if bindings.contains_key(&symbol) {
                    continue;
                }
                if let Some(binding) = resolver.resolve(&symbol, &bindings) {
                    debug!("Resolver bound `{}` to {:?}", symbol, binding);
                    bindings.insert(symbol, binding);
                }
            }
        }

        let lenient = Substitution {
            bindings: &bindings,
            signature,
            strict: false,
        };
        let mut parameters = signature
            .argtypes()
            .iter()
            .zip(&per_argument)
            .map(|(param, captured)| lenient.datashape(param, captured.as_deref()))
            .collect::<DsResult<Vec<_>>>()?;

        let strict = Substitution {
            strict: true,
            ..lenient
        };
        parameters.push(strict.datashape(signature.restype(), None)?);

        let resolved = Function::from_parameters(parameters)?;
        debug!("Matched `{}` as `{}` (cost {})", signature, resolved, max_cost);
        Ok(MatchOutcome::Matched {
            signature: resolved,
            cost: max_cost,
        })
    }
}

/// [`Solver::match_argtypes_to_signature`] on the global coercion table, for untyped terms.
///
/// `argtypes` must be a tuple and `signature` a function.
pub fn match_argtypes_to_signature(
    argtypes: &Type,
    signature: &Type,
    resolver: Option<&dyn TypeVarResolver>,
    cutoff: f64,
) -> DsResult<MatchOutcome> {
    let Type::Tuple(argtypes) = argtypes else {
        return Err(DataShapeError::InvalidArgtypes(argtypes.to_string()));
    };
    let Type::Function(signature) = signature else {
        return Err(DataShapeError::InvalidSignature(signature.to_string()));
    };
    Solver::default().match_argtypes_to_signature(argtypes, signature, resolver, cutoff)
}

/// Whether `concrete` matches `pattern`, binding any symbols of the pattern.
///
/// ```rust
/// # use dshape::{parser::dshape, solver::matches_datashape_pattern};
/// let concrete = dshape("10 * 3 * float32").unwrap();
/// assert!(matches_datashape_pattern(&concrete, &dshape("A... * 3 * T").unwrap()));
/// assert!(!matches_datashape_pattern(&concrete, &dshape("4 * T").unwrap()));
/// ```
pub fn matches_datashape_pattern(concrete: &DataShape, pattern: &DataShape) -> bool {
    let signature = Function::new([pattern.clone()], crate::types::CType::VOID.into());
    let argtypes = Tuple::new(vec![concrete.clone()]);
    Solver::default()
        .match_argtypes_to_signature(&argtypes, &signature, None, f64::INFINITY)
        .is_ok_and(|outcome| outcome.is_matched())
}
