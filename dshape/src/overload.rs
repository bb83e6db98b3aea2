//! Named overload sets and minimum-cost dispatch.
use log::debug;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::{
    error::{DataShapeError, DsResult},
    parser,
    solver::{MatchOutcome, Solver, TypeVarResolver},
    types::{Function, Tuple, Type},
};

/// Ordered list of candidate signatures under a display name.
///
/// Registration takes the write lock; resolution matches against a snapshot taken under the
/// read lock, so a populated set can be shared between threads and resolved concurrently.
#[derive(Debug)]
pub struct OverloadResolver {
    name: String,
    overloads: RwLock<Vec<Function>>,
}

impl OverloadResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: RwLock::new(Vec::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.overloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.overloads.read().is_empty()
    }

    /// Signature registered at `index`.
    pub fn get(&self, index: usize) -> Option<MappedRwLockReadGuard<'_, Function>> {
        RwLockReadGuard::try_map(self.overloads.read(), |overloads| overloads.get(index)).ok()
    }

    /// Append signatures. Every term must be a function; on failure nothing is registered.
    pub fn extend_overloads<T: Into<Type>>(
        &self,
        signatures: impl IntoIterator<Item = T>,
    ) -> DsResult<()> {
        let signatures = signatures
            .into_iter()
            .map(|signature| match signature.into() {
                Type::Function(func) => Ok(func),
                other => Err(DataShapeError::InvalidSignature(other.to_string())),
            })
            .collect::<DsResult<Vec<_>>>()?;

        let mut overloads = self.overloads.write();
        debug!(
            "{}: registering {} overload(s) after {} existing",
            self.name,
            signatures.len(),
            overloads.len()
        );
        overloads.extend(signatures);
        Ok(())
    }

    /// Parse and append signatures written as text.
    pub fn extend_overloads_from_str<S: AsRef<str>>(
        &self,
        signatures: impl IntoIterator<Item = S>,
    ) -> DsResult<()> {
        let parsed = signatures
            .into_iter()
            .map(|src| parser::signature(src.as_ref()))
            .collect::<DsResult<Vec<_>>>()?;
        self.extend_overloads(parsed)
    }

    /// Pick the cheapest matching overload using the global coercion table.
    ///
    /// Returns the index of the winning signature and its resolved form.
    pub fn resolve_overload(
        &self,
        argtypes: &Tuple,
        resolver: Option<&dyn TypeVarResolver>,
    ) -> DsResult<(usize, Function)> {
        self.resolve_overload_with(&Solver::default(), argtypes, resolver)
    }

    /// [`resolve_overload`](Self::resolve_overload) with an explicit solver.
    ///
    /// Candidates whose arity differs are skipped. Coercion and unification failures are
    /// swallowed per candidate; when no candidate matches, the last such failure is returned,
    /// or [`DataShapeError::NoMatchingOverload`] if there was none. Several candidates at the
    /// lowest cost give [`DataShapeError::AmbiguousOverload`].
    pub fn resolve_overload_with(
        &self,
        solver: &Solver<'_>,
        argtypes: &Tuple,
        resolver: Option<&dyn TypeVarResolver>,
    ) -> DsResult<(usize, Function)> {
        // No lock is held while matching: `resolver` may re-enter this set.
        let overloads = self.overloads.read().clone();

        let mut min_cost = f64::INFINITY;
        let mut candidates: Vec<(usize, Function)> = Vec::new();
        let mut last_error = None;

        for (index, signature) in overloads.iter().enumerate() {
            if signature.arity() != argtypes.len() {
                continue;
            }

            match solver.match_argtypes_to_signature(argtypes, signature, resolver, min_cost) {
                Ok(MatchOutcome::Matched { signature, cost }) => {
                    if cost < min_cost {
                        min_cost = cost;
                        candidates.clear();
                    }
                    if cost <= min_cost {
                        candidates.push((index, signature));
                    }
                }
                Ok(MatchOutcome::Pruned { .. }) => {}
                Err(err) if err.is_recoverable() => {
                    debug!("{}: rejected overload #{}: {}", self.name, index, err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        match candidates.len() {
            0 => Err(last_error.unwrap_or_else(|| DataShapeError::NoMatchingOverload {
                name: self.name.clone(),
                argtypes: argtypes.to_string(),
            })),
            1 => {
                let (index, signature) = candidates.swap_remove(0);
                debug!(
                    "{}: resolved {} to overload #{} `{}` (cost {})",
                    self.name, argtypes, index, signature, min_cost
                );
                Ok((index, signature))
            }
            _ => Err(DataShapeError::AmbiguousOverload {
                name: self.name.clone(),
                argtypes: argtypes.to_string(),
                candidates: candidates
                    .into_iter()
                    .map(|(_, signature)| signature.to_string())
                    .collect(),
            }),
        }
    }
}

/// Winning overload of a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct Overload<P> {
    /// The signature with every symbol substituted for this call.
    pub resolved: Function,
    /// The signature as registered.
    pub signature: Function,
    pub payload: P,
}

/// Overload set carrying a payload (an implementation, a kernel id, ...) per signature.
#[derive(Debug)]
pub struct Dispatcher<P> {
    overloads: OverloadResolver,
    payloads: RwLock<Vec<P>>,
}

impl<P: Clone> Dispatcher<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            overloads: OverloadResolver::new(name),
            payloads: RwLock::new(Vec::new()),
        }
    }

    /// The underlying overload set.
    #[inline]
    pub fn overloads(&self) -> &OverloadResolver {
        &self.overloads
    }

    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }

    /// Register `payload` under `signature`, which must be a function type.
    pub fn add_overload<T: Into<Type>>(&self, payload: P, signature: T) -> DsResult<()> {
        // Held across both pushes so that indices of signatures and payloads agree.
        let mut payloads = self.payloads.write();
        self.overloads.extend_overloads([signature])?;
        payloads.push(payload);
        Ok(())
    }

    /// [`add_overload`](Self::add_overload) with a signature written as text.
    pub fn add_overload_from_str(&self, payload: P, signature: &str) -> DsResult<()> {
        self.add_overload(payload, parser::signature(signature)?)
    }

    /// Cheapest overload for `argtypes` on the global coercion table.
    pub fn best_match(&self, argtypes: &Tuple) -> DsResult<Overload<P>> {
        self.best_match_with(&Solver::default(), argtypes, None)
    }

    /// [`best_match`](Self::best_match) with an explicit solver and resolver.
    pub fn best_match_with(
        &self,
        solver: &Solver<'_>,
        argtypes: &Tuple,
        resolver: Option<&dyn TypeVarResolver>,
    ) -> DsResult<Overload<P>> {
        let (index, resolved) = self
            .overloads
            .resolve_overload_with(solver, argtypes, resolver)?;

        let signature = self.overloads.get(index).map(|sig| (*sig).clone());
        let payload = self.payloads.read().get(index).cloned();
        match (signature, payload) {
            (Some(signature), Some(payload)) => Ok(Overload {
                resolved,
                signature,
                payload,
            }),
            _ => Err(DataShapeError::NoMatchingOverload {
                name: self.overloads.name().to_string(),
                argtypes: argtypes.to_string(),
            }),
        }
    }
}
