//! Coercion costs between types.
//!
//! Scalar-to-scalar costs live in a directed weighted graph kept transitively
//! closed: every edge `a -> b` carries the cheapest known cost of any path from
//! `a` to `b`. Dimension, datashape and aggregate costs are derived from it by
//! [`CoercionTable::coercion_cost`].
use std::collections::{BTreeSet, VecDeque};

use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use petgraph::{Direction, graphmap::DiGraphMap};

use crate::{
    config::CostModel,
    error::{DataShapeError, DsResult},
    solver::{Equation, match_equation},
    types::{CType, DataShape, Kind, Type, TypeVar},
};

/// Cost to coerce a number to a wider number of the same family.
const WIDENING: f64 = 1.0;
/// Cost of conversions that may lose precision or flip sign.
const LOSSY: f64 = 1.5;

#[derive(Debug, Clone)]
pub struct CoercionTable {
    graph: DiGraphMap<CType, f64>,
    costs: CostModel,
}

impl Default for CoercionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CoercionTable {
    /// Empty table with the default cost model.
    pub fn new() -> Self {
        Self::with_cost_model(CostModel::default())
    }

    /// Empty table with a custom cost model.
    pub fn with_cost_model(costs: CostModel) -> Self {
        Self {
            graph: DiGraphMap::new(),
            costs,
        }
    }

    /// Table seeded with the numeric coercion rules.
    pub fn with_default_rules(costs: CostModel) -> Self {
        let mut table = Self::with_cost_model(costs);
        table.register_default_rules();
        table
    }

    #[inline]
    pub fn cost_model(&self) -> &CostModel {
        &self.costs
    }

    /// Record that `src` coerces to `dst` at `cost`, keeping the cheaper of the new and the
    /// known cost. With `transitive`, every path through the new edge is relaxed as well.
    pub fn add_coercion(
        &mut self,
        src: CType,
        dst: CType,
        cost: f64,
        transitive: bool,
    ) -> DsResult<()> {
        if cost.is_nan() || cost < 0.0 {
            return Err(DataShapeError::InvalidCost {
                src: src.to_string(),
                dst: dst.to_string(),
                cost,
            });
        }

        for ty in [src, dst] {
            if !self.graph.contains_node(ty) {
                self.graph.add_node(ty);
                self.graph.add_edge(ty, ty, 0.0);
            }
        }

        if !self.relax(src, dst, cost) {
            return Ok(());
        }
        debug!("Registered coercion {} -> {} (cost {})", src, dst, cost);

        if transitive {
            self.propagate(src, dst);
        }
        Ok(())
    }

    /// Lower the cost of `src -> dst` to `cost` if cheaper. Returns whether the edge changed.
    fn relax(&mut self, src: CType, dst: CType, cost: f64) -> bool {
        match self.graph.edge_weight(src, dst) {
            Some(&known) if known <= cost => false,
            _ => {
                self.graph.add_edge(src, dst, cost);
                true
            }
        }
    }

    fn propagate(&mut self, src: CType, dst: CType) {
        let mut worklist = VecDeque::from([(src, dst)]);

        while let Some((a, b)) = worklist.pop_front() {
            let Some(&cost) = self.graph.edge_weight(a, b) else {
                continue;
            };

            let predecessors: Vec<(CType, f64)> = self
                .graph
                .neighbors_directed(a, Direction::Incoming)
                .filter(|&p| p != a)
                .filter_map(|p| self.graph.edge_weight(p, a).map(|&w| (p, w)))
                .collect();
            for (p, w) in predecessors {
                if p != b && self.relax(p, b, w + cost) {
                    debug!("Derived coercion {} -> {} (cost {})", p, b, w + cost);
                    worklist.push_back((p, b));
                }
            }

            let successors: Vec<(CType, f64)> = self
                .graph
                .neighbors_directed(b, Direction::Outgoing)
                .filter(|&s| s != b)
                .filter_map(|s| self.graph.edge_weight(b, s).map(|&w| (s, w)))
                .collect();
            for (s, w) in successors {
                if s != a && self.relax(a, s, cost + w) {
                    debug!("Derived coercion {} -> {} (cost {})", a, s, cost + w);
                    worklist.push_back((a, s));
                }
            }
        }
    }

    /// Raw scalar-to-scalar cost, `None` when no path is known.
    pub fn scalar_cost(&self, src: CType, dst: CType) -> Option<f64> {
        if src == dst {
            return Some(0.0);
        }
        self.graph.edge_weight(src, dst).copied()
    }

    /// Every known `(src, dst, cost)` entry, reflexive ones included.
    pub fn entries(&self) -> impl Iterator<Item = (CType, CType, f64)> + '_ {
        self.graph.all_edges().map(|(src, dst, cost)| (src, dst, *cost))
    }

    /// Number of known entries.
    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Seed the numeric rules: widening within a family, cross-family widening, lossy
    /// conversions, and numbers to `bool` as a last resort. `bool` never coerces to a number.
    pub fn register_default_rules(&mut self) {
        let chains: [&[CType]; 4] = [
            &[CType::INT8, CType::INT16, CType::INT32, CType::INT64],
            &[CType::UINT8, CType::UINT16, CType::UINT32, CType::UINT64],
            &[CType::FLOAT16, CType::FLOAT32, CType::FLOAT64],
            &[CType::COMPLEX64, CType::COMPLEX128],
        ];
        let mut rules: Vec<(CType, CType, f64)> = chains
            .iter()
            .flat_map(|chain| chain.windows(2).map(|pair| (pair[0], pair[1], WIDENING)))
            .collect();

        rules.extend([
            (CType::UINT8, CType::INT16, WIDENING),
            (CType::UINT16, CType::INT32, WIDENING),
            (CType::UINT32, CType::INT64, WIDENING),
            (CType::INT8, CType::FLOAT16, WIDENING),
            (CType::INT16, CType::FLOAT32, WIDENING),
            (CType::INT32, CType::FLOAT64, WIDENING),
            (CType::FLOAT32, CType::COMPLEX64, WIDENING),
            (CType::FLOAT64, CType::COMPLEX128, WIDENING),
        ]);

        rules.extend([
            (CType::UINT8, CType::INT8, LOSSY),
            (CType::UINT16, CType::INT16, LOSSY),
            (CType::UINT32, CType::INT32, LOSSY),
            (CType::UINT64, CType::INT64, LOSSY),
            (CType::INT8, CType::UINT8, LOSSY),
            (CType::INT16, CType::UINT16, LOSSY),
            (CType::INT32, CType::UINT32, LOSSY),
            (CType::INT64, CType::UINT64, LOSSY),
            (CType::INT32, CType::FLOAT32, LOSSY),
            (CType::INT64, CType::FLOAT64, LOSSY),
            (CType::UINT64, CType::FLOAT64, LOSSY),
            (CType::FLOAT64, CType::COMPLEX64, LOSSY),
        ]);

        let bool_sink = self.costs.bool_sink;
        rules.extend(
            CType::ALL
                .into_iter()
                .filter(|ty| ty.is_numeric() && *ty != CType::BOOL)
                .map(|ty| (ty, CType::BOOL, bool_sink)),
        );

        for (src, dst, cost) in rules {
            if let Err(err) = self.add_coercion(src, dst, cost, true) {
                warn!("Skipping default coercion rule: {}", err);
            }
        }
    }

    /// Cost of coercing `src` to `dst`.
    ///
    /// Each type variable of `dst` costs `fresh_typevar` the first time it is seen and
    /// nothing afterwards; a type variable as `src` matches anything for free.
    pub fn coercion_cost(&self, src: &Type, dst: &Type) -> DsResult<f64> {
        self.coercion_cost_seen(src, dst, &mut BTreeSet::new())
    }

    /// [`coercion_cost`](Self::coercion_cost) threading the set of already seen type variables.
    pub fn coercion_cost_seen(
        &self,
        src: &Type,
        dst: &Type,
        seen: &mut BTreeSet<TypeVar>,
    ) -> DsResult<f64> {
        if src == dst {
            return Ok(0.0);
        }

        let cost = match (src, dst) {
            (Type::TypeVar(_) | Type::Implements { .. }, _) => 0.0,
            (_, Type::TypeVar(tv)) => {
                if seen.insert(tv.clone()) {
                    self.costs.fresh_typevar
                } else {
                    0.0
                }
            }
            (Type::CType(a), Type::Implements { typeset, .. }) => {
                if !typeset.contains(a) {
                    return Err(DataShapeError::coercion(src, dst));
                }
                let broadcast = self.costs.broadcast;
                broadcast - broadcast / typeset.len() as f64
            }
            (Type::CType(a), Type::CType(b)) => self
                .scalar_cost(*a, *b)
                .ok_or_else(|| DataShapeError::coercion(src, dst))?,
            (Type::Fixed(_) | Type::Var, Type::Fixed(_) | Type::Var) => self
                .broadcast_cost(src, dst)
                .ok_or_else(|| DataShapeError::coercion(src, dst))?,
            (Type::DataShape(_), _) | (_, Type::DataShape(_)) => self.datashape_cost(
                &DataShape::from(src.clone()),
                &DataShape::from(dst.clone()),
                seen,
            )?,
            (Type::Record(a), Type::Record(b)) => {
                if a.len() != b.len() || !a.names().eq(b.names()) {
                    return Err(DataShapeError::coercion(src, dst));
                }
                let mut total = 0.0;
                for (x, y) in a.types().zip(b.types()) {
                    total += self.coercion_cost_seen(x, y, seen)?;
                }
                total
            }
            (Type::Tuple(a), Type::Tuple(b)) => {
                if a.len() != b.len() {
                    return Err(DataShapeError::coercion(src, dst));
                }
                let mut total = 0.0;
                for (x, y) in a.dshapes().iter().zip(b.dshapes()) {
                    total += self.datashape_cost(x, y, seen)?;
                }
                total
            }
            (Type::Option(a), Type::Option(b)) => self.coercion_cost_seen(a, b, seen)?,
            (_, Type::Option(b)) if src.kind() == Kind::Measure => {
                self.coercion_cost_seen(src, b, seen)?
            }
            _ => return Err(DataShapeError::coercion(src, dst)),
        };

        trace!("coercion_cost({}, {}) = {}", src, dst, cost);
        Ok(cost)
    }

    /// Broadcasting rules between two concrete dimensions.
    fn broadcast_cost(&self, src: &Type, dst: &Type) -> Option<f64> {
        match (src, dst) {
            (Type::Fixed(a), Type::Fixed(b)) if a == b => Some(0.0),
            (Type::Fixed(1), Type::Fixed(_)) | (Type::Fixed(_), Type::Fixed(1)) => {
                Some(self.costs.broadcast)
            }
            (Type::Var, Type::Var) => Some(0.0),
            (Type::Var, Type::Fixed(_)) | (Type::Fixed(_), Type::Var) => {
                Some(self.costs.broadcast)
            }
            _ => None,
        }
    }

    fn datashape_cost(
        &self,
        src: &DataShape,
        dst: &DataShape,
        seen: &mut BTreeSet<TypeVar>,
    ) -> DsResult<f64> {
        let mut total = 0.0;

        if dst.ellipsis_position().is_some() {
            for equation in match_equation(src, dst)? {
                total += match equation {
                    Equation::Term(a, b) => self.coercion_cost_seen(&a, &b, seen)?,
                    Equation::Ellipsis(_, Some(tv)) if seen.contains(&tv) => 0.0,
                    Equation::Ellipsis(_, tv) => {
                        seen.extend(tv);
                        self.costs.added_dim
                    }
                };
            }
            return Ok(total);
        }

        if src.ndim() > dst.ndim() {
            return Err(DataShapeError::coercion(
                &Type::from(src.clone()),
                &Type::from(dst.clone()),
            ));
        }

        let added = dst.ndim() - src.ndim();
        for dim in &dst.shape()[..added] {
            total += if dim.is_unit_dim() {
                self.costs.added_unit_dim
            } else {
                self.costs.added_dim
            };
        }
        for (a, b) in src.shape().iter().zip(&dst.shape()[added..]) {
            total += self.coercion_cost_seen(a, b, seen)?;
        }
        total += self.coercion_cost_seen(src.measure(), dst.measure(), seen)?;
        Ok(total)
    }

    /// Dimension-to-dimension cost, `f64::INFINITY` when incompatible.
    pub fn dim_coercion_cost(&self, src: &Type, dst: &Type) -> f64 {
        let both_dims = [src, dst]
            .iter()
            .all(|ty| matches!(ty.kind(), Kind::Dimension | Kind::Free));
        if !both_dims {
            return f64::INFINITY;
        }
        self.coercion_cost(src, dst).unwrap_or(f64::INFINITY)
    }

    /// Measure-to-measure cost, `f64::INFINITY` when incompatible.
    pub fn dtype_coercion_cost(&self, src: &Type, dst: &Type) -> f64 {
        let both_measures = [src, dst]
            .iter()
            .all(|ty| matches!(ty.kind(), Kind::Measure | Kind::Free));
        if !both_measures {
            return f64::INFINITY;
        }
        self.coercion_cost(src, dst).unwrap_or(f64::INFINITY)
    }
}

static GLOBAL: Lazy<CoercionTable> =
    Lazy::new(|| CoercionTable::with_default_rules(CostModel::from_env_or_default()));

/// Process-wide table holding the default rules. Built on first use and never mutated.
pub fn global() -> &'static CoercionTable {
    &GLOBAL
}

/// [`CoercionTable::coercion_cost`] on the [global](global) table.
pub fn coercion_cost(src: &Type, dst: &Type) -> DsResult<f64> {
    GLOBAL.coercion_cost(src, dst)
}

/// [`CoercionTable::dim_coercion_cost`] on the [global](global) table.
pub fn dim_coercion_cost(src: &Type, dst: &Type) -> f64 {
    GLOBAL.dim_coercion_cost(src, dst)
}

/// [`CoercionTable::dtype_coercion_cost`] on the [global](global) table.
pub fn dtype_coercion_cost(src: &Type, dst: &Type) -> f64 {
    GLOBAL.dtype_coercion_cost(src, dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CoercionTable {
        CoercionTable::with_default_rules(CostModel::default())
    }

    #[test]
    fn negative_cost_rejected() {
        let mut table = CoercionTable::new();
        let err = table
            .add_coercion(CType::INT8, CType::INT16, -1.0, true)
            .unwrap_err();
        assert!(err.is_invalid_cost());
        assert!(table.is_empty());
    }

    #[test]
    fn reflexive_entries_are_inserted() {
        let mut table = CoercionTable::new();
        table
            .add_coercion(CType::INT8, CType::INT16, 1.0, false)
            .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.scalar_cost(CType::INT8, CType::INT8), Some(0.0));
        assert_eq!(table.scalar_cost(CType::INT16, CType::INT16), Some(0.0));
    }

    #[test]
    fn transitive_closure_through_later_edges() {
        let mut table = CoercionTable::new();
        table.add_coercion(CType::INT8, CType::INT16, 1.0, true).unwrap();
        table.add_coercion(CType::INT32, CType::INT64, 1.0, true).unwrap();
        // bridging edge connects both halves
        table.add_coercion(CType::INT16, CType::INT32, 1.0, true).unwrap();
        assert_eq!(table.scalar_cost(CType::INT8, CType::INT64), Some(3.0));
        assert_eq!(table.scalar_cost(CType::INT16, CType::INT64), Some(2.0));
        assert_eq!(table.scalar_cost(CType::INT64, CType::INT8), None);
    }

    #[test]
    fn decrease_propagates() {
        let mut table = CoercionTable::new();
        table.add_coercion(CType::INT8, CType::INT16, 5.0, true).unwrap();
        table.add_coercion(CType::INT16, CType::INT32, 1.0, true).unwrap();
        assert_eq!(table.scalar_cost(CType::INT8, CType::INT32), Some(6.0));
        table.add_coercion(CType::INT8, CType::INT16, 2.0, true).unwrap();
        assert_eq!(table.scalar_cost(CType::INT8, CType::INT32), Some(3.0));
    }

    #[test]
    fn non_transitive_insert() {
        let mut table = CoercionTable::new();
        table.add_coercion(CType::INT8, CType::INT16, 1.0, false).unwrap();
        table.add_coercion(CType::INT16, CType::INT32, 1.0, false).unwrap();
        assert_eq!(table.scalar_cost(CType::INT8, CType::INT32), None);
    }

    #[test]
    fn bool_is_a_sink() {
        let table = table();
        assert_eq!(table.scalar_cost(CType::INT32, CType::BOOL), Some(1000.0));
        assert_eq!(table.scalar_cost(CType::BOOL, CType::INT8), None);
    }

    #[test]
    fn typevar_costs_depend_on_sightings() {
        let table = table();
        let t = Type::typevar("T").unwrap();
        let mut seen = BTreeSet::new();
        let first = table
            .coercion_cost_seen(&CType::INT32.into(), &t, &mut seen)
            .unwrap();
        let second = table
            .coercion_cost_seen(&CType::FLOAT64.into(), &t, &mut seen)
            .unwrap();
        assert_eq!(first, 0.1);
        assert_eq!(second, 0.0);
        assert_eq!(table.coercion_cost(&t, &CType::INT8.into()).unwrap(), 0.0);
    }

    #[test]
    fn implements_cost_depends_on_set_size() {
        let table = table();
        let floating = Type::implements("T", crate::types::TypeSet::Floating).unwrap();
        let cost = table
            .coercion_cost(&CType::FLOAT32.into(), &floating)
            .unwrap();
        assert!((cost - (0.1 - 0.1 / 3.0)).abs() < 1e-12);
        assert!(table
            .coercion_cost(&CType::INT32.into(), &floating)
            .unwrap_err()
            .is_coercion());
    }

    #[test]
    fn option_destinations() {
        let table = table();
        let opt = Type::option(CType::INT64.into()).unwrap();
        assert_eq!(table.coercion_cost(&CType::INT32.into(), &opt).unwrap(), 1.0);
        assert!(table.coercion_cost(&opt, &CType::INT64.into()).is_err());
    }

    #[test]
    fn infinite_costs_instead_of_errors() {
        let table = table();
        assert_eq!(
            table.dim_coercion_cost(&Type::Fixed(3), &Type::Fixed(5)),
            f64::INFINITY
        );
        assert_eq!(table.dim_coercion_cost(&Type::Fixed(1), &Type::Fixed(5)), 0.1);
        assert_eq!(
            table.dtype_coercion_cost(&CType::FLOAT32.into(), &CType::INT32.into()),
            f64::INFINITY
        );
        assert_eq!(
            table.dtype_coercion_cost(&Type::Fixed(3), &CType::INT32.into()),
            f64::INFINITY
        );
    }
}
