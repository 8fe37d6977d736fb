//! The per-grid data store for cached operators and material parameters.

use std::collections::HashMap;

use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{
    field::{Faces, Field},
    grid::Grid,
};

/// Material and boundary data for the flow problem on one grid.
///
/// All entries are optional with documented defaults,
/// so a freshly created store describes a homogeneous no-flow problem.
#[derive(Clone, Debug, Default)]
pub struct FlowParameters {
    /// Boundary condition values, one entry per face
    /// (nonzero only on boundary faces). Defaults to all zeros.
    pub bc_values: Option<na::DVector<f64>>,
    /// Porosity, one entry per cell. Defaults to all ones.
    pub porosity: Option<na::DVector<f64>>,
    /// Time-step scale, one entry per cell. Defaults to all ones.
    pub time_step: Option<na::DVector<f64>>,
}

/// Mutable per-grid storage shared by all discretizations on that grid.
///
/// Discretization operators are cached under string keys of the form
/// `"{keyword}_{name}"`, where the keyword namespaces one
/// discretization instance so that several can coexist on one grid
/// without collisions.
///
/// The cache is populated lazily: the first assembly call that needs a
/// missing operator runs the discretization and writes its operators
/// back here, and later calls reuse them. The store never invalidates
/// on its own; after changing geometry or coefficients the caller must
/// call [`invalidate`][Self::invalidate] explicitly.
#[derive(Clone, Debug, Default)]
pub struct GridData {
    operators: HashMap<String, nas::CsrMatrix<f64>>,
    params: FlowParameters,
}

impl GridData {
    /// Create an empty store with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached operator by its full key.
    #[inline]
    pub fn operator(&self, key: &str) -> Option<&nas::CsrMatrix<f64>> {
        self.operators.get(key)
    }

    /// Whether an operator is cached under the given key.
    #[inline]
    pub fn contains_operator(&self, key: &str) -> bool {
        self.operators.contains_key(key)
    }

    /// Store an operator under the given key, replacing any previous one.
    pub fn insert_operator(&mut self, key: impl Into<String>, op: nas::CsrMatrix<f64>) {
        self.operators.insert(key.into(), op);
    }

    /// Drop every cached operator belonging to the given keyword,
    /// forcing the next assembly call to re-discretize.
    ///
    /// Other keywords' entries are left untouched.
    pub fn invalidate(&mut self, keyword: &str) {
        let prefix = format!("{keyword}_");
        log::debug!("invalidating cached operators under `{prefix}*`");
        self.operators.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Access the flow parameters.
    #[inline]
    pub fn params(&self) -> &FlowParameters {
        &self.params
    }

    /// Mutably access the flow parameters.
    #[inline]
    pub fn params_mut(&mut self) -> &mut FlowParameters {
        &mut self.params
    }

    /// Get the boundary condition values for a grid,
    /// one entry per face; all zeros when none have been set.
    pub fn bc_values(&self, g: &Grid) -> Field<Faces> {
        match &self.params.bc_values {
            Some(vals) => Field::from(vals.clone()),
            None => g.new_face_field(),
        }
    }
}
