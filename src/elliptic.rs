//! Assembly of the cell-centered pressure equation for one grid
//! and of its interface contributions.
//!
//! The heavy lifting of computing flux coefficients
//! (two-point or multi-point approximations)
//! is done by an external provider implementing [`FluxDiscretization`].
//! Everything a provider gets for free by doing so
//! lives in the [`FvElliptic`] extension trait:
//! composing the cached operators with the grid's divergence
//! into a system matrix and right-hand side,
//! extracting physical quantities from a solution,
//! and assembling mortar coupling conditions.

use nalgebra_sparse as nas;

use crate::{
    coupling::{BlockIndex, CouplingBlocks, MortarGrid, MortarSide},
    data::GridData,
    field::{Cells, Faces, Field},
    grid::Grid,
    operator::{Op, Operand},
};

/// Names of the operators a flux discretization stores in [`GridData`],
/// to be combined with the instance keyword via
/// [`FluxDiscretization::key`].
pub mod keys {
    /// Maps cell pressures to face fluxes.
    pub const FLUX: &str = "flux";
    /// Maps boundary condition values to face fluxes.
    pub const BOUND_FLUX: &str = "bound_flux";
    /// Reconstructs boundary-face pressures from cell pressures.
    pub const BOUND_PRESSURE_CELL: &str = "bound_pressure_cell";
    /// Reconstructs boundary-face pressures from boundary values.
    pub const BOUND_PRESSURE_FACE: &str = "bound_pressure_face";
}

/// Error in assembling a discretization.
#[derive(thiserror::Error, Debug)]
pub enum DiscretizationError {
    /// A required operator is absent from the data store
    /// even after running the discretization,
    /// meaning the provider did not populate its contract keys.
    #[error("operator `{0}` missing from the data store after discretization")]
    MissingOperator(String),
    /// The provider rejected the grid or parameter data it was given.
    #[error("invalid discretization data: {0}")]
    InvalidData(String),
}

/// The external provider of flux-discretization coefficients
/// for a second-order elliptic equation.
///
/// [`discretize`][Self::discretize] must store four sparse operators
/// in the grid's data store, under this instance's
/// [`key`][Self::key] combined with the names in [`keys`]:
/// `flux` (cells to faces), `bound_flux` (boundary values to faces),
/// and the two pressure-trace reconstructions
/// `bound_pressure_cell` and `bound_pressure_face`.
pub trait FluxDiscretization {
    /// The keyword namespacing this instance's entries in the data store.
    ///
    /// Two instances with different keywords can share one grid's store
    /// without touching each other's operators.
    fn keyword(&self) -> &str;

    /// Compute the flux operators for a grid
    /// and store them in the data store.
    fn discretize(&self, g: &Grid, data: &mut GridData) -> Result<(), DiscretizationError>;

    /// The data store key prefix of this instance.
    fn key(&self) -> String {
        format!("{}_", self.keyword())
    }
}

/// Assembly operations shared by every cell-centered
/// finite-volume discretization of an elliptic equation.
///
/// Implemented for free for every [`FluxDiscretization`];
/// all methods have default bodies and none need overriding.
/// Discretization is triggered lazily: `assemble_*` methods run
/// [`discretize`][FluxDiscretization::discretize] when a required
/// operator is missing and reuse the cached one otherwise.
/// The `assemble_int_bound_*` methods do *not* discretize lazily —
/// they assume assembly for this grid has already been run
/// and fail with [`DiscretizationError::MissingOperator`] otherwise.
pub trait FvElliptic: FluxDiscretization {
    /// The number of degrees of freedom on a grid:
    /// one pressure unknown per cell.
    fn ndof(&self, g: &Grid) -> usize {
        g.num_cells()
    }

    /// Extract the pressure part of a solution vector.
    ///
    /// Trivial for finite volume methods, where cell pressure
    /// is the only primary variable; this exists to give all
    /// discretization families a uniform extraction interface.
    fn extract_pressure(
        &self,
        _g: &Grid,
        solution: &Field<Cells>,
        _data: &GridData,
    ) -> Field<Cells> {
        solution.clone()
    }

    /// Compute the face fluxes corresponding to a pressure solution.
    ///
    /// Requires the flux operator to already be in the data store,
    /// i.e. assembly must have been run first.
    fn extract_flux(
        &self,
        _g: &Grid,
        solution: &Field<Cells>,
        data: &GridData,
    ) -> Result<Field<Faces>, DiscretizationError> {
        let flux = stored(data, self.key() + keys::FLUX)?;
        Ok(Field::from_values(flux * solution.values()))
    }

    /// Assemble the system matrix `div * flux`
    /// for a discretization of a second-order elliptic equation,
    /// discretizing first if the flux operator is not yet cached.
    fn assemble_matrix(
        &self,
        g: &Grid,
        data: &mut GridData,
    ) -> Result<Op<Field<Cells>, Field<Cells>>, DiscretizationError> {
        self.discretize_if_missing(g, data, keys::FLUX)?;
        let flux: Op<Field<Cells>, Field<Faces>> =
            Op::from(stored(data, self.key() + keys::FLUX)?.clone());
        Ok(g.divergence() * flux)
    }

    /// Assemble the boundary-condition right-hand side
    /// `-div * bound_flux * bc_values`,
    /// discretizing first if the boundary-flux operator is not yet cached.
    ///
    /// The negative sign encodes that boundary flux contributes to the
    /// balance equation with sign opposite to interior divergence.
    fn assemble_rhs(
        &self,
        g: &Grid,
        data: &mut GridData,
    ) -> Result<Field<Cells>, DiscretizationError> {
        self.discretize_if_missing(g, data, keys::BOUND_FLUX)?;
        let bound_flux = stored(data, self.key() + keys::BOUND_FLUX)?;
        let bc_values = data.bc_values(g);

        let boundary_flux = bound_flux * bc_values.values();
        Ok(Field::from_values(-(g.divergence().as_csr() * &boundary_flux)))
    }

    /// Assemble both the system matrix and the right-hand side.
    ///
    /// Pure convenience; the two calls may independently trigger
    /// discretization, which is fine because it is idempotent once cached.
    fn assemble_matrix_rhs(
        &self,
        g: &Grid,
        data: &mut GridData,
    ) -> Result<(Op<Field<Cells>, Field<Cells>>, Field<Cells>), DiscretizationError> {
        Ok((self.assemble_matrix(g, data)?, self.assemble_rhs(g, data)?))
    }

    /// Run the discretization if the given operator is not yet cached.
    ///
    /// The cache write is the only mutation in this trait;
    /// the store is never invalidated from here
    /// (see [`GridData::invalidate`]).
    fn discretize_if_missing(
        &self,
        g: &Grid,
        data: &mut GridData,
        name: &str,
    ) -> Result<(), DiscretizationError> {
        let key = self.key() + name;
        if !data.contains_operator(&key) {
            log::debug!(
                "`{}`: operator `{key}` not cached, discretizing {}D grid",
                self.keyword(),
                g.dim(),
            );
            self.discretize(g, data)?;
        }
        Ok(())
    }

    //
    // interface conditions
    //

    /// Enforce flux continuity across an interface:
    /// flux entering `g` over its interface faces
    /// equals the mortar flux projected back onto those faces.
    ///
    /// Adds `div * bound_flux * proj^T` into the (This, Mortar) block,
    /// where `proj` is the mortar projection for the side `g` occupies.
    /// Naturally assembled from the primary side;
    /// the secondary grid's balance instead gets the mortar flux
    /// through [`assemble_int_bound_source`][Self::assemble_int_bound_source].
    fn assemble_int_bound_flux(
        &self,
        g: &Grid,
        data: &GridData,
        mortar: &MortarGrid,
        side: MortarSide,
        cc: &mut CouplingBlocks,
    ) -> Result<(), DiscretizationError> {
        let proj = mortar.to_mortar_avg(side);
        let bound_flux = stored(data, self.key() + keys::BOUND_FLUX)?;
        let contribution = &(g.divergence().as_csr() * bound_flux) * &proj.transpose();
        cc.add(BlockIndex::This, BlockIndex::Mortar, &contribution);
        Ok(())
    }

    /// Inject the mortar flux as a source in `g`'s balance equation.
    ///
    /// Subtracts `proj^T` from the (This, Mortar) block.
    /// Naturally assembled from the secondary side,
    /// whose cells coincide with the interface:
    /// no divergence is involved because the mortar flux
    /// enters the cell balance directly, not through faces.
    fn assemble_int_bound_source(
        &self,
        _g: &Grid,
        mortar: &MortarGrid,
        side: MortarSide,
        cc: &mut CouplingBlocks,
    ) {
        let proj = mortar.to_mortar_avg(side);
        cc.subtract(BlockIndex::This, BlockIndex::Mortar, &proj.transpose());
    }

    /// Represent the pressure trace on the interface
    /// as seen from `g`'s side.
    ///
    /// Adds `proj * bound_pressure_cell` into the (Mortar, This) block
    /// and `proj * bound_pressure_face * proj^T` into (Mortar, Mortar):
    /// the trace is a combination of `g`'s cell pressures and of the
    /// boundary-value reconstruction folded back through the projection.
    fn assemble_int_bound_pressure_trace(
        &self,
        _g: &Grid,
        data: &GridData,
        mortar: &MortarGrid,
        side: MortarSide,
        cc: &mut CouplingBlocks,
    ) -> Result<(), DiscretizationError> {
        let proj = mortar.to_mortar_avg(side);
        let bp_cell = stored(data, self.key() + keys::BOUND_PRESSURE_CELL)?;
        let bp_face = stored(data, self.key() + keys::BOUND_PRESSURE_FACE)?;

        cc.add(BlockIndex::Mortar, BlockIndex::This, &(proj * bp_cell));
        cc.add(
            BlockIndex::Mortar,
            BlockIndex::Mortar,
            &(&(proj * bp_face) * &proj.transpose()),
        );
        Ok(())
    }

    /// Enforce pressure continuity directly against `g`'s cell pressures.
    ///
    /// Subtracts `proj` from the (Mortar, This) block.
    /// Naturally assembled from the secondary side,
    /// where the interface pressure *is* a cell pressure
    /// and needs no trace reconstruction.
    fn assemble_int_bound_pressure_cell(
        &self,
        _g: &Grid,
        mortar: &MortarGrid,
        side: MortarSide,
        cc: &mut CouplingBlocks,
    ) {
        cc.subtract(
            BlockIndex::Mortar,
            BlockIndex::This,
            mortar.to_mortar_avg(side),
        );
    }

    /// Hook for discretization families that must modify the system
    /// matrix when an interface carries a Neumann-type condition.
    ///
    /// Void for finite volume methods: the coupling operations above
    /// already encode flux continuity. Exists only to keep the
    /// operation set uniform across discretization families.
    fn enforce_neumann_int_bound(
        &self,
        _g: &Grid,
        _mortar: &MortarGrid,
        _matrix: &mut nas::CsrMatrix<f64>,
    ) {
    }
}

impl<T: FluxDiscretization + ?Sized> FvElliptic for T {}

fn stored(data: &GridData, key: String) -> Result<&nas::CsrMatrix<f64>, DiscretizationError> {
    data.operator(&key)
        .ok_or(DiscretizationError::MissingOperator(key))
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{cart_grid_1d, point_grid, ring_grid_1d};
    use crate::operator::Operator;
    use nalgebra as na;
    use std::cell::Cell;

    /// A two-point flux provider with unit transmissibilities,
    /// counting its discretize calls so tests can verify caching.
    ///
    /// Its flux operator is the signed incidence itself, which makes
    /// `div * flux` the standard difference Laplacian on unit cells.
    struct UnitTpfa {
        keyword: String,
        discretize_calls: Cell<usize>,
    }

    impl UnitTpfa {
        fn new(keyword: &str) -> Self {
            Self {
                keyword: keyword.to_string(),
                discretize_calls: Cell::new(0),
            }
        }
    }

    /// Identity on the boundary faces, zero elsewhere.
    fn boundary_identity(g: &Grid) -> nas::CsrMatrix<f64> {
        let mut coo = nas::CooMatrix::new(g.num_faces(), g.num_faces());
        for face in g.boundary_faces().ones() {
            coo.push(face, face, 1.0);
        }
        nas::CsrMatrix::from(&coo)
    }

    impl FluxDiscretization for UnitTpfa {
        fn keyword(&self) -> &str {
            &self.keyword
        }

        fn discretize(&self, g: &Grid, data: &mut GridData) -> Result<(), DiscretizationError> {
            self.discretize_calls.set(self.discretize_calls.get() + 1);

            let flux = self.key() + keys::FLUX;
            data.insert_operator(flux, g.divergence().transpose().into_csr());
            data.insert_operator(self.key() + keys::BOUND_FLUX, boundary_identity(g));

            // pressure trace on a boundary face: the adjacent cell's pressure
            let mut bp_cell = nas::CooMatrix::new(g.num_faces(), g.num_cells());
            for face in g.boundary_faces().ones() {
                for &cell in g.signed_incidence().row(face).col_indices() {
                    bp_cell.push(face, cell, 1.0);
                }
            }
            data.insert_operator(
                self.key() + keys::BOUND_PRESSURE_CELL,
                nas::CsrMatrix::from(&bp_cell),
            );
            data.insert_operator(self.key() + keys::BOUND_PRESSURE_FACE, boundary_identity(g));
            Ok(())
        }
    }

    fn dense(m: &nas::CsrMatrix<f64>) -> na::DMatrix<f64> {
        nas::convert::serial::convert_csr_dense(m)
    }

    fn single_entry(rows: usize, cols: usize, i: usize, j: usize, v: f64) -> nas::CsrMatrix<f64> {
        let mut coo = nas::CooMatrix::new(rows, cols);
        coo.push(i, j, v);
        nas::CsrMatrix::from(&coo)
    }

    #[test]
    fn ndof_is_cell_count() {
        let tpfa = UnitTpfa::new("pressure");
        for g in [cart_grid_1d(5, 5.0), ring_grid_1d(3, 3.0), point_grid()] {
            assert_eq!(tpfa.ndof(&g), g.num_cells());
        }
    }

    #[test]
    fn extract_pressure_is_identity() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(3, 3.0);
        let data = GridData::new();
        let solution = Field::from(na::DVector::from_vec(vec![1.0, -2.0, 0.5]));
        assert_eq!(tpfa.extract_pressure(&g, &solution, &data), solution);
    }

    #[test]
    fn extract_flux_requires_prior_assembly() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(2, 2.0);
        let mut data = GridData::new();
        let solution = Field::from(na::DVector::from_vec(vec![1.0, 0.0]));

        // no assembly yet: precondition violation
        assert!(matches!(
            tpfa.extract_flux(&g, &solution, &data),
            Err(DiscretizationError::MissingOperator(_))
        ));

        tpfa.assemble_matrix(&g, &mut data).unwrap();
        let flux = tpfa.extract_flux(&g, &solution, &data).unwrap();
        // unit pressure in the left cell pushes flux out through both its faces
        assert_eq!(flux.values, na::DVector::from_vec(vec![-1.0, 1.0, 0.0]));
    }

    #[test]
    fn assembled_matrix_is_the_laplacian() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(3, 3.0);
        let mut data = GridData::new();

        let matrix = tpfa.assemble_matrix(&g, &mut data).unwrap();
        #[rustfmt::skip]
        let expected = na::DMatrix::from_row_slice(3, 3, &[
            2.0, -1.0, 0.0,
            -1.0, 2.0, -1.0,
            0.0, -1.0, 2.0,
        ]);
        assert_eq!(dense(matrix.as_csr()), expected);
    }

    #[test]
    fn assembly_reuses_cached_operators() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(4, 4.0);
        let mut data = GridData::new();

        let first = tpfa.assemble_matrix(&g, &mut data).unwrap();
        let second = tpfa.assemble_matrix(&g, &mut data).unwrap();
        assert_eq!(first, second);
        assert_eq!(tpfa.discretize_calls.get(), 1);

        // rhs finds its operator cached by the same discretize call
        tpfa.assemble_rhs(&g, &mut data).unwrap();
        assert_eq!(tpfa.discretize_calls.get(), 1);

        // explicit invalidation forces a re-discretization
        data.invalidate(tpfa.keyword());
        tpfa.assemble_matrix(&g, &mut data).unwrap();
        assert_eq!(tpfa.discretize_calls.get(), 2);
    }

    #[test]
    fn matrix_on_closed_grid_is_symmetric_and_conservative() {
        let tpfa = UnitTpfa::new("pressure");
        let g = ring_grid_1d(5, 5.0);
        let mut data = GridData::new();

        let matrix = dense(tpfa.assemble_matrix(&g, &mut data).unwrap().as_csr());
        assert_eq!(matrix.nrows(), g.num_cells());
        assert_eq!(matrix.ncols(), g.num_cells());
        assert_eq!(matrix, matrix.transpose());
        // with no boundary faces, each row of the balance sums to zero
        for row in matrix.row_iter() {
            approx::assert_abs_diff_eq!(row.sum(), 0.0);
        }
    }

    #[test]
    fn rhs_carries_boundary_flux_with_opposite_sign() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(2, 2.0);
        let mut data = GridData::new();
        data.params_mut().bc_values = Some(na::DVector::from_vec(vec![2.0, 0.0, 3.0]));

        let rhs = tpfa.assemble_rhs(&g, &mut data).unwrap();
        // the left face normal points out of the domain into cell 0,
        // the right face out of cell 1
        assert_eq!(rhs.values, na::DVector::from_vec(vec![2.0, -3.0]));

        let (matrix, rhs_again) = tpfa.assemble_matrix_rhs(&g, &mut data).unwrap();
        assert_eq!(rhs_again, rhs);
        assert_eq!(matrix, tpfa.assemble_matrix(&g, &mut data).unwrap());
    }

    #[test]
    fn keywords_namespace_the_data_store() {
        let pressure = UnitTpfa::new("pressure");
        let tracer = UnitTpfa::new("tracer");
        let g = cart_grid_1d(3, 3.0);
        let mut data = GridData::new();

        let m_p = pressure.assemble_matrix(&g, &mut data).unwrap();
        let m_t = tracer.assemble_matrix(&g, &mut data).unwrap();
        assert_eq!(m_p, m_t);
        assert_eq!(pressure.discretize_calls.get(), 1);
        assert_eq!(tracer.discretize_calls.get(), 1);
        assert!(data.contains_operator("pressure_flux"));
        assert!(data.contains_operator("tracer_flux"));
    }

    /// The scenario from the coupling tests below:
    /// a 2-cell 1D grid whose right boundary face meets a 0D grid
    /// through a mortar with a single cell.
    fn fracture_scenario() -> (Grid, Grid, MortarGrid) {
        let matrix_grid = cart_grid_1d(2, 2.0);
        let fracture = point_grid();
        let mortar = MortarGrid::new(
            // the interface is the 1D grid's rightmost face
            single_entry(1, 3, 0, 2, 1.0),
            // and the 0D grid's only cell
            single_entry(1, 1, 0, 0, 1.0),
        );
        (matrix_grid, fracture, mortar)
    }

    #[test]
    fn flux_continuity_block_has_divergence_signs() {
        let tpfa = UnitTpfa::new("pressure");
        let (g, fracture, mortar) = fracture_scenario();
        let mut data = GridData::new();
        tpfa.assemble_matrix(&g, &mut data).unwrap();

        let mut cc = CouplingBlocks::new(tpfa.ndof(&g), fracture.num_cells(), mortar.num_cells());
        tpfa.assemble_int_bound_flux(&g, &data, &mortar, MortarSide::Primary, &mut cc)
            .unwrap();

        // the interface face normal points out of cell 1;
        // cell 0 does not touch the interface
        let expected = na::DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        assert_eq!(dense(cc.block(BlockIndex::This, BlockIndex::Mortar)), expected);
    }

    #[test]
    fn pressure_trace_mirrors_flux_continuity() {
        let tpfa = UnitTpfa::new("pressure");
        let (g, fracture, mortar) = fracture_scenario();
        let mut data = GridData::new();
        tpfa.assemble_matrix(&g, &mut data).unwrap();

        let mut cc = CouplingBlocks::new(tpfa.ndof(&g), fracture.num_cells(), mortar.num_cells());
        tpfa.assemble_int_bound_flux(&g, &data, &mortar, MortarSide::Primary, &mut cc)
            .unwrap();
        tpfa.assemble_int_bound_pressure_trace(&g, &data, &mortar, MortarSide::Primary, &mut cc)
            .unwrap();

        // the trace block against cell pressures is the transpose
        // of the flux continuity block in this symmetric discretization
        assert_eq!(
            dense(cc.block(BlockIndex::Mortar, BlockIndex::This)),
            dense(cc.block(BlockIndex::This, BlockIndex::Mortar)).transpose(),
        );
        // the self-interaction term folds the boundary reconstruction
        // back through the projection
        assert_eq!(
            dense(cc.block(BlockIndex::Mortar, BlockIndex::Mortar)),
            na::DMatrix::from_element(1, 1, 1.0),
        );
    }

    #[test]
    fn secondary_side_source_and_pressure_blocks_are_transposes() {
        let tpfa = UnitTpfa::new("pressure");
        let (g, fracture, mortar) = fracture_scenario();
        let mut data = GridData::new();
        tpfa.assemble_matrix(&g, &mut data).unwrap();

        // assembled from the fracture's perspective: it is the secondary side
        let mut cc = CouplingBlocks::new(fracture.num_cells(), tpfa.ndof(&g), mortar.num_cells());
        tpfa.assemble_int_bound_source(&fracture, &mortar, MortarSide::Secondary, &mut cc);
        tpfa.assemble_int_bound_pressure_cell(&fracture, &mortar, MortarSide::Secondary, &mut cc);

        let source = dense(cc.block(BlockIndex::This, BlockIndex::Mortar));
        let pressure = dense(cc.block(BlockIndex::Mortar, BlockIndex::This));
        assert_eq!(source, na::DMatrix::from_element(1, 1, -1.0));
        assert_eq!(source, pressure.transpose());
    }

    #[test]
    fn coupling_contributions_accumulate() {
        let tpfa = UnitTpfa::new("pressure");
        let g = cart_grid_1d(2, 2.0);
        let fracture = point_grid();
        let mut data = GridData::new();
        tpfa.assemble_matrix(&g, &mut data).unwrap();

        // two interfaces touching disjoint boundary faces of the same grid
        let left = MortarGrid::new(single_entry(1, 3, 0, 0, 1.0), single_entry(1, 1, 0, 0, 1.0));
        let right = MortarGrid::new(single_entry(1, 3, 0, 2, 1.0), single_entry(1, 1, 0, 0, 1.0));

        let new_cc = || CouplingBlocks::new(tpfa.ndof(&g), fracture.num_cells(), 1);

        let mut cc_both = new_cc();
        tpfa.assemble_int_bound_flux(&g, &data, &left, MortarSide::Primary, &mut cc_both)
            .unwrap();
        tpfa.assemble_int_bound_flux(&g, &data, &right, MortarSide::Primary, &mut cc_both)
            .unwrap();

        let mut cc_left = new_cc();
        tpfa.assemble_int_bound_flux(&g, &data, &left, MortarSide::Primary, &mut cc_left)
            .unwrap();
        let mut cc_right = new_cc();
        tpfa.assemble_int_bound_flux(&g, &data, &right, MortarSide::Primary, &mut cc_right)
            .unwrap();

        assert_eq!(
            dense(cc_both.block(BlockIndex::This, BlockIndex::Mortar)),
            dense(cc_left.block(BlockIndex::This, BlockIndex::Mortar))
                + dense(cc_right.block(BlockIndex::This, BlockIndex::Mortar)),
        );
    }

    #[test]
    fn enforce_neumann_int_bound_is_a_no_op() {
        let tpfa = UnitTpfa::new("pressure");
        let (g, _, mortar) = fracture_scenario();
        let mut data = GridData::new();
        let matrix = tpfa.assemble_matrix(&g, &mut data).unwrap();

        let mut csr = matrix.as_csr().clone();
        tpfa.enforce_neumann_int_bound(&g, &mortar, &mut csr);
        assert_eq!(&csr, matrix.as_csr());
    }
}
