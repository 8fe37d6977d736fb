//! A mass matrix for constant test and trial functions,
//! the trivial reference member of the discretization family.

use itertools::izip;
use nalgebra as na;

use crate::{
    data::GridData,
    field::{Cells, Field},
    grid::Grid,
    operator::DiagonalOperator,
};

/// Discretization of the L2 mass bilinear form
/// with cell-wise constant functions.
///
/// The matrix is diagonal with entries
/// `cell_volume * porosity / time_step`,
/// with porosity and time step taken from the grid's
/// [`FlowParameters`][crate::FlowParameters] (all ones when unset).
#[derive(Clone, Copy, Debug, Default)]
pub struct MassMatrix;

impl MassMatrix {
    /// The number of degrees of freedom on a grid: one per cell.
    pub fn ndof(&self, g: &Grid) -> usize {
        g.num_cells()
    }

    /// Assemble the mass matrix and its (null) right-hand side.
    pub fn matrix_rhs(
        &self,
        g: &Grid,
        data: &GridData,
    ) -> (DiagonalOperator<Field<Cells>, Field<Cells>>, Field<Cells>) {
        let ndof = self.ndof(g);
        let ones = || na::DVector::repeat(ndof, 1.0);
        let porosity = data.params().porosity.clone().unwrap_or_else(ones);
        let time_step = data.params().time_step.clone().unwrap_or_else(ones);

        let coeff = na::DVector::from_iterator(
            ndof,
            izip!(g.cell_volumes().iter(), porosity.iter(), time_step.iter())
                .map(|(vol, phi, dt)| vol * phi / dt),
        );
        (DiagonalOperator::from(coeff), g.new_cell_field())
    }

    /// The inverse of an assembled mass matrix.
    ///
    /// Degenerate coefficients (zero volume or porosity) give
    /// non-finite entries here rather than an error;
    /// see [`DiagonalOperator::inv`].
    pub fn inv(
        &self,
        matrix: &DiagonalOperator<Field<Cells>, Field<Cells>>,
    ) -> DiagonalOperator<Field<Cells>, Field<Cells>> {
        matrix.inv()
    }
}
