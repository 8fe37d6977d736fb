//! The geometric entity a discretization operates on: a [`Grid`].
//!
//! Grids are read-only here; constructing them from actual geometry
//! (meshing, fracture splitting, geometry computation) is the job of
//! an external mesh layer. A few hand-built grids for tests and demos
//! are provided at the bottom of this module.

use fixedbitset as fb;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{
    field::{Cells, Faces, Field},
    operator::Op,
};

/// A computational grid, immutable after construction.
///
/// Only the data the discretization needs is stored:
/// cell volumes and the signed cell-face incidence.
/// One row of the incidence per face, one column per cell,
/// with a value of +1 where the face normal points out of the cell
/// and -1 where it points in. Boundary faces have a single nonzero,
/// interior faces two with opposite signs.
#[derive(Clone, Debug)]
pub struct Grid {
    dim: usize,
    cell_volumes: na::DVector<f64>,
    cell_faces: nas::CsrMatrix<i8>,
    /// faces with exactly one adjacent cell
    boundary_faces: fb::FixedBitSet,
}

impl Grid {
    /// Construct a grid from its cell volumes and signed cell-face incidence.
    ///
    /// `cell_faces` must have one row per face and one column per cell.
    ///
    /// # Panics
    ///
    /// Panics if the incidence column count does not match the number
    /// of cell volumes.
    pub fn new(dim: usize, cell_volumes: na::DVector<f64>, cell_faces: nas::CsrMatrix<i8>) -> Self {
        assert_eq!(
            cell_faces.ncols(),
            cell_volumes.len(),
            "incidence columns must match cell count"
        );

        let mut boundary_faces = fb::FixedBitSet::with_capacity(cell_faces.nrows());
        for (face, row) in cell_faces.row_iter().enumerate() {
            if row.nnz() == 1 {
                boundary_faces.insert(face);
            }
        }

        Self {
            dim,
            cell_volumes,
            cell_faces,
            boundary_faces,
        }
    }

    /// The topological dimension the grid is embedded in.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get the number of cells in the grid.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cell_faces.ncols()
    }

    /// Get the number of faces in the grid.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.cell_faces.nrows()
    }

    /// Get the cell volumes, one scalar per cell.
    #[inline]
    pub fn cell_volumes(&self) -> &na::DVector<f64> {
        &self.cell_volumes
    }

    /// The signed cell-face incidence, one row per face.
    #[inline]
    pub fn signed_incidence(&self) -> &nas::CsrMatrix<i8> {
        &self.cell_faces
    }

    /// The set of faces on the grid boundary
    /// (faces with a single adjacent cell).
    #[inline]
    pub fn boundary_faces(&self) -> &fb::FixedBitSet {
        &self.boundary_faces
    }

    /// Construct the discrete divergence operator,
    /// summing signed face fluxes into a per-cell balance.
    ///
    /// This is the transpose of the signed incidence.
    /// Its sign convention matches the incidence:
    /// a positive flux on a face contributes positively
    /// to the cell its normal points out of.
    pub fn divergence(&self) -> Op<Field<Faces>, Field<Cells>> {
        let signs = self.cell_faces.transpose();
        // build the same matrix
        // but with the signs converted to floats for easy multiplication
        let float_mat = nas::CsrMatrix::try_from_pattern_and_values(
            signs.pattern().clone(),
            signs.values().iter().map(|s| *s as f64).collect(),
        )
        .unwrap();
        Op::from(float_mat)
    }

    /// Create a field with a value of zero for each cell in the grid.
    pub fn new_cell_field(&self) -> Field<Cells> {
        Field::zeros(self.num_cells())
    }

    /// Create a field with a value of zero for each face in the grid.
    pub fn new_face_field(&self) -> Field<Faces> {
        Field::zeros(self.num_faces())
    }
}

//
// hand-built grids for tests and demos
//

/// A 1D Cartesian grid with `num_cells` equal cells
/// covering `[0, length]`, faces oriented in the +x direction.
pub fn cart_grid_1d(num_cells: usize, length: f64) -> Grid {
    assert!(num_cells > 0);
    let dx = length / num_cells as f64;

    let mut coo = nas::CooMatrix::new(num_cells + 1, num_cells);
    for face in 0..=num_cells {
        // the face normal points out of the cell on its left
        // and into the cell on its right
        if face > 0 {
            coo.push(face, face - 1, 1);
        }
        if face < num_cells {
            coo.push(face, face, -1);
        }
    }

    Grid::new(
        1,
        na::DVector::repeat(num_cells, dx),
        nas::CsrMatrix::from(&coo),
    )
}

/// A periodic 1D grid with `num_cells` equal cells and no boundary faces;
/// face `f` connects cell `f - 1` (wrapping around) to cell `f`.
///
/// Useful for conservation tests, since every face is interior.
pub fn ring_grid_1d(num_cells: usize, length: f64) -> Grid {
    assert!(num_cells >= 2, "a ring needs at least two cells");
    let dx = length / num_cells as f64;

    let mut coo = nas::CooMatrix::new(num_cells, num_cells);
    for face in 0..num_cells {
        coo.push(face, (face + num_cells - 1) % num_cells, 1);
        coo.push(face, face, -1);
    }

    Grid::new(
        1,
        na::DVector::repeat(num_cells, dx),
        nas::CsrMatrix::from(&coo),
    )
}

/// A 0D grid with a single unit-volume cell and no faces,
/// as used for fracture intersections.
pub fn point_grid() -> Grid {
    Grid::new(
        0,
        na::DVector::repeat(1, 1.0),
        nas::CsrMatrix::zeros(0, 1),
    )
}
