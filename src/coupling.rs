//! Interfaces between grids of different dimension:
//! the [`MortarGrid`] and the [`CouplingBlocks`] accumulator
//! that interface conditions are assembled into.

use nalgebra_sparse as nas;

/// The side of a mortar interface a grid occupies.
///
/// The primary side is the higher-dimensional grid,
/// the secondary side the lower-dimensional one.
/// The roles are fixed by geometry, but every coupling operation
/// can be assembled from either side, so the side is passed
/// explicitly per call rather than inferred.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MortarSide {
    /// The higher-dimensional side of the interface.
    Primary,
    /// The lower-dimensional side of the interface.
    Secondary,
}

impl MortarSide {
    /// The other side of the interface.
    pub fn opposite(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

/// The interface grid between a higher- and a lower-dimensional grid,
/// carrying its own flux/pressure unknowns (one per mortar cell).
///
/// A mortar grid exposes one averaging projection per side,
/// mapping that side's discrete space into the mortar space.
/// The primary projection maps the primary grid's *face* space
/// (its faces along the interface); the secondary projection maps the
/// secondary grid's *cell* space, since the lower-dimensional grid's
/// cells coincide geometrically with the interface.
#[derive(Clone, Debug)]
pub struct MortarGrid {
    primary_to_mortar_avg: nas::CsrMatrix<f64>,
    secondary_to_mortar_avg: nas::CsrMatrix<f64>,
}

impl MortarGrid {
    /// Construct a mortar grid from its two averaging projections.
    ///
    /// # Panics
    ///
    /// Panics if the projections disagree on the number of mortar cells.
    pub fn new(
        primary_to_mortar_avg: nas::CsrMatrix<f64>,
        secondary_to_mortar_avg: nas::CsrMatrix<f64>,
    ) -> Self {
        assert_eq!(
            primary_to_mortar_avg.nrows(),
            secondary_to_mortar_avg.nrows(),
            "projections must map to the same mortar space"
        );
        Self {
            primary_to_mortar_avg,
            secondary_to_mortar_avg,
        }
    }

    /// Get the number of cells (unknowns) in the mortar grid.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.primary_to_mortar_avg.nrows()
    }

    /// The averaging projection from the primary grid's faces
    /// to the mortar cells.
    #[inline]
    pub fn primary_to_mortar_avg(&self) -> &nas::CsrMatrix<f64> {
        &self.primary_to_mortar_avg
    }

    /// The averaging projection from the secondary grid's cells
    /// to the mortar cells.
    #[inline]
    pub fn secondary_to_mortar_avg(&self) -> &nas::CsrMatrix<f64> {
        &self.secondary_to_mortar_avg
    }

    /// The averaging projection for the given side.
    #[inline]
    pub fn to_mortar_avg(&self, side: MortarSide) -> &nas::CsrMatrix<f64> {
        match side {
            MortarSide::Primary => &self.primary_to_mortar_avg,
            MortarSide::Secondary => &self.secondary_to_mortar_avg,
        }
    }
}

/// Named row/column index into [`CouplingBlocks`].
///
/// The positions are fixed at {0, 1, 2} for the grid being assembled,
/// the grid on the other side of the interface, and the mortar,
/// in that order; the external assembler relies on this convention
/// when stitching blocks into the global system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockIndex {
    /// The grid the current assembly call is made for.
    This,
    /// The grid on the other side of the interface.
    Other,
    /// The mortar grid.
    Mortar,
}

impl BlockIndex {
    fn pos(self) -> usize {
        match self {
            Self::This => 0,
            Self::Other => 1,
            Self::Mortar => 2,
        }
    }
}

/// Accumulator for the 3x3 block matrix of coupling contributions
/// for one grid/interface pair.
///
/// Blocks are only ever added into, never overwritten,
/// so independent coupling operations compose additively.
/// The caller owns zeroing: a fresh accumulator per interface
/// (or an externally managed one) is assumed.
#[derive(Clone, Debug)]
pub struct CouplingBlocks {
    blocks: [[nas::CsrMatrix<f64>; 3]; 3],
}

impl CouplingBlocks {
    /// Create a zeroed accumulator from the number of unknowns
    /// of the grid being assembled, the opposing grid, and the mortar.
    pub fn new(ndof_this: usize, ndof_other: usize, ndof_mortar: usize) -> Self {
        let dims = [ndof_this, ndof_other, ndof_mortar];
        Self {
            blocks: dims.map(|rows| dims.map(|cols| nas::CsrMatrix::zeros(rows, cols))),
        }
    }

    /// Add a contribution into one block.
    ///
    /// Panics on shape mismatch, like all sparse arithmetic here.
    pub fn add(&mut self, row: BlockIndex, col: BlockIndex, contribution: &nas::CsrMatrix<f64>) {
        let slot = &mut self.blocks[row.pos()][col.pos()];
        *slot = &*slot + contribution;
    }

    /// Subtract a contribution from one block.
    pub fn subtract(
        &mut self,
        row: BlockIndex,
        col: BlockIndex,
        contribution: &nas::CsrMatrix<f64>,
    ) {
        let slot = &mut self.blocks[row.pos()][col.pos()];
        *slot = &*slot - contribution;
    }

    /// Read one block.
    #[inline]
    pub fn block(&self, row: BlockIndex, col: BlockIndex) -> &nas::CsrMatrix<f64> {
        &self.blocks[row.pos()][col.pos()]
    }
}
