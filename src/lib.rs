//! Building blocks for cell-centered finite-volume discretizations
//! of single-phase flow in mixed-dimensional (fractured) domains.
//!
//! A domain is a collection of [`Grid`]s of different topological dimension
//! (a matrix grid cut by lower-dimensional fracture grids),
//! glued together through interface ("mortar") grids.
//! This crate assembles, per grid and per interface,
//! the sparse building blocks of the pressure equation:
//!
//! - the per-grid system matrix `div * flux` and boundary right-hand side
//!   (see [`FvElliptic`]),
//! - the interface contributions enforcing flux and pressure continuity
//!   across a mortar grid (see [`CouplingBlocks`]),
//! - a diagonal mass matrix for use in time discretizations
//!   (see [`MassMatrix`]).
//!
//! The actual flux-discretization coefficients (two-point or multi-point
//! flux approximations) are computed by an external provider
//! implementing [`FluxDiscretization`] and cached in a per-grid [`GridData`]
//! store; everything here composes those cached operators.
//! Grid geometry construction, global system stitching, and linear solvers
//! are likewise owned by the caller.
//!
//! # Operators
//!
//! Discrete quantities live in typed spaces: cell pressures are a
//! [`Field<Cells>`][Field], face fluxes a [`Field<Faces>`][Field],
//! mortar unknowns a [`Field<Mortar>`][Field].
//! Sparse operators between these spaces carry their input and output
//! spaces as type parameters, so composition with `*` is shape-checked
//! at compile time:
//!
//! ```
//! # use mdflow::{grid::cart_grid_1d, Cells, Faces, Field, Op};
//! let g = cart_grid_1d(4, 1.0);
//! // maps face fluxes to cell balances
//! let div: Op<Field<Faces>, Field<Cells>> = g.divergence();
//! let balance = div * &g.new_face_field();
//! ```

#![warn(missing_docs)]

pub mod grid;
#[doc(inline)]
pub use grid::Grid;

pub mod field;
#[doc(inline)]
pub use field::{Cells, Faces, Field, Mortar};

pub mod operator;
#[doc(inline)]
pub use operator::{DiagonalOperator, Op, Operand, Operator};

pub mod data;
#[doc(inline)]
pub use data::{FlowParameters, GridData};

pub mod elliptic;
#[doc(inline)]
pub use elliptic::{DiscretizationError, FluxDiscretization, FvElliptic};

pub mod coupling;
#[doc(inline)]
pub use coupling::{BlockIndex, CouplingBlocks, MortarGrid, MortarSide};

pub mod mass;
#[doc(inline)]
pub use mass::MassMatrix;

// nalgebra re-export for convenience,
// since all dense vectors in the public API are nalgebra types

pub use nalgebra as na;
/// Type alias for the dense `nalgebra` vector type used throughout.
pub type DVector = na::DVector<f64>;
