//! Composable sparse operators for doing math on [`Field`][crate::Field]s.

use nalgebra as na;
use nalgebra_sparse as nas;

use crate::field::Field;
use itertools::izip;

//
// traits
//

/// Trait enabling operator composition checked for compatibility at compile time.
pub trait Operator {
    /// The type of field this operator takes as an input.
    type Input: Operand;
    /// The type of field this operator produces as an output.
    type Output: Operand;

    /// Apply this operator to an input field.
    fn apply(&self, input: &Self::Input) -> Self::Output;
    /// Convert this operator into a CSR matrix.
    fn into_csr(self) -> nas::CsrMatrix<f64>;
}

/// Trait implemented by [`Field`][crate::Field]s to enable operators
/// to construct and deconstruct them in a generic way.
pub trait Operand {
    /// The space marker of this field, used for matching with other generic types.
    type Space;
    /// Get the underlying vector of values in the field.
    fn values(&self) -> &na::DVector<f64>;
    /// Construct a field from a vector of values.
    fn from_values(values: na::DVector<f64>) -> Self;
}

//
// concrete operators
//

/// A diagonal matrix operator, e.g. a mass matrix.
///
/// See [`MatrixOperator`] and the [crate-level docs][crate#operators] for more details.
#[derive(Clone, Debug)]
pub struct DiagonalOperator<Input, Output> {
    // a diagonal vector is a more efficient form of storage than a CSR matrix.
    // this is converted to a matrix upon composition with other operators
    diagonal: na::DVector<f64>,
    _marker: std::marker::PhantomData<(Input, Output)>,
}

impl<Input, Output> Operator for DiagonalOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    type Input = Input;
    type Output = Output;

    fn apply(&self, input: &Self::Input) -> Self::Output {
        let input = input.values();
        let ret = na::DVector::from_iterator(
            input.len(),
            izip!(self.diagonal.iter(), input.iter()).map(|(&diag_val, &in_val)| diag_val * in_val),
        );
        Self::Output::from_values(ret)
    }

    fn into_csr(self) -> nas::CsrMatrix<f64> {
        // nalgebra doesn't have a method to construct CSR directly from a diagonal.
        // construct an identity matrix to get the right sparsity pattern
        // and then replace the entries
        let mut csr = nas::CsrMatrix::identity(self.diagonal.len());
        for (&diag, mat_diag) in self.diagonal.iter().zip(csr.values_mut()) {
            *mat_diag = diag;
        }
        csr
    }
}

impl<Input, Output> From<na::DVector<f64>> for DiagonalOperator<Input, Output> {
    fn from(diagonal: na::DVector<f64>) -> Self {
        Self {
            diagonal,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Input, Output> DiagonalOperator<Input, Output> {
    /// Get the diagonal entries of this operator.
    #[inline]
    pub fn diagonal(&self) -> &na::DVector<f64> {
        &self.diagonal
    }

    /// The inverse of this operator, i.e. the reciprocal diagonal.
    ///
    /// Zero diagonal entries produce non-finite values in the result
    /// rather than an error, so that the caller can detect degenerate
    /// coefficients numerically.
    pub fn inv(&self) -> DiagonalOperator<Output, Input> {
        DiagonalOperator::from(self.diagonal.map(|d| 1.0 / d))
    }
}

impl<Input, Output> PartialEq for DiagonalOperator<Input, Output> {
    fn eq(&self, other: &Self) -> bool {
        self.diagonal == other.diagonal
    }
}

/// A general sparse matrix operator,
/// parameterized with the field types it consumes and produces.
///
/// This can be a composition of one or more [`MatrixOperator`]s
/// and [`DiagonalOperator`]s.
/// Composition can be done using multiplication syntax:
/// ```
/// # use mdflow::{grid::cart_grid_1d, Cells, Faces, Field, Op};
/// # use nalgebra_sparse::CsrMatrix;
/// # let g = cart_grid_1d(3, 1.0);
/// let flux: Op<Field<Cells>, Field<Faces>> =
///     Op::from(CsrMatrix::zeros(g.num_faces(), g.num_cells()));
/// let system: Op<Field<Cells>, Field<Cells>> = g.divergence() * flux;
/// ```
/// A free function [`compose`] is also provided for the same purpose.
///
/// There is also a [`DiagonalOperator`] type for operators
/// which are specifically diagonal matrices,
/// which stores them in a somewhat more efficient format.
/// When you don't need the efficiency and prefer notational convenience,
/// these can also be converted into a MatrixOperator using the std [`From`] trait.
/// This enables writing all your operator types as `MatrixOperator<Input, Output>`,
/// a convenient pattern which can be written more concisely with the type alias [`Op`].
#[derive(Clone, Debug)]
pub struct MatrixOperator<Input, Output> {
    mat: nas::CsrMatrix<f64>,
    _marker: std::marker::PhantomData<(Input, Output)>,
}

/// A type alias for [`MatrixOperator`]
/// to make common patterns more convenient to type.
pub type Op<Input, Output> = MatrixOperator<Input, Output>;

impl<Input, Output> Operator for MatrixOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    type Input = Input;
    type Output = Output;

    fn apply(&self, input: &Self::Input) -> Self::Output {
        Self::Output::from_values(&self.mat * input.values())
    }

    fn into_csr(self) -> nas::CsrMatrix<f64> {
        self.mat
    }
}

impl<Input, Output> MatrixOperator<Input, Output> {
    /// Access the underlying CSR matrix of this operator.
    #[inline]
    pub fn as_csr(&self) -> &nas::CsrMatrix<f64> {
        &self.mat
    }

    /// The transpose of this operator,
    /// mapping the output space back to the input space.
    pub fn transpose(&self) -> MatrixOperator<Output, Input> {
        MatrixOperator::from(self.mat.transpose())
    }
}

impl<L, R> PartialEq for MatrixOperator<L, R> {
    fn eq(&self, other: &Self) -> bool {
        self.mat == other.mat
    }
}

// conversions from other operators and construction by matrix

impl<Input, Output> From<nas::CsrMatrix<f64>> for MatrixOperator<Input, Output> {
    fn from(mat: nas::CsrMatrix<f64>) -> Self {
        Self {
            mat,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Input, Output> From<DiagonalOperator<Input, Output>> for MatrixOperator<Input, Output>
where
    DiagonalOperator<Input, Output>: Operator,
{
    fn from(s: DiagonalOperator<Input, Output>) -> Self {
        Self {
            mat: s.into_csr(),
            _marker: std::marker::PhantomData,
        }
    }
}

//
// helper functions
//

/// Compose two operators such that `r` is applied before `l`.
///
/// This can also be done with multiplication syntax:
/// `compose(l, r)` is equivalent to `l * r`.
pub fn compose<Left, Right>(l: Left, r: Right) -> MatrixOperator<Right::Input, Left::Output>
where
    Left: Operator<Input = Right::Output>,
    Right: Operator,
{
    MatrixOperator {
        mat: l.into_csr() * r.into_csr(),
        _marker: std::marker::PhantomData,
    }
}

//
// std trait implementations
//

// Mul implementations for composition, scalar multiplication and application to fields.
// These need to be implemented for each type separately due to the orphan rule

// compositions

impl<In, Out, Rhs> std::ops::Mul<Rhs> for DiagonalOperator<In, Out>
where
    In: Operand,
    Out: Operand,
    Rhs: Operator<Output = <Self as Operator>::Input>,
{
    type Output = MatrixOperator<Rhs::Input, <Self as Operator>::Output>;

    fn mul(self, rhs: Rhs) -> Self::Output {
        compose(self, rhs)
    }
}

impl<In, Out, Rhs> std::ops::Mul<Rhs> for MatrixOperator<In, Out>
where
    In: Operand,
    Out: Operand,
    Rhs: Operator<Output = <Self as Operator>::Input>,
{
    type Output = MatrixOperator<Rhs::Input, <Self as Operator>::Output>;

    fn mul(self, rhs: Rhs) -> Self::Output {
        compose(self, rhs)
    }
}

// scalar multiplication

impl<Input, Output> std::ops::Mul<DiagonalOperator<Input, Output>> for f64 {
    type Output = DiagonalOperator<Input, Output>;

    fn mul(self, mut rhs: DiagonalOperator<Input, Output>) -> Self::Output {
        rhs.diagonal *= self;
        rhs
    }
}

impl<L, R> std::ops::Mul<MatrixOperator<L, R>> for f64 {
    type Output = MatrixOperator<L, R>;

    fn mul(self, mut rhs: MatrixOperator<L, R>) -> Self::Output {
        rhs.mat *= self;
        rhs
    }
}

// fields

// impl for reference too, because the impl for value consumes the operator
// and we don't usually want that

impl<Out, S> std::ops::Mul<&Field<S>> for DiagonalOperator<Field<S>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Field<S>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, S> std::ops::Mul<&Field<S>> for &DiagonalOperator<Field<S>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Field<S>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, S> std::ops::Mul<&Field<S>> for MatrixOperator<Field<S>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Field<S>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, S> std::ops::Mul<&Field<S>> for &MatrixOperator<Field<S>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Field<S>) -> Self::Output {
        self.apply(rhs)
    }
}

//
// tests
//
