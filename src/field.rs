//! Typed value vectors over the discrete spaces of a grid.

use nalgebra as na;

/// Marker type for the space of cell-centered values (one per cell).
#[derive(Clone, Copy, Debug)]
pub struct Cells;

/// Marker type for the space of face values (one per face),
/// used for fluxes and boundary-condition data alike.
#[derive(Clone, Copy, Debug)]
pub struct Faces;

/// Marker type for the space of mortar values (one per mortar cell).
#[derive(Clone, Copy, Debug)]
pub struct Mortar;

/// A vector of values associated with one discrete space of a grid,
/// e.g. a pressure per cell ([`Field<Cells>`]) or a flux per face
/// ([`Field<Faces>`]).
///
/// The space marker only exists at the type level;
/// at runtime this is a plain dense vector.
/// Zero-valued fields of the right length are constructed with
/// [`Grid::new_cell_field`][crate::Grid::new_cell_field] and friends,
/// arbitrary ones with the [`From`] impl from a `DVector`.
#[derive(Clone)]
pub struct Field<Space> {
    /// The underlying vector of real values, exposed for convenience.
    ///
    /// Note that changing the length of this vector at runtime
    /// will cause a dimension mismatch with operators,
    /// leading to a panic when an operator is applied.
    /// Use with caution.
    pub values: na::DVector<f64>,
    _marker: std::marker::PhantomData<Space>,
}

impl<Space> Field<Space> {
    #[inline]
    pub(crate) fn zeros(len: usize) -> Self {
        Self::from(na::DVector::zeros(len))
    }

    /// Get the number of values in the field.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the field has no values (e.g. a face field on a 0D grid).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<Space> From<na::DVector<f64>> for Field<Space> {
    fn from(values: na::DVector<f64>) -> Self {
        Self {
            values,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Space> crate::operator::Operand for Field<Space> {
    type Space = Space;

    fn values(&self) -> &na::DVector<f64> {
        &self.values
    }

    fn from_values(values: na::DVector<f64>) -> Self {
        Self::from(values)
    }
}

// std trait impls for math ops and such
// (a few permutations needed to also work with references)

impl<S> std::fmt::Debug for Field<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field, values {:?}", self.values)
    }
}

impl<S> PartialEq for Field<S> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

// Add

impl<S> std::ops::Add for Field<S> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Field::from(self.values + rhs.values)
    }
}

impl<S> std::ops::Add<&Field<S>> for Field<S> {
    type Output = Self;

    fn add(self, rhs: &Field<S>) -> Self::Output {
        Field::from(self.values + &rhs.values)
    }
}

impl<S> std::ops::Add for &Field<S> {
    type Output = Field<S>;

    fn add(self, rhs: Self) -> Self::Output {
        Field::from(&self.values + &rhs.values)
    }
}

// AddAssign

impl<S> std::ops::AddAssign for Field<S> {
    fn add_assign(&mut self, rhs: Self) {
        self.values += rhs.values;
    }
}

impl<S> std::ops::AddAssign<&Field<S>> for Field<S> {
    fn add_assign(&mut self, rhs: &Field<S>) {
        self.values += &rhs.values;
    }
}

// Neg

impl<S> std::ops::Neg for Field<S> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from(-self.values)
    }
}

impl<S> std::ops::Neg for &Field<S> {
    type Output = Field<S>;

    fn neg(self) -> Self::Output {
        Field::from(-&self.values)
    }
}

// Sub

impl<S> std::ops::Sub for Field<S> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::from(self.values - rhs.values)
    }
}

impl<S> std::ops::Sub for &Field<S> {
    type Output = Field<S>;

    fn sub(self, rhs: Self) -> Self::Output {
        Field::from(&self.values - &rhs.values)
    }
}

// Mul (scalar)

impl<S> std::ops::Mul<Field<S>> for f64 {
    type Output = Field<S>;

    fn mul(self, rhs: Field<S>) -> Self::Output {
        Field::from(self * rhs.values)
    }
}

impl<S> std::ops::Mul<&Field<S>> for f64 {
    type Output = Field<S>;

    fn mul(self, rhs: &Field<S>) -> Self::Output {
        Field::from(self * &rhs.values)
    }
}
