//! Scalar and vector fields over a voxel lattice.

pub mod mask;

use crate::{
    error::LatticeError,
    geometry::{
        Dim3::{self, X, Y, Z},
        Idx3, In3D, Vec3,
    },
    grid::Lattice3,
    num::BFloat,
};
use ndarray::prelude::*;
use std::sync::Arc;

/// Creates a column-major 3D array with the shape of the given lattice by
/// evaluating `compute_value` for every flat memory order index.
pub fn array_from_flat_fn<T, C>(lattice: &Lattice3, compute_value: C) -> Array3<T>
where
    C: FnMut(usize) -> T,
{
    let values: Vec<T> = (0..lattice.n_voxels()).map(compute_value).collect();
    Array::from_shape_vec(lattice.shape().to_tuple().f(), values)
        .expect("Number of values matches lattice shape")
}

/// Wraps a memory order buffer in a column-major 3D array with the shape of the lattice.
pub fn array_from_buffer<T>(lattice: &Lattice3, values: Vec<T>) -> Array3<T> {
    Array::from_shape_vec(lattice.shape().to_tuple().f(), values)
        .expect("Number of values matches lattice shape")
}

/// Returns the shape of a 3D array as an `In3D`.
pub fn array_shape<T>(values: &Array3<T>) -> In3D<usize> {
    let shape = values.shape();
    In3D::new(shape[0], shape[1], shape[2])
}

/// A 3D scalar field.
///
/// Holds the lattice and the values of a 3D scalar field, one per voxel.
/// The array of values is laid out in column-major order in memory.
#[derive(Clone, Debug)]
pub struct ScalarField3<F> {
    name: String,
    lattice: Arc<Lattice3>,
    values: Array3<F>,
}

impl<F: BFloat> ScalarField3<F> {
    /// Creates a new scalar field given a name, a lattice and the values.
    ///
    /// The values must have the shape of the lattice and be stored in
    /// column-major order.
    pub fn new(name: String, lattice: Arc<Lattice3>, values: Array3<F>) -> Self {
        assert!(
            &array_shape(&values) == lattice.shape(),
            "Shape of lattice does not match shape of array of values."
        );
        assert!(
            values.t().is_standard_layout(),
            "Array of values must be contiguous in column-major order."
        );
        Self {
            name,
            lattice,
            values,
        }
    }

    /// Creates a new scalar field with every value set to zero.
    pub fn zeros(name: String, lattice: Arc<Lattice3>) -> Self {
        let values = Array3::zeros(lattice.shape().to_tuple().f());
        Self::new(name, lattice, values)
    }

    /// Creates a new scalar field by checking that the given values fit the lattice.
    pub fn try_new(
        name: String,
        lattice: Arc<Lattice3>,
        values: Array3<F>,
    ) -> Result<Self, LatticeError> {
        LatticeError::check_shape(&name, lattice.shape(), &array_shape(&values))?;
        let values = if values.t().is_standard_layout() {
            values
        } else {
            let mut reordered = Array3::zeros(lattice.shape().to_tuple().f());
            reordered.assign(&values);
            reordered
        };
        Ok(Self::new(name, lattice, values))
    }

    /// Returns a reference to the name of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the lattice.
    pub fn lattice(&self) -> &Lattice3 {
        self.lattice.as_ref()
    }

    /// Returns a new atomic reference counted pointer to the lattice.
    pub fn arc_with_lattice(&self) -> Arc<Lattice3> {
        Arc::clone(&self.lattice)
    }

    /// Returns the 3D shape of the lattice.
    pub fn shape(&self) -> &In3D<usize> {
        self.lattice.shape()
    }

    /// Returns a reference to the 3D array of field values.
    pub fn values(&self) -> &Array3<F> {
        &self.values
    }

    /// Returns the field values as a slice in memory order.
    pub fn values_in_memory_order(&self) -> &[F] {
        self.values
            .as_slice_memory_order()
            .expect("Field values are contiguous")
    }

    /// Returns the field value at the given 3D index.
    pub fn value(&self, indices: &Idx3<usize>) -> F {
        self.values[[indices[X], indices[Y], indices[Z]]]
    }

    /// Consumes the scalar field and returns the owned array of field values.
    pub fn into_values(self) -> Array3<F> {
        self.values
    }

    /// Consumes the scalar field and returns a version with the given name.
    pub fn with_name(self, name: String) -> Self {
        Self {
            name,
            lattice: self.lattice,
            values: self.values,
        }
    }
}

/// A 3D vector field.
///
/// Holds the lattice and the values of the three components of a 3D
/// vector field. The arrays of component values are laid out in
/// column-major order in memory.
#[derive(Clone, Debug)]
pub struct VectorField3<F> {
    name: String,
    lattice: Arc<Lattice3>,
    components: In3D<ScalarField3<F>>,
}

impl<F: BFloat> VectorField3<F> {
    /// Creates a new vector field given a name, a lattice, and the scalar fields
    /// representing the component values.
    pub fn new(name: String, lattice: Arc<Lattice3>, components: In3D<ScalarField3<F>>) -> Self {
        for dim in Dim3::slice() {
            assert!(
                components[dim].shape() == lattice.shape(),
                "Shape of {}-component does not match shape of lattice.",
                dim
            );
        }
        Self {
            name,
            lattice,
            components,
        }
    }

    /// Returns a reference to the name of the field.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the lattice.
    pub fn lattice(&self) -> &Lattice3 {
        self.lattice.as_ref()
    }

    /// Returns a new atomic reference counted pointer to the lattice.
    pub fn arc_with_lattice(&self) -> Arc<Lattice3> {
        Arc::clone(&self.lattice)
    }

    /// Returns the 3D shape of the lattice.
    pub fn shape(&self) -> &In3D<usize> {
        self.lattice.shape()
    }

    /// Returns a reference to the scalar field representing the specified
    /// vector field component.
    pub fn component(&self, dim: Dim3) -> &ScalarField3<F> {
        &self.components[dim]
    }

    /// Returns a reference to the 3D array of field values for the
    /// specified component.
    pub fn values(&self, dim: Dim3) -> &Array3<F> {
        self.components[dim].values()
    }

    /// Returns the field vector at the given 3D index.
    pub fn vector(&self, indices: &Idx3<usize>) -> Vec3<F> {
        Vec3::with_each_component(|dim| self.components[dim].value(indices))
    }

    /// Returns the field vector at the given flat memory order index.
    pub fn vector_at_flat_idx(&self, flat_idx: usize) -> Vec3<F> {
        Vec3::with_each_component(|dim| self.components[dim].values_in_memory_order()[flat_idx])
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::grid::{LatticeBoundary, SpatialTransform};

    fn lattice() -> Arc<Lattice3> {
        Arc::new(Lattice3::with_boundary(
            In3D::new(3, 2, 2),
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ))
    }

    #[test]
    fn flat_fn_fills_in_column_major_order() {
        let lattice = lattice();
        let values = array_from_flat_fn(&lattice, |idx| idx as f64);
        let field = ScalarField3::new("index".to_string(), Arc::clone(&lattice), values);
        assert_eq!(field.value(&Idx3::new(1, 0, 0)), 1.0);
        assert_eq!(field.value(&Idx3::new(0, 1, 0)), 3.0);
        assert_eq!(field.value(&Idx3::new(2, 1, 1)), 11.0);
        assert_eq!(field.values_in_memory_order()[7], 7.0);
    }

    #[test]
    fn row_major_values_are_reordered() {
        let lattice = lattice();
        let values = Array3::from_shape_fn((3, 2, 2), |(i, j, k)| (i + 10 * j + 100 * k) as f32);
        let field = ScalarField3::try_new("data".to_string(), lattice, values).unwrap();
        assert!(field.values().t().is_standard_layout());
        assert_eq!(field.value(&Idx3::new(2, 1, 1)), 112.0);
        assert_eq!(field.values_in_memory_order()[1], 1.0);
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let values = Array3::<f64>::zeros((3, 2, 3).f());
        let err = ScalarField3::try_new("phi".to_string(), lattice(), values).unwrap_err();
        assert_eq!(
            err,
            LatticeError::ShapeMismatch {
                quantity: "phi".to_string(),
                expected: In3D::new(3, 2, 2),
                found: In3D::new(3, 2, 3),
            }
        );
    }
}
