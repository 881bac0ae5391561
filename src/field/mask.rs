//! Boolean voxel masks and the tissue masks defining the thickness problem.

use super::{array_from_flat_fn, array_shape, ScalarField3};
use crate::{
    error::LatticeError,
    geometry::{
        Dim3::{X, Y, Z},
        Idx3, In3D,
    },
    grid::Lattice3,
    num::BFloat,
};
use ndarray::prelude::*;
use std::sync::Arc;

/// A boolean flag for every voxel of a lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelMask3 {
    name: String,
    lattice: Arc<Lattice3>,
    values: Array3<bool>,
}

impl VoxelMask3 {
    /// Creates a new mask from column-major flags with the shape of the lattice.
    pub fn new(name: String, lattice: Arc<Lattice3>, values: Array3<bool>) -> Self {
        assert!(
            &array_shape(&values) == lattice.shape(),
            "Shape of lattice does not match shape of mask."
        );
        let values = if values.t().is_standard_layout() {
            values
        } else {
            let mut reordered = Array3::from_elem(lattice.shape().to_tuple().f(), false);
            reordered.assign(&values);
            reordered
        };
        Self {
            name,
            lattice,
            values,
        }
    }

    /// Creates a new mask by evaluating `is_set` for every voxel index.
    pub fn from_fn<C>(name: String, lattice: Arc<Lattice3>, is_set: C) -> Self
    where
        C: Fn(&Idx3<usize>) -> bool,
    {
        let values = array_from_flat_fn(&lattice, |flat_idx| {
            is_set(&lattice.idx_from_flat(flat_idx))
        });
        Self::new(name, lattice, values)
    }

    /// Creates a new mask with no voxels set.
    pub fn empty(name: String, lattice: Arc<Lattice3>) -> Self {
        Self::from_fn(name, lattice, |_| false)
    }

    /// Creates a mask flagging every voxel where the scalar field is non-zero.
    pub fn from_scalar_field<F: BFloat>(field: &ScalarField3<F>) -> Self {
        let values = field.values().mapv(|value| value != F::zero());
        Self::new(field.name().to_string(), field.arc_with_lattice(), values)
    }

    /// Returns a reference to the name of the mask.
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

    /// Returns a reference to the 3D array of flags.
    pub fn values(&self) -> &Array3<bool> {
        &self.values
    }

    /// Returns the flags as a slice in memory order.
    pub fn values_in_memory_order(&self) -> &[bool] {
        self.values
            .as_slice_memory_order()
            .expect("Mask values are contiguous")
    }

    /// Whether the voxel at the given 3D index is set.
    pub fn is_set(&self, indices: &Idx3<usize>) -> bool {
        self.values[[indices[X], indices[Y], indices[Z]]]
    }

    /// Whether the voxel at the given flat memory order index is set.
    pub fn is_set_at_flat_idx(&self, flat_idx: usize) -> bool {
        self.values_in_memory_order()[flat_idx]
    }

    /// Counts the number of set voxels.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|&&is_set| is_set).count()
    }

    /// Returns the flat memory order indices of all set voxels in increasing order.
    pub fn set_flat_indices(&self) -> Vec<usize> {
        self.values_in_memory_order()
            .iter()
            .enumerate()
            .filter_map(|(flat_idx, &is_set)| if is_set { Some(flat_idx) } else { None })
            .collect()
    }

    /// Consumes the mask and returns a version with the given name.
    pub fn with_name(self, name: String) -> Self {
        Self { name, ..self }
    }

    /// Converts the mask into a scalar field with 1 for set voxels and 0 elsewhere.
    pub fn to_scalar_field<F: BFloat>(&self) -> ScalarField3<F> {
        ScalarField3::new(
            self.name.clone(),
            self.arc_with_lattice(),
            self.values
                .mapv(|is_set| if is_set { F::one() } else { F::zero() }),
        )
    }

    fn check_same_lattice(&self, other: &Self) -> Result<(), LatticeError> {
        LatticeError::check_shape(&other.name, self.shape(), other.shape())
    }
}

/// Role of a voxel in the potential problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelClass {
    /// Outside the tissue; never updated.
    Free,
    /// Inside the tissue; relaxed towards the average of its neighbors.
    Domain,
    /// On the white matter side; fixed at potential 1.
    InnerBoundary,
    /// On the pial side; fixed at potential 0.
    OuterBoundary,
}

/// The domain mask and the two Dirichlet boundary masks of one subject.
///
/// All masks share a lattice and the two boundaries are disjoint.
/// The masks can not be modified after construction.
#[derive(Clone, Debug)]
pub struct TissueMasks3 {
    domain: VoxelMask3,
    inner_boundary: VoxelMask3,
    outer_boundary: VoxelMask3,
}

impl TissueMasks3 {
    /// Validates and bundles the domain and boundary masks.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the bundled masks.
    /// - `Err`: Contains a `ShapeMismatch` if the masks disagree in shape, or an
    /// `OverlappingBoundaries` if any voxel is in both boundaries.
    pub fn new(
        domain: VoxelMask3,
        inner_boundary: VoxelMask3,
        outer_boundary: VoxelMask3,
    ) -> Result<Self, LatticeError> {
        domain.check_same_lattice(&inner_boundary)?;
        domain.check_same_lattice(&outer_boundary)?;

        let count = inner_boundary
            .values()
            .iter()
            .zip(outer_boundary.values().iter())
            .filter(|(&inner, &outer)| inner && outer)
            .count();
        if count > 0 {
            return Err(LatticeError::OverlappingBoundaries { count });
        }

        Ok(Self {
            domain,
            inner_boundary,
            outer_boundary,
        })
    }

    /// Returns the mask of voxels where the potential is relaxed.
    pub fn domain(&self) -> &VoxelMask3 {
        &self.domain
    }

    /// Returns the mask of voxels fixed at potential 1.
    pub fn inner_boundary(&self) -> &VoxelMask3 {
        &self.inner_boundary
    }

    /// Returns the mask of voxels fixed at potential 0.
    pub fn outer_boundary(&self) -> &VoxelMask3 {
        &self.outer_boundary
    }

    /// Returns a reference to the lattice shared by the masks.
    pub fn lattice(&self) -> &Lattice3 {
        self.domain.lattice()
    }

    /// Returns a new atomic reference counted pointer to the shared lattice.
    pub fn arc_with_lattice(&self) -> Arc<Lattice3> {
        self.domain.arc_with_lattice()
    }

    /// Returns a copy of the masks placed on a lattice with the same shape but
    /// possibly different edge behavior or transform.
    pub fn on_lattice(&self, lattice: Arc<Lattice3>) -> Result<Self, LatticeError> {
        let move_mask = |mask: &VoxelMask3| -> Result<VoxelMask3, LatticeError> {
            LatticeError::check_shape(mask.name(), lattice.shape(), mask.shape())?;
            Ok(VoxelMask3::new(
                mask.name().to_string(),
                Arc::clone(&lattice),
                mask.values().clone(),
            ))
        };
        Self::new(
            move_mask(&self.domain)?,
            move_mask(&self.inner_boundary)?,
            move_mask(&self.outer_boundary)?,
        )
    }

    /// Determines the role of the voxel at the given flat memory order index.
    ///
    /// Boundary membership takes precedence over domain membership.
    pub fn classify(&self, flat_idx: usize) -> VoxelClass {
        if self.inner_boundary.is_set_at_flat_idx(flat_idx) {
            VoxelClass::InnerBoundary
        } else if self.outer_boundary.is_set_at_flat_idx(flat_idx) {
            VoxelClass::OuterBoundary
        } else if self.domain.is_set_at_flat_idx(flat_idx) {
            VoxelClass::Domain
        } else {
            VoxelClass::Free
        }
    }

    /// Determines the role of every voxel, in memory order.
    pub fn classify_all(&self) -> Vec<VoxelClass> {
        (0..self.lattice().n_voxels())
            .map(|flat_idx| self.classify(flat_idx))
            .collect()
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::grid::{LatticeBoundary, SpatialTransform};

    fn lattice(shape: In3D<usize>) -> Arc<Lattice3> {
        Arc::new(Lattice3::with_boundary(
            shape,
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ))
    }

    fn layer_mask(name: &str, lattice: &Arc<Lattice3>, z: usize) -> VoxelMask3 {
        VoxelMask3::from_fn(name.to_string(), Arc::clone(lattice), |indices| {
            indices[Z] == z
        })
    }

    #[test]
    fn valid_masks_are_classified() {
        let lattice = lattice(In3D::new(2, 2, 4));
        let domain = VoxelMask3::from_fn("cortex".to_string(), Arc::clone(&lattice), |indices| {
            indices[Z] > 0 && indices[Z] < 3
        });
        let masks = TissueMasks3::new(
            domain,
            layer_mask("wm", &lattice, 0),
            layer_mask("pial", &lattice, 3),
        )
        .unwrap();

        let classes = masks.classify_all();
        assert_eq!(classes[lattice.flat_idx(&Idx3::new(1, 1, 0))], VoxelClass::InnerBoundary);
        assert_eq!(classes[lattice.flat_idx(&Idx3::new(0, 1, 2))], VoxelClass::Domain);
        assert_eq!(classes[lattice.flat_idx(&Idx3::new(1, 0, 3))], VoxelClass::OuterBoundary);
        assert_eq!(masks.outer_boundary().count(), 4);
        assert_eq!(masks.outer_boundary().set_flat_indices(), vec![12, 13, 14, 15]);
    }

    #[test]
    fn masks_of_different_shapes_are_rejected() {
        let lattice_a = lattice(In3D::new(2, 2, 4));
        let lattice_b = lattice(In3D::new(2, 3, 4));
        let err = TissueMasks3::new(
            VoxelMask3::empty("cortex".to_string(), Arc::clone(&lattice_a)),
            layer_mask("wm", &lattice_a, 0),
            layer_mask("pial", &lattice_b, 3),
        )
        .unwrap_err();
        assert_eq!(
            err,
            LatticeError::ShapeMismatch {
                quantity: "pial".to_string(),
                expected: In3D::new(2, 2, 4),
                found: In3D::new(2, 3, 4),
            }
        );
    }

    #[test]
    fn overlapping_boundaries_are_rejected() {
        let lattice = lattice(In3D::new(2, 2, 4));
        let err = TissueMasks3::new(
            VoxelMask3::empty("cortex".to_string(), Arc::clone(&lattice)),
            layer_mask("wm", &lattice, 1),
            layer_mask("pial", &lattice, 1),
        )
        .unwrap_err();
        assert_eq!(err, LatticeError::OverlappingBoundaries { count: 4 });
    }

    #[test]
    fn masks_convert_to_and_from_scalar_fields() {
        let lattice = lattice(In3D::new(2, 2, 4));
        let mask = layer_mask("wm", &lattice, 2);
        let field: ScalarField3<f32> = mask.to_scalar_field();
        assert_eq!(field.value(&Idx3::new(0, 1, 2)), 1.0);
        assert_eq!(field.value(&Idx3::new(0, 1, 1)), 0.0);
        assert_eq!(VoxelMask3::from_scalar_field(&field), mask);
    }
}
