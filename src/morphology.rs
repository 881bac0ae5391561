//! Binary morphology and construction of the boundary masks from segmentations.

use crate::{
    backend::ComputeBackend,
    error::LatticeError,
    field::{
        array_from_buffer,
        mask::{TissueMasks3, VoxelMask3},
    },
    geometry::{Dim3, Idx3},
    grid::Lattice3,
};
use std::{mem, sync::Arc};

/// Configuration parameters for deriving boundary masks.
#[derive(Clone, Debug)]
pub struct BoundaryMaskConfig {
    /// Number of cortex dilations used to find the inner boundary.
    pub inner_dilation_iterations: usize,
    /// Number of brain erosions restricting the inner boundary to the brain interior.
    pub brain_erosion_iterations: usize,
    /// Number of cortex dilations used to find the outer boundary.
    pub outer_dilation_iterations: usize,
    /// How each morphology pass is scheduled.
    pub backend: ComputeBackend,
}

impl BoundaryMaskConfig {
    pub const DEFAULT_INNER_DILATION_ITERATIONS: usize = 1;
    pub const DEFAULT_BRAIN_EROSION_ITERATIONS: usize = 2;
    pub const DEFAULT_OUTER_DILATION_ITERATIONS: usize = 3;

    /// Panics if any of the configuration parameter values are invalid.
    pub fn validate(&self) {
        assert!(
            self.inner_dilation_iterations >= 1 && self.outer_dilation_iterations >= 1,
            "Number of dilations must be at least one."
        );
    }
}

impl Default for BoundaryMaskConfig {
    fn default() -> Self {
        BoundaryMaskConfig {
            inner_dilation_iterations: Self::DEFAULT_INNER_DILATION_ITERATIONS,
            brain_erosion_iterations: Self::DEFAULT_BRAIN_EROSION_ITERATIONS,
            outer_dilation_iterations: Self::DEFAULT_OUTER_DILATION_ITERATIONS,
            backend: ComputeBackend::default(),
        }
    }
}

/// Returns the flat indices of the six face neighbors of the voxel, with
/// `None` for neighbors outside the lattice. The lattice never wraps here.
fn cross_neighbors(lattice: &Lattice3, flat_idx: usize) -> [Option<usize>; 6] {
    let indices: Idx3<usize> = lattice.idx_from_flat(flat_idx);
    let mut neighbors = [None; 6];
    for dim in Dim3::slice() {
        let i = indices[dim];
        let stride = lattice.stride(dim);
        if i > 0 {
            neighbors[2 * dim.num()] = Some(flat_idx - stride);
        }
        if i + 1 < lattice.shape()[dim] {
            neighbors[2 * dim.num() + 1] = Some(flat_idx + stride);
        }
    }
    neighbors
}

fn apply_cross_pass<C>(mask: &VoxelMask3, iterations: usize, backend: ComputeBackend, update: C) -> VoxelMask3
where
    C: Fn(bool, [Option<bool>; 6]) -> bool + Sync,
{
    let lattice = mask.arc_with_lattice();
    let mut current = mask.values_in_memory_order().to_vec();
    let mut next = current.clone();

    for _ in 0..iterations {
        let previous = &current;
        backend.fill(&mut next, |flat_idx| {
            let neighbors = cross_neighbors(&lattice, flat_idx);
            update(
                previous[flat_idx],
                neighbors.map(|neighbor| neighbor.map(|idx| previous[idx])),
            )
        });
        mem::swap(&mut current, &mut next);
    }
    let values = array_from_buffer(&lattice, current);
    VoxelMask3::new(mask.name().to_string(), lattice, values)
}

/// Dilates the mask the given number of times with the 6-connected cross.
///
/// Voxels outside the lattice count as unset.
pub fn binary_dilation(mask: &VoxelMask3, iterations: usize, backend: ComputeBackend) -> VoxelMask3 {
    apply_cross_pass(mask, iterations, backend, |is_set, neighbors| {
        is_set || neighbors.iter().any(|&neighbor| neighbor == Some(true))
    })
}

/// Erodes the mask the given number of times with the 6-connected cross.
///
/// Voxels outside the lattice count as unset, so set voxels at the lattice
/// edge are removed by the first erosion.
pub fn binary_erosion(mask: &VoxelMask3, iterations: usize, backend: ComputeBackend) -> VoxelMask3 {
    apply_cross_pass(mask, iterations, backend, |is_set, neighbors| {
        is_set && neighbors.iter().all(|&neighbor| neighbor == Some(true))
    })
}

/// Derives the domain and boundary masks from a cortex and a whole-brain mask.
///
/// - inner boundary: voxels next to the cortex, outside it, but well inside the brain;
/// - outer boundary: voxels near the cortex but outside the brain;
/// - domain: cortex voxels in neither boundary.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains the validated `TissueMasks3`.
/// - `Err`: Contains a `ShapeMismatch` if the input masks disagree in shape.
pub fn build_boundary_masks(
    cortex: &VoxelMask3,
    brain: &VoxelMask3,
    config: &BoundaryMaskConfig,
) -> Result<TissueMasks3, LatticeError> {
    config.validate();
    LatticeError::check_shape(brain.name(), cortex.shape(), brain.shape())?;

    let backend = config.backend;
    let lattice = cortex.arc_with_lattice();

    let near_cortex = binary_dilation(cortex, config.inner_dilation_iterations, backend);
    let brain_interior = binary_erosion(brain, config.brain_erosion_iterations, backend);
    let around_cortex = binary_dilation(cortex, config.outer_dilation_iterations, backend);

    let inner = VoxelMask3::from_fn("wm".to_string(), Arc::clone(&lattice), |indices| {
        near_cortex.is_set(indices) && !cortex.is_set(indices) && brain_interior.is_set(indices)
    });
    let outer = VoxelMask3::from_fn("pial".to_string(), Arc::clone(&lattice), |indices| {
        around_cortex.is_set(indices) && !brain.is_set(indices)
    });
    let domain = VoxelMask3::from_fn("cortex".to_string(), lattice, |indices| {
        cortex.is_set(indices) && !inner.is_set(indices) && !outer.is_set(indices)
    });

    TissueMasks3::new(domain, inner, outer)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        geometry::{Dim3::X, In3D},
        grid::{LatticeBoundary, SpatialTransform},
    };

    fn lattice(shape: In3D<usize>) -> Arc<Lattice3> {
        Arc::new(Lattice3::with_boundary(
            shape,
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ))
    }

    fn single_voxel(lattice: &Arc<Lattice3>, voxel: Idx3<usize>) -> VoxelMask3 {
        VoxelMask3::from_fn("seed".to_string(), Arc::clone(lattice), |indices| {
            indices == &voxel
        })
    }

    #[test]
    fn dilation_grows_cross_without_wrapping() {
        let lattice = lattice(In3D::new(5, 5, 5));
        let seed = single_voxel(&lattice, Idx3::new(0, 2, 2));

        let once = binary_dilation(&seed, 1, ComputeBackend::Serial);
        assert_eq!(once.count(), 6);
        assert!(once.is_set(&Idx3::new(1, 2, 2)));
        assert!(!once.is_set(&Idx3::new(4, 2, 2)));
        assert!(!once.is_set(&Idx3::new(1, 3, 2)));

        let twice = binary_dilation(&seed, 2, ComputeBackend::Parallel);
        assert!(twice.is_set(&Idx3::new(1, 3, 2)));
        assert!(twice.is_set(&Idx3::new(2, 2, 2)));
    }

    #[test]
    fn erosion_strips_lattice_edge() {
        let lattice = lattice(In3D::new(5, 5, 5));
        let full = VoxelMask3::from_fn("brain".to_string(), Arc::clone(&lattice), |_| true);

        let once = binary_erosion(&full, 1, ComputeBackend::Serial);
        assert_eq!(once.count(), 27);
        let twice = binary_erosion(&full, 2, ComputeBackend::Serial);
        assert_eq!(twice.count(), 1);
        assert!(twice.is_set(&Idx3::new(2, 2, 2)));
    }

    #[test]
    fn boundaries_enclose_cortical_shell() {
        // Brain fills x < 6; cortex is the layer x = 3..5 inside it.
        let lattice = lattice(In3D::new(10, 7, 7));
        let brain = VoxelMask3::from_fn("brain".to_string(), Arc::clone(&lattice), |indices| {
            indices[X] < 6
        });
        let cortex = VoxelMask3::from_fn("cortex".to_string(), Arc::clone(&lattice), |indices| {
            (3..6).contains(&indices[X])
        });

        let masks = build_boundary_masks(&cortex, &brain, &BoundaryMaskConfig::default()).unwrap();

        let center = |x| Idx3::new(x, 3, 3);
        assert!(masks.inner_boundary().is_set(&center(2)));
        assert!(!masks.inner_boundary().is_set(&center(1)));
        assert!(masks.outer_boundary().is_set(&center(6)));
        assert!(masks.outer_boundary().is_set(&center(8)));
        assert!(!masks.outer_boundary().is_set(&center(9)));
        assert!(masks.domain().is_set(&center(4)));
        assert!(!masks.domain().is_set(&center(2)));

        // The eroded brain excludes the y and z edges of the lattice.
        assert!(!masks.inner_boundary().is_set(&Idx3::new(2, 0, 3)));
        assert!(!masks.inner_boundary().is_set(&Idx3::new(2, 3, 1)));
        assert!(masks.inner_boundary().is_set(&Idx3::new(2, 2, 4)));
        assert_eq!(masks.domain().count(), 3 * 7 * 7);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let cortex = VoxelMask3::empty("cortex".to_string(), lattice(In3D::new(4, 4, 4)));
        let brain = VoxelMask3::empty("brain".to_string(), lattice(In3D::new(4, 4, 5)));
        let err = build_boundary_masks(&cortex, &brain, &BoundaryMaskConfig::default()).unwrap_err();
        assert!(matches!(err, LatticeError::ShapeMismatch { .. }));
    }
}
