//! Finite difference gradients of the potential and their normalization.

use crate::{
    backend::ComputeBackend,
    field::{array_from_buffer, ScalarField3, VectorField3},
    geometry::{Dim3, In3D, Vec3},
    grid::Lattice3,
    num::{cast_float, BFloat},
};
use std::sync::Arc;

/// Magnitude substituted for an exactly vanishing gradient before normalization.
pub const ZERO_MAGNITUDE_FLOOR: f64 = 1e-4;

/// Configuration parameters for gradient computation.
#[derive(Clone, Debug, Default)]
pub struct GradientConfig {
    /// How the per-voxel pass is scheduled.
    pub backend: ComputeBackend,
}

/// Computes the difference of the field along `dim` at the given voxel.
///
/// The forward difference is used unless it is exactly zero, in which case
/// the backward difference is used instead. The last voxel along an axis
/// always uses the backward difference. The backward neighbor of the first
/// voxel follows the edge behavior of the lattice.
fn axis_difference(lattice: &Lattice3, values: &[f64], flat_idx: usize, dim: Dim3) -> f64 {
    let size = lattice.shape()[dim];
    if size == 1 {
        return 0.0;
    }
    let stride = lattice.stride(dim);
    let i = lattice.idx_from_flat(flat_idx)[dim];
    let base = flat_idx - i * stride;
    let value = values[flat_idx];

    let backward = || value - values[base + lattice.lower_neighbor(dim, i) * stride];

    if i == size - 1 {
        backward()
    } else {
        let forward = values[flat_idx + stride] - value;
        if forward == 0.0 {
            backward()
        } else {
            forward
        }
    }
}

fn raw_gradient_vector(lattice: &Lattice3, values: &[f64], flat_idx: usize) -> Vec3<f64> {
    Vec3::with_each_component(|dim| axis_difference(lattice, values, flat_idx, dim))
}

fn normalized_gradient_vector(lattice: &Lattice3, values: &[f64], flat_idx: usize) -> Vec3<f64> {
    let raw = raw_gradient_vector(lattice, values, flat_idx);
    let length = raw.length();
    let length = if length == 0.0 {
        ZERO_MAGNITUDE_FLOOR
    } else {
        length
    };
    &raw * (1.0 / length)
}

fn compute_vector_field<F, C>(
    field: &ScalarField3<F>,
    name: &str,
    backend: ComputeBackend,
    compute_vector: C,
) -> VectorField3<f64>
where
    F: BFloat,
    C: Fn(&Lattice3, &[f64], usize) -> Vec3<f64> + Sync,
{
    let lattice = field.arc_with_lattice();
    let values: Vec<f64> = field
        .values_in_memory_order()
        .iter()
        .map(|&value| cast_float(value))
        .collect();

    let mut vectors = vec![Vec3::zero(); lattice.n_voxels()];
    backend.fill(&mut vectors, |flat_idx| {
        compute_vector(lattice.as_ref(), &values, flat_idx)
    });

    let components = In3D::with_each_component(|dim| {
        ScalarField3::new(
            format!("{}_{}", name, dim),
            Arc::clone(&lattice),
            array_from_buffer(
                &lattice,
                vectors.iter().map(|vector| vector[dim]).collect(),
            ),
        )
    });
    VectorField3::new(name.to_string(), lattice, components)
}

/// Computes the unnormalized finite difference gradient of the given field.
pub fn compute_raw_gradient<F: BFloat>(
    field: &ScalarField3<F>,
    config: &GradientConfig,
) -> VectorField3<f64> {
    compute_vector_field(field, "raw_gradient", config.backend, raw_gradient_vector)
}

/// Computes the unit direction of the finite difference gradient of the given field.
///
/// Where the gradient vanishes exactly, its magnitude is replaced by
/// `ZERO_MAGNITUDE_FLOOR` before dividing, so every output vector is finite
/// for finite input.
pub fn compute_gradient<F: BFloat>(
    field: &ScalarField3<F>,
    config: &GradientConfig,
) -> VectorField3<f64> {
    compute_vector_field(field, "gradient", config.backend, normalized_gradient_vector)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        field::array_from_flat_fn,
        geometry::{
            Dim3::{X, Y, Z},
            Idx3,
        },
        grid::{LatticeBoundary, SpatialTransform},
    };
    use approx::assert_abs_diff_eq;

    fn field_from_fn<C>(shape: In3D<usize>, boundary: LatticeBoundary, compute: C) -> ScalarField3<f64>
    where
        C: Fn(&Idx3<usize>) -> f64,
    {
        let lattice = Arc::new(Lattice3::with_boundary(
            shape,
            boundary,
            SpatialTransform::identity(),
        ));
        let values = array_from_flat_fn(&lattice, |flat_idx| compute(&lattice.idx_from_flat(flat_idx)));
        ScalarField3::new("phi".to_string(), lattice, values)
    }

    #[test]
    fn gradient_vectors_are_unit_or_zero() {
        let field = field_from_fn(In3D::new(4, 5, 3), LatticeBoundary::Periodic, |indices| {
            let (i, j, k) = (indices[X] as f64, indices[Y] as f64, indices[Z] as f64);
            (0.3 * i * i - 0.7 * j + 0.1 * k * i).sin()
        });
        let gradient = compute_gradient(&field, &GradientConfig::default());
        for flat_idx in 0..field.lattice().n_voxels() {
            let vector = gradient.vector_at_flat_idx(flat_idx);
            assert!(vector.is_finite());
            if !vector.is_zero() {
                assert_abs_diff_eq!(vector.length(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn zero_forward_difference_falls_back_to_backward_difference() {
        // Plateau from x = 2 onwards, rising before it.
        let field = field_from_fn(In3D::new(5, 1, 1), LatticeBoundary::Clamped, |indices| {
            [0.0, 0.25, 0.75, 0.75, 0.75][indices[X]]
        });
        let raw = compute_raw_gradient(&field, &GradientConfig::default());
        assert_eq!(raw.vector(&Idx3::new(0, 0, 0))[X], 0.25);
        assert_eq!(raw.vector(&Idx3::new(1, 0, 0))[X], 0.5);
        assert_eq!(raw.vector(&Idx3::new(2, 0, 0))[X], 0.5);
        assert_eq!(raw.vector(&Idx3::new(3, 0, 0))[X], 0.0);
    }

    #[test]
    fn last_index_uses_backward_difference() {
        let field = field_from_fn(In3D::new(2, 2, 4), LatticeBoundary::Periodic, |indices| {
            (indices[Z] * indices[Z]) as f64
        });
        let raw = compute_raw_gradient(&field, &GradientConfig::default());
        assert_eq!(raw.vector(&Idx3::new(1, 1, 3))[Z], 5.0);
        assert_eq!(raw.vector(&Idx3::new(1, 1, 2))[Z], 5.0);
        assert_eq!(raw.vector(&Idx3::new(1, 1, 0))[Z], 1.0);
    }

    #[test]
    fn backward_difference_at_first_index_follows_lattice_edge() {
        let plateau_start = |boundary| {
            field_from_fn(In3D::new(3, 1, 1), boundary, |indices| {
                [0.5, 0.5, 0.0][indices[X]]
            })
        };
        let config = GradientConfig::default();

        let periodic = compute_raw_gradient(&plateau_start(LatticeBoundary::Periodic), &config);
        assert_eq!(periodic.vector(&Idx3::origin())[X], 0.5);

        let clamped = compute_raw_gradient(&plateau_start(LatticeBoundary::Clamped), &config);
        assert_eq!(clamped.vector(&Idx3::origin())[X], 0.0);
    }

    #[test]
    fn constant_field_gives_zero_vectors() {
        let field = field_from_fn(In3D::new(3, 3, 3), LatticeBoundary::Periodic, |_| 0.5);
        let gradient = compute_gradient(&field, &GradientConfig::default());
        for flat_idx in 0..field.lattice().n_voxels() {
            assert!(gradient.vector_at_flat_idx(flat_idx).is_zero());
        }
    }

    #[test]
    fn small_gradients_are_normalized() {
        let field = field_from_fn(In3D::new(4, 1, 1), LatticeBoundary::Clamped, |indices| {
            1e-9 * indices[X] as f64
        });
        let gradient = compute_gradient(&field, &GradientConfig::default());
        assert_abs_diff_eq!(gradient.vector(&Idx3::new(1, 0, 0))[X], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn backends_give_identical_gradients() {
        let field = field_from_fn(In3D::new(6, 4, 5), LatticeBoundary::Periodic, |indices| {
            ((indices[X] * 7 + indices[Y] * 3 + indices[Z]) % 5) as f64
        });
        let with_backend = |backend| compute_gradient(&field, &GradientConfig { backend });
        let serial = with_backend(ComputeBackend::Serial);
        let parallel = with_backend(ComputeBackend::Parallel);
        for dim in Dim3::slice() {
            assert_eq!(serial.values(dim), parallel.values(dim));
        }
    }
}
