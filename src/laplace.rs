//! Relaxation of the harmonic potential between the cortical boundaries.

use crate::{
    backend::ComputeBackend,
    field::{
        array_from_buffer,
        mask::{TissueMasks3, VoxelClass},
        ScalarField3,
    },
    grid::Lattice3,
    io::Verbosity,
};
use std::{mem, sync::Arc};

/// Floating-point precision to use for the potential.
#[allow(non_camel_case_types)]
pub type fph = f64;

/// Potential imposed on the inner (white matter) boundary.
pub const INNER_POTENTIAL: fph = 1.0;

/// Potential imposed on the outer (pial) boundary.
pub const OUTER_POTENTIAL: fph = 0.0;

/// Configuration parameters for the Laplace solver.
#[derive(Clone, Debug)]
pub struct LaplaceSolverConfig {
    /// Maximum number of relaxation sweeps to perform.
    pub max_iterations: usize,
    /// Relaxation stops when the largest change of any voxel in a sweep falls below this.
    pub tolerance: fph,
    /// How each sweep is scheduled.
    pub backend: ComputeBackend,
}

impl LaplaceSolverConfig {
    pub const DEFAULT_MAX_ITERATIONS: usize = 2000;
    pub const DEFAULT_TOLERANCE: fph = 1e-6;

    /// Panics if any of the configuration parameter values are invalid.
    pub fn validate(&self) {
        assert!(
            self.max_iterations >= 1,
            "Maximum number of iterations must be at least one."
        );
        assert!(
            self.tolerance > 0.0,
            "Convergence tolerance must be larger than zero."
        );
    }
}

impl Default for LaplaceSolverConfig {
    fn default() -> Self {
        LaplaceSolverConfig {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
            backend: ComputeBackend::default(),
        }
    }
}

/// Outcome of relaxing the potential.
#[derive(Clone, Debug)]
pub struct LaplaceSolution {
    /// The relaxed potential (best effort if not converged).
    pub potential: ScalarField3<fph>,
    /// Whether the tolerance was met within the iteration budget.
    pub converged: bool,
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Largest change of any voxel in the final sweep.
    pub max_change: fph,
}

/// Jacobi relaxation of Laplace's equation with Dirichlet boundaries.
///
/// Each sweep replaces every domain voxel by the average of its six face
/// neighbors taken from the previous iterate. New values are written to a
/// separate buffer that is swapped in once the sweep is complete, so the
/// result never depends on the order in which voxels are visited.
#[derive(Clone, Debug)]
pub struct JacobiRelaxation {
    lattice: Arc<Lattice3>,
    classes: Vec<VoxelClass>,
    current: Vec<fph>,
    next: Vec<fph>,
    iterations: usize,
}

impl JacobiRelaxation {
    /// Sets up the initial potential: zero everywhere except for the
    /// inner boundary, which is set to one.
    pub fn new(masks: &TissueMasks3) -> Self {
        let lattice = masks.arc_with_lattice();
        let classes = masks.classify_all();
        let current: Vec<_> = classes
            .iter()
            .map(|&class| Self::fixed_value(class).unwrap_or(0.0))
            .collect();
        let next = current.clone();
        Self {
            lattice,
            classes,
            current,
            next,
            iterations: 0,
        }
    }

    /// Returns the current potential in memory order.
    pub fn values(&self) -> &[fph] {
        &self.current
    }

    /// Returns the number of sweeps performed so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Performs a single sweep over the full lattice and returns the largest
    /// absolute change of any voxel.
    pub fn sweep(&mut self, backend: ComputeBackend) -> fph {
        let lattice = self.lattice.as_ref();
        let classes = &self.classes;
        let previous = &self.current;

        backend.fill(&mut self.next, |flat_idx| match classes[flat_idx] {
            VoxelClass::Domain => {
                let neighbors = lattice.face_neighbors(&lattice.idx_from_flat(flat_idx));
                neighbors.iter().map(|&idx| previous[idx]).sum::<fph>() / 6.0
            }
            class => Self::fixed_value(class).unwrap_or(previous[flat_idx]),
        });

        let (updated, previous) = (&self.next, &self.current);
        let max_change = backend.max_over(updated.len(), |flat_idx| {
            (updated[flat_idx] - previous[flat_idx]).abs()
        });

        mem::swap(&mut self.current, &mut self.next);
        self.iterations += 1;
        max_change
    }

    /// Consumes the relaxation and returns the current potential as a field.
    pub fn into_potential(self) -> ScalarField3<fph> {
        let values = array_from_buffer(&self.lattice, self.current);
        ScalarField3::new("laplace".to_string(), self.lattice, values)
    }

    fn fixed_value(class: VoxelClass) -> Option<fph> {
        match class {
            VoxelClass::InnerBoundary => Some(INNER_POTENTIAL),
            VoxelClass::OuterBoundary => Some(OUTER_POTENTIAL),
            VoxelClass::Domain | VoxelClass::Free => None,
        }
    }
}

/// Solves Laplace's equation inside the domain with the potential fixed to
/// one on the inner boundary and zero on the outer boundary.
///
/// Neighbor lookups at the edge of the lattice follow the lattice's
/// periodicity. Failing to converge is not an error: the best effort
/// potential is returned with `converged` set to `false`.
///
/// # Parameters
///
/// - `masks`: Validated domain and boundary masks.
/// - `config`: Iteration budget, tolerance and backend.
/// - `verbosity`: Whether and how to report progress.
///
/// # Returns
///
/// A `LaplaceSolution` with the potential and convergence information.
pub fn solve_laplace(
    masks: &TissueMasks3,
    config: &LaplaceSolverConfig,
    verbosity: &Verbosity,
) -> LaplaceSolution {
    config.validate();

    let mut relaxation = JacobiRelaxation::new(masks);
    let mut max_change = 0.0;
    let mut converged = false;

    while relaxation.iterations() < config.max_iterations {
        max_change = relaxation.sweep(config.backend);

        if verbosity.print_messages() && relaxation.iterations() % 50 == 0 {
            println!(
                "Finished iteration {}, max difference = {:.3e}",
                relaxation.iterations(),
                max_change
            );
        }
        if max_change < config.tolerance {
            converged = true;
            break;
        }
    }

    let iterations = relaxation.iterations();
    if verbosity.print_messages() {
        if converged {
            println!("Converged after {} iterations", iterations);
        } else {
            println!(
                "Did not converge after {} iterations (max difference = {:.3e})",
                iterations, max_change
            );
        }
    }

    LaplaceSolution {
        potential: relaxation.into_potential(),
        converged,
        iterations,
        max_change,
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        field::mask::VoxelMask3,
        geometry::{
            Dim3::{X, Z},
            Idx3, In3D,
        },
        grid::{LatticeBoundary, SpatialTransform},
    };
    use approx::assert_abs_diff_eq;

    fn slab_masks(boundary: LatticeBoundary) -> TissueMasks3 {
        let lattice = Arc::new(Lattice3::with_boundary(
            In3D::new(5, 5, 5),
            boundary,
            SpatialTransform::identity(),
        ));
        let mask = |name: &str, is_set: fn(usize) -> bool| {
            VoxelMask3::from_fn(name.to_string(), Arc::clone(&lattice), |indices| {
                is_set(indices[Z])
            })
        };
        TissueMasks3::new(
            mask("cortex", |z| z > 0 && z < 4),
            mask("wm", |z| z == 0),
            mask("pial", |z| z == 4),
        )
        .unwrap()
    }

    #[test]
    fn boundary_voxels_stay_fixed_during_sweeps() {
        let masks = slab_masks(LatticeBoundary::Periodic);
        let classes = masks.classify_all();
        let mut relaxation = JacobiRelaxation::new(&masks);

        for _ in 0..25 {
            for (class, &value) in classes.iter().zip(relaxation.values()) {
                match class {
                    VoxelClass::InnerBoundary => assert_eq!(value, INNER_POTENTIAL),
                    VoxelClass::OuterBoundary => assert_eq!(value, OUTER_POTENTIAL),
                    _ => {}
                }
            }
            assert!(relaxation.sweep(ComputeBackend::Serial) >= 0.0);
        }
    }

    #[test]
    fn slab_converges_to_linear_ramp() {
        for boundary in [LatticeBoundary::Periodic, LatticeBoundary::Clamped] {
            let solution = solve_laplace(
                &slab_masks(boundary),
                &LaplaceSolverConfig::default(),
                &Verbosity::Quiet,
            );
            assert!(solution.converged);
            assert!(solution.iterations < LaplaceSolverConfig::DEFAULT_MAX_ITERATIONS);
            assert!(solution.max_change < LaplaceSolverConfig::DEFAULT_TOLERANCE);

            for z in 0..5 {
                assert_abs_diff_eq!(
                    solution.potential.value(&Idx3::new(2, 3, z)),
                    1.0 - 0.25 * z as f64,
                    epsilon = 1e-4
                );
            }
        }
    }

    #[test]
    fn sweeps_use_previous_iterate_only() {
        let masks = slab_masks(LatticeBoundary::Periodic);
        let mut relaxation = JacobiRelaxation::new(&masks);
        relaxation.sweep(ComputeBackend::Serial);

        // Only the layer next to the inner boundary can have changed after
        // one sweep when updates never see values from the same sweep.
        let potential = relaxation.into_potential();
        assert_abs_diff_eq!(potential.value(&Idx3::new(0, 0, 1)), 1.0 / 6.0);
        assert_eq!(potential.value(&Idx3::new(0, 0, 2)), 0.0);
        assert_eq!(potential.value(&Idx3::new(0, 0, 3)), 0.0);
    }

    #[test]
    fn backends_give_identical_potentials() {
        let masks = slab_masks(LatticeBoundary::Periodic);
        let solve_with = |backend| {
            let config = LaplaceSolverConfig {
                max_iterations: 37,
                backend,
                ..LaplaceSolverConfig::default()
            };
            solve_laplace(&masks, &config, &Verbosity::Quiet)
        };
        let serial = solve_with(ComputeBackend::Serial);
        let parallel = solve_with(ComputeBackend::Parallel);
        assert_eq!(serial.potential.values(), parallel.potential.values());
        assert_eq!(serial.iterations, parallel.iterations);
    }

    #[test]
    fn exhausted_budget_is_reported_as_not_converged() {
        let config = LaplaceSolverConfig {
            max_iterations: 3,
            ..LaplaceSolverConfig::default()
        };
        let solution = solve_laplace(
            &slab_masks(LatticeBoundary::Periodic),
            &config,
            &Verbosity::Quiet,
        );
        assert!(!solution.converged);
        assert_eq!(solution.iterations, 3);
        assert!(solution.max_change > 0.0);
    }

    #[test]
    fn touching_boundaries_converge_immediately() {
        let lattice = Arc::new(Lattice3::with_boundary(
            In3D::new(4, 4, 2),
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ));
        let masks = TissueMasks3::new(
            VoxelMask3::empty("cortex".to_string(), Arc::clone(&lattice)),
            VoxelMask3::from_fn("wm".to_string(), Arc::clone(&lattice), |indices| {
                indices[Z] == 0 && indices[X] < 2
            }),
            VoxelMask3::from_fn("pial".to_string(), Arc::clone(&lattice), |indices| {
                indices[Z] == 1 && indices[X] < 2
            }),
        )
        .unwrap();

        let solution = solve_laplace(&masks, &LaplaceSolverConfig::default(), &Verbosity::Quiet);
        assert!(solution.converged);
        assert!(solution.iterations <= 1);
        assert_eq!(solution.max_change, 0.0);
        assert_eq!(solution.potential.value(&Idx3::new(1, 3, 0)), 1.0);
        assert_eq!(solution.potential.value(&Idx3::new(3, 3, 0)), 0.0);
    }
}
