//! Running the full thickness computation for a subject.

use crate::{
    error::{LatticeError, PipelineError},
    field::{mask::TissueMasks3, ScalarField3, VectorField3},
    gradient::{self, GradientConfig},
    grid::LatticeBoundary,
    io::{
        nifti,
        subjects::{BoundarySource, SubjectFiles, SubjectOutputs},
        Verbosity,
    },
    laplace::{self, LaplaceSolution, LaplaceSolverConfig},
    morphology::{self, BoundaryMaskConfig},
    tracing::{self, streamline::StreamlineSet3, StreamlineTracerConfig},
};
use std::sync::Arc;

/// Configuration of every stage of the thickness computation.
#[derive(Clone, Debug, Default)]
pub struct ThicknessPipelineConfig {
    pub boundary_masks: BoundaryMaskConfig,
    pub solver: LaplaceSolverConfig,
    pub gradient: GradientConfig,
    pub tracer: StreamlineTracerConfig,
    /// Edge behavior of the lattice used by the solver and gradient.
    pub lattice_boundary: LatticeBoundary,
}

impl ThicknessPipelineConfig {
    /// Panics if any of the configuration parameter values are invalid.
    pub fn validate(&self) {
        self.boundary_masks.validate();
        self.solver.validate();
        self.tracer.validate();
    }
}

/// Everything computed for one subject.
#[derive(Clone, Debug)]
pub struct ThicknessResult {
    pub solution: LaplaceSolution,
    pub gradient: VectorField3<f64>,
    pub streamlines: StreamlineSet3,
}

impl ThicknessResult {
    /// Returns the relaxed potential.
    pub fn potential(&self) -> &ScalarField3<f64> {
        &self.solution.potential
    }

    /// Creates the thickness volume: step counts on the outer boundary, NaN
    /// where undefined and zero elsewhere.
    pub fn thickness_volume(&self) -> ScalarField3<f64> {
        self.streamlines.thickness_volume()
    }
}

/// Runs the solver, gradient and tracing stages on the given masks.
///
/// The masks are moved onto a lattice with the configured edge behavior
/// before solving. A potential that did not converge is used as is after
/// printing a warning.
pub fn run_thickness_pipeline(
    masks: &TissueMasks3,
    config: &ThicknessPipelineConfig,
    verbosity: &Verbosity,
) -> Result<ThicknessResult, LatticeError> {
    config.validate();

    let lattice = Arc::new(
        masks
            .lattice()
            .with_periodicity(config.lattice_boundary.periodicity()),
    );
    let masks = masks.on_lattice(lattice)?;

    let solution = laplace::solve_laplace(&masks, &config.solver, verbosity);
    if !solution.converged && verbosity.print_messages() {
        eprintln!(
            "Warning: Potential did not converge within {} iterations (max change {:.3e}), using best effort result",
            solution.iterations, solution.max_change
        );
    }

    let gradient = gradient::compute_gradient(&solution.potential, &config.gradient);

    let streamlines = tracing::trace_streamlines(
        &solution.potential,
        &gradient,
        masks.outer_boundary(),
        &config.tracer,
        verbosity,
    )?;

    Ok(ThicknessResult {
        solution,
        gradient,
        streamlines,
    })
}

/// Reads the masks of a subject, deriving the boundaries from the brain
/// mask if they are not given.
pub fn load_tissue_masks(
    subject: &SubjectFiles,
    config: &ThicknessPipelineConfig,
) -> Result<TissueMasks3, PipelineError> {
    let boundary = config.lattice_boundary;
    let cortex = nifti::read_mask(subject.cortex(), "cortex", boundary)?;
    let masks = match subject.boundaries() {
        BoundarySource::Brain(brain_path) => {
            let brain = nifti::read_mask(brain_path, "brain", boundary)?;
            morphology::build_boundary_masks(&cortex, &brain, &config.boundary_masks)?
        }
        BoundarySource::Given { inner, outer } => TissueMasks3::new(
            cortex,
            nifti::read_mask(inner, "wm", boundary)?,
            nifti::read_mask(outer, "pial", boundary)?,
        )?,
    };
    Ok(masks)
}

/// Writes the potential, gradient and thickness volumes of a result.
pub fn write_thickness_result(
    result: &ThicknessResult,
    outputs: &SubjectOutputs,
) -> Result<(), PipelineError> {
    nifti::write_scalar_field(result.potential(), &outputs.laplace)?;
    nifti::write_vector_field(&result.gradient, &outputs.gradient)?;
    nifti::write_scalar_field(&result.thickness_volume(), &outputs.thickness)?;
    Ok(())
}

/// Reads the inputs of a subject, runs the pipeline and writes the outputs.
pub fn process_subject(
    subject: &SubjectFiles,
    outputs: &SubjectOutputs,
    config: &ThicknessPipelineConfig,
    verbosity: &Verbosity,
) -> Result<ThicknessResult, PipelineError> {
    let masks = load_tissue_masks(subject, config)?;
    let result = run_thickness_pipeline(&masks, config, verbosity)?;
    write_thickness_result(&result, outputs)?;
    Ok(result)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        backend::ComputeBackend,
        field::mask::VoxelMask3,
        geometry::{Dim3::Z, In3D},
        grid::{Lattice3, SpatialTransform},
    };

    #[test]
    fn non_converged_potential_is_still_traced() {
        let lattice = Arc::new(Lattice3::with_boundary(
            In3D::new(3, 3, 5),
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ));
        let layer = |name: &str, is_set: fn(usize) -> bool| {
            VoxelMask3::from_fn(name.to_string(), Arc::clone(&lattice), |indices| {
                is_set(indices[Z])
            })
        };
        let masks = TissueMasks3::new(
            layer("cortex", |z| z > 0 && z < 4),
            layer("wm", |z| z == 0),
            layer("pial", |z| z == 4),
        )
        .unwrap();

        let config = ThicknessPipelineConfig {
            solver: LaplaceSolverConfig {
                max_iterations: 2,
                backend: ComputeBackend::Serial,
                ..LaplaceSolverConfig::default()
            },
            lattice_boundary: LatticeBoundary::Clamped,
            ..ThicknessPipelineConfig::default()
        };
        let result = run_thickness_pipeline(&masks, &config, &Verbosity::Quiet).unwrap();

        assert!(!result.solution.converged);
        assert_eq!(result.solution.iterations, 2);
        assert!(!result.potential().lattice().is_periodic(Z));
        assert_eq!(result.streamlines.len(), 9);
        let thickness = result.thickness_volume();
        assert_eq!(thickness.shape(), lattice.shape());
    }
}
