//! Tracing streamlines of the potential gradient from the outer to the inner boundary.

pub mod stepping;
pub mod streamline;

use self::{
    stepping::{EulerStepper3, Stepper3, StepperResult, StoppingCause},
    streamline::{Streamline3, StreamlineSet3, Thickness},
};
use crate::{
    backend::ComputeBackend,
    error::LatticeError,
    field::{mask::VoxelMask3, ScalarField3, VectorField3},
    geometry::{Idx3, Point3},
    io::Verbosity,
    num::{cast_float, BFloat},
};

/// Floating-point precision to use for tracing.
#[allow(non_camel_case_types)]
pub type ftr = f64;

/// Configuration parameters for streamline tracing.
#[derive(Clone, Debug)]
pub struct StreamlineTracerConfig {
    /// Distance moved per step, in voxel lengths per unit gradient vector.
    pub step_size: ftr,
    /// Number of steps after which a trace is abandoned as undefined.
    pub max_steps: usize,
    /// Potential at which the inner boundary counts as reached.
    pub wm_threshold: ftr,
    /// Amount subtracted from `wm_threshold` to absorb round-off in the potential.
    pub threshold_slack: ftr,
    /// Whether to keep the positions visited by each trace.
    pub record_paths: bool,
    /// How the traces are scheduled.
    pub backend: ComputeBackend,
}

impl StreamlineTracerConfig {
    pub const DEFAULT_STEP_SIZE: ftr = 0.1;
    pub const DEFAULT_MAX_STEPS: usize = 200;
    pub const DEFAULT_WM_THRESHOLD: ftr = 1.0;
    pub const DEFAULT_THRESHOLD_SLACK: ftr = 0.0;

    /// Returns the potential at or above which tracing terminates.
    pub fn termination_potential(&self) -> ftr {
        self.wm_threshold - self.threshold_slack
    }

    /// Panics if any of the configuration parameter values are invalid.
    pub fn validate(&self) {
        assert!(
            self.step_size > 0.0,
            "Step size must be larger than zero."
        );
        assert!(
            self.max_steps >= 1,
            "Maximum number of steps must be at least one."
        );
        assert!(
            self.threshold_slack >= 0.0,
            "Threshold slack must not be negative."
        );
    }
}

impl Default for StreamlineTracerConfig {
    fn default() -> Self {
        StreamlineTracerConfig {
            step_size: Self::DEFAULT_STEP_SIZE,
            max_steps: Self::DEFAULT_MAX_STEPS,
            wm_threshold: Self::DEFAULT_WM_THRESHOLD,
            threshold_slack: Self::DEFAULT_THRESHOLD_SLACK,
            record_paths: true,
            backend: ComputeBackend::default(),
        }
    }
}

/// Traces a single streamline from the given voxel.
///
/// Each iteration looks up the voxel containing the current position, stops
/// if the step budget is used up or the potential there has reached the
/// termination potential, and otherwise records the position and takes a step.
/// The number of recorded positions thus equals the number of steps, and a
/// defined thickness is always smaller than the step budget.
///
/// # Parameters
///
/// - `potential`: Potential used for the termination test.
/// - `gradient`: Direction field to step along.
/// - `stepper`: Stepper to use (will be consumed).
/// - `start_voxel`: Voxel where the tracing should start.
/// - `config`: Step budget, threshold and whether to record the path.
///
/// # Returns
///
/// The traced `Streamline3`, whose thickness is `Thickness::Undefined` if the
/// step budget was exhausted or the position left the lattice.
///
/// # Type parameters
///
/// - `F`: Floating point type of the potential.
/// - `G`: Floating point type of the direction field.
/// - `St`: Type of stepper.
pub fn trace_streamline<F, G, St>(
    potential: &ScalarField3<F>,
    gradient: &VectorField3<G>,
    mut stepper: St,
    start_voxel: &Idx3<usize>,
    config: &StreamlineTracerConfig,
) -> Streamline3
where
    F: BFloat,
    G: BFloat,
    St: Stepper3,
{
    let lattice = potential.lattice();
    let termination_potential = config.termination_potential();
    let mut positions = Vec::new();

    stepper.place(&Point3::from_idx(start_voxel));

    let (thickness, stopping_cause) = loop {
        let voxel = match stepper.current_voxel(lattice) {
            StepperResult::Ok(voxel) => voxel,
            StepperResult::Stopped(cause) => break (Thickness::Undefined, cause),
        };
        // Arriving on the last allowed step still counts as running out of steps.
        if stepper.n_steps() >= config.max_steps {
            break (Thickness::Undefined, StoppingCause::StepBudgetExhausted);
        }
        if cast_float::<F, ftr>(potential.value(&voxel)) >= termination_potential {
            break (
                Thickness::Steps(stepper.n_steps()),
                StoppingCause::ReachedInnerBoundary,
            );
        }
        if config.record_paths {
            positions.push(stepper.position().clone());
        }
        stepper.step(gradient, &voxel);
    };

    Streamline3::new(start_voxel.clone(), positions, thickness, stopping_cause)
}

/// Traces a streamline from every voxel of the outer boundary.
///
/// # Parameters
///
/// - `potential`: Relaxed potential between the boundaries.
/// - `gradient`: Normalized gradient of the potential.
/// - `outer_boundary`: Mask of voxels to start tracing from.
/// - `config`: Stepping parameters and backend.
/// - `verbosity`: Whether and how to report progress.
///
/// # Returns
///
/// A `Result` which is either:
///
/// - `Ok`: Contains a `StreamlineSet3` with one streamline per outer boundary voxel.
/// - `Err`: Contains a `ShapeMismatch` if the inputs are not on lattices of the same shape.
pub fn trace_streamlines<F, G>(
    potential: &ScalarField3<F>,
    gradient: &VectorField3<G>,
    outer_boundary: &VoxelMask3,
    config: &StreamlineTracerConfig,
    verbosity: &Verbosity,
) -> Result<StreamlineSet3, LatticeError>
where
    F: BFloat,
    G: BFloat,
{
    config.validate();
    LatticeError::check_shape(gradient.name(), potential.shape(), gradient.shape())?;
    LatticeError::check_shape(outer_boundary.name(), potential.shape(), outer_boundary.shape())?;

    let lattice = potential.arc_with_lattice();
    let start_flat_indices = outer_boundary.set_flat_indices();

    if verbosity.print_messages() {
        println!(
            "Tracing streamlines from {} boundary voxels",
            start_flat_indices.len()
        );
    }

    let progress_bar = verbosity.create_progress_bar(start_flat_indices.len());
    let stepper = EulerStepper3::new(config.step_size);

    let streamlines = config
        .backend
        .map_collect(&start_flat_indices, |_, &flat_idx| {
            let streamline = trace_streamline(
                potential,
                gradient,
                stepper.clone(),
                &lattice.idx_from_flat(flat_idx),
                config,
            );
            progress_bar.inc(1);
            streamline
        });
    progress_bar.finish_and_clear();

    let streamlines = StreamlineSet3::new(lattice, start_flat_indices, streamlines);

    if verbosity.print_messages() {
        println!(
            "{} of {} traces did not reach the inner boundary",
            streamlines.count_undefined(),
            streamlines.len()
        );
    }
    Ok(streamlines)
}
