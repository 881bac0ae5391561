//! Stepping along streamlines of a direction field.

use super::ftr;
use crate::{
    field::VectorField3,
    geometry::{Idx3, Point3, Vec3},
    grid::Lattice3,
    num::{cast_float, BFloat},
};

/// A stepper result which is either OK (with an arbitrary value) or stopped (with a cause).
#[derive(Clone, Debug)]
pub enum StepperResult<T> {
    Ok(T),
    Stopped(StoppingCause),
}

/// Reason for terminating stepping.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub enum StoppingCause {
    /// The potential at the current voxel reached the inner boundary threshold.
    ReachedInnerBoundary,
    /// The maximum number of steps was taken without reaching the inner boundary.
    StepBudgetExhausted,
    /// The position left the lattice.
    OutOfBounds,
}

/// Defines the properties of a stepping scheme.
///
/// The direction at a position is the field vector of the voxel containing
/// it, so a stepper only needs to know the voxel to move on from.
pub trait Stepper3: Clone {
    /// Places the stepper at the given position and resets the step count.
    fn place(&mut self, position: &Point3<ftr>);

    /// Finds the voxel containing the current position.
    ///
    /// # Returns
    ///
    /// A `StepperResult<Idx3<usize>>` which is either:
    ///
    /// - `Ok`: Contains the 3D index of the voxel.
    /// - `Stopped`: The position is not finite or lies outside the lattice.
    fn current_voxel(&self, lattice: &Lattice3) -> StepperResult<Idx3<usize>>;

    /// Advances the position along the field vector of the given voxel.
    fn step<F: BFloat>(&mut self, field: &VectorField3<F>, voxel: &Idx3<usize>);

    /// Returns a reference to the current stepper position.
    fn position(&self) -> &Point3<ftr>;

    /// Returns the number of steps taken since the stepper was placed.
    fn n_steps(&self) -> usize;
}

/// Forward Euler stepping with a fixed step size.
#[derive(Clone, Debug)]
pub struct EulerStepper3 {
    step_size: ftr,
    position: Point3<ftr>,
    n_steps: usize,
}

impl EulerStepper3 {
    /// Creates a new stepper moving `step_size` voxel lengths per unit field vector.
    pub fn new(step_size: ftr) -> Self {
        Self {
            step_size,
            position: Point3::origin(),
            n_steps: 0,
        }
    }
}

impl Stepper3 for EulerStepper3 {
    fn place(&mut self, position: &Point3<ftr>) {
        self.position = position.clone();
        self.n_steps = 0;
    }

    fn current_voxel(&self, lattice: &Lattice3) -> StepperResult<Idx3<usize>> {
        match lattice.find_voxel(&self.position) {
            Some(voxel) => StepperResult::Ok(voxel),
            None => StepperResult::Stopped(StoppingCause::OutOfBounds),
        }
    }

    fn step<F: BFloat>(&mut self, field: &VectorField3<F>, voxel: &Idx3<usize>) {
        let direction: Vec3<ftr> = Vec3::with_each_component(|dim| {
            cast_float::<F, ftr>(field.component(dim).value(voxel))
        });
        self.position = &self.position + &(&direction * self.step_size);
        self.n_steps += 1;
    }

    fn position(&self) -> &Point3<ftr> {
        &self.position
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        field::ScalarField3,
        geometry::{
            Dim3::{X, Y, Z},
            In3D,
        },
        grid::{LatticeBoundary, SpatialTransform},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, ShapeBuilder};
    use std::sync::Arc;

    #[test]
    fn euler_step_moves_along_voxel_vector() {
        let lattice = Arc::new(Lattice3::with_boundary(
            In3D::new(3, 3, 3),
            LatticeBoundary::Clamped,
            SpatialTransform::identity(),
        ));
        let component = |dim| {
            let value: f32 = if dim == Z { -1.0 } else { 0.0 };
            ScalarField3::new(
                format!("g{}", dim),
                Arc::clone(&lattice),
                Array3::from_elem((3, 3, 3).f(), value),
            )
        };
        let field: VectorField3<f32> = VectorField3::new(
            "g".to_string(),
            Arc::clone(&lattice),
            In3D::with_each_component(component),
        );

        let mut stepper = EulerStepper3::new(0.5);
        stepper.place(&Point3::new(1.0, 1.0, 2.0));

        let voxel = match stepper.current_voxel(&lattice) {
            StepperResult::Ok(voxel) => voxel,
            StepperResult::Stopped(cause) => panic!("Unexpected stop: {:?}", cause),
        };
        stepper.step(&field, &voxel);
        stepper.step(&field, &voxel);
        assert_eq!(stepper.n_steps(), 2);
        assert_abs_diff_eq!(stepper.position()[Z], 1.0);
        assert_eq!(stepper.position()[X], 1.0);
        assert_eq!(stepper.position()[Y], 1.0);

        stepper.place(&Point3::new(1.0, 1.0, -0.1));
        assert_eq!(stepper.n_steps(), 0);
        assert!(matches!(
            stepper.current_voxel(&lattice),
            StepperResult::Stopped(StoppingCause::OutOfBounds)
        ));
    }
}
