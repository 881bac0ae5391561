//! Traced streamlines and the collection of all streamlines of a boundary.

use super::{ftr, stepping::StoppingCause};
use crate::{
    field::{array_from_buffer, ScalarField3},
    geometry::{Idx3, Point3},
    grid::Lattice3,
};
use std::sync::Arc;

#[cfg(feature = "serialization")]
use serde::Serialize;

#[cfg(feature = "json")]
use crate::io::utils::save_data_as_json;
#[cfg(feature = "json")]
use std::{collections::BTreeMap, io, path::Path};

/// Measured thickness of a single trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub enum Thickness {
    /// Number of steps taken to reach the inner boundary.
    Steps(usize),
    /// The trace did not reach the inner boundary.
    Undefined,
}

impl Thickness {
    /// Whether the thickness is a measured value.
    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Steps(_))
    }

    /// Returns the number of steps if the thickness is defined.
    pub fn steps(&self) -> Option<usize> {
        match self {
            Self::Steps(steps) => Some(*steps),
            Self::Undefined => None,
        }
    }

    /// Returns the thickness as a float, with NaN representing an undefined value.
    pub fn to_float(&self) -> f64 {
        match self {
            Self::Steps(steps) => *steps as f64,
            Self::Undefined => f64::NAN,
        }
    }
}

/// A streamline traced from a single outer boundary voxel.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialization", derive(Serialize))]
pub struct Streamline3 {
    start_voxel: Idx3<usize>,
    positions: Vec<Point3<ftr>>,
    thickness: Thickness,
    stopping_cause: StoppingCause,
}

impl Streamline3 {
    pub fn new(
        start_voxel: Idx3<usize>,
        positions: Vec<Point3<ftr>>,
        thickness: Thickness,
        stopping_cause: StoppingCause,
    ) -> Self {
        Self {
            start_voxel,
            positions,
            thickness,
            stopping_cause,
        }
    }

    /// Returns the voxel the streamline was started from.
    pub fn start_voxel(&self) -> &Idx3<usize> {
        &self.start_voxel
    }

    /// Returns the position before each step taken, in order.
    pub fn positions(&self) -> &[Point3<ftr>] {
        &self.positions
    }

    /// Returns the voxels containing each recorded position.
    pub fn voxels(&self) -> Vec<Idx3<usize>> {
        self.positions
            .iter()
            .filter_map(|position| position.floored_idx())
            .collect()
    }

    /// Returns the number of recorded positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no positions were recorded.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the measured thickness.
    pub fn thickness(&self) -> Thickness {
        self.thickness
    }

    /// Returns the reason the trace ended.
    pub fn stopping_cause(&self) -> StoppingCause {
        self.stopping_cause
    }
}

/// The streamlines traced from every voxel of an outer boundary.
///
/// Streamlines are stored contiguously in increasing flat index order of
/// their start voxels, so each start voxel maps to a fixed slot.
#[derive(Clone, Debug)]
pub struct StreamlineSet3 {
    lattice: Arc<Lattice3>,
    start_flat_indices: Vec<usize>,
    streamlines: Vec<Streamline3>,
}

impl StreamlineSet3 {
    /// Creates a new set from start voxel flat indices in increasing order and
    /// the corresponding streamlines.
    pub fn new(
        lattice: Arc<Lattice3>,
        start_flat_indices: Vec<usize>,
        streamlines: Vec<Streamline3>,
    ) -> Self {
        assert_eq!(
            start_flat_indices.len(),
            streamlines.len(),
            "Number of start voxels and streamlines differ."
        );
        assert!(
            start_flat_indices.windows(2).all(|pair| pair[0] < pair[1]),
            "Start voxel indices must be strictly increasing."
        );
        Self {
            lattice,
            start_flat_indices,
            streamlines,
        }
    }

    /// Returns a reference to the lattice the streamlines were traced on.
    pub fn lattice(&self) -> &Lattice3 {
        self.lattice.as_ref()
    }

    /// Returns the number of streamlines.
    pub fn len(&self) -> usize {
        self.streamlines.len()
    }

    /// Whether the set contains no streamlines.
    pub fn is_empty(&self) -> bool {
        self.streamlines.is_empty()
    }

    /// Returns the streamlines in order of their start voxels.
    pub fn streamlines(&self) -> &[Streamline3] {
        &self.streamlines
    }

    /// Returns the streamline started from the given voxel, if any.
    pub fn streamline_from(&self, start_voxel: &Idx3<usize>) -> Option<&Streamline3> {
        if !self.lattice.contains(start_voxel) {
            return None;
        }
        let flat_idx = self.lattice.flat_idx(start_voxel);
        self.start_flat_indices
            .binary_search(&flat_idx)
            .ok()
            .map(|slot| &self.streamlines[slot])
    }

    /// Returns the number of streamlines with undefined thickness.
    pub fn count_undefined(&self) -> usize {
        self.streamlines
            .iter()
            .filter(|streamline| !streamline.thickness().is_defined())
            .count()
    }

    /// Creates a thickness volume with the step count at each start voxel,
    /// NaN where the thickness is undefined and zero elsewhere.
    pub fn thickness_volume(&self) -> ScalarField3<f64> {
        let mut values = vec![0.0; self.lattice.n_voxels()];
        for (&flat_idx, streamline) in self.start_flat_indices.iter().zip(&self.streamlines) {
            values[flat_idx] = streamline.thickness().to_float();
        }
        ScalarField3::new(
            "thickness".to_string(),
            Arc::clone(&self.lattice),
            array_from_buffer(&self.lattice, values),
        )
    }

    /// Serializes the streamlines into JSON format, keyed by the flat index of
    /// their start voxel, and saves them at the given path.
    #[cfg(feature = "json")]
    pub fn save_as_json(&self, file_path: &Path) -> io::Result<()> {
        let streamlines: BTreeMap<usize, &Streamline3> = self
            .start_flat_indices
            .iter()
            .copied()
            .zip(self.streamlines.iter())
            .collect();
        save_data_as_json(file_path, &streamlines)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{
        geometry::{Dim3::Z, In3D},
        grid::{LatticeBoundary, SpatialTransform},
    };

    #[test]
    fn thickness_volume_marks_undefined_traces() {
        let lattice = Arc::new(Lattice3::with_boundary(
            In3D::new(2, 2, 2),
            LatticeBoundary::Periodic,
            SpatialTransform::identity(),
        ));
        let streamline = |voxel: Idx3<usize>, n_steps: usize, thickness, cause| {
            let positions = (0..n_steps)
                .map(|step| {
                    let mut position = Point3::from_idx(&voxel);
                    position[Z] -= 0.1 * step as f64;
                    position
                })
                .collect();
            Streamline3::new(voxel, positions, thickness, cause)
        };
        let set = StreamlineSet3::new(
            Arc::clone(&lattice),
            vec![4, 6],
            vec![
                streamline(
                    Idx3::new(0, 0, 1),
                    11,
                    Thickness::Steps(11),
                    StoppingCause::ReachedInnerBoundary,
                ),
                streamline(
                    Idx3::new(0, 1, 1),
                    3,
                    Thickness::Undefined,
                    StoppingCause::StepBudgetExhausted,
                ),
            ],
        );

        assert_eq!(set.count_undefined(), 1);
        let from_first = set.streamline_from(&Idx3::new(0, 0, 1)).unwrap();
        assert_eq!(from_first.len(), 11);
        assert_eq!(from_first.voxels()[10], Idx3::new(0, 0, 0));
        assert!(set.streamline_from(&Idx3::new(1, 1, 1)).is_none());

        let volume = set.thickness_volume();
        assert_eq!(volume.value(&Idx3::new(0, 0, 1)), 11.0);
        assert!(volume.value(&Idx3::new(0, 1, 1)).is_nan());
        assert_eq!(volume.value(&Idx3::new(1, 1, 1)), 0.0);
    }
}
