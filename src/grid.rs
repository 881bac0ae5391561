//! Voxel lattices and their spatial transforms.

use crate::geometry::{
    Dim3::{self, X, Y, Z},
    Idx3, In3D, Point3,
};
use std::fmt;

/// How neighbor lookups behave at the edge of the lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatticeBoundary {
    /// Neighbors beyond the edge wrap around to the opposite side.
    Periodic,
    /// Neighbors beyond the edge are replaced by the edge voxel itself
    /// (zero flux across the lattice edge).
    Clamped,
}

impl LatticeBoundary {
    /// Returns the periodicity flag of each dimension.
    pub fn periodicity(self) -> In3D<bool> {
        In3D::same(self == Self::Periodic)
    }
}

impl Default for LatticeBoundary {
    fn default() -> Self {
        Self::Periodic
    }
}

impl fmt::Display for LatticeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Periodic => "periodic",
                Self::Clamped => "clamped",
            }
        )
    }
}

/// Affine mapping from voxel indices to physical coordinates.
///
/// Stored as the first three rows of a 4x4 matrix in row-major order;
/// the last row is always `[0, 0, 0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialTransform {
    rows: [[f64; 4]; 3],
}

impl SpatialTransform {
    /// Creates a transform from the first three rows of the affine matrix.
    pub fn from_rows(rows: [[f64; 4]; 3]) -> Self {
        Self { rows }
    }

    /// Creates a transform scaling each index by the given voxel size.
    pub fn from_voxel_sizes(voxel_sizes: &In3D<f64>) -> Self {
        Self::from_rows([
            [voxel_sizes[X], 0.0, 0.0, 0.0],
            [0.0, voxel_sizes[Y], 0.0, 0.0],
            [0.0, 0.0, voxel_sizes[Z], 0.0],
        ])
    }

    /// Creates the identity transform.
    pub fn identity() -> Self {
        Self::from_voxel_sizes(&In3D::same(1.0))
    }

    /// Returns the first three rows of the affine matrix.
    pub fn rows(&self) -> &[[f64; 4]; 3] {
        &self.rows
    }

    /// Returns the physical extent of a voxel along each axis.
    pub fn voxel_sizes(&self) -> In3D<f64> {
        In3D::with_each_component(|dim| {
            let column = dim.num();
            self.rows
                .iter()
                .map(|row| row[column] * row[column])
                .sum::<f64>()
                .sqrt()
        })
    }

    /// Maps a (possibly fractional) voxel position to physical coordinates.
    pub fn voxel_to_world(&self, position: &Point3<f64>) -> Point3<f64> {
        Point3::with_each_component(|dim| {
            let row = &self.rows[dim.num()];
            row[0] * position[X] + row[1] * position[Y] + row[2] * position[Z] + row[3]
        })
    }
}

impl Default for SpatialTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A regular 3D lattice of voxels.
///
/// Flat voxel indices follow column-major (x fastest) memory order,
/// matching the layout of the field arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct Lattice3 {
    shape: In3D<usize>,
    is_periodic: In3D<bool>,
    transform: SpatialTransform,
}

impl Lattice3 {
    /// Creates a new lattice with the given shape, periodicity and transform.
    pub fn new(shape: In3D<usize>, is_periodic: In3D<bool>, transform: SpatialTransform) -> Self {
        assert!(
            shape[X] > 0 && shape[Y] > 0 && shape[Z] > 0,
            "Lattice must contain at least one voxel along each axis."
        );
        Self {
            shape,
            is_periodic,
            transform,
        }
    }

    /// Creates a new lattice whose edge behavior is the same for all axes.
    pub fn with_boundary(
        shape: In3D<usize>,
        boundary: LatticeBoundary,
        transform: SpatialTransform,
    ) -> Self {
        Self::new(shape, boundary.periodicity(), transform)
    }

    /// Returns the 3D shape of the lattice.
    pub fn shape(&self) -> &In3D<usize> {
        &self.shape
    }

    /// Returns the total number of voxels.
    pub fn n_voxels(&self) -> usize {
        self.shape.volume()
    }

    /// Whether the lattice wraps around along the given dimension.
    pub fn is_periodic(&self, dim: Dim3) -> bool {
        self.is_periodic[dim]
    }

    /// Returns the spatial transform of the lattice.
    pub fn transform(&self) -> &SpatialTransform {
        &self.transform
    }

    /// Returns a copy of the lattice with a different edge behavior.
    pub fn with_periodicity(&self, is_periodic: In3D<bool>) -> Self {
        Self::new(self.shape.clone(), is_periodic, self.transform.clone())
    }

    /// Whether the given 3D index lies inside the lattice.
    pub fn contains(&self, indices: &Idx3<usize>) -> bool {
        indices[X] < self.shape[X] && indices[Y] < self.shape[Y] && indices[Z] < self.shape[Z]
    }

    /// Finds the voxel containing the given fractional voxel position,
    /// or `None` if the position lies outside the lattice.
    pub fn find_voxel(&self, position: &Point3<f64>) -> Option<Idx3<usize>> {
        position
            .floored_idx()
            .filter(|indices| self.contains(indices))
    }

    /// Converts a 3D index to the corresponding flat memory order index.
    pub fn flat_idx(&self, indices: &Idx3<usize>) -> usize {
        indices[X] + self.shape[X] * (indices[Y] + self.shape[Y] * indices[Z])
    }

    /// Converts a flat memory order index to the corresponding 3D index.
    pub fn idx_from_flat(&self, flat_idx: usize) -> Idx3<usize> {
        compute_3d_array_indices_from_flat_idx(&self.shape, flat_idx)
    }

    /// Returns the flat distance between neighboring voxels along the given dimension.
    pub fn stride(&self, dim: Dim3) -> usize {
        match dim {
            X => 1,
            Y => self.shape[X],
            Z => self.shape[X] * self.shape[Y],
        }
    }

    /// Returns the index along `dim` of the lower neighbor of the voxel at index `i`.
    ///
    /// At the lower edge this wraps for a periodic dimension and stays at the
    /// edge otherwise.
    pub fn lower_neighbor(&self, dim: Dim3, i: usize) -> usize {
        if i > 0 {
            i - 1
        } else if self.is_periodic[dim] {
            self.shape[dim] - 1
        } else {
            0
        }
    }

    /// Returns the index along `dim` of the upper neighbor of the voxel at index `i`.
    ///
    /// At the upper edge this wraps for a periodic dimension and stays at the
    /// edge otherwise.
    pub fn upper_neighbor(&self, dim: Dim3, i: usize) -> usize {
        let last = self.shape[dim] - 1;
        if i < last {
            i + 1
        } else if self.is_periodic[dim] {
            0
        } else {
            last
        }
    }

    /// Returns the flat indices of the six face neighbors of the given voxel,
    /// ordered as lower and upper neighbor for x, y and z.
    pub fn face_neighbors(&self, indices: &Idx3<usize>) -> [usize; 6] {
        let flat_idx = self.flat_idx(indices);
        let mut neighbors = [0; 6];
        for dim in Dim3::slice() {
            let i = indices[dim];
            let stride = self.stride(dim);
            let base = flat_idx - i * stride;
            neighbors[2 * dim.num()] = base + self.lower_neighbor(dim, i) * stride;
            neighbors[2 * dim.num() + 1] = base + self.upper_neighbor(dim, i) * stride;
        }
        neighbors
    }
}

/// Computes the 3D indices of the given flat index for an array with the given
/// shape laid out in column-major order.
pub fn compute_3d_array_indices_from_flat_idx(shape: &In3D<usize>, flat_idx: usize) -> Idx3<usize> {
    let xy_size = shape[X] * shape[Y];
    let k = flat_idx / xy_size;
    let flat_xy_idx = flat_idx - k * xy_size;
    let j = flat_xy_idx / shape[X];
    let i = flat_xy_idx - j * shape[X];
    Idx3::new(i, j, k)
}
