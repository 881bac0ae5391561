#![allow(dead_code)]

use cortex_thickness::{
    cli,
    field::{mask::VoxelMask3, ScalarField3},
    geometry::{Dim3::Z, In3D},
    grid::{Lattice3, LatticeBoundary, SpatialTransform},
    io::nifti,
};
use lazy_static::lazy_static;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;

/// Number of voxels along x and y of the test slabs.
pub const SLAB_WIDTH: usize = 5;

lazy_static! {
    static ref COMMAND: clap::Command<'static> = cli::build::build();
}

#[macro_export]
macro_rules! path_str {
    ($path:expr) => {
        $path.to_string_lossy().as_ref()
    };
}

pub fn run<I, T>(args: I)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = std::iter::once(OsString::from("cortex_thickness"))
        .chain(args.into_iter().map(Into::into));
    cli::run::run_with_args(COMMAND.clone().get_matches_from(args));
}

pub fn assert_file_exists<P: AsRef<Path>>(file_path: P) {
    let file_path = file_path.as_ref();
    assert!(
        file_path.exists(),
        "File {} does not exist",
        file_path.display()
    );
}

pub fn assert_file_missing<P: AsRef<Path>>(file_path: P) {
    let file_path = file_path.as_ref();
    assert!(
        !file_path.exists(),
        "File {} exists but should not",
        file_path.display()
    );
}

/// Scratch directory for the files of a single test, removed when dropped.
pub struct Test {
    dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.dir.path().join(file_name.as_ref())
    }

    pub fn write_mask<S: AsRef<str>>(&self, file_name: S, mask: &VoxelMask3) -> PathBuf {
        let file_path = self.path(file_name);
        nifti::write_scalar_field(&mask.to_scalar_field::<f32>(), &file_path).unwrap();
        file_path
    }
}

pub fn slab_lattice(depth: usize) -> Arc<Lattice3> {
    Arc::new(Lattice3::with_boundary(
        In3D::new(SLAB_WIDTH, SLAB_WIDTH, depth),
        LatticeBoundary::Periodic,
        SpatialTransform::identity(),
    ))
}

/// Mask covering every voxel whose z-index lies in the given inclusive range.
pub fn z_layer_mask(name: &str, lattice: &Arc<Lattice3>, z_start: usize, z_end: usize) -> VoxelMask3 {
    VoxelMask3::from_fn(name.to_string(), Arc::clone(lattice), |indices| {
        indices[Z] >= z_start && indices[Z] <= z_end
    })
}

/// Cortex, white matter and pial masks of a flat slab with the white matter
/// at the bottom and the pial surface at the top.
pub fn slab_masks(depth: usize) -> (VoxelMask3, VoxelMask3, VoxelMask3) {
    let lattice = slab_lattice(depth);
    (
        z_layer_mask("cortex", &lattice, 1, depth - 2),
        z_layer_mask("wm", &lattice, 0, 0),
        z_layer_mask("pial", &lattice, depth - 1, depth - 1),
    )
}

/// Writes the masks of a slab subject with given boundaries into the test directory.
pub fn write_slab_subject(test: &Test, id: &str, depth: usize) {
    let (cortex, wm, pial) = slab_masks(depth);
    test.write_mask(format!("{}_cortex.nii.gz", id), &cortex);
    test.write_mask(format!("{}_wm.nii.gz", id), &wm);
    test.write_mask(format!("{}_pial.nii.gz", id), &pial);
}

pub fn read_thickness_map<P: AsRef<Path>>(file_path: P) -> ScalarField3<f64> {
    nifti::read_scalar_field(file_path.as_ref(), "thickness", LatticeBoundary::Periodic).unwrap()
}
