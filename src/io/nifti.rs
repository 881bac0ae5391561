//! Reading and writing of NIfTI-1 volumes.
//!
//! Only single-file volumes (`.nii`, optionally gzip compressed) are
//! supported. Voxel data is stored with x varying fastest, which is the
//! same column-major memory order used by the fields.

use super::utils;
use crate::{
    field::{array_from_buffer, mask::VoxelMask3, ScalarField3, VectorField3},
    geometry::{
        Dim3::{self, X, Y, Z},
        In3D,
    },
    grid::{Lattice3, LatticeBoundary, SpatialTransform},
    num::{cast_float, BFloat},
};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use nifti::{volume::ndarray::IntoNdArray, InMemNiftiObject, NiftiHeader, NiftiObject};
use std::{
    fs,
    io::{self, Cursor, Write},
    path::Path,
    sync::Arc,
};

const HEADER_SIZE: usize = 348;
const WRITTEN_VOX_OFFSET: usize = 352;
const SINGLE_FILE_MAGIC: &[u8; 4] = b"n+1\0";

/// Volume data and geometry read from a NIfTI file.
#[derive(Clone, Debug)]
pub struct NiftiVolume {
    shape: In3D<usize>,
    n_frames: usize,
    transform: SpatialTransform,
    values: Vec<f64>,
}

impl NiftiVolume {
    /// Returns the spatial shape of the volume.
    pub fn shape(&self) -> &In3D<usize> {
        &self.shape
    }

    /// Returns the number of values stored per voxel.
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    /// Returns the affine transform of the volume.
    pub fn transform(&self) -> &SpatialTransform {
        &self.transform
    }

    /// Creates a lattice with the shape and transform of the volume.
    pub fn lattice(&self, boundary: LatticeBoundary) -> Lattice3 {
        Lattice3::with_boundary(self.shape.clone(), boundary, self.transform.clone())
    }

    /// Converts the volume into a scalar field on the given lattice.
    pub fn into_scalar_field<F: BFloat>(
        self,
        name: String,
        lattice: Arc<Lattice3>,
    ) -> io::Result<ScalarField3<F>> {
        self.verify_lattice(&name, &lattice, 1)?;
        let values = self.values.into_iter().map(cast_float).collect();
        Ok(ScalarField3::new(
            name,
            Arc::clone(&lattice),
            array_from_buffer(&lattice, values),
        ))
    }

    /// Converts the volume into a vector field on the given lattice.
    ///
    /// The volume must hold three frames, one per vector component.
    pub fn into_vector_field<F: BFloat>(
        self,
        name: String,
        lattice: Arc<Lattice3>,
    ) -> io::Result<VectorField3<F>> {
        self.verify_lattice(&name, &lattice, 3)?;
        let n_voxels = lattice.n_voxels();
        let component = |dim: Dim3| {
            let frame = &self.values[dim.num() * n_voxels..(dim.num() + 1) * n_voxels];
            ScalarField3::new(
                format!("{}_{}", name, dim),
                Arc::clone(&lattice),
                array_from_buffer(&lattice, frame.iter().copied().map(cast_float).collect()),
            )
        };
        let components = In3D::with_each_component(component);
        Ok(VectorField3::new(name, lattice, components))
    }

    fn verify_lattice(&self, name: &str, lattice: &Lattice3, n_frames: usize) -> io::Result<()> {
        if &self.shape != lattice.shape() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Volume {} has shape {}, expected {}",
                    name,
                    self.shape,
                    lattice.shape()
                ),
            ));
        }
        if self.n_frames != n_frames {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Volume {} has {} values per voxel, expected {}",
                    name, self.n_frames, n_frames
                ),
            ));
        }
        Ok(())
    }
}

/// Reads a NIfTI-1 volume from the given path.
///
/// Gzip compression is detected from the content, not the extension.
pub fn read_nifti_volume(file_path: &Path) -> io::Result<NiftiVolume> {
    let bytes = fs::read(file_path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Could not read {}: {}", file_path.display(), err),
        )
    })?;
    let object = if is_gzip(&bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes.as_slice())))
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes.as_slice()))
    }
    .map_err(|err| {
        invalid_data(format!(
            "Invalid NIfTI file {}: {}",
            file_path.display(),
            err
        ))
    })?;
    volume_from_nifti_object(object).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("Invalid NIfTI file {}: {}", file_path.display(), err),
        )
    })
}

/// Reads a 3D NIfTI volume as a scalar field on a lattice with the given edge behavior.
pub fn read_scalar_field(
    file_path: &Path,
    name: &str,
    boundary: LatticeBoundary,
) -> io::Result<ScalarField3<f64>> {
    let volume = read_nifti_volume(file_path)?;
    let lattice = Arc::new(volume.lattice(boundary));
    volume.into_scalar_field(name.to_string(), lattice)
}

/// Reads a 4D NIfTI volume with three frames as a vector field.
pub fn read_vector_field(
    file_path: &Path,
    name: &str,
    boundary: LatticeBoundary,
) -> io::Result<VectorField3<f64>> {
    let volume = read_nifti_volume(file_path)?;
    let lattice = Arc::new(volume.lattice(boundary));
    volume.into_vector_field(name.to_string(), lattice)
}

/// Reads a 3D NIfTI volume as a mask where every non-zero voxel is set.
pub fn read_mask(file_path: &Path, name: &str, boundary: LatticeBoundary) -> io::Result<VoxelMask3> {
    read_scalar_field(file_path, name, boundary).map(|field| VoxelMask3::from_scalar_field(&field))
}

/// Writes the scalar field as a float32 NIfTI-1 volume.
///
/// The file is gzip compressed if the path ends with `.gz`.
pub fn write_scalar_field<F: BFloat>(field: &ScalarField3<F>, file_path: &Path) -> io::Result<()> {
    write_nifti_frames(
        file_path,
        field.lattice(),
        &[field.values_in_memory_order()],
    )
}

/// Writes the vector field as a 4D float32 NIfTI-1 volume with one frame per component.
pub fn write_vector_field<F: BFloat>(field: &VectorField3<F>, file_path: &Path) -> io::Result<()> {
    write_nifti_frames(
        file_path,
        field.lattice(),
        &[
            field.component(X).values_in_memory_order(),
            field.component(Y).values_in_memory_order(),
            field.component(Z).values_in_memory_order(),
        ],
    )
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

fn transform_from_header(header: &NiftiHeader) -> SpatialTransform {
    if header.sform_code > 0 {
        let row = |srow: [f32; 4]| srow.map(f64::from);
        SpatialTransform::from_rows([row(header.srow_x), row(header.srow_y), row(header.srow_z)])
    } else {
        let voxel_size = |i: usize| {
            let size = header.pixdim[i] as f64;
            if size > 0.0 {
                size
            } else {
                1.0
            }
        };
        SpatialTransform::from_voxel_sizes(&In3D::new(voxel_size(1), voxel_size(2), voxel_size(3)))
    }
}

fn volume_from_nifti_object(object: InMemNiftiObject) -> io::Result<NiftiVolume> {
    let transform = transform_from_header(object.header());

    // Intensity scaling is applied during the conversion
    let array = object
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|err| invalid_data(format!("Could not convert voxel data: {}", err)))?;

    let dims = array.shape().to_vec();
    if !(3..=4).contains(&dims.len()) {
        return Err(invalid_data(format!(
            "Expected a 3D or 4D volume, got {} dimensions",
            dims.len()
        )));
    }
    if dims.iter().any(|&size| size < 1) {
        return Err(invalid_data(format!("Invalid dimensions {:?}", dims)));
    }
    let shape = In3D::new(dims[0], dims[1], dims[2]);
    let n_frames = dims.get(3).copied().unwrap_or(1);

    let mut values = Vec::with_capacity(shape.volume() * n_frames);
    for frame in 0..n_frames {
        for k in 0..shape[Z] {
            for j in 0..shape[Y] {
                for i in 0..shape[X] {
                    let index = [i, j, k, frame];
                    values.push(array[&index[..dims.len()]]);
                }
            }
        }
    }

    Ok(NiftiVolume {
        shape,
        n_frames,
        transform,
        values,
    })
}

fn write_nifti_frames<F: BFloat>(
    file_path: &Path,
    lattice: &Lattice3,
    frames: &[&[F]],
) -> io::Result<()> {
    let header = create_float32_header(lattice, frames.len())?;

    let write_contents = |writer: &mut dyn Write| -> io::Result<()> {
        writer.write_all(&header)?;
        writer.write_all(&[0_u8; WRITTEN_VOX_OFFSET - HEADER_SIZE])?;
        for frame in frames {
            for &value in frame.iter() {
                writer.write_f32::<LittleEndian>(cast_float(value))?;
            }
        }
        Ok(())
    };

    let is_compressed = file_path
        .extension()
        .map_or(false, |extension| extension == "gz");

    utils::write_atomically(file_path, |writer| {
        if is_compressed {
            let mut encoder = GzEncoder::new(writer, Compression::default());
            write_contents(&mut encoder)?;
            encoder.finish()?;
            Ok(())
        } else {
            write_contents(writer)
        }
    })
}

fn create_float32_header(lattice: &Lattice3, n_frames: usize) -> io::Result<Vec<u8>> {
    let shape = lattice.shape();
    let transform = lattice.transform();

    let to_i16 = |size: usize| {
        i16::try_from(size)
            .map_err(|_| invalid_data(format!("Dimension {} too large for NIfTI-1", size)))
    };

    let mut header = vec![0_u8; HEADER_SIZE];
    LittleEndian::write_i32(&mut header[0..], HEADER_SIZE as i32);

    let dim = [
        if n_frames > 1 { 4 } else { 3 },
        to_i16(shape[X])?,
        to_i16(shape[Y])?,
        to_i16(shape[Z])?,
        to_i16(n_frames)?,
        1,
        1,
        1,
    ];
    for (i, &size) in dim.iter().enumerate() {
        LittleEndian::write_i16(&mut header[40 + 2 * i..], size);
    }

    // float32 with 32 bits per voxel
    LittleEndian::write_i16(&mut header[70..], 16);
    LittleEndian::write_i16(&mut header[72..], 32);

    let voxel_sizes = transform.voxel_sizes();
    let pixdim = [1.0, voxel_sizes[X], voxel_sizes[Y], voxel_sizes[Z], 1.0, 1.0, 1.0, 1.0];
    for (i, &size) in pixdim.iter().enumerate() {
        LittleEndian::write_f32(&mut header[76 + 4 * i..], size as f32);
    }

    LittleEndian::write_f32(&mut header[108..], WRITTEN_VOX_OFFSET as f32);
    LittleEndian::write_f32(&mut header[112..], 1.0);
    LittleEndian::write_f32(&mut header[116..], 0.0);

    // Millimeters
    header[123] = 2;

    // sform_code 1 (scanner anatomical)
    LittleEndian::write_i16(&mut header[254..], 1);
    for (row_idx, row) in transform.rows().iter().enumerate() {
        for (i, &value) in row.iter().enumerate() {
            LittleEndian::write_f32(&mut header[280 + 16 * row_idx + 4 * i..], value as f32);
        }
    }

    header[344..348].copy_from_slice(SINGLE_FILE_MAGIC);
    Ok(header)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{field::array_from_flat_fn, geometry::Idx3};

    fn lattice() -> Arc<Lattice3> {
        Arc::new(Lattice3::with_boundary(
            In3D::new(3, 4, 2),
            LatticeBoundary::Periodic,
            SpatialTransform::from_rows([
                [0.5, 0.0, 0.0, -12.0],
                [0.0, 0.25, 0.0, 3.5],
                [0.0, 0.0, 2.0, 1.0],
            ]),
        ))
    }

    #[test]
    fn scalar_field_survives_compressed_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("42_laplace.nii.gz");

        let lattice = lattice();
        let values = array_from_flat_fn(&lattice, |idx| {
            if idx == 5 {
                f64::NAN
            } else {
                0.125 * idx as f64
            }
        });
        let field = ScalarField3::new("laplace".to_string(), Arc::clone(&lattice), values);
        write_scalar_field(&field, &file_path).unwrap();

        let read_field = read_scalar_field(&file_path, "laplace", LatticeBoundary::Periodic).unwrap();
        assert_eq!(read_field.lattice(), lattice.as_ref());
        assert_eq!(read_field.value(&Idx3::new(2, 3, 1)), field.value(&Idx3::new(2, 3, 1)));
        assert!(read_field.values_in_memory_order()[5].is_nan());
    }

    #[test]
    fn vector_field_is_stored_as_three_frames() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("gradient.nii");

        let lattice = lattice();
        let component = |dim: Dim3| {
            ScalarField3::new(
                format!("g{}", dim),
                Arc::clone(&lattice),
                array_from_flat_fn(&lattice, |idx| (dim.num() * 100 + idx) as f32),
            )
        };
        let field = VectorField3::new(
            "gradient".to_string(),
            Arc::clone(&lattice),
            In3D::with_each_component(component),
        );
        write_vector_field(&field, &file_path).unwrap();

        let volume = read_nifti_volume(&file_path).unwrap();
        assert_eq!(volume.n_frames(), 3);
        assert!(volume
            .clone()
            .into_scalar_field::<f64>("gradient".to_string(), Arc::clone(&lattice))
            .is_err());

        let read_field: VectorField3<f32> = volume
            .into_vector_field("gradient".to_string(), Arc::clone(&lattice))
            .unwrap();
        let indices = Idx3::new(1, 2, 1);
        assert_eq!(read_field.vector(&indices), field.vector(&indices));
    }

    #[test]
    fn intensity_scaling_is_applied() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("scaled.nii");

        let lattice = lattice();
        let mask = VoxelMask3::from_fn("mask".to_string(), Arc::clone(&lattice), |indices| {
            indices[Z] == 1
        });
        write_scalar_field(&mask.to_scalar_field::<f32>(), &file_path).unwrap();

        let mut bytes = fs::read(&file_path).unwrap();
        LittleEndian::write_f32(&mut bytes[112..], 2.0);
        LittleEndian::write_f32(&mut bytes[116..], -1.0);
        fs::write(&file_path, &bytes).unwrap();

        let field = read_scalar_field(&file_path, "mask", LatticeBoundary::Clamped).unwrap();
        assert_eq!(field.value(&Idx3::new(0, 0, 1)), 1.0);
        assert_eq!(field.value(&Idx3::new(0, 0, 0)), -1.0);
        assert!(!field.lattice().is_periodic(X));
    }

    #[test]
    fn voxel_sizes_are_used_without_sform() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("plain.nii");

        let lattice = lattice();
        let mask = VoxelMask3::from_fn("mask".to_string(), Arc::clone(&lattice), |_| true);
        write_scalar_field(&mask.to_scalar_field::<f32>(), &file_path).unwrap();

        let mut bytes = fs::read(&file_path).unwrap();
        LittleEndian::write_i16(&mut bytes[254..], 0);
        fs::write(&file_path, &bytes).unwrap();

        let volume = read_nifti_volume(&file_path).unwrap();
        assert_eq!(volume.shape(), &In3D::new(3, 4, 2));
        assert_eq!(
            volume.transform(),
            &SpatialTransform::from_voxel_sizes(&In3D::new(0.5, 0.25, 2.0))
        );
    }

    #[test]
    fn truncated_files_are_rejected() {
        let directory = tempfile::tempdir().unwrap();
        let file_path = directory.path().join("broken.nii");
        fs::write(&file_path, [0_u8; 100]).unwrap();
        let err = read_nifti_volume(&file_path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
