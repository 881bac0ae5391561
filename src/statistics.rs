//! Aggregate statistics of thickness maps.

use crate::{
    field::ScalarField3,
    geometry::Dim3::{X, Y, Z},
    io::utils,
    num::{cast_float, BFloat},
};
use std::{borrow::Cow, fmt::Write as _, io, path::Path};

/// Running mean over the thickness values that count as measurements.
#[derive(Clone, Copy, Debug, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    /// Adds the value unless it is zero (not a boundary voxel) or not finite
    /// (undefined thickness).
    fn add(&mut self, value: f64) {
        if value.is_finite() && value != 0.0 {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}

/// Computes the mean thickness over all measured voxels of the map.
///
/// Zero and non-finite voxels are excluded. Returns `None` if no voxel has a
/// measured thickness.
pub fn mean_thickness<F: BFloat>(thickness_map: &ScalarField3<F>) -> Option<f64> {
    let mut accumulator = MeanAccumulator::default();
    for &value in thickness_map.values_in_memory_order() {
        accumulator.add(cast_float(value));
    }
    accumulator.mean()
}

/// Computes the mean thickness of every z-slice of the map, with the same
/// exclusions as `mean_thickness`.
pub fn slice_mean_thicknesses<F: BFloat>(thickness_map: &ScalarField3<F>) -> Vec<Option<f64>> {
    let shape = thickness_map.shape();
    let values = thickness_map.values();
    (0..shape[Z])
        .map(|k| {
            let mut accumulator = MeanAccumulator::default();
            for j in 0..shape[Y] {
                for i in 0..shape[X] {
                    accumulator.add(cast_float(values[[i, j, k]]));
                }
            }
            accumulator.mean()
        })
        .collect()
}

/// Mean thicknesses of one subject.
#[derive(Clone, Debug, PartialEq)]
pub struct ThicknessSummary {
    pub subject: String,
    pub mean: Option<f64>,
    pub slice_means: Vec<Option<f64>>,
}

impl ThicknessSummary {
    /// Computes the summary of the given thickness map.
    pub fn from_thickness_map<F: BFloat>(subject: String, thickness_map: &ScalarField3<F>) -> Self {
        Self {
            subject,
            mean: mean_thickness(thickness_map),
            slice_means: slice_mean_thicknesses(thickness_map),
        }
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(String::new, |value| value.to_string())
}

/// Quotes a CSV cell if it contains a separator, quote or line break.
fn format_csv_cell(text: &str) -> Cow<str> {
    if text.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", text.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(text)
    }
}

/// Formats the mean thickness of each subject as CSV.
pub fn format_totals_csv(summaries: &[ThicknessSummary]) -> String {
    let mut text = String::from("subject,mean_thickness\n");
    for summary in summaries {
        // Writing to a `String` can not fail
        let _ = writeln!(
            text,
            "{},{}",
            format_csv_cell(&summary.subject),
            format_optional(summary.mean)
        );
    }
    text
}

/// Formats the mean thickness of each z-slice of each subject as CSV.
///
/// Subjects with fewer slices than the others get empty trailing cells.
pub fn format_slice_csv(summaries: &[ThicknessSummary]) -> String {
    let n_slices = summaries
        .iter()
        .map(|summary| summary.slice_means.len())
        .max()
        .unwrap_or(0);

    let mut text = String::from("subject");
    for slice in 1..=n_slices {
        let _ = write!(text, ",z_slice_{}", slice);
    }
    text.push('\n');

    for summary in summaries {
        text.push_str(&format_csv_cell(&summary.subject));
        for slice in 0..n_slices {
            text.push(',');
            text.push_str(&format_optional(
                summary.slice_means.get(slice).copied().flatten(),
            ));
        }
        text.push('\n');
    }
    text
}

/// Writes the mean thickness of each subject as a CSV file.
pub fn write_totals_csv(summaries: &[ThicknessSummary], file_path: &Path) -> io::Result<()> {
    utils::write_text_file(&format_totals_csv(summaries), file_path)
}

/// Writes the per-slice mean thicknesses of each subject as a CSV file.
pub fn write_slice_csv(summaries: &[ThicknessSummary], file_path: &Path) -> io::Result<()> {
    utils::write_text_file(&format_slice_csv(summaries), file_path)
}
