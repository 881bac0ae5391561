//! Utilities for creating the command line interface.

use crate::{
    backend::ComputeBackend,
    exit_on_error, exit_on_false,
    field::{mask::VoxelMask3, ScalarField3},
    grid::LatticeBoundary,
    io::{nifti, utils as io_utils, OverwriteMode, Verbosity},
    num::BFloat,
};
use clap::{Arg, ArgMatches, Command};
use indicatif::ProgressStyle;
use lazy_static::lazy_static;
use std::{path::Path, str::FromStr};

lazy_static! {
    static ref DEFAULT_PROGRESS_STYLE: ProgressStyle =
        ProgressStyle::default_bar().template("Progress: {bar:40}  {percent}% | ETA: {eta}");
}

pub fn parse_value_string<T>(argument_name: &str, value_string: &str) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    exit_on_error!(
        value_string.parse(),
        "Error: Could not parse value for {0}: {1}",
        argument_name
    )
}

fn verify_finite_float_value<F: BFloat>(argument_name: &str, value: F) {
    exit_on_false!(value.is_finite(), "Error: {} must be finite", argument_name);
}

pub fn get_value_from_required_parseable_argument<T>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> T
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    parse_value_string(
        argument_name,
        arguments
            .value_of(argument_name)
            .expect("No value for required argument"),
    )
}

pub fn get_finite_float_value_from_required_parseable_argument<F>(
    arguments: &ArgMatches,
    argument_name: &str,
) -> F
where
    F: BFloat + FromStr,
    <F as FromStr>::Err: std::fmt::Display,
{
    let value: F = get_value_from_required_parseable_argument(arguments, argument_name);
    verify_finite_float_value(argument_name, value);
    value
}

pub fn get_required_path_argument<'a>(arguments: &'a ArgMatches, argument_name: &str) -> &'a Path {
    Path::new(
        arguments
            .value_of(argument_name)
            .expect("No value for required argument"),
    )
}

/// Adds the `--overwrite` and `--no-overwrite` flags.
pub fn add_overwrite_arguments(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("overwrite")
                .long("overwrite")
                .help("Automatically overwrite any existing files")
                .conflicts_with("no-overwrite"),
        )
        .arg(
            Arg::new("no-overwrite")
                .long("no-overwrite")
                .help("Do not overwrite any existing files")
                .conflicts_with("overwrite"),
        )
}

/// Adds the `--verbose` flag and, if supported, the `--progress` flag.
pub fn add_verbosity_arguments(
    command: Command<'static>,
    support_progress: bool,
) -> Command<'static> {
    let command = command.arg(
        Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Print status messages"),
    );
    if support_progress {
        command.arg(
            Arg::new("progress")
                .short('p')
                .long("progress")
                .help("Show progress bar (also implies `verbose`)"),
        )
    } else {
        command
    }
}

/// Adds the arguments selecting the lattice edge behavior and compute backend.
pub fn add_lattice_arguments(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("lattice-boundary")
                .long("lattice-boundary")
                .require_equals(true)
                .value_name("MODE")
                .help(
                    "How neighbors beyond the edge of the lattice are found\n\
                     periodic: wrap around to the opposite side\n\
                     clamped: use the edge voxel (zero flux)",
                )
                .next_line_help(true)
                .takes_value(true)
                .possible_values(["periodic", "clamped"])
                .default_value("periodic"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("Process voxels on a single thread"),
        )
}

pub fn overwrite_mode_from_arguments(arguments: &ArgMatches) -> OverwriteMode {
    if arguments.is_present("overwrite") {
        OverwriteMode::Always
    } else if arguments.is_present("no-overwrite") {
        OverwriteMode::Never
    } else {
        OverwriteMode::Ask
    }
}

pub fn parse_verbosity(arguments: &ArgMatches, support_progress: bool) -> Verbosity {
    if support_progress && arguments.is_present("progress") {
        Verbosity::Progress(DEFAULT_PROGRESS_STYLE.clone())
    } else if arguments.is_present("verbose") {
        Verbosity::Messages
    } else {
        Verbosity::Quiet
    }
}

pub fn lattice_boundary_from_arguments(arguments: &ArgMatches) -> LatticeBoundary {
    match arguments
        .value_of("lattice-boundary")
        .expect("No value for argument with default")
    {
        "periodic" => LatticeBoundary::Periodic,
        "clamped" => LatticeBoundary::Clamped,
        mode => unreachable!("Invalid lattice boundary mode {}", mode),
    }
}

pub fn compute_backend_from_arguments(arguments: &ArgMatches) -> ComputeBackend {
    if arguments.is_present("serial") {
        ComputeBackend::Serial
    } else {
        ComputeBackend::Parallel
    }
}

/// Whether the file at the given path may be written, exiting on I/O errors.
pub fn output_is_writable(file_path: &Path, overwrite_mode: OverwriteMode) -> bool {
    exit_on_error!(
        io_utils::check_if_write_allowed(file_path, overwrite_mode),
        "Error: Could not determine whether to write {0}: {1}",
        file_path.display()
    )
}

pub fn read_mask_or_exit(file_path: &Path, name: &str, boundary: LatticeBoundary) -> VoxelMask3 {
    exit_on_error!(
        nifti::read_mask(file_path, name, boundary),
        "Error: Could not read {0} mask: {1}",
        name
    )
}

pub fn read_scalar_field_or_exit(
    file_path: &Path,
    name: &str,
    boundary: LatticeBoundary,
) -> ScalarField3<f64> {
    exit_on_error!(
        nifti::read_scalar_field(file_path, name, boundary),
        "Error: Could not read {0}: {1}",
        name
    )
}

pub fn write_scalar_field_or_exit<F: BFloat>(
    field: &ScalarField3<F>,
    file_path: &Path,
    overwrite_mode: OverwriteMode,
) {
    if output_is_writable(file_path, overwrite_mode) {
        exit_on_error!(
            nifti::write_scalar_field(field, file_path),
            "Error: Could not write {0}: {1}",
            file_path.display()
        );
    }
}
