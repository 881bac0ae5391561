//! Command line interface for computing the normalized potential gradient.

use crate::{
    cli::utils as cli_utils,
    exit_on_error,
    gradient::{self, GradientConfig},
    io::nifti,
};
use clap::{Arg, ArgMatches, Command};

/// Builds a representation of the `gradient` command line subcommand.
pub fn create_gradient_subcommand() -> Command<'static> {
    let command = Command::new("gradient")
        .about("Compute the normalized finite difference gradient of a potential")
        .arg(
            Arg::new("laplace-file")
                .value_name("LAPLACE_FILE")
                .help("Path to the potential")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("output-file")
                .value_name("OUTPUT_FILE")
                .help("Path where the gradient should be written (as three frames)")
                .required(true)
                .takes_value(true),
        );
    let command = cli_utils::add_lattice_arguments(command);
    cli_utils::add_overwrite_arguments(command)
}

/// Runs the actions for the `gradient` subcommand using the given arguments.
pub fn run_gradient_subcommand(arguments: &ArgMatches) {
    let config = GradientConfig {
        backend: cli_utils::compute_backend_from_arguments(arguments),
    };
    let lattice_boundary = cli_utils::lattice_boundary_from_arguments(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);

    let potential = cli_utils::read_scalar_field_or_exit(
        cli_utils::get_required_path_argument(arguments, "laplace-file"),
        "laplace",
        lattice_boundary,
    );

    let gradient = gradient::compute_gradient(&potential, &config);

    let output_file_path = cli_utils::get_required_path_argument(arguments, "output-file");
    if cli_utils::output_is_writable(output_file_path, overwrite_mode) {
        exit_on_error!(
            nifti::write_vector_field(&gradient, output_file_path),
            "Error: Could not write {0}: {1}",
            output_file_path.display()
        );
    }
}
