//! Command line interface for solving for the Laplace potential.

use crate::{
    cli::utils as cli_utils,
    exit_on_error, exit_on_false,
    field::mask::TissueMasks3,
    laplace::{self, fph, LaplaceSolverConfig},
};
use clap::{Arg, ArgMatches, Command};

/// Adds arguments for parameters used by the Laplace solver.
pub fn add_laplace_solver_arguments(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("max-iterations")
                .long("max-iterations")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Maximum number of relaxation sweeps")
                .takes_value(true)
                .default_value("2000"),
        )
        .arg(
            Arg::new("tolerance")
                .long("tolerance")
                .require_equals(true)
                .value_name("VALUE")
                .help("Stop when no voxel changes by more than this in a sweep")
                .takes_value(true)
                .default_value("1e-6"),
        )
}

/// Creates a Laplace solver configuration from the given arguments.
pub fn construct_laplace_solver_config_from_options(arguments: &ArgMatches) -> LaplaceSolverConfig {
    let max_iterations: usize =
        cli_utils::get_value_from_required_parseable_argument(arguments, "max-iterations");
    let tolerance: fph =
        cli_utils::get_finite_float_value_from_required_parseable_argument(arguments, "tolerance");

    exit_on_false!(
        max_iterations >= 1,
        "Error: Maximum number of iterations must be at least one"
    );
    exit_on_false!(tolerance > 0.0, "Error: Tolerance must be larger than zero");

    LaplaceSolverConfig {
        max_iterations,
        tolerance,
        backend: cli_utils::compute_backend_from_arguments(arguments),
    }
}

/// Builds a representation of the `laplace` command line subcommand.
pub fn create_laplace_subcommand() -> Command<'static> {
    let command = Command::new("laplace")
        .about("Relax the potential between given white matter and pial boundaries")
        .arg(
            Arg::new("cortex-file")
                .value_name("CORTEX_FILE")
                .help("Path to the cortex mask where the potential is relaxed")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("wm-file")
                .value_name("WM_FILE")
                .help("Path to the white matter boundary mask (potential 1)")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("pial-file")
                .value_name("PIAL_FILE")
                .help("Path to the pial boundary mask (potential 0)")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("output-file")
                .value_name("OUTPUT_FILE")
                .help("Path where the potential should be written")
                .required(true)
                .takes_value(true),
        );
    let command = add_laplace_solver_arguments(command);
    let command = cli_utils::add_lattice_arguments(command);
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, false)
}

/// Runs the actions for the `laplace` subcommand using the given arguments.
pub fn run_laplace_subcommand(arguments: &ArgMatches) {
    let config = construct_laplace_solver_config_from_options(arguments);
    let lattice_boundary = cli_utils::lattice_boundary_from_arguments(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, false);

    let read_mask = |argument_name: &str, name: &str| {
        cli_utils::read_mask_or_exit(
            cli_utils::get_required_path_argument(arguments, argument_name),
            name,
            lattice_boundary,
        )
    };
    let masks = exit_on_error!(
        TissueMasks3::new(
            read_mask("cortex-file", "cortex"),
            read_mask("wm-file", "wm"),
            read_mask("pial-file", "pial"),
        ),
        "Error: Invalid masks: {}"
    );

    let solution = laplace::solve_laplace(&masks, &config, &verbosity);
    if !solution.converged {
        eprintln!(
            "Warning: Potential did not converge within {} iterations (max change {:.3e})",
            solution.iterations, solution.max_change
        );
    }

    cli_utils::write_scalar_field_or_exit(
        &solution.potential,
        cli_utils::get_required_path_argument(arguments, "output-file"),
        overwrite_mode,
    );
}
