//! Command line interface for tracing streamlines and measuring thickness.

use crate::{
    cli::utils as cli_utils,
    exit_on_error, exit_on_false,
    io::nifti,
    tracing::{self, ftr, StreamlineTracerConfig},
};
use clap::{Arg, ArgMatches, Command};

/// Adds arguments for parameters used by the streamline tracer.
pub fn add_streamline_tracer_arguments(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("step-size")
                .long("step-size")
                .require_equals(true)
                .value_name("VALUE")
                .help("Distance moved per step [voxels]")
                .takes_value(true)
                .default_value("0.1"),
        )
        .arg(
            Arg::new("max-steps")
                .long("max-steps")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Number of steps after which a trace is marked as undefined")
                .takes_value(true)
                .default_value("200"),
        )
        .arg(
            Arg::new("wm-threshold")
                .long("wm-threshold")
                .require_equals(true)
                .value_name("VALUE")
                .help("Potential at which the white matter boundary counts as reached")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::new("threshold-slack")
                .long("threshold-slack")
                .require_equals(true)
                .value_name("VALUE")
                .help("Tolerance subtracted from the white matter threshold")
                .takes_value(true)
                .default_value("0"),
        )
}

/// Creates a streamline tracer configuration from the given arguments.
pub fn construct_streamline_tracer_config_from_options(
    arguments: &ArgMatches,
) -> StreamlineTracerConfig {
    let step_size: ftr =
        cli_utils::get_finite_float_value_from_required_parseable_argument(arguments, "step-size");
    let max_steps: usize =
        cli_utils::get_value_from_required_parseable_argument(arguments, "max-steps");
    let wm_threshold: ftr = cli_utils::get_finite_float_value_from_required_parseable_argument(
        arguments,
        "wm-threshold",
    );
    let threshold_slack: ftr = cli_utils::get_finite_float_value_from_required_parseable_argument(
        arguments,
        "threshold-slack",
    );

    exit_on_false!(step_size > 0.0, "Error: Step size must be larger than zero");
    exit_on_false!(
        max_steps >= 1,
        "Error: Maximum number of steps must be at least one"
    );
    exit_on_false!(
        threshold_slack >= 0.0,
        "Error: Threshold slack must not be negative"
    );

    StreamlineTracerConfig {
        step_size,
        max_steps,
        wm_threshold,
        threshold_slack,
        record_paths: false,
        backend: cli_utils::compute_backend_from_arguments(arguments),
    }
}

/// Adds the argument for exporting streamline paths, if supported.
pub fn add_streamline_output_argument(command: Command<'static>) -> Command<'static> {
    #[cfg(feature = "json")]
    let command = command.arg(
        Arg::new("streamlines-output-file")
            .long("streamlines-output-file")
            .require_equals(true)
            .value_name("PATH")
            .help("Path of a JSON file where the streamline paths should be saved")
            .takes_value(true),
    );
    command
}

/// Builds a representation of the `trace` command line subcommand.
pub fn create_trace_subcommand() -> Command<'static> {
    let command = Command::new("trace")
        .about("Trace streamlines from the pial boundary and write the thickness map")
        .arg(
            Arg::new("laplace-file")
                .value_name("LAPLACE_FILE")
                .help("Path to the potential")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("gradient-file")
                .value_name("GRADIENT_FILE")
                .help("Path to the normalized gradient of the potential")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("pial-file")
                .value_name("PIAL_FILE")
                .help("Path to the pial boundary mask to start tracing from")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("output-file")
                .value_name("OUTPUT_FILE")
                .help("Path where the thickness map should be written")
                .required(true)
                .takes_value(true),
        );
    let command = add_streamline_tracer_arguments(command);
    let command = add_streamline_output_argument(command);
    let command = cli_utils::add_lattice_arguments(command);
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, true)
}

/// Runs the actions for the `trace` subcommand using the given arguments.
pub fn run_trace_subcommand(arguments: &ArgMatches) {
    #[allow(unused_mut)]
    let mut config = construct_streamline_tracer_config_from_options(arguments);
    #[cfg(feature = "json")]
    {
        config.record_paths = arguments.is_present("streamlines-output-file");
    }
    let lattice_boundary = cli_utils::lattice_boundary_from_arguments(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, true);

    let potential = cli_utils::read_scalar_field_or_exit(
        cli_utils::get_required_path_argument(arguments, "laplace-file"),
        "laplace",
        lattice_boundary,
    );
    let gradient = exit_on_error!(
        nifti::read_vector_field(
            cli_utils::get_required_path_argument(arguments, "gradient-file"),
            "gradient",
            lattice_boundary,
        ),
        "Error: Could not read gradient: {}"
    );
    let outer_boundary = cli_utils::read_mask_or_exit(
        cli_utils::get_required_path_argument(arguments, "pial-file"),
        "pial",
        lattice_boundary,
    );

    let streamlines = exit_on_error!(
        tracing::trace_streamlines(&potential, &gradient, &outer_boundary, &config, &verbosity),
        "Error: Could not trace streamlines: {}"
    );

    cli_utils::write_scalar_field_or_exit(
        &streamlines.thickness_volume(),
        cli_utils::get_required_path_argument(arguments, "output-file"),
        overwrite_mode,
    );

    #[cfg(feature = "json")]
    if let Some(streamlines_file_path) = arguments.value_of("streamlines-output-file") {
        let streamlines_file_path = std::path::Path::new(streamlines_file_path);
        if cli_utils::output_is_writable(streamlines_file_path, overwrite_mode) {
            exit_on_error!(
                streamlines.save_as_json(streamlines_file_path),
                "Error: Could not save streamlines in {0}: {1}",
                streamlines_file_path.display()
            );
        }
    }
}
