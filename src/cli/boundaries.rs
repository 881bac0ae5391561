//! Command line interface for deriving boundary masks from segmentations.

use crate::{
    cli::utils as cli_utils,
    exit_on_error, exit_on_false,
    morphology::{self, BoundaryMaskConfig},
};
use clap::{Arg, ArgMatches, Command};

/// Adds arguments for the number of morphology iterations.
pub fn add_boundary_mask_arguments(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("inner-dilations")
                .long("inner-dilations")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Number of cortex dilations used to find the white matter boundary")
                .takes_value(true)
                .default_value("1"),
        )
        .arg(
            Arg::new("brain-erosions")
                .long("brain-erosions")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Number of brain erosions restricting the white matter boundary")
                .takes_value(true)
                .default_value("2"),
        )
        .arg(
            Arg::new("outer-dilations")
                .long("outer-dilations")
                .require_equals(true)
                .value_name("NUMBER")
                .help("Number of cortex dilations used to find the pial boundary")
                .takes_value(true)
                .default_value("3"),
        )
}

/// Creates a boundary mask configuration from the given arguments.
pub fn construct_boundary_mask_config_from_options(arguments: &ArgMatches) -> BoundaryMaskConfig {
    let config = BoundaryMaskConfig {
        inner_dilation_iterations: cli_utils::get_value_from_required_parseable_argument(
            arguments,
            "inner-dilations",
        ),
        brain_erosion_iterations: cli_utils::get_value_from_required_parseable_argument(
            arguments,
            "brain-erosions",
        ),
        outer_dilation_iterations: cli_utils::get_value_from_required_parseable_argument(
            arguments,
            "outer-dilations",
        ),
        backend: cli_utils::compute_backend_from_arguments(arguments),
    };
    exit_on_false!(
        config.inner_dilation_iterations >= 1 && config.outer_dilation_iterations >= 1,
        "Error: Number of dilations must be at least one"
    );
    config
}

/// Builds a representation of the `boundaries` command line subcommand.
pub fn create_boundaries_subcommand() -> Command<'static> {
    let command = Command::new("boundaries")
        .about("Derive white matter and pial boundary masks from cortex and brain masks")
        .arg(
            Arg::new("cortex-file")
                .value_name("CORTEX_FILE")
                .help("Path to the cortex mask")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("brain-file")
                .value_name("BRAIN_FILE")
                .help("Path to the whole-brain mask")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("wm-output-file")
                .value_name("WM_OUTPUT_FILE")
                .help("Path where the white matter boundary mask should be written")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("pial-output-file")
                .value_name("PIAL_OUTPUT_FILE")
                .help("Path where the pial boundary mask should be written")
                .required(true)
                .takes_value(true),
        );
    let command = add_boundary_mask_arguments(command);
    let command = cli_utils::add_lattice_arguments(command);
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, false)
}

/// Runs the actions for the `boundaries` subcommand using the given arguments.
pub fn run_boundaries_subcommand(arguments: &ArgMatches) {
    let config = construct_boundary_mask_config_from_options(arguments);
    let lattice_boundary = cli_utils::lattice_boundary_from_arguments(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, false);

    let cortex = cli_utils::read_mask_or_exit(
        cli_utils::get_required_path_argument(arguments, "cortex-file"),
        "cortex",
        lattice_boundary,
    );
    let brain = cli_utils::read_mask_or_exit(
        cli_utils::get_required_path_argument(arguments, "brain-file"),
        "brain",
        lattice_boundary,
    );

    let masks = exit_on_error!(
        morphology::build_boundary_masks(&cortex, &brain, &config),
        "Error: Could not derive boundary masks: {}"
    );

    if verbosity.print_messages() {
        println!(
            "Found {} white matter and {} pial boundary voxels around {} cortex voxels",
            masks.inner_boundary().count(),
            masks.outer_boundary().count(),
            masks.domain().count()
        );
    }

    cli_utils::write_scalar_field_or_exit(
        &masks.inner_boundary().to_scalar_field::<f32>(),
        cli_utils::get_required_path_argument(arguments, "wm-output-file"),
        overwrite_mode,
    );
    cli_utils::write_scalar_field_or_exit(
        &masks.outer_boundary().to_scalar_field::<f32>(),
        cli_utils::get_required_path_argument(arguments, "pial-output-file"),
        overwrite_mode,
    );
}
