//! Command line interface for running the full thickness computation on one subject.

use crate::{
    cli::{
        boundaries::{add_boundary_mask_arguments, construct_boundary_mask_config_from_options},
        laplace::{add_laplace_solver_arguments, construct_laplace_solver_config_from_options},
        trace::{add_streamline_tracer_arguments, construct_streamline_tracer_config_from_options},
        utils as cli_utils,
    },
    exit_on_error,
    gradient::GradientConfig,
    io::{
        subjects::{BoundarySource, SubjectFiles, SubjectOutputs},
        utils as io_utils, OverwriteMode,
    },
    pipeline::{self, ThicknessPipelineConfig, ThicknessResult},
};
use clap::{Arg, ArgMatches, Command};

/// Adds every argument configuring the stages of the thickness computation.
pub fn add_thickness_pipeline_arguments(command: Command<'static>) -> Command<'static> {
    let command = add_boundary_mask_arguments(command);
    let command = add_laplace_solver_arguments(command);
    let command = add_streamline_tracer_arguments(command);
    cli_utils::add_lattice_arguments(command)
}

/// Creates a pipeline configuration from the given arguments.
pub fn construct_thickness_pipeline_config_from_options(
    arguments: &ArgMatches,
) -> ThicknessPipelineConfig {
    ThicknessPipelineConfig {
        boundary_masks: construct_boundary_mask_config_from_options(arguments),
        solver: construct_laplace_solver_config_from_options(arguments),
        gradient: GradientConfig {
            backend: cli_utils::compute_backend_from_arguments(arguments),
        },
        tracer: construct_streamline_tracer_config_from_options(arguments),
        lattice_boundary: cli_utils::lattice_boundary_from_arguments(arguments),
    }
}

/// Builds a representation of the `pipeline` command line subcommand.
pub fn create_pipeline_subcommand() -> Command<'static> {
    let command = Command::new("pipeline")
        .about("Compute the potential, gradient and thickness map of a single subject")
        .arg(
            Arg::new("cortex-file")
                .value_name("CORTEX_FILE")
                .help("Path to the cortex mask")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("output-dir")
                .value_name("OUTPUT_DIR")
                .help("Directory where the output volumes should be written")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("brain-file")
                .long("brain")
                .require_equals(true)
                .value_name("PATH")
                .help("Path to a whole-brain mask to derive the boundaries from")
                .takes_value(true)
                .required_unless_present_all(&["wm-file", "pial-file"])
                .conflicts_with_all(&["wm-file", "pial-file"]),
        )
        .arg(
            Arg::new("wm-file")
                .long("wm")
                .require_equals(true)
                .value_name("PATH")
                .help("Path to a given white matter boundary mask")
                .takes_value(true)
                .requires("pial-file"),
        )
        .arg(
            Arg::new("pial-file")
                .long("pial")
                .require_equals(true)
                .value_name("PATH")
                .help("Path to a given pial boundary mask")
                .takes_value(true)
                .requires("wm-file"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .require_equals(true)
                .value_name("NAME")
                .help("Identifier used as prefix for the output file names")
                .takes_value(true)
                .default_value("subject"),
        );
    let command = add_thickness_pipeline_arguments(command);
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, true)
}

/// Runs the actions for the `pipeline` subcommand using the given arguments.
pub fn run_pipeline_subcommand(arguments: &ArgMatches) {
    let config = construct_thickness_pipeline_config_from_options(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, true);

    let boundaries = match arguments.value_of("brain-file") {
        Some(brain_file_path) => BoundarySource::Brain(brain_file_path.into()),
        None => BoundarySource::Given {
            inner: cli_utils::get_required_path_argument(arguments, "wm-file").to_path_buf(),
            outer: cli_utils::get_required_path_argument(arguments, "pial-file").to_path_buf(),
        },
    };
    let subject = SubjectFiles::new(
        arguments
            .value_of("id")
            .expect("No value for argument with default")
            .to_string(),
        cli_utils::get_required_path_argument(arguments, "cortex-file").to_path_buf(),
        boundaries,
    );

    let output_dir = cli_utils::get_required_path_argument(arguments, "output-dir");
    exit_on_error!(
        io_utils::create_directory_if_missing(output_dir),
        "Error: Could not create output directory {0}: {1}",
        output_dir.display()
    );
    let outputs = subject.output_paths(output_dir);
    if !outputs_are_writable(&outputs, overwrite_mode) {
        return;
    }

    let result = exit_on_error!(
        pipeline::process_subject(&subject, &outputs, &config, &verbosity),
        "Error: Could not process subject {0}: {1}",
        subject.id()
    );

    if verbosity.print_messages() {
        print_result_summary(subject.id(), &result);
    }
}

/// Whether every output of a subject may be written.
pub fn outputs_are_writable(outputs: &SubjectOutputs, overwrite_mode: OverwriteMode) -> bool {
    [&outputs.laplace, &outputs.gradient, &outputs.thickness]
        .iter()
        .all(|file_path| cli_utils::output_is_writable(file_path, overwrite_mode))
}

pub fn print_result_summary(id: &str, result: &ThicknessResult) {
    println!(
        "{}: potential {} after {} iterations, {} of {} streamlines undefined",
        id,
        if result.solution.converged {
            "converged"
        } else {
            "not converged"
        },
        result.solution.iterations,
        result.streamlines.count_undefined(),
        result.streamlines.len()
    );
}
