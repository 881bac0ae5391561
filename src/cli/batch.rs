//! Command line interface for processing every subject found in a directory.

use crate::{
    cli::{
        pipeline::{
            add_thickness_pipeline_arguments, construct_thickness_pipeline_config_from_options,
            outputs_are_writable, print_result_summary,
        },
        utils as cli_utils,
    },
    exit_on_error, exit_with_error,
    io::{subjects, utils as io_utils, Verbosity},
    pipeline,
};
use clap::{Arg, ArgMatches, Command};

/// Builds a representation of the `batch` command line subcommand.
pub fn create_batch_subcommand() -> Command<'static> {
    let command = Command::new("batch")
        .about("Compute thickness maps for every subject in a directory")
        .long_about(
            "Compute thickness maps for every subject in a directory.\n\
             A subject consists of a mask named <ID>_cortex.nii[.gz] together with \
             either <ID>_brain.nii[.gz] or both <ID>_wm.nii[.gz] and <ID>_pial.nii[.gz].\n\
             Subjects that fail are reported and skipped.",
        )
        .arg(
            Arg::new("input-dir")
                .value_name("INPUT_DIR")
                .help("Directory containing the subject masks")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("output-dir")
                .value_name("OUTPUT_DIR")
                .help("Directory where the output volumes should be written")
                .required(true)
                .takes_value(true),
        );
    let command = add_thickness_pipeline_arguments(command);
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, true)
}

/// Runs the actions for the `batch` subcommand using the given arguments.
pub fn run_batch_subcommand(arguments: &ArgMatches) {
    let config = construct_thickness_pipeline_config_from_options(arguments);
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, true);

    let input_dir = cli_utils::get_required_path_argument(arguments, "input-dir");
    let output_dir = cli_utils::get_required_path_argument(arguments, "output-dir");

    let discovered = exit_on_error!(
        subjects::discover_subjects(input_dir),
        "Error: Could not scan {0} for subjects: {1}",
        input_dir.display()
    );
    for id in &discovered.incomplete {
        eprintln!("Warning: Skipping subject {} with missing input volumes", id);
    }
    if discovered.complete.is_empty() {
        exit_with_error!("Error: No complete subjects found in {}", input_dir.display());
    }

    exit_on_error!(
        io_utils::create_directory_if_missing(output_dir),
        "Error: Could not create output directory {0}: {1}",
        output_dir.display()
    );

    let n_subjects = discovered.complete.len();
    let mut n_processed = 0;
    let mut n_failed = 0;
    for (subject_idx, subject) in discovered.complete.iter().enumerate() {
        if verbosity.print_messages() {
            println!(
                "Processing subject {} ({}/{})",
                subject.id(),
                subject_idx + 1,
                n_subjects
            );
        }
        let outputs = subject.output_paths(output_dir);
        if !outputs_are_writable(&outputs, overwrite_mode) {
            continue;
        }
        // Per-subject progress bars would interleave with the messages above.
        let subject_verbosity = match verbosity {
            Verbosity::Quiet => Verbosity::Quiet,
            _ => Verbosity::Messages,
        };
        match pipeline::process_subject(subject, &outputs, &config, &subject_verbosity) {
            Ok(result) => {
                n_processed += 1;
                if verbosity.print_messages() {
                    print_result_summary(subject.id(), &result);
                }
            }
            Err(err) => {
                n_failed += 1;
                eprintln!("Error: Could not process subject {}: {}", subject.id(), err);
            }
        }
    }

    if verbosity.print_messages() {
        println!(
            "Processed {} of {} subjects ({} failed, {} incomplete)",
            n_processed,
            n_subjects,
            n_failed,
            discovered.incomplete.len()
        );
    }
}
