//! Command line interface for summarizing thickness maps as CSV tables.

use crate::{
    cli::utils as cli_utils,
    exit_on_error, exit_on_false,
    grid::LatticeBoundary,
    io::subjects,
    statistics::{self, ThicknessSummary},
};
use clap::{Arg, ArgMatches, Command};

/// Builds a representation of the `report` command line subcommand.
pub fn create_report_subcommand() -> Command<'static> {
    let command = Command::new("report")
        .about("Tabulate mean thicknesses of the thickness maps in a directory")
        .arg(
            Arg::new("input-dir")
                .value_name("INPUT_DIR")
                .help("Directory containing maps named <ID>_thickness.nii[.gz]")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("totals-file")
                .value_name("TOTALS_CSV")
                .help("Path where the mean thickness of each subject should be written")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::new("slices-file")
                .value_name("SLICES_CSV")
                .help("Path where the mean thickness of each z-slice should be written")
                .required(true)
                .takes_value(true),
        );
    let command = cli_utils::add_overwrite_arguments(command);
    cli_utils::add_verbosity_arguments(command, false)
}

/// Runs the actions for the `report` subcommand using the given arguments.
pub fn run_report_subcommand(arguments: &ArgMatches) {
    let overwrite_mode = cli_utils::overwrite_mode_from_arguments(arguments);
    let verbosity = cli_utils::parse_verbosity(arguments, false);

    let input_dir = cli_utils::get_required_path_argument(arguments, "input-dir");
    let maps = exit_on_error!(
        subjects::discover_thickness_maps(input_dir),
        "Error: Could not scan {0} for thickness maps: {1}",
        input_dir.display()
    );
    exit_on_false!(
        !maps.is_empty(),
        "Error: No thickness maps found in {}",
        input_dir.display()
    );

    let summaries: Vec<_> = maps
        .into_iter()
        .map(|(id, file_path)| {
            let thickness_map = cli_utils::read_scalar_field_or_exit(
                &file_path,
                "thickness",
                LatticeBoundary::default(),
            );
            let summary = ThicknessSummary::from_thickness_map(id, &thickness_map);
            if verbosity.print_messages() {
                match summary.mean {
                    Some(mean) => println!("{}: mean thickness {:.2}", summary.subject, mean),
                    None => println!("{}: no defined thickness values", summary.subject),
                }
            }
            summary
        })
        .collect();

    let totals_file_path = cli_utils::get_required_path_argument(arguments, "totals-file");
    if cli_utils::output_is_writable(totals_file_path, overwrite_mode) {
        exit_on_error!(
            statistics::write_totals_csv(&summaries, totals_file_path),
            "Error: Could not write {0}: {1}",
            totals_file_path.display()
        );
    }
    let slices_file_path = cli_utils::get_required_path_argument(arguments, "slices-file");
    if cli_utils::output_is_writable(slices_file_path, overwrite_mode) {
        exit_on_error!(
            statistics::write_slice_csv(&summaries, slices_file_path),
            "Error: Could not write {0}: {1}",
            slices_file_path.display()
        );
    }
}
