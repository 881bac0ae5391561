//! Function for running the command line program.

use super::{
    batch::run_batch_subcommand, boundaries::run_boundaries_subcommand, build,
    completions::run_completions_subcommand, gradient::run_gradient_subcommand,
    laplace::run_laplace_subcommand, pipeline::run_pipeline_subcommand,
    report::run_report_subcommand, trace::run_trace_subcommand,
};
use clap::ArgMatches;
use std::time::Instant;

/// Runs the `cortex_thickness` command line program.
pub fn run() {
    run_with_args(build::build().get_matches());
}

/// Runs the `cortex_thickness` command line program with the given parsed arguments.
pub fn run_with_args(arguments: ArgMatches) {
    let start_instant = Instant::now();

    match arguments.subcommand() {
        Some(("boundaries", subcommand_arguments)) => {
            run_boundaries_subcommand(subcommand_arguments)
        }
        Some(("laplace", subcommand_arguments)) => run_laplace_subcommand(subcommand_arguments),
        Some(("gradient", subcommand_arguments)) => run_gradient_subcommand(subcommand_arguments),
        Some(("trace", subcommand_arguments)) => run_trace_subcommand(subcommand_arguments),
        Some(("pipeline", subcommand_arguments)) => run_pipeline_subcommand(subcommand_arguments),
        Some(("batch", subcommand_arguments)) => run_batch_subcommand(subcommand_arguments),
        Some(("report", subcommand_arguments)) => run_report_subcommand(subcommand_arguments),
        Some(("completions", subcommand_arguments)) => {
            run_completions_subcommand(subcommand_arguments)
        }
        _ => unreachable!("Subcommand is required"),
    }

    if arguments.is_present("timing") {
        println!("Elapsed time: {} s", start_instant.elapsed().as_secs_f64());
    }
}
