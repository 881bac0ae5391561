//! Function for building the command line hierarchy.

use super::{
    batch::create_batch_subcommand, boundaries::create_boundaries_subcommand,
    completions::create_completions_subcommand, gradient::create_gradient_subcommand,
    laplace::create_laplace_subcommand, pipeline::create_pipeline_subcommand,
    report::create_report_subcommand, trace::create_trace_subcommand,
};
use clap::{self, Arg, Command};

/// Build the `cortex_thickness` command line hierarchy.
pub fn build() -> Command<'static> {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("timing")
                .short('t')
                .long("timing")
                .help("Display elapsed time when done"),
        )
        .subcommand(create_boundaries_subcommand())
        .subcommand(create_laplace_subcommand())
        .subcommand(create_gradient_subcommand())
        .subcommand(create_trace_subcommand())
        .subcommand(create_pipeline_subcommand())
        .subcommand(create_batch_subcommand())
        .subcommand(create_report_subcommand())
        .subcommand(create_completions_subcommand())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn command_hierarchy_is_consistent() {
        build().debug_assert();
    }
}
