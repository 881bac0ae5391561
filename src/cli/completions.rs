//! Command line interface for generating a command line completion script.

use super::build;
use crate::exit_on_error;
use clap::{Arg, ArgMatches, Command};
use clap_complete::Shell;
use std::io;

/// Creates a subcommand for printing a tab-completion script.
pub fn create_completions_subcommand() -> Command<'static> {
    Command::new("completions")
        .about("Generate tab-completion script for your shell")
        .hide(true)
        .arg(
            Arg::new("shell")
                .value_name("SHELL")
                .required(true)
                .takes_value(true)
                .possible_values(["bash", "zsh", "fish"])
                .help("The shell to generate the script for"),
        )
        .after_help(
            r#"DISCUSSION
    The script is output on `stdout`, allowing one to re-direct the
    output to the file of their choosing.

    BASH:

        $ mkdir -p ~/.local/share/bash-completion/completions
        $ cortex_thickness completions bash >> ~/.local/share/bash-completion/completions/cortex_thickness

    ZSH (with `fpath+=~/.zfunc` in `.zshrc` before `compinit`):

        $ cortex_thickness completions zsh > ~/.zfunc/_cortex_thickness

    FISH:

        $ mkdir -p ~/.config/fish/completions
        $ cortex_thickness completions fish > ~/.config/fish/completions/cortex_thickness.fish

    You may have to log out and log back in to your shell session for
    the changes to take affect."#,
        )
}

/// Runs the actions for the `completions` subcommand using the given arguments.
pub fn run_completions_subcommand(arguments: &ArgMatches) {
    let shell: Shell = exit_on_error!(
        arguments
            .value_of("shell")
            .expect("No value for required argument")
            .parse(),
        "Error: Invalid shell: {}"
    );
    let mut command = build::build();
    clap_complete::generate(shell, &mut command, clap::crate_name!(), &mut io::stdout());
}
