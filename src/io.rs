//! File input/output.

pub mod nifti;
pub mod subjects;
pub mod utils;

use indicatif::{ProgressBar, ProgressStyle};

/// How much non-critical status information to report.
#[derive(Clone, Debug)]
pub enum Verbosity {
    Quiet,
    Messages,
    Progress(ProgressStyle),
}

impl Verbosity {
    /// Whether status messages should be printed.
    pub fn print_messages(&self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Creates a progress bar for the given number of steps, which is
    /// hidden unless progress reporting is enabled.
    pub fn create_progress_bar(&self, n_steps: usize) -> ProgressBar {
        match self {
            Self::Progress(style) => {
                let progress_bar = ProgressBar::new(n_steps as u64);
                progress_bar.set_style(style.clone());
                progress_bar
            }
            _ => ProgressBar::hidden(),
        }
    }
}

/// What to do when an output file already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwriteMode {
    Ask,
    Always,
    Never,
}
