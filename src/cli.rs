//! Command line interface.

pub mod batch;
pub mod boundaries;
pub mod build;
pub mod completions;
pub mod gradient;
pub mod laplace;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod trace;
pub mod utils;
