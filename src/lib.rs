//! The `cortex_thickness` crate estimates local cortical thickness from
//! segmented brain volumes with the Laplace method.
//!
//! A harmonic potential is relaxed between the white matter and pial
//! boundaries of the cortex, its normalized gradient gives the streamline
//! directions, and the number of Euler steps needed to walk from the pial
//! to the white matter boundary is reported as the thickness.

#[macro_use]
pub mod error;

pub mod backend;
pub mod field;
pub mod geometry;
pub mod gradient;
pub mod grid;
pub mod io;
pub mod laplace;
pub mod morphology;
pub mod num;
pub mod pipeline;
pub mod statistics;
pub mod tracing;

#[cfg(feature = "cli")]
pub mod cli;
