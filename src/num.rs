//! Utilities related to numbers.

use ieee754;
use num;
use std::fmt;

/// Floating point marker trait for easier control over trait bounds.
pub trait BFloat:
    Sync + Send + num::Float + num::cast::FromPrimitive + ieee754::Ieee754 + fmt::Debug
{
}

impl BFloat for f32 {}
impl BFloat for f64 {}

/// Casts a value of one floating point type to another.
///
/// Both types are IEEE floats, so the cast can not fail.
pub fn cast_float<F: BFloat, G: BFloat>(value: F) -> G {
    G::from(value).unwrap_or_else(G::nan)
}
