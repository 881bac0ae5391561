//! Error types and error reporting macros.

use crate::geometry::In3D;
use std::{error, fmt, io};

#[cfg(not(feature = "for-testing"))]
#[macro_export]
macro_rules! exit_with_error {
    ($($print_arg:tt)*) => {{
        eprintln!($($print_arg)*);
        quit::with_code(1);
    }};
}

#[cfg(feature = "for-testing")]
#[macro_export]
macro_rules! exit_with_error {
    ($($print_arg:tt)*) => {{
        panic!($($print_arg)*);
    }};
}

#[macro_export]
macro_rules! exit_on_error {
    ($result:expr, $($print_arg:tt)*) => {
        match $result {
            Ok(value) => value,
            Err(err) => {
                $crate::exit_with_error!($($print_arg)*, err)
            }
        }
    };
}

#[macro_export]
macro_rules! exit_on_false {
    ($logic:expr, $($print_arg:tt)*) => {
        if $logic {
            true
        } else {
            $crate::exit_with_error!($($print_arg)*)
        }
    };
}

#[macro_export]
macro_rules! exit_on_none {
    ($option:expr, $($print_arg:tt)*) => {
        $option.unwrap_or_else(|| $crate::exit_with_error!($($print_arg)*))
    };
}

/// Violation of the lattice preconditions shared by all pipeline stages.
#[derive(Clone, Debug, PartialEq)]
pub enum LatticeError {
    /// Two inputs that must live on the same lattice disagree in shape.
    ShapeMismatch {
        quantity: String,
        expected: In3D<usize>,
        found: In3D<usize>,
    },
    /// Some voxels are flagged as both inner and outer boundary.
    OverlappingBoundaries { count: usize },
}

impl LatticeError {
    /// Returns an error if the found shape differs from the expected one.
    pub fn check_shape(
        quantity: &str,
        expected: &In3D<usize>,
        found: &In3D<usize>,
    ) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                quantity: quantity.to_string(),
                expected: expected.clone(),
                found: found.clone(),
            })
        }
    }
}

impl fmt::Display for LatticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                quantity,
                expected,
                found,
            } => write!(
                f,
                "Shape of {} is {}, but the lattice has shape {}",
                quantity, found, expected
            ),
            Self::OverlappingBoundaries { count } => write!(
                f,
                "{} voxel{} belong to both the inner and the outer boundary",
                count,
                if *count == 1 { "" } else { "s" }
            ),
        }
    }
}

impl error::Error for LatticeError {}

/// Failure while processing a single subject.
#[derive(Debug)]
pub enum PipelineError {
    Lattice(LatticeError),
    Io(io::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lattice(err) => write!(f, "Invalid input volumes: {}", err),
            Self::Io(err) => write!(f, "I/O failure: {}", err),
        }
    }
}

impl error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Lattice(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<LatticeError> for PipelineError {
    fn from(err: LatticeError) -> Self {
        Self::Lattice(err)
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
