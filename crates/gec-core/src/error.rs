//! Error types shared across the GEC crates.
//!
//! [`ValidationError`] is raised by [`crate::ParameterSet::validate`] before a
//! model is ever built, so malformed inputs never reach a solver. [`GecError`]
//! is what the parameter loader returns: a file that cannot be read, parsed
//! or validated.
//!
//! # Example
//!
//! ```ignore
//! use gec_core::{GecError, GecResult};
//!
//! fn prepare(path: &str) -> GecResult<()> {
//!     let params = load_parameters(path)?;
//!     params.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Input data that cannot produce a well-defined dispatch model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Horizon must contain at least one time step
    #[error("horizon has no time steps")]
    EmptyHorizon,

    /// Line count does not match a tree over the declared buses
    #[error("topology is not a tree: {0}")]
    NotATree(String),

    /// A bus is the end node of more than one line
    #[error("bus {bus} has more than one parent line (lines {first} and {second})")]
    MultipleParents {
        bus: usize,
        first: usize,
        second: usize,
    },

    /// The slack bus may not be fed by any line
    #[error("slack bus 0 is the end node of line {line}")]
    RootHasParent { line: usize },

    /// A bus cannot be reached from the slack bus (cycle or disconnected branch)
    #[error("bus {bus} is not reachable from the slack bus")]
    Unreachable { bus: usize },

    /// A line references a bus index outside `0..n_bus`
    #[error("line {line} references bus {bus} outside 0..{n_bus}")]
    BusOutOfRange { line: usize, bus: usize, n_bus: usize },

    /// A user sits on the slack bus or outside the network
    #[error("user {user} is connected to invalid bus {bus}")]
    UserBus { user: usize, bus: usize },

    /// Two users share one connection point
    #[error("users {first} and {second} are both connected to bus {bus}")]
    DuplicateUserBus {
        bus: usize,
        first: usize,
        second: usize,
    },

    /// Comfort breakpoints need strictly increasing temperatures
    #[error("comfort breakpoint temperatures must be strictly increasing (index {index})")]
    BreakpointsNotIncreasing { index: usize },

    /// At least one segment is required for the comfort envelope
    #[error("comfort envelope needs at least two breakpoints, got {0}")]
    TooFewBreakpoints(usize),

    /// A device or network rating is missing, non-finite or inconsistent
    #[error("invalid rating `{name}`: {reason}")]
    InvalidRating { name: String, reason: String },

    /// A time series does not cover the horizon
    #[error("series `{name}` has {actual} entries, expected {expected}")]
    SeriesLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Comfort penalty must be non-negative for the envelope to be exact
    #[error("comfort price must be non-negative, got {0}")]
    NegativeComfortPrice(f64),

    /// Congestion window lies outside the horizon or is reversed
    #[error("congestion window {start}..{end} is invalid for a horizon of {steps} steps")]
    CongestionWindow {
        start: usize,
        end: usize,
        steps: usize,
    },
}

/// Unified error type for GEC operations.
#[derive(Error, Debug)]
pub enum GecError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Convenience type alias for Results using GecError.
pub type GecResult<T> = Result<T, GecError>;

impl From<serde_json::Error> for GecError {
    fn from(err: serde_json::Error) -> Self {
        GecError::Parse(err.to_string())
    }
}
