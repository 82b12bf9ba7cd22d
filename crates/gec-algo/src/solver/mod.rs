//! Solver abstraction and the bundled clarabel branch-and-bound adapter.
//!
//! A [`SolverAdapter`] takes a finished [`DispatchModel`] and returns a
//! read-only [`SolveOutcome`]. Infeasibility and time limits are *statuses*,
//! not errors: only setup failures and unusable numerics surface as
//! [`SolveError`].

mod branch_and_bound;
pub mod iis;
mod lowering;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ConstraintTag, DispatchModel, VarId};

pub use branch_and_bound::ClarabelBranchAndBound;
pub use iis::IisReport;

/// Interior-point settings used for every relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConicSettings {
    pub max_iter: u32,
    pub tol_feas: f64,
    pub tol_gap: f64,
}

impl Default for ConicSettings {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol_feas: 1e-8,
            tol_gap: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Relative optimality gap at which the search stops
    pub mip_gap: f64,
    pub time_limit: Duration,
    pub verbose: bool,
    /// Upper bound on explored branch-and-bound nodes
    pub max_nodes: usize,
    /// Distance from 0/1 below which a binary counts as integral
    pub integrality_tolerance: f64,
    pub conic: ConicSettings,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mip_gap: 0.05,
            time_limit: Duration::from_secs(600),
            verbose: false,
            max_nodes: 100_000,
            integrality_tolerance: 1e-6,
            conic: ConicSettings::default(),
        }
    }
}

/// Termination status of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Incumbent within the requested gap
    Optimal,
    Infeasible,
    /// Stopped by the time limit; values are present if an incumbent exists
    TimeLimit,
    Other(String),
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::TimeLimit => write!(f, "time limit"),
            SolveStatus::Other(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    /// Assignment indexed by [`VarId::index`]
    pub values: Option<Vec<f64>>,
    pub best_bound: Option<f64>,
    /// Relative gap between incumbent and bound
    pub gap: Option<f64>,
    pub nodes: usize,
    pub runtime: Duration,
}

impl SolveOutcome {
    pub fn has_solution(&self) -> bool {
        self.values.is_some()
    }

    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.as_ref().map(|v| v[var.index()])
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// The backend rejected the problem data or settings
    #[error("solver setup failed: {0}")]
    Setup(String),

    #[error("numerical failure: {0}")]
    Numerical(String),

    /// A solution was requested from an outcome that has none
    #[error("no solution available (status: {0})")]
    NoSolution(SolveStatus),
}

/// Engine that solves a [`DispatchModel`].
pub trait SolverAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn solve(&self, model: &DispatchModel, config: &SolverConfig) -> Result<SolveOutcome, SolveError>;

    /// Irreducible infeasible subset of the constraint descriptors.
    fn compute_iis(&self, model: &DispatchModel, config: &SolverConfig) -> Result<IisReport, SolveError>;
}

/// Incumbent-bound distance that counts as closed whatever the objective scale.
pub const ABSOLUTE_GAP_TOLERANCE: f64 = 1e-6;

/// Relative gap as reported by MIP solvers: `|incumbent − bound| / |incumbent|`.
pub fn relative_gap(incumbent: f64, bound: f64) -> f64 {
    let diff = (incumbent - bound).abs();
    if diff <= 1e-12 {
        0.0
    } else {
        diff / incumbent.abs().max(1e-10)
    }
}

/// Whether `bound` proves `incumbent` to within `mip_gap`.
///
/// Falls back to [`ABSOLUTE_GAP_TOLERANCE`] so an objective near zero can
/// still close.
pub fn gap_closed(incumbent: f64, bound: f64, mip_gap: f64) -> bool {
    (incumbent - bound).abs() <= ABSOLUTE_GAP_TOLERANCE || relative_gap(incumbent, bound) <= mip_gap
}

pub(crate) fn tags_of(model: &DispatchModel, indices: &[usize]) -> Vec<ConstraintTag> {
    indices
        .iter()
        .map(|&i| model.constraints()[i].tag.clone())
        .collect()
}
