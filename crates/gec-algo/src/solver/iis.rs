//! Irreducible infeasible subsets by deletion filtering.
//!
//! Each constraint descriptor is dropped in turn; if the remainder is still
//! infeasible the constraint is discarded for good, otherwise it is kept.
//! What survives is infeasible, and removing any single member makes it
//! feasible. Variable bounds stay in every check.
//!
//! When the continuous relaxation is already infeasible the checks solve
//! relaxations only. Otherwise the infeasibility comes from the binaries and
//! every check is a feasibility tree search.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use web_time::Instant;

use super::branch_and_bound::Search;
use super::lowering::{ConicProgram, Relaxation};
use super::{tags_of, SolveError, SolveStatus, SolverConfig};
use crate::model::{ConstraintTag, DispatchModel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IisReport {
    /// Tags of the irreducible subset
    pub constraints: Vec<ConstraintTag>,
    /// False when the full model turned out to be feasible
    pub model_infeasible: bool,
    /// The filter ran on the continuous relaxation
    pub on_relaxation: bool,
    /// Every check finished inside the time budget
    pub complete: bool,
    pub checks: usize,
    pub runtime: Duration,
}

impl IisReport {
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constraints.iter().any(|tag| tag.name == name)
    }
}

struct Checker<'a> {
    model: &'a DispatchModel,
    config: &'a SolverConfig,
    deadline: Instant,
    on_relaxation: bool,
}

impl Checker<'_> {
    /// `Some(true)` when `subset` is infeasible, `None` when undecided.
    fn is_infeasible(&self, subset: &[usize]) -> Result<Option<bool>, SolveError> {
        let now = Instant::now();
        if now >= self.deadline {
            return Ok(None);
        }
        if self.on_relaxation {
            let bounds = self.model.variables().bounds();
            let program = ConicProgram::lower(self.model, subset, &bounds, false);
            Ok(
                match program.solve(&self.config.conic, false, self.deadline - now)? {
                    Relaxation::Infeasible => Some(true),
                    Relaxation::Optimal { .. } => Some(false),
                    Relaxation::TimeLimit | Relaxation::Failed(_) => None,
                },
            )
        } else {
            let outcome = Search::new(self.model, subset, self.config, false, self.deadline).run(true)?;
            Ok(match outcome.status {
                SolveStatus::Infeasible => Some(true),
                _ if outcome.has_solution() => Some(false),
                _ => None,
            })
        }
    }
}

pub(crate) fn deletion_filter(model: &DispatchModel, config: &SolverConfig) -> Result<IisReport, SolveError> {
    let start = Instant::now();
    let all: Vec<usize> = (0..model.constraints().len()).collect();
    let mut checker = Checker {
        model,
        config,
        deadline: start + config.time_limit,
        on_relaxation: true,
    };

    let report = |constraints: Vec<ConstraintTag>, model_infeasible, on_relaxation, complete, checks| IisReport {
        constraints,
        model_infeasible,
        on_relaxation,
        complete,
        checks,
        runtime: start.elapsed(),
    };

    match checker.is_infeasible(&all)? {
        Some(true) => {}
        Some(false) => {
            checker.on_relaxation = false;
            match checker.is_infeasible(&all)? {
                Some(true) => {}
                Some(false) => return Ok(report(Vec::new(), false, false, true, 2)),
                None => return Ok(report(Vec::new(), false, false, false, 2)),
            }
        }
        None => return Ok(report(Vec::new(), false, true, false, 1)),
    }

    let mut kept = all;
    let mut pos = 0;
    let mut checks = 0;
    let mut complete = true;
    while pos < kept.len() {
        let candidate: Vec<usize> = kept
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != pos)
            .map(|(_, &i)| i)
            .collect();
        checks += 1;
        match checker.is_infeasible(&candidate)? {
            Some(true) => kept = candidate,
            Some(false) => pos += 1,
            None => {
                complete = false;
                if Instant::now() >= checker.deadline {
                    warn!(remaining = kept.len() - pos, "IIS time budget exhausted");
                    break;
                }
                pos += 1;
            }
        }
    }

    info!(
        size = kept.len(),
        checks,
        complete,
        on_relaxation = checker.on_relaxation,
        "computed irreducible infeasible subset"
    );
    Ok(report(
        tags_of(model, &kept),
        true,
        checker.on_relaxation,
        complete,
        checks,
    ))
}
