//! Branch and bound over the binary switching variables, with clarabel
//! solving every continuous relaxation.
//!
//! Search order: depth-first dives until a first incumbent exists, then
//! best-bound. Branching picks the most fractional binary. A rounding pass
//! at the root tries to seed an incumbent before any branching.

use std::time::Duration;

use tracing::{debug, info, warn};
use web_time::Instant;

use super::iis::{deletion_filter, IisReport};
use super::lowering::{ConicProgram, Relaxation};
use super::{
    gap_closed, relative_gap, SolveError, SolveOutcome, SolveStatus, SolverAdapter, SolverConfig,
};
use crate::model::{DispatchModel, VarId};

/// Bundled adapter: clarabel interior point + branch and bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBranchAndBound;

impl SolverAdapter for ClarabelBranchAndBound {
    fn name(&self) -> &str {
        "clarabel-bnb"
    }

    fn solve(&self, model: &DispatchModel, config: &SolverConfig) -> Result<SolveOutcome, SolveError> {
        let active: Vec<usize> = (0..model.constraints().len()).collect();
        let deadline = Instant::now() + config.time_limit;
        let search = Search::new(model, &active, config, true, deadline);
        let outcome = search.run(false)?;
        info!(
            solver = self.name(),
            status = %outcome.status,
            objective = ?outcome.objective,
            gap = ?outcome.gap,
            nodes = outcome.nodes,
            runtime_ms = outcome.runtime.as_millis() as u64,
            "solve finished"
        );
        Ok(outcome)
    }

    fn compute_iis(&self, model: &DispatchModel, config: &SolverConfig) -> Result<IisReport, SolveError> {
        deletion_filter(model, config)
    }
}

#[derive(Debug, Clone)]
struct Node {
    /// Binaries fixed on the path from the root
    fixings: Vec<(VarId, f64)>,
    /// Relaxation value of the parent
    bound: f64,
}

/// Why the tree search stopped before proving its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Time,
    Nodes,
}

pub(crate) struct Search<'a> {
    model: &'a DispatchModel,
    active: &'a [usize],
    config: &'a SolverConfig,
    with_objective: bool,
    deadline: Instant,
    root_bounds: Vec<(f64, f64)>,
    binaries: Vec<VarId>,
}

impl<'a> Search<'a> {
    pub(crate) fn new(
        model: &'a DispatchModel,
        active: &'a [usize],
        config: &'a SolverConfig,
        with_objective: bool,
        deadline: Instant,
    ) -> Self {
        Self {
            model,
            active,
            config,
            with_objective,
            deadline,
            root_bounds: model.variables().bounds(),
            binaries: model.variables().binaries().collect(),
        }
    }

    fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        (now < self.deadline).then(|| self.deadline - now)
    }

    fn relax(&self, fixings: &[(VarId, f64)]) -> Result<Relaxation, SolveError> {
        let Some(remaining) = self.remaining() else {
            return Ok(Relaxation::TimeLimit);
        };
        let mut bounds = self.root_bounds.clone();
        for &(var, value) in fixings {
            bounds[var.index()] = (value, value);
        }
        let program = ConicProgram::lower(self.model, self.active, &bounds, self.with_objective);
        debug!(rows = program.n_rows(), fixed = fixings.len(), "solving relaxation");
        program.solve(&self.config.conic, self.config.verbose, remaining)
    }

    /// Most fractional binary, if any is outside the integrality tolerance.
    fn branching_candidate(&self, x: &[f64]) -> Option<(VarId, f64)> {
        let tol = self.config.integrality_tolerance;
        self.binaries
            .iter()
            .map(|&var| (var, x[var.index()]))
            .filter(|(_, value)| (value - value.round()).abs() > tol)
            .max_by(|a, b| {
                let fa = (a.1 - 0.5).abs();
                let fb = (b.1 - 0.5).abs();
                fb.total_cmp(&fa)
            })
    }

    fn snap_binaries(&self, x: &mut [f64]) {
        for var in &self.binaries {
            let v = &mut x[var.index()];
            *v = v.round().clamp(0.0, 1.0);
        }
    }

    /// Fix every binary to its rounded relaxation value and re-solve.
    fn rounding_heuristic(&self, x: &[f64]) -> Result<Option<(f64, Vec<f64>)>, SolveError> {
        let fixings: Vec<(VarId, f64)> = self
            .binaries
            .iter()
            .map(|&var| (var, if x[var.index()] > 0.5 { 1.0 } else { 0.0 }))
            .collect();
        match self.relax(&fixings)? {
            Relaxation::Optimal { objective, mut x } => {
                self.snap_binaries(&mut x);
                Ok(Some((objective, x)))
            }
            _ => Ok(None),
        }
    }

    /// Run the tree search. With `first_feasible` the search returns as
    /// soon as any integral point is found.
    pub(crate) fn run(&self, first_feasible: bool) -> Result<SolveOutcome, SolveError> {
        let start = Instant::now();
        let mut open = vec![Node {
            fixings: Vec::new(),
            bound: f64::NEG_INFINITY,
        }];
        let mut incumbent: Option<(f64, Vec<f64>)> = None;
        let mut nodes = 0usize;
        let mut failed_nodes = 0usize;
        // Parent bound of every node whose relaxation failed; those subtrees stay unexplored
        let mut unresolved_bound = f64::INFINITY;
        let mut interrupt: Option<Interrupt> = None;

        loop {
            if let Some((best, _)) = &incumbent {
                let bound = open
                    .iter()
                    .map(|n| n.bound)
                    .fold(best.min(unresolved_bound), f64::min);
                if first_feasible || gap_closed(*best, bound, self.config.mip_gap) {
                    break;
                }
            }

            // Depth-first until an incumbent exists, best-bound afterwards
            let node = if incumbent.is_none() {
                open.pop()
            } else {
                open.iter()
                    .enumerate()
                    .min_by(|a, b| a.1.bound.total_cmp(&b.1.bound))
                    .map(|(idx, _)| idx)
                    .map(|idx| open.swap_remove(idx))
            };
            let Some(node) = node else { break };

            if let Some((best, _)) = &incumbent {
                if node.bound >= *best - 1e-9 * best.abs().max(1.0) {
                    continue;
                }
            }
            if nodes >= self.config.max_nodes {
                open.push(node);
                interrupt = Some(Interrupt::Nodes);
                break;
            }

            nodes += 1;
            let (objective, x) = match self.relax(&node.fixings)? {
                Relaxation::Optimal { objective, x } => (objective, x),
                Relaxation::Infeasible => continue,
                Relaxation::TimeLimit => {
                    open.push(node);
                    interrupt = Some(Interrupt::Time);
                    break;
                }
                Relaxation::Failed(msg) => {
                    warn!(node = nodes, depth = node.fixings.len(), "pruning node: {}", msg);
                    failed_nodes += 1;
                    unresolved_bound = unresolved_bound.min(node.bound);
                    continue;
                }
            };

            if let Some((best, _)) = &incumbent {
                if objective >= *best {
                    continue;
                }
            }

            match self.branching_candidate(&x) {
                None => {
                    let mut x = x;
                    self.snap_binaries(&mut x);
                    debug!(node = nodes, objective, "new incumbent");
                    incumbent = Some((objective, x));
                }
                Some((var, value)) => {
                    if nodes == 1 && incumbent.is_none() && !first_feasible {
                        if let Some((obj, xr)) = self.rounding_heuristic(&x)? {
                            debug!(objective = obj, "rounding heuristic found incumbent");
                            incumbent = Some((obj, xr));
                        }
                    }
                    let child = |fix: f64| {
                        let mut fixings = node.fixings.clone();
                        fixings.push((var, fix));
                        Node {
                            fixings,
                            bound: objective,
                        }
                    };
                    // The side closer to the relaxation value is explored first
                    if value >= 0.5 {
                        open.push(child(0.0));
                        open.push(child(1.0));
                    } else {
                        open.push(child(1.0));
                        open.push(child(0.0));
                    }
                }
            }

            if nodes % 100 == 0 {
                debug!(
                    nodes,
                    open = open.len(),
                    incumbent = ?incumbent.as_ref().map(|(o, _)| *o),
                    "branch and bound progress"
                );
            }
        }

        let open_bound = open.iter().map(|n| n.bound).fold(unresolved_bound, f64::min);
        Ok(self.finish(incumbent, open_bound, failed_nodes, interrupt, nodes, start.elapsed()))
    }

    /// Turn the state the search stopped in into an outcome.
    ///
    /// `open_bound` covers open nodes and nodes whose relaxation failed.
    fn finish(
        &self,
        incumbent: Option<(f64, Vec<f64>)>,
        open_bound: f64,
        failed_nodes: usize,
        interrupt: Option<Interrupt>,
        nodes: usize,
        runtime: Duration,
    ) -> SolveOutcome {
        match incumbent {
            Some((objective, values)) => {
                let bound = open_bound.min(objective);
                let closed = gap_closed(objective, bound, self.config.mip_gap);
                let status = match interrupt {
                    Some(Interrupt::Time) => SolveStatus::TimeLimit,
                    _ if closed => SolveStatus::Optimal,
                    _ if failed_nodes > 0 => SolveStatus::Other(format!(
                        "gap not proven; {} node relaxations failed numerically",
                        failed_nodes
                    )),
                    Some(Interrupt::Nodes) => SolveStatus::Other("node limit reached".to_string()),
                    // Queue exhausted means every subtree was resolved
                    None => SolveStatus::Optimal,
                };
                SolveOutcome {
                    status,
                    objective: Some(objective),
                    values: Some(values),
                    best_bound: bound.is_finite().then_some(bound),
                    gap: bound.is_finite().then(|| relative_gap(objective, bound)),
                    nodes,
                    runtime,
                }
            }
            None => {
                let status = match interrupt {
                    Some(Interrupt::Time) => SolveStatus::TimeLimit,
                    Some(Interrupt::Nodes) => SolveStatus::Other("node limit reached".to_string()),
                    None if failed_nodes > 0 => SolveStatus::Other(format!(
                        "no solution found; {} node relaxations failed numerically",
                        failed_nodes
                    )),
                    None => SolveStatus::Infeasible,
                };
                SolveOutcome {
                    status,
                    objective: None,
                    values: None,
                    best_bound: None,
                    gap: None,
                    nodes,
                    runtime,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FormulationOptions;
    use gec_core::{ComfortBreakpoints, ParameterSet};

    /// Heating need far below both device minimums, so the relaxation
    /// switches devices on fractionally.
    fn switching_case(steps: usize) -> ParameterSet {
        let mut case = ParameterSet::reference_case(1).truncated(steps);
        case.devices.hp_min_mw = 4.9e-3;
        case.devices.boiler_min_mw = 14e-3;
        case.weather.ambient_c = vec![20.0; steps];
        case.thermal.initial_indoor_c = 21.0;
        case.prices.comfort_price = 5.0;
        case.comfort = ComfortBreakpoints::new(
            vec![19.0, 20.0, 21.0, 22.0, 23.0],
            vec![12.0, 8.0, 5.0, 8.0, 12.0],
        )
        .unwrap();
        case
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(600)
    }

    #[test]
    fn test_branching_picks_most_fractional() {
        let case = ParameterSet::reference_case(1).truncated(2);
        let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
        let config = SolverConfig::default();
        let active: Vec<usize> = Vec::new();
        let search = Search::new(&model, &active, &config, true, Instant::now());

        let vars = model.variables();
        let mut x = vec![0.0; vars.len()];
        x[vars.b_hp.at(0, 0).index()] = 0.9;
        x[vars.b_boil.at(0, 1).index()] = 0.45;
        let (var, value) = search.branching_candidate(&x).unwrap();
        assert_eq!(var, vars.b_boil.at(0, 1));
        assert_eq!(value, 0.45);

        x[vars.b_boil.at(0, 1).index()] = 1.0;
        x[vars.b_hp.at(0, 0).index()] = 1.0;
        assert!(search.branching_candidate(&x).is_none());
    }

    #[test]
    fn test_expired_deadline_reports_time_limit() {
        let case = ParameterSet::reference_case(1).truncated(2);
        let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
        let config = SolverConfig::default();
        let active: Vec<usize> = (0..model.constraints().len()).collect();
        let search = Search::new(&model, &active, &config, true, Instant::now());
        let outcome = search.run(false).unwrap();
        assert_eq!(outcome.status, SolveStatus::TimeLimit);
        assert!(!outcome.has_solution());
    }

    #[test]
    fn test_tree_search_matches_enumeration() {
        let case = switching_case(4);
        let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
        let config = SolverConfig {
            mip_gap: 0.0,
            ..SolverConfig::default()
        };
        let active: Vec<usize> = (0..model.constraints().len()).collect();
        let search = Search::new(&model, &active, &config, true, far_deadline());

        let binaries = search.binaries.clone();
        assert_eq!(binaries.len(), 8);
        let mut best = f64::INFINITY;
        for mask in 0u32..(1 << binaries.len()) {
            let fixings: Vec<(VarId, f64)> = binaries
                .iter()
                .enumerate()
                .map(|(bit, &var)| (var, f64::from((mask >> bit) & 1)))
                .collect();
            if let Relaxation::Optimal { objective, .. } = search.relax(&fixings).unwrap() {
                best = best.min(objective);
            }
        }
        assert!(best.is_finite());

        let outcome = search.run(false).unwrap();
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!(outcome.nodes > 1, "root relaxation was already integral");
        let objective = outcome.objective.unwrap();
        assert!(
            (objective - best).abs() <= 1e-5 * best.abs().max(1.0),
            "tree search {objective} vs enumeration {best}"
        );
    }

    #[test]
    fn test_failed_root_relaxation_is_not_infeasible() {
        let case = switching_case(2);
        let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
        let mut config = SolverConfig::default();
        config.conic.max_iter = 1;
        let active: Vec<usize> = (0..model.constraints().len()).collect();
        let outcome = Search::new(&model, &active, &config, true, far_deadline())
            .run(false)
            .unwrap();
        assert!(!outcome.has_solution());
        match outcome.status {
            SolveStatus::Other(msg) => assert!(msg.contains("failed"), "{msg}"),
            other => panic!("unexpected status {other}"),
        }
    }

    #[test]
    fn test_failed_subtree_keeps_its_bound() {
        let case = ParameterSet::reference_case(1).truncated(1);
        let model = DispatchModel::build(&case, FormulationOptions::default()).unwrap();
        let config = SolverConfig::default();
        let active: Vec<usize> = Vec::new();
        let search = Search::new(&model, &active, &config, true, far_deadline());

        // A child of a root with bound 90 failed after the incumbent reached 100
        let outcome = search.finish(Some((100.0, vec![0.0])), 90.0, 1, None, 3, Duration::ZERO);
        assert!(matches!(&outcome.status, SolveStatus::Other(msg) if msg.contains("1 node relaxations failed")));
        assert_eq!(outcome.best_bound, Some(90.0));
        assert!((outcome.gap.unwrap() - 0.1).abs() < 1e-12);
        assert!(outcome.has_solution());

        // The same failure inside the requested gap still proves the incumbent
        let outcome = search.finish(Some((100.0, vec![0.0])), 99.0, 1, None, 3, Duration::ZERO);
        assert_eq!(outcome.status, SolveStatus::Optimal);

        let outcome = search.finish(Some((100.0, vec![0.0])), 90.0, 0, Some(Interrupt::Nodes), 3, Duration::ZERO);
        assert_eq!(outcome.status, SolveStatus::Other("node limit reached".to_string()));
    }
}
