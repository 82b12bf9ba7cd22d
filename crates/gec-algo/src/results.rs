//! Solved values mapped back onto buses, lines and households.

use gec_core::{Diagnostics, ParameterSet, SLACK_BUS};
use serde::Serialize;
use tracing::warn;

use crate::model::{ConstraintBody, DispatchModel};
use crate::solver::{SolveError, SolveOutcome, SolveStatus};

/// Relative cone gap above which a branch is reported as not tight.
pub const SOC_TIGHTNESS_TOLERANCE: f64 = 1e-3;

/// Binary values above this count as "on".
const ON_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct BusSeries {
    pub bus: usize,
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    /// Squared voltage in kV²
    pub v: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineSeries {
    pub line: usize,
    pub from: usize,
    pub to: usize,
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    /// Squared current in kA²
    pub l: Vec<f64>,
    /// Active loss `R·l` in MW
    pub loss: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSeries {
    pub user: usize,
    pub bus: usize,
    pub hp_power: Vec<f64>,
    pub hp_on: Vec<bool>,
    pub boiler_heat: Vec<f64>,
    pub boiler_gas: Vec<f64>,
    pub boiler_on: Vec<bool>,
    pub pv_output: Vec<f64>,
    /// Available PV minus dispatched PV
    pub pv_curtailed: Vec<f64>,
    pub indoor_temp: Vec<f64>,
    pub heat: Vec<f64>,
    pub ppd: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub electricity: f64,
    pub gas: f64,
    pub comfort: f64,
    pub slack: f64,
    pub total: f64,
}

/// Branch cone check at one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SocCheck {
    pub line: usize,
    pub t: usize,
    /// `P² + Q²`
    pub flow_sq: f64,
    /// `l · v_parent`
    pub product: f64,
    /// `1 − sqrt(flow_sq / product)`, 0 when tight
    pub relative_gap: f64,
}

impl SocCheck {
    pub fn is_tight(&self, tolerance: f64) -> bool {
        self.relative_gap <= tolerance
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub status: SolveStatus,
    pub runtime_ms: u128,
    pub gap: Option<f64>,
    pub objective: f64,
    pub costs: CostBreakdown,
    pub buses: Vec<BusSeries>,
    pub lines: Vec<LineSeries>,
    pub users: Vec<UserSeries>,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
}

impl DispatchResult {
    /// Read solution values back into per-entity series.
    ///
    /// Fails with [`SolveError::NoSolution`] when the outcome carries no
    /// values (infeasible, or time limit without incumbent).
    pub fn extract(
        model: &DispatchModel,
        params: &ParameterSet,
        outcome: &SolveOutcome,
    ) -> Result<Self, SolveError> {
        let values = outcome
            .values
            .as_deref()
            .ok_or_else(|| SolveError::NoSolution(outcome.status.clone()))?;
        let vars = model.variables();
        let topo = vars.topology();
        let steps = vars.steps();

        let buses = (0..topo.n_bus())
            .map(|bus| BusSeries {
                bus,
                p: vars.p.series(bus, values),
                q: vars.q.series(bus, values),
                v: vars.v.series(bus, values),
            })
            .collect();

        let lines = topo
            .lines()
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let l = vars.l.series(i, values);
                LineSeries {
                    line: i,
                    from: line.start_node,
                    to: line.end_node,
                    p: vars.p_line.series(i, values),
                    q: vars.q_line.series(i, values),
                    loss: l.iter().map(|x| line.r_ohm * x).collect(),
                    l,
                }
            })
            .collect();

        let on = |series: Vec<f64>| series.into_iter().map(|x| x > ON_THRESHOLD).collect();
        let users = params
            .users
            .iter()
            .enumerate()
            .map(|(u, user)| {
                let pv_output = vars.p_pv.series(u, values);
                let pv_curtailed = pv_output
                    .iter()
                    .enumerate()
                    .map(|(t, p)| {
                        (user.pv_capacity_mw * params.weather.pv_availability[t] - p).max(0.0)
                    })
                    .collect();
                UserSeries {
                    user: u,
                    bus: user.bus,
                    hp_power: vars.p_hp.series(u, values),
                    hp_on: on(vars.b_hp.series(u, values)),
                    boiler_heat: vars.h_boil.series(u, values),
                    boiler_gas: vars.g_boil.series(u, values),
                    boiler_on: on(vars.b_boil.series(u, values)),
                    pv_output,
                    pv_curtailed,
                    indoor_temp: vars.t_in.series(u, values),
                    heat: vars.heat.series(u, values),
                    ppd: vars.ppd.series(u, values),
                }
            })
            .collect();

        let objective = model.objective();
        let mut costs = CostBreakdown {
            electricity: objective.electricity.evaluate(values),
            gas: objective.gas.evaluate(values),
            comfort: objective.comfort.evaluate(values),
            slack: objective.slack.evaluate(values),
            total: 0.0,
        };
        costs.total = costs.electricity + costs.gas + costs.comfort + costs.slack;

        let mut diagnostics = model.diagnostics().clone();
        for check in soc_tightness(model, values) {
            if !check.is_tight(SOC_TIGHTNESS_TOLERANCE) {
                warn!(
                    line = check.line,
                    t = check.t,
                    gap = check.relative_gap,
                    "branch cone is not tight"
                );
                diagnostics.loose_cone(check.line, check.t, check.relative_gap);
            }
        }
        debug_assert_eq!(steps, params.steps());

        Ok(Self {
            status: outcome.status.clone(),
            runtime_ms: outcome.runtime.as_millis(),
            gap: outcome.gap,
            objective: outcome.objective.unwrap_or(costs.total),
            costs,
            buses,
            lines,
            users,
            diagnostics,
        })
    }

    /// Import at the transformer, `−p_0`, per step.
    pub fn grid_import(&self) -> Vec<f64> {
        self.buses[SLACK_BUS].p.iter().map(|p| -p).collect()
    }

    /// `p_0 + Σ_{j≠0} p_j + Σ R·l` per step; zero when power is conserved.
    pub fn radial_balance_residual(&self) -> Vec<f64> {
        let steps = self.buses[SLACK_BUS].p.len();
        (0..steps)
            .map(|t| {
                let injections: f64 = self.buses.iter().map(|b| b.p[t]).sum();
                let losses: f64 = self.lines.iter().map(|l| l.loss[t]).sum();
                injections + losses
            })
            .collect()
    }
}

/// Compare `P² + Q²` against `l · v_parent` for every branch cone.
pub fn soc_tightness(model: &DispatchModel, values: &[f64]) -> Vec<SocCheck> {
    model
        .constraints()
        .iter()
        .filter(|c| c.tag.name == "branch_cone")
        .filter_map(|c| match &c.body {
            ConstraintBody::RotatedCone { terms, y, z } => {
                let flow_sq: f64 = terms.iter().map(|e| e.evaluate(values).powi(2)).sum();
                let product = y.evaluate(values) * z.evaluate(values);
                let relative_gap = if product <= f64::EPSILON {
                    0.0
                } else {
                    (1.0 - (flow_sq / product).sqrt()).max(0.0)
                };
                Some(SocCheck {
                    line: c.tag.entity.unwrap_or(0),
                    t: c.tag.time.unwrap_or(0),
                    flow_sq,
                    product,
                    relative_gap,
                })
            }
            _ => None,
        })
        .collect()
}
