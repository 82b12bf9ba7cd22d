//! Cost function: electricity import, boiler gas, discomfort and slack penalty.

use gec_core::{ParameterSet, SLACK_BUS, STEP_HOURS};

use super::expr::LinExpr;
use super::variables::VariableSpace;

/// The objective and its named parts, kept separately for cost reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub electricity: LinExpr,
    pub gas: LinExpr,
    pub comfort: LinExpr,
    pub slack: LinExpr,
}

impl Objective {
    /// Sum of all parts.
    pub fn total(&self) -> LinExpr {
        self.electricity.clone() + self.gas.clone() + self.comfort.clone() + self.slack.clone()
    }
}

pub struct ObjectiveAssembler;

impl ObjectiveAssembler {
    /// `Σ_t 1000·price_el(t)·(−p_0)·Δt + Σ price_gas(t)·g + Σ comfort_price·PPD`,
    /// plus `penalty · Σ slack` when soft constraints are active.
    pub fn assemble(vars: &VariableSpace, params: &ParameterSet, penalty: Option<f64>) -> Objective {
        let mut electricity = LinExpr::new();
        let mut gas = LinExpr::new();
        let mut comfort = LinExpr::new();
        let mut slack = LinExpr::new();

        for t in 0..params.steps() {
            // p_0 is negative when importing, so the import cost is −p_0
            let price_el = params.prices.electricity_at(t);
            electricity.add_term(vars.p.at(SLACK_BUS, t), -1000.0 * price_el * STEP_HOURS);

            let price_gas = params.prices.gas_at(t);
            for u in 0..params.n_users() {
                gas.add_term(vars.g_boil.at(u, t), price_gas);
                comfort.add_term(vars.ppd.at(u, t), params.prices.comfort_price);
            }
        }

        if let (Some(soft), Some(penalty)) = (&vars.soft, penalty) {
            for grid in [
                &soft.bus_pos,
                &soft.bus_neg,
                &soft.voltage_pos,
                &soft.voltage_neg,
                &soft.line,
            ] {
                for row in 0..grid.rows() {
                    for t in 0..params.steps() {
                        slack.add_term(grid.at(row, t), penalty);
                    }
                }
            }
        }

        Objective {
            electricity,
            gas,
            comfort,
            slack,
        }
    }
}
