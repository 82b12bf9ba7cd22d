//! Indoor temperature dynamics and the PPD comfort envelope.
//!
//! The RC model balances stored heat against supplied heat and envelope
//! losses over one quarter hour:
//!
//! ```text
//! C·(T[t] − T[t−1]) = 1000·Heat[t]·Δt + (T_amb[t−1] − T[t−1])/R·Δt
//! ```
//!
//! with `T[−1]` the measured indoor temperature and `T_amb[−1] = T_amb[0]`.
//! The state-space variant imposes only the indoor row of `x' = A·x + B·u`
//! with the emission temperature held constant and the envelope temperature
//! taken equal to ambient.

use gec_core::{ParameterSet, ThermalDynamics, STEP_HOURS};

use super::constraint::{Component, Constraint, ConstraintModule, ConstraintTag};
use super::expr::LinExpr;
use super::variables::VariableSpace;

#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalComfortModel;

impl ThermalComfortModel {
    fn dynamics(
        vars: &VariableSpace,
        u: usize,
        t: usize,
        params: &ParameterSet,
    ) -> Constraint {
        let tag = ConstraintTag::new(Component::Thermal, "indoor_dynamics")
            .entity(u)
            .at(t);
        let t_now = vars.t_in.at(u, t);
        let heat_kw = 1000.0 * vars.heat.at(u, t);
        let previous: LinExpr = if t == 0 {
            LinExpr::constant(params.thermal.initial_indoor_c)
        } else {
            vars.t_in.at(u, t - 1).into()
        };
        let ambient = &params.weather.ambient_c;

        match &params.thermal.dynamics {
            ThermalDynamics::Rc {
                capacitance_kwh_per_k,
                resistance_k_per_kw,
            } => {
                let ambient_prev = ambient[t.saturating_sub(1)];
                let stored = *capacitance_kwh_per_k * (t_now - previous.clone());
                let supplied = STEP_HOURS * heat_kw
                    + (STEP_HOURS / resistance_k_per_kw) * (LinExpr::constant(ambient_prev) - previous);
                Constraint::eq(tag, stored, supplied)
            }
            ThermalDynamics::StateSpace {
                a,
                b,
                emission_temp_c,
            } => {
                let amb = ambient[t];
                let solar = params.weather.solar_irradiance[t];
                let rhs = a[0][0] * previous
                    + (a[0][1] * emission_temp_c + a[0][2] * amb + b[0][0] * amb + b[0][2] * solar)
                    + b[0][1] * heat_kw;
                Constraint::eq(tag, t_now, rhs)
            }
        }
    }
}

impl ConstraintModule for ThermalComfortModel {
    fn component(&self) -> Component {
        Component::Thermal
    }

    fn contribute(&self, vars: &VariableSpace, t: usize, params: &ParameterSet) -> Vec<Constraint> {
        let n_seg = params.comfort.len().saturating_sub(1);
        let mut out = Vec::with_capacity(params.n_users() * (1 + n_seg));

        for u in 0..params.n_users() {
            out.push(Self::dynamics(vars, u, t, params));

            // PPD ≥ each segment line; the maximum is the convex envelope
            let ppd = vars.ppd.at(u, t);
            let temp = vars.t_in.at(u, t);
            for (k, seg) in params.comfort.segments().enumerate() {
                let line = seg.slope() * (temp - seg.x0) + seg.y0;
                out.push(Constraint::ge(
                    ConstraintTag::new(Component::Thermal, "ppd_segment")
                        .entity(u)
                        .at(t)
                        .index(k),
                    ppd,
                    line,
                ));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constraint::ConstraintBody;

    fn case_and_vars(state_space: bool) -> (ParameterSet, VariableSpace) {
        let mut case = ParameterSet::reference_case(1).truncated(3);
        if state_space {
            case.thermal.dynamics = ThermalDynamics::reference_state_space();
        }
        let topo = case.validate().unwrap();
        let vars = VariableSpace::new(&case, topo, false);
        (case, vars)
    }

    #[test]
    fn test_rc_first_step_uses_initial_temperature() {
        let (case, vars) = case_and_vars(false);
        let cons = ThermalComfortModel.contribute(&vars, 0, &case);
        assert_eq!(cons.len(), 1 + 4);
        let ConstraintBody::Linear { expr, rhs, .. } = &cons[0].body else {
            panic!("dynamics must be linear");
        };
        let ThermalDynamics::Rc {
            capacitance_kwh_per_k: c,
            resistance_k_per_kw: r,
        } = case.thermal.dynamics
        else {
            unreachable!()
        };
        let t0 = case.thermal.initial_indoor_c;
        let amb = case.weather.ambient_c[0];
        assert!((expr.coefficient(vars.t_in.at(0, 0)) - c).abs() < 1e-12);
        assert!((expr.coefficient(vars.heat.at(0, 0)) + 250.0).abs() < 1e-12);
        // C·T0 + (amb − T0)·Δt/R moved to the right-hand side
        let expected = c * t0 + (amb - t0) * 0.25 / r;
        assert!((rhs - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rc_later_step_links_previous_state() {
        let (case, vars) = case_and_vars(false);
        let cons = ThermalComfortModel.contribute(&vars, 2, &case);
        let ConstraintBody::Linear { expr, .. } = &cons[0].body else {
            panic!("dynamics must be linear");
        };
        assert!(expr.coefficient(vars.t_in.at(0, 1)) < 0.0);
    }

    #[test]
    fn test_state_space_row() {
        let (case, vars) = case_and_vars(true);
        let cons = ThermalComfortModel.contribute(&vars, 1, &case);
        let ConstraintBody::Linear { expr, .. } = &cons[0].body else {
            panic!("dynamics must be linear");
        };
        assert_eq!(expr.coefficient(vars.t_in.at(0, 1)), 1.0);
        assert!((expr.coefficient(vars.t_in.at(0, 0)) + 0.975_423_437_233_804_1).abs() < 1e-12);
    }

    #[test]
    fn test_ppd_segments_at_19_5() {
        let (case, vars) = case_and_vars(false);
        let cons = ThermalComfortModel.contribute(&vars, 0, &case);
        let mut values = vec![0.0; vars.len()];
        values[vars.t_in.at(0, 0).index()] = 19.5;
        values[vars.ppd.at(0, 0).index()] = 11.1;
        for c in cons.iter().filter(|c| c.tag.name == "ppd_segment") {
            assert!(c.violation(&values) < 1e-12, "{} violated", c.tag);
        }
        values[vars.ppd.at(0, 0).index()] = 11.0;
        let first = cons.iter().find(|c| c.tag.index == Some(0)).unwrap();
        assert!((first.violation(&values) - 0.1).abs() < 1e-9);
    }
}
