//! Household devices mapped onto bus injections.

use gec_core::ParameterSet;

use super::constraint::{Component, Constraint, ConstraintModule, ConstraintTag};
use super::expr::LinExpr;
use super::variables::VariableSpace;

/// Bus injection = baseload − PV + heat pump, with fixed power factors.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadCouplingModel {
    /// Add the reactive baseload to the bus reactive injection
    pub include_baseload_reactive: bool,
}

impl ConstraintModule for LoadCouplingModel {
    fn component(&self) -> Component {
        Component::Coupling
    }

    fn contribute(&self, vars: &VariableSpace, t: usize, params: &ParameterSet) -> Vec<Constraint> {
        let dev = &params.devices;
        let mut out = Vec::with_capacity(5 * params.n_users());

        for (u, user) in params.users.iter().enumerate() {
            let tag = |name| ConstraintTag::new(Component::Coupling, name).entity(u).at(t);
            let p_pv = vars.p_pv.at(u, t);
            let q_pv = vars.q_pv.at(u, t);
            let p_hp = vars.p_hp.at(u, t);
            let q_hp = vars.q_hp.at(u, t);

            out.push(Constraint::eq(
                tag("bus_p"),
                vars.p.at(user.bus, t),
                p_hp - p_pv + user.baseload_p_mw[t],
            ));
            let mut q_load = q_hp - q_pv;
            if self.include_baseload_reactive {
                q_load.add_constant(user.baseload_q_at(t));
            }
            out.push(Constraint::eq(tag("bus_q"), vars.q.at(user.bus, t), q_load));

            out.push(Constraint::eq(tag("pv_reactive"), q_pv, dev.tan_phi_pv * p_pv));
            out.push(Constraint::eq(tag("hp_reactive"), q_hp, dev.tan_phi_hp * p_hp));
            out.push(Constraint::le(
                tag("pv_limit"),
                p_pv,
                LinExpr::constant(user.pv_capacity_mw * params.weather.pv_availability[t]),
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constraint::ConstraintBody;

    fn bus_q_rhs(include: bool) -> f64 {
        let case = ParameterSet::reference_case(1).truncated(2);
        let topo = case.validate().unwrap();
        let vars = VariableSpace::new(&case, topo, false);
        let model = LoadCouplingModel {
            include_baseload_reactive: include,
        };
        let cons = model.contribute(&vars, 1, &case);
        let bus_q = cons.iter().find(|c| c.tag.name == "bus_q").unwrap();
        match &bus_q.body {
            ConstraintBody::Linear { rhs, .. } => *rhs,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_reactive_baseload_is_optional() {
        assert_eq!(bus_q_rhs(false), 0.0);
        assert!((bus_q_rhs(true) - 1e-4).abs() < 1e-15);
    }

    #[test]
    fn test_pv_limit_follows_availability() {
        let mut case = ParameterSet::reference_case(1).truncated(1);
        case.weather.pv_availability[0] = 0.5;
        let topo = case.validate().unwrap();
        let vars = VariableSpace::new(&case, topo, false);
        let cons = LoadCouplingModel::default().contribute(&vars, 0, &case);
        assert_eq!(cons.len(), 5);
        let limit = cons.iter().find(|c| c.tag.name == "pv_limit").unwrap();
        match &limit.body {
            ConstraintBody::Linear { rhs, .. } => assert!((rhs - 2.5e-3).abs() < 1e-15),
            _ => unreachable!(),
        }
    }
}
