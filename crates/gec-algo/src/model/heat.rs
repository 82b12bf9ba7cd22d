//! Hybrid heat supply: heat pump or gas boiler, never both in one step.

use gec_core::{ParameterSet, STEPS_PER_HOUR};

use super::constraint::{Component, Constraint, ConstraintModule, ConstraintTag};
use super::expr::LinExpr;
use super::variables::VariableSpace;

#[derive(Debug, Clone, Copy, Default)]
pub struct HybridHeatSourceModel;

impl ConstraintModule for HybridHeatSourceModel {
    fn component(&self) -> Component {
        Component::HeatSource
    }

    fn contribute(&self, vars: &VariableSpace, t: usize, params: &ParameterSet) -> Vec<Constraint> {
        let dev = &params.devices;
        let mut out = Vec::with_capacity(8 * params.n_users());

        for (u, user) in params.users.iter().enumerate() {
            let tag = |name| ConstraintTag::new(Component::HeatSource, name).entity(u).at(t);
            let own = user.ownership();
            let p_hp = vars.p_hp.at(u, t);
            let b_hp = vars.b_hp.at(u, t);
            let h_hp = vars.h_hp.at(u, t);
            let h_boil = vars.h_boil.at(u, t);
            let g_boil = vars.g_boil.at(u, t);
            let b_boil = vars.b_boil.at(u, t);

            // A household without a heat pump has both bounds at zero
            out.push(Constraint::le(tag("hp_max"), p_hp, dev.hp_max_mw * own * b_hp));
            out.push(Constraint::ge(tag("hp_min"), p_hp, dev.hp_min_mw * own * b_hp));
            out.push(Constraint::eq(tag("hp_heat"), h_hp, dev.cop * p_hp));

            out.push(Constraint::le(tag("boiler_max"), h_boil, dev.boiler_max_mw * b_boil));
            out.push(Constraint::ge(tag("boiler_min"), h_boil, dev.boiler_min_mw * b_boil));
            // 1000·h = 4·LHV·g: kW per MW, quarter-hour steps per hour
            out.push(Constraint::eq(
                tag("boiler_gas"),
                1000.0 * h_boil,
                STEPS_PER_HOUR as f64 * dev.gas_lhv_kwh_per_m3 * g_boil,
            ));

            out.push(Constraint::le(tag("exclusive"), b_hp + b_boil, LinExpr::constant(1.0)));
            out.push(Constraint::eq(tag("total_heat"), vars.heat.at(u, t), h_hp + h_boil));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::constraint::ConstraintBody;

    #[test]
    fn test_ownership_zeroes_heat_pump_bounds() {
        let mut case = ParameterSet::reference_case(2).truncated(1);
        case.users[1].owns_heat_pump = false;
        let topo = case.validate().unwrap();
        let vars = VariableSpace::new(&case, topo, false);
        let cons = HybridHeatSourceModel.contribute(&vars, 0, &case);
        assert_eq!(cons.len(), 16);

        let hp_max = cons
            .iter()
            .find(|c| c.tag.name == "hp_max" && c.tag.entity == Some(1))
            .unwrap();
        let ConstraintBody::Linear { expr, .. } = &hp_max.body else {
            panic!("hp_max must be linear");
        };
        // p_hp ≤ 0·b_hp
        assert_eq!(expr.coefficient(vars.b_hp.at(1, 0)), 0.0);
        assert_eq!(expr.coefficient(vars.p_hp.at(1, 0)), 1.0);
    }

    #[test]
    fn test_gas_conversion_coefficients() {
        let case = ParameterSet::reference_case(1).truncated(1);
        let topo = case.validate().unwrap();
        let vars = VariableSpace::new(&case, topo, false);
        let cons = HybridHeatSourceModel.contribute(&vars, 0, &case);
        let gas = cons.iter().find(|c| c.tag.name == "boiler_gas").unwrap();
        let ConstraintBody::Linear { expr, rhs, .. } = &gas.body else {
            panic!("boiler_gas must be linear");
        };
        assert_eq!(*rhs, 0.0);
        assert_eq!(expr.coefficient(vars.h_boil.at(0, 0)), 1000.0);
        assert!((expr.coefficient(vars.g_boil.at(0, 0)) + 40.64).abs() < 1e-12);
    }
}
