//! DistFlow branch-flow model with second-order cone relaxation.
//!
//! Variables per step: squared voltage `v` and net injection `p, q` per bus
//! (positive = consumption), sending-end flow `P, Q` and squared current `l`
//! per line. Line `i` runs from its parent bus `s(i)` to child `e(i)`:
//!
//! ```text
//! p_j = Σ_{i: e(i)=j} (P_i − R_i·l_i) − Σ_{i: s(i)=j} P_i        (same for q, X)
//! v_e = v_s − 2(R·P + X·Q) + (R² + X²)·l
//! P² + Q² ≤ l · v_s                                            (rotated cone)
//! l ≤ I_nom²
//! v_0 = v_ref²,  p_0 ≥ congestion(t),  ‖(p_0, q_0)‖ ≤ S_trafo
//! ```
//!
//! On radial networks with costs increasing in losses the relaxation is
//! tight at the optimum; [`crate::results::soc_tightness`] reports where it is not.

use gec_core::{ParameterSet, SLACK_BUS};

use super::constraint::{Component, Constraint, ConstraintModule, ConstraintTag};
use super::expr::LinExpr;
use super::variables::VariableSpace;

/// Power flow, voltage and transformer limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkFlowModel;

impl NetworkFlowModel {
    fn tag(name: &'static str, t: usize) -> ConstraintTag {
        ConstraintTag::new(Component::Network, name).at(t)
    }
}

impl ConstraintModule for NetworkFlowModel {
    fn component(&self) -> Component {
        Component::Network
    }

    fn contribute(&self, vars: &VariableSpace, t: usize, params: &ParameterSet) -> Vec<Constraint> {
        let topo = vars.topology();
        let net = &params.network;
        let mut out = Vec::with_capacity(4 + 3 * topo.n_bus() + 3 * topo.n_lines());

        let p0 = vars.p.at(SLACK_BUS, t);
        let q0 = vars.q.at(SLACK_BUS, t);

        out.push(Constraint::ge(
            Self::tag("congestion", t),
            p0,
            LinExpr::constant(net.congestion.limit_at(t)),
        ));
        out.push(Constraint::second_order_cone(
            Self::tag("trafo_capacity", t),
            LinExpr::constant(net.trafo_capacity_mva),
            vec![LinExpr::from(p0), LinExpr::from(q0)],
        ));
        out.push(Constraint::eq(
            Self::tag("slack_voltage", t),
            vars.v.at(SLACK_BUS, t),
            LinExpr::constant(net.v_ref_sq()),
        ));

        // Bus balances
        for bus in 0..topo.n_bus() {
            let mut p_net = LinExpr::new();
            let mut q_net = LinExpr::new();
            if let Some(i) = topo.parent_line(bus) {
                let line = topo.line(i);
                let l = vars.l.at(i, t);
                p_net = p_net + vars.p_line.at(i, t) - line.r_ohm * l;
                q_net = q_net + vars.q_line.at(i, t) - line.x_ohm * l;
            }
            for &i in topo.child_lines(bus) {
                p_net = p_net - vars.p_line.at(i, t);
                q_net = q_net - vars.q_line.at(i, t);
            }
            if let Some(soft) = &vars.soft {
                p_net = p_net + soft.bus_pos.at(bus, t) - soft.bus_neg.at(bus, t);
            }
            out.push(Constraint::eq(
                Self::tag("p_balance", t).entity(bus),
                vars.p.at(bus, t),
                p_net,
            ));
            out.push(Constraint::eq(
                Self::tag("q_balance", t).entity(bus),
                vars.q.at(bus, t),
                q_net,
            ));
        }

        // Buses without a household draw nothing
        let mut is_user_bus = vec![false; topo.n_bus()];
        for user in &params.users {
            is_user_bus[user.bus] = true;
        }
        for bus in (0..topo.n_bus()).filter(|&b| b != SLACK_BUS && !is_user_bus[b]) {
            out.push(Constraint::eq(
                Self::tag("idle_bus_p", t).entity(bus),
                vars.p.at(bus, t),
                LinExpr::new(),
            ));
            out.push(Constraint::eq(
                Self::tag("idle_bus_q", t).entity(bus),
                vars.q.at(bus, t),
                LinExpr::new(),
            ));
        }

        // Lines
        for (i, line) in topo.lines().iter().enumerate() {
            let p = vars.p_line.at(i, t);
            let q = vars.q_line.at(i, t);
            let l = vars.l.at(i, t);
            let v_from = vars.v.at(line.start_node, t);
            let v_to = vars.v.at(line.end_node, t);

            out.push(Constraint::eq(
                Self::tag("voltage_drop", t).entity(i),
                v_to,
                v_from - 2.0 * line.r_ohm * p - 2.0 * line.x_ohm * q + line.impedance_sq() * l,
            ));
            out.push(Constraint::rotated_cone(
                Self::tag("branch_cone", t).entity(i),
                vec![LinExpr::from(p), LinExpr::from(q)],
                l,
                v_from,
            ));
            let mut limit = LinExpr::constant(line.current_limit_sq());
            if let Some(soft) = &vars.soft {
                limit += soft.line.at(i, t);
            }
            out.push(Constraint::le(Self::tag("current_limit", t).entity(i), l, limit));
        }

        // Soft voltage band replaces the variable bounds
        if let Some(soft) = &vars.soft {
            let (v_lo, v_hi) = net.v_sq_bounds();
            for bus in 0..topo.n_bus() {
                let v = vars.v.at(bus, t);
                out.push(Constraint::ge(
                    Self::tag("v_min", t).entity(bus),
                    v + soft.voltage_neg.at(bus, t),
                    LinExpr::constant(v_lo),
                ));
                out.push(Constraint::le(
                    Self::tag("v_max", t).entity(bus),
                    v - soft.voltage_pos.at(bus, t),
                    LinExpr::constant(v_hi),
                ));
            }
        }

        out
    }
}
