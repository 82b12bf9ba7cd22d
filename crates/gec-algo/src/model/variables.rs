//! Decision variable registry.
//!
//! Every family is a dense `rows × steps` grid of consecutive [`VarId`]s, so a
//! handle is computed, never looked up. Bounds declared here are part of the
//! model (the voltage band, non-negativity, binary domains) and are not
//! emitted as tagged constraints.

use gec_core::{ParameterSet, Topology};
use serde::Serialize;

use super::expr::VarId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    Continuous,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarInfo {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub kind: VarKind,
}

/// `rows × steps` block of consecutive variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarGrid {
    first: usize,
    rows: usize,
    steps: usize,
}

impl VarGrid {
    #[inline]
    pub fn at(&self, row: usize, t: usize) -> VarId {
        debug_assert!(row < self.rows && t < self.steps);
        VarId::new(self.first + row * self.steps + t)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Values of one row across the horizon.
    pub fn series(&self, row: usize, values: &[f64]) -> Vec<f64> {
        (0..self.steps).map(|t| values[self.at(row, t).index()]).collect()
    }
}

/// Slack variables of the soft-constraint variant.
#[derive(Debug, Clone)]
pub struct SoftVars {
    pub bus_pos: VarGrid,
    pub bus_neg: VarGrid,
    pub voltage_pos: VarGrid,
    pub voltage_neg: VarGrid,
    pub line: VarGrid,
}

/// Upper bound on each voltage slack in kV².
pub const VOLTAGE_SLACK_LIMIT: f64 = 0.1;

/// All variables of one dispatch model.
#[derive(Debug, Clone)]
pub struct VariableSpace {
    infos: Vec<VarInfo>,
    topology: Topology,
    steps: usize,

    // per bus
    pub p: VarGrid,
    pub q: VarGrid,
    pub v: VarGrid,
    // per line
    pub p_line: VarGrid,
    pub q_line: VarGrid,
    pub l: VarGrid,
    // per user
    pub p_pv: VarGrid,
    pub q_pv: VarGrid,
    pub p_hp: VarGrid,
    pub q_hp: VarGrid,
    pub b_hp: VarGrid,
    pub h_hp: VarGrid,
    pub h_boil: VarGrid,
    pub g_boil: VarGrid,
    pub b_boil: VarGrid,
    pub heat: VarGrid,
    pub t_in: VarGrid,
    pub ppd: VarGrid,

    pub soft: Option<SoftVars>,
}

impl VariableSpace {
    /// Declare every variable for a validated case.
    ///
    /// With `soft` the voltage band moves from variable bounds into slack
    /// constraints, and slack grids are added.
    pub fn new(params: &ParameterSet, topology: Topology, soft: bool) -> Self {
        let steps = params.steps();
        let n_bus = topology.n_bus();
        let n_line = topology.n_lines();
        let n_user = params.n_users();
        let (v_lo, v_hi) = params.network.v_sq_bounds();
        let inf = f64::INFINITY;

        let mut reg = Registry {
            infos: Vec::new(),
            steps,
        };
        use VarKind::{Binary, Continuous};

        let p = reg.grid("p_bus", n_bus, -inf, inf, Continuous);
        let q = reg.grid("q_bus", n_bus, -inf, inf, Continuous);
        let v = if soft {
            reg.grid("v_sq", n_bus, 0.0, inf, Continuous)
        } else {
            reg.grid("v_sq", n_bus, v_lo, v_hi, Continuous)
        };
        let p_line = reg.grid("p_line", n_line, -inf, inf, Continuous);
        let q_line = reg.grid("q_line", n_line, -inf, inf, Continuous);
        let l = reg.grid("i_sq", n_line, 0.0, inf, Continuous);

        let p_pv = reg.grid("p_pv", n_user, 0.0, inf, Continuous);
        let q_pv = reg.grid("q_pv", n_user, -inf, inf, Continuous);
        let p_hp = reg.grid("p_hp", n_user, 0.0, inf, Continuous);
        let q_hp = reg.grid("q_hp", n_user, 0.0, inf, Continuous);
        let b_hp = reg.grid("hp_on", n_user, 0.0, 1.0, Binary);
        let h_hp = reg.grid("h_hp", n_user, 0.0, inf, Continuous);
        let h_boil = reg.grid("h_boil", n_user, 0.0, inf, Continuous);
        let g_boil = reg.grid("g_boil", n_user, 0.0, inf, Continuous);
        let b_boil = reg.grid("boiler_on", n_user, 0.0, 1.0, Binary);
        let heat = reg.grid("heat", n_user, 0.0, inf, Continuous);
        let t_in = reg.grid("t_in", n_user, -inf, inf, Continuous);
        let ppd = reg.grid("ppd", n_user, 0.0, inf, Continuous);

        let soft = soft.then(|| SoftVars {
            bus_pos: reg.grid("slack_bus_pos", n_bus, 0.0, inf, Continuous),
            bus_neg: reg.grid("slack_bus_neg", n_bus, 0.0, inf, Continuous),
            voltage_pos: reg.grid("slack_v_pos", n_bus, 0.0, VOLTAGE_SLACK_LIMIT, Continuous),
            voltage_neg: reg.grid("slack_v_neg", n_bus, 0.0, VOLTAGE_SLACK_LIMIT, Continuous),
            line: reg.grid("slack_line", n_line, 0.0, inf, Continuous),
        });

        Self {
            infos: reg.infos,
            topology,
            steps,
            p,
            q,
            v,
            p_line,
            q_line,
            l,
            p_pv,
            q_pv,
            p_hp,
            q_hp,
            b_hp,
            h_hp,
            h_boil,
            g_boil,
            b_boil,
            heat,
            t_in,
            ppd,
            soft,
        }
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn info(&self, var: VarId) -> &VarInfo {
        &self.infos[var.index()]
    }

    pub fn infos(&self) -> &[VarInfo] {
        &self.infos
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn binaries(&self) -> impl Iterator<Item = VarId> + '_ {
        self.infos
            .iter()
            .enumerate()
            .filter(|(_, info)| info.kind == VarKind::Binary)
            .map(|(i, _)| VarId::new(i))
    }

    pub fn n_binary(&self) -> usize {
        self.binaries().count()
    }

    /// Declared `(lower, upper)` bounds in [`VarId`] order.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.infos.iter().map(|i| (i.lower, i.upper)).collect()
    }
}

struct Registry {
    infos: Vec<VarInfo>,
    steps: usize,
}

impl Registry {
    fn grid(&mut self, name: &str, rows: usize, lower: f64, upper: f64, kind: VarKind) -> VarGrid {
        let first = self.infos.len();
        for row in 0..rows {
            for t in 0..self.steps {
                self.infos.push(VarInfo {
                    name: format!("{name}({row},{t})"),
                    lower,
                    upper,
                    kind,
                });
            }
        }
        VarGrid {
            first,
            rows,
            steps: self.steps,
        }
    }
}
