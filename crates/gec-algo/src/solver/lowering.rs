//! Lowering of constraint descriptors into clarabel's standard form.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    ½xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! Rows are emitted in three groups: all equalities (zero cone, including
//! fixed variables), all inequalities and finite bounds (nonnegative cone),
//! then one second-order cone per conic descriptor. A cone row `s = c + a·x`
//! becomes `A = −a, b = c`. A rotated cone `Σx² ≤ y·z` is stored as
//! `‖(2x, y − z)‖ ≤ y + z`.

use std::time::Duration;

use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT};

use super::{ConicSettings, SolveError};
use crate::model::{ConstraintBody, DispatchModel, LinExpr, Sense};

/// Outcome of one continuous relaxation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Relaxation {
    Optimal { objective: f64, x: Vec<f64> },
    Infeasible,
    TimeLimit,
    Failed(String),
}

pub(crate) struct ConicProgram {
    n_var: usize,
    a: CscMatrix<f64>,
    b: Vec<f64>,
    q: Vec<f64>,
    cones: Vec<SupportedConeT<f64>>,
    objective_offset: f64,
}

struct RowBuilder {
    cols: Vec<Vec<(usize, f64)>>,
    rhs: Vec<f64>,
}

impl RowBuilder {
    /// `Σ coeff·x ≤/= b` row in `Ax + s = b` form.
    fn push(&mut self, coeffs: impl Iterator<Item = (usize, f64)>, b: f64) {
        let row = self.rhs.len();
        for (col, val) in coeffs {
            self.cols[col].push((row, val));
        }
        self.rhs.push(b);
    }

    /// Cone row `s = expr`.
    fn push_affine(&mut self, expr: &LinExpr) {
        self.push(
            expr.terms().map(|(v, c)| (v.index(), -c)),
            expr.constant_value(),
        );
    }
}

impl ConicProgram {
    /// Lower the constraints listed in `active` with per-variable `bounds`.
    ///
    /// Without `with_objective` the program is a pure feasibility problem.
    pub(crate) fn lower(
        model: &DispatchModel,
        active: &[usize],
        bounds: &[(f64, f64)],
        with_objective: bool,
    ) -> Self {
        let n_var = model.variables().len();
        let constraints = model.constraints();
        let mut rows = RowBuilder {
            cols: vec![Vec::new(); n_var],
            rhs: Vec::new(),
        };
        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();

        // Equalities
        for (j, &(lo, hi)) in bounds.iter().enumerate() {
            if lo == hi {
                rows.push(std::iter::once((j, 1.0)), lo);
            }
        }
        for &i in active {
            if let ConstraintBody::Linear {
                expr,
                sense: Sense::Eq,
                rhs,
            } = &constraints[i].body
            {
                rows.push(expr.terms().map(|(v, c)| (v.index(), c)), *rhs);
            }
        }
        let n_eq = rows.rhs.len();
        if n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_eq));
        }

        // Inequalities, all as Σ a·x ≤ b
        for (j, &(lo, hi)) in bounds.iter().enumerate() {
            if lo == hi {
                continue;
            }
            if hi.is_finite() {
                rows.push(std::iter::once((j, 1.0)), hi);
            }
            if lo.is_finite() {
                rows.push(std::iter::once((j, -1.0)), -lo);
            }
        }
        for &i in active {
            if let ConstraintBody::Linear { expr, sense, rhs } = &constraints[i].body {
                match sense {
                    Sense::Eq => {}
                    Sense::Le => rows.push(expr.terms().map(|(v, c)| (v.index(), c)), *rhs),
                    Sense::Ge => rows.push(expr.terms().map(|(v, c)| (v.index(), -c)), -rhs),
                }
            }
        }
        let n_ineq = rows.rhs.len() - n_eq;
        if n_ineq > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_ineq));
        }

        // Second-order cones
        for &i in active {
            match &constraints[i].body {
                ConstraintBody::Linear { .. } => {}
                ConstraintBody::SecondOrderCone { bound, terms } => {
                    rows.push_affine(bound);
                    for term in terms {
                        rows.push_affine(term);
                    }
                    cones.push(SupportedConeT::SecondOrderConeT(1 + terms.len()));
                }
                ConstraintBody::RotatedCone { terms, y, z } => {
                    rows.push_affine(&(y.clone() + z.clone()));
                    for term in terms {
                        rows.push_affine(&(2.0 * term.clone()));
                    }
                    rows.push_affine(&(y.clone() - z.clone()));
                    cones.push(SupportedConeT::SecondOrderConeT(2 + terms.len()));
                }
            }
        }

        // Column-wise entries to CSC
        let n_rows = rows.rhs.len();
        let mut col_ptr = Vec::with_capacity(n_var + 1);
        let mut row_idx = Vec::new();
        let mut values = Vec::new();
        for col in rows.cols.iter_mut() {
            col_ptr.push(row_idx.len());
            col.sort_by_key(|(r, _)| *r);
            for &(r, v) in col.iter() {
                row_idx.push(r);
                values.push(v);
            }
        }
        col_ptr.push(row_idx.len());
        let a = CscMatrix::new(n_rows, n_var, col_ptr, row_idx, values);

        let mut q = vec![0.0; n_var];
        let mut objective_offset = 0.0;
        if with_objective {
            let total = model.objective().total();
            for (v, c) in total.terms() {
                q[v.index()] = c;
            }
            objective_offset = total.constant_value();
        }

        Self {
            n_var,
            a,
            b: rows.rhs,
            q,
            cones,
            objective_offset,
        }
    }

    pub(crate) fn n_rows(&self) -> usize {
        self.b.len()
    }

    /// Run the interior-point method on this program.
    pub(crate) fn solve(
        &self,
        settings: &ConicSettings,
        verbose: bool,
        time_limit: Duration,
    ) -> Result<Relaxation, SolveError> {
        let n = self.n_var;
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());

        let settings = DefaultSettingsBuilder::default()
            .verbose(verbose)
            .max_iter(settings.max_iter)
            .tol_feas(settings.tol_feas)
            .tol_gap_abs(settings.tol_gap)
            .tol_gap_rel(settings.tol_gap)
            .time_limit(time_limit.as_secs_f64())
            .equilibrate_enable(true)
            .build()
            .map_err(|e| SolveError::Setup(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver = DefaultSolver::new(&p, &self.q, &self.a, &self.b, &self.cones, settings)
            .map_err(|e| SolveError::Setup(format!("Clarabel initialization failed: {:?}", e)))?;
        solver.solve();

        let sol = &solver.solution;
        Ok(match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Relaxation::Optimal {
                objective: sol.obj_val + self.objective_offset,
                x: sol.x.clone(),
            },
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Relaxation::Infeasible
            }
            SolverStatus::MaxTime => Relaxation::TimeLimit,
            other => Relaxation::Failed(format!("Clarabel returned status {:?}", other)),
        })
    }
}
