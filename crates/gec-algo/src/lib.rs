//! # gec-algo: Day-ahead electro-thermal dispatch
//!
//! Builds and solves the joint scheduling problem of a radial low-voltage
//! feeder and the heating systems of the households connected to it.
//!
//! The pipeline has three stages:
//!
//! | Stage | Entry point | Output |
//! |-------|-------------|--------|
//! | Formulation | [`DispatchModel::build`] | Variables, tagged constraints, objective |
//! | Solve | [`SolverAdapter::solve`] | [`SolveOutcome`] with status and values |
//! | Extraction | [`DispatchResult::extract`] | Per bus, line and user time series |
//!
//! The network uses the DistFlow branch-flow model with the squared-current
//! equality relaxed to a rotated second-order cone. Each household runs a
//! heat pump and a gas boiler that never operate at the same time, so the
//! problem is a mixed-integer SOCP. The bundled [`ClarabelBranchAndBound`]
//! adapter solves every relaxation with clarabel.
//!
//! ## Example
//!
//! ```no_run
//! use gec_algo::{ClarabelBranchAndBound, DispatchModel, DispatchResult, SolverAdapter, SolverConfig};
//! use gec_core::ParameterSet;
//!
//! let params = ParameterSet::reference_case(3);
//! let model = DispatchModel::build(&params, Default::default())?;
//! let outcome = ClarabelBranchAndBound.solve(&model, &SolverConfig::default())?;
//! let result = DispatchResult::extract(&model, &params, &outcome)?;
//! println!("total cost: {:.2}", result.costs.total);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod model;
pub mod results;
pub mod solver;

pub use model::{
    Component, Constraint, ConstraintBody, ConstraintModule, ConstraintTag, DispatchModel,
    FormulationOptions, LinExpr, ModelError, ModelStats, Objective, Sense, SoftConstraints, VarId,
    VariableSpace,
};
pub use results::{
    soc_tightness, BusSeries, CostBreakdown, DispatchResult, LineSeries, SocCheck, UserSeries,
    SOC_TIGHTNESS_TOLERANCE,
};
pub use solver::{
    gap_closed, relative_gap, ClarabelBranchAndBound, ConicSettings, IisReport, SolveError, SolveOutcome,
    SolveStatus, SolverAdapter, SolverConfig, ABSOLUTE_GAP_TOLERANCE,
};
