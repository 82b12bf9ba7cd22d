//! Mixed-integer conic formulation of the electro-thermal dispatch.
//!
//! | Block | Module | Content |
//! |-------|--------|---------|
//! | [`NetworkFlowModel`] | [`network`] | DistFlow balances, voltage drop, branch cones, trafo and congestion limits |
//! | [`HybridHeatSourceModel`] | [`heat`] | Heat pump / boiler switching and conversion |
//! | [`ThermalComfortModel`] | [`thermal`] | RC or state-space indoor dynamics, PPD envelope |
//! | [`LoadCouplingModel`] | [`coupling`] | Household devices → bus injections |
//! | [`ObjectiveAssembler`] | [`objective`] | Electricity, gas, comfort and slack costs |

pub mod builder;
pub mod constraint;
pub mod coupling;
pub mod expr;
pub mod heat;
pub mod network;
pub mod objective;
pub mod thermal;
pub mod variables;

pub use builder::{
    DispatchModel, FormulationOptions, ModelError, ModelStats, SoftConstraints,
    DEFAULT_SLACK_PENALTY,
};
pub use constraint::{
    Component, Constraint, ConstraintBody, ConstraintModule, ConstraintTag, Sense,
};
pub use coupling::LoadCouplingModel;
pub use expr::{LinExpr, VarId};
pub use heat::HybridHeatSourceModel;
pub use network::NetworkFlowModel;
pub use objective::{Objective, ObjectiveAssembler};
pub use thermal::ThermalComfortModel;
pub use variables::{SoftVars, VarGrid, VarInfo, VarKind, VariableSpace, VOLTAGE_SLACK_LIMIT};
