//! Assembles the formulation blocks into one [`DispatchModel`].

use std::collections::{BTreeMap, HashSet};

use gec_core::{Diagnostics, ParameterSet, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::constraint::{Component, Constraint, ConstraintModule, ConstraintTag};
use super::coupling::LoadCouplingModel;
use super::heat::HybridHeatSourceModel;
use super::network::NetworkFlowModel;
use super::objective::{Objective, ObjectiveAssembler};
use super::thermal::ThermalComfortModel;
use super::variables::VariableSpace;

/// Penalty per unit slack used when no other value is given.
pub const DEFAULT_SLACK_PENALTY: f64 = 1e8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftConstraints {
    pub penalty: f64,
}

impl Default for SoftConstraints {
    fn default() -> Self {
        Self {
            penalty: DEFAULT_SLACK_PENALTY,
        }
    }
}

/// Switches that change the formulation without changing the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulationOptions {
    #[serde(default)]
    pub include_baseload_reactive: bool,
    /// Relax bus balance, voltage band and current limits with penalized slacks
    #[serde(default)]
    pub soft_constraints: Option<SoftConstraints>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid parameters: {0}")]
    Validation(#[from] ValidationError),

    #[error("constraint tag `{0}` is emitted twice")]
    DuplicateTag(String),
}

/// Size summary of a built model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStats {
    pub variables: usize,
    pub binaries: usize,
    pub linear_constraints: usize,
    pub conic_constraints: usize,
    pub by_component: BTreeMap<Component, usize>,
}

/// Variables, tagged constraints and objective of one dispatch case.
#[derive(Debug, Clone)]
pub struct DispatchModel {
    variables: VariableSpace,
    constraints: Vec<Constraint>,
    objective: Objective,
    options: FormulationOptions,
    diagnostics: Diagnostics,
}

impl DispatchModel {
    /// Validate `params` and build the full model.
    pub fn build(params: &ParameterSet, options: FormulationOptions) -> Result<Self, ModelError> {
        let modules: Vec<Box<dyn ConstraintModule>> = vec![
            Box::new(NetworkFlowModel),
            Box::new(HybridHeatSourceModel),
            Box::new(ThermalComfortModel),
            Box::new(LoadCouplingModel {
                include_baseload_reactive: options.include_baseload_reactive,
            }),
        ];
        Self::build_with_modules(params, options, &modules)
    }

    /// Build with an explicit list of formulation blocks.
    pub fn build_with_modules(
        params: &ParameterSet,
        options: FormulationOptions,
        modules: &[Box<dyn ConstraintModule>],
    ) -> Result<Self, ModelError> {
        let topology = params.validate()?;
        let diagnostics = params.diagnose();

        let variables = VariableSpace::new(params, topology, options.soft_constraints.is_some());

        let mut constraints = Vec::new();
        for t in 0..params.steps() {
            for module in modules {
                let block = module.contribute(&variables, t, params);
                debug_assert!(block.iter().all(|c| c.tag.component == module.component()));
                constraints.extend(block);
            }
        }

        let mut seen: HashSet<&ConstraintTag> = HashSet::with_capacity(constraints.len());
        for c in &constraints {
            if !seen.insert(&c.tag) {
                return Err(ModelError::DuplicateTag(c.tag.to_string()));
            }
        }

        let objective = ObjectiveAssembler::assemble(
            &variables,
            params,
            options.soft_constraints.map(|s| s.penalty),
        );

        let model = Self {
            variables,
            constraints,
            objective,
            options,
            diagnostics,
        };
        let stats = model.stats();
        info!(
            variables = stats.variables,
            binaries = stats.binaries,
            linear = stats.linear_constraints,
            conic = stats.conic_constraints,
            "built dispatch model"
        );
        Ok(model)
    }

    pub fn variables(&self) -> &VariableSpace {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn options(&self) -> &FormulationOptions {
        &self.options
    }

    /// Warnings raised while validating the inputs.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn find(&self, tag: &ConstraintTag) -> Option<&Constraint> {
        self.constraints.iter().find(|c| &c.tag == tag)
    }

    pub fn stats(&self) -> ModelStats {
        let mut by_component = BTreeMap::new();
        let mut conic = 0;
        for c in &self.constraints {
            *by_component.entry(c.tag.component).or_insert(0) += 1;
            if c.is_conic() {
                conic += 1;
            }
        }
        ModelStats {
            variables: self.variables.len(),
            binaries: self.variables.n_binary(),
            linear_constraints: self.constraints.len() - conic,
            conic_constraints: conic,
            by_component,
        }
    }

    /// Largest constraint or bound violation of a full assignment.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let cons = self
            .constraints
            .iter()
            .map(|c| c.violation(values))
            .fold(0.0, f64::max);
        let bounds = self
            .variables
            .infos()
            .iter()
            .zip(values)
            .map(|(info, x)| (info.lower - x).max(x - info.upper).max(0.0))
            .fold(0.0, f64::max);
        cons.max(bounds)
    }
}
