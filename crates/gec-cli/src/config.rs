//! TOML run configuration.
//!
//! ```toml
//! [solver]
//! mip_gap = 0.01
//! time_limit_secs = 120
//!
//! [output]
//! dir = "runs"
//! save_model = true
//!
//! [formulation]
//! soft_penalty = 1e8
//! ```
//!
//! Command-line flags override values from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gec_algo::{FormulationOptions, SoftConstraints, SolverConfig};
use gec_io::OutputConfig;
use serde::{Deserialize, Serialize};

use crate::cli::SolveArgs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub solver: SolverSection,
    pub output: OutputSection,
    pub formulation: FormulationSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSection {
    pub mip_gap: Option<f64>,
    pub time_limit_secs: Option<f64>,
    pub verbose: Option<bool>,
    pub max_nodes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub dir: Option<PathBuf>,
    pub name: Option<String>,
    pub save_model: Option<bool>,
    pub save_solution: Option<bool>,
    pub save_iis: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormulationSection {
    pub include_baseload_reactive: Option<bool>,
    pub soft_penalty: Option<f64>,
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading run configuration {}", path.display()))?;
    let config: RunConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing run configuration {}", path.display()))?;
    Ok(config)
}

impl RunConfig {
    pub fn solver_config(&self, args: &SolveArgs) -> Result<SolverConfig> {
        let mut config = SolverConfig::default();
        if let Some(gap) = args.mip_gap.or(self.solver.mip_gap) {
            anyhow::ensure!(gap >= 0.0 && gap.is_finite(), "mip gap must be non-negative, got {gap}");
            config.mip_gap = gap;
        }
        if let Some(secs) = args.time_limit.or(self.solver.time_limit_secs) {
            config.time_limit = Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid time limit {secs}"))?;
        }
        config.verbose = args.verbose || self.solver.verbose.unwrap_or(false);
        if let Some(nodes) = self.solver.max_nodes {
            config.max_nodes = nodes;
        }
        Ok(config)
    }

    pub fn output_config(&self, args: &SolveArgs) -> OutputConfig {
        let defaults = OutputConfig::default();
        let out = &self.output;
        OutputConfig {
            output_dir: args
                .out_dir
                .clone()
                .or_else(|| out.dir.clone())
                .unwrap_or(defaults.output_dir),
            output_name: args
                .name
                .clone()
                .or_else(|| out.name.clone())
                .unwrap_or(defaults.output_name),
            save_model: args.save_model || out.save_model.unwrap_or(false),
            save_solution: args.save_solution || out.save_solution.unwrap_or(false),
            save_iis: args.save_iis || out.save_iis.unwrap_or(false),
        }
    }

    pub fn formulation_options(&self, args: &SolveArgs) -> FormulationOptions {
        FormulationOptions {
            include_baseload_reactive: self.formulation.include_baseload_reactive.unwrap_or(false),
            soft_constraints: args
                .soft_penalty
                .or(self.formulation.soft_penalty)
                .map(|penalty| SoftConstraints { penalty }),
        }
    }
}
