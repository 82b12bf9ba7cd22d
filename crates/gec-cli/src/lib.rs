pub mod cli;
pub mod config;

pub use cli::{Cli, Commands, SolveArgs, ThermalModel};
pub use config::{load_run_config, FormulationSection, OutputSection, RunConfig, SolverSection};
