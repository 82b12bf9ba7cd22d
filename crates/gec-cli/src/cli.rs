use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Day-ahead electro-thermal microgrid dispatch", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and solve the dispatch problem
    Solve(SolveArgs),
    /// Validate a parameter file and print diagnostics
    Validate {
        /// Parameter file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        params: PathBuf,
    },
    /// Build the model and print its size by component
    Inspect {
        /// Parameter file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        params: PathBuf,
        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the comfort envelope at given indoor temperatures
    Comfort {
        /// Parameter file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        params: PathBuf,
        /// Indoor temperatures in °C
        #[arg(long = "temp", required = true, num_args = 1..)]
        temperatures: Vec<f64>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    /// Parameter file (JSON)
    #[arg(value_hint = ValueHint::FilePath)]
    pub params: PathBuf,

    /// TOML run configuration with [solver], [output] and [formulation] sections
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Directory for all artifacts
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Artifact stem (defaults to YYYYMMDD_HHMM)
    #[arg(long)]
    pub name: Option<String>,

    /// Write the textual model (.lp)
    #[arg(long)]
    pub save_model: bool,

    /// Write variable values (.sol)
    #[arg(long)]
    pub save_solution: bool,

    /// Compute and write an IIS (.ilp) when the model is infeasible
    #[arg(long)]
    pub save_iis: bool,

    /// Relative MIP gap
    #[arg(long)]
    pub mip_gap: Option<f64>,

    /// Time limit in seconds
    #[arg(long)]
    pub time_limit: Option<f64>,

    /// Print interior-point iterations
    #[arg(long)]
    pub verbose: bool,

    /// Replace the building model with the reference one of this kind
    #[arg(long, value_enum)]
    pub thermal: Option<ThermalModel>,

    /// Relax balances, voltage band and line limits with this slack penalty
    #[arg(long)]
    pub soft_penalty: Option<f64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalModel {
    Rc,
    StateSpace,
}
