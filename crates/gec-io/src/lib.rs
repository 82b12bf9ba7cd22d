//! # gec-io: Dispatch data I/O
//!
//! Reads [`ParameterSet`](gec_core::ParameterSet) files and writes the
//! artifacts of a dispatch run.
//!
//! | Artifact | Writer | Content |
//! |----------|--------|---------|
//! | `<name>.lp` | [`output::write_model`] | Textual model: objective, constraints by tag, bounds, binaries |
//! | `<name>.sol` | [`output::write_solution`] | One `name value` line per variable |
//! | `<name>.ilp` | [`output::write_iis`] | The irreducible infeasible subset in the `.lp` layout |
//! | `<name>.json` | [`output::write_result_json`] | Full [`DispatchResult`](gec_algo::DispatchResult) |
//! | `<name>_users.csv` | [`output::write_user_csv`] | Household series, one row per user and step |
//! | `<name>_buses.csv` | [`output::write_bus_csv`] | Bus series, one row per bus and step |

pub mod loader;
pub mod output;

pub use loader::{load_parameters, parse_parameters};
pub use output::{write_artifacts, Artifacts, OutputConfig};
