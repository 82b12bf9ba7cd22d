//! JSON parameter files.

use std::fs;
use std::path::Path;

use gec_core::{GecError, GecResult, ParameterSet};
use tracing::debug;

/// Read and validate a parameter file.
///
/// Validation runs here so that a file that loads is also buildable.
pub fn load_parameters(path: impl AsRef<Path>) -> GecResult<ParameterSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let params: ParameterSet = serde_json::from_str(&text)
        .map_err(|e| GecError::Parse(format!("{}: {}", path.display(), e)))?;
    params.validate()?;
    debug!(
        path = %path.display(),
        steps = params.steps(),
        users = params.n_users(),
        "loaded parameters"
    );
    Ok(params)
}

/// Parse and validate parameters from a JSON string.
pub fn parse_parameters(text: &str) -> GecResult<ParameterSet> {
    let params: ParameterSet = serde_json::from_str(text)?;
    params.validate()?;
    Ok(params)
}
