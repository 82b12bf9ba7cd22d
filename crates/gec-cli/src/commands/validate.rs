use std::path::Path;

use anyhow::{Context, Result};
use gec_io::load_parameters;

pub fn handle(params: &Path) -> Result<()> {
    let case = load_parameters(params)
        .with_context(|| format!("validating {}", params.display()))?;
    println!(
        "Parameters valid: {} buses, {} lines, {} users, {} steps",
        case.n_bus(),
        case.network.lines.len(),
        case.n_users(),
        case.steps()
    );
    let diagnostics = case.diagnose();
    if !diagnostics.is_empty() {
        print!("{}", diagnostics);
    }
    Ok(())
}
