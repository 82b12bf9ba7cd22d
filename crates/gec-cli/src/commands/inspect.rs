use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gec_algo::{DispatchModel, FormulationOptions};
use gec_io::load_parameters;
use tabwriter::TabWriter;

pub fn handle(params: &Path, json: bool) -> Result<()> {
    let case = load_parameters(params)
        .with_context(|| format!("loading {}", params.display()))?;
    let model = DispatchModel::build(&case, FormulationOptions::default())
        .context("building dispatch model")?;
    let stats = model.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Variables\t{}", stats.variables)?;
    writeln!(writer, "Binaries\t{}", stats.binaries)?;
    writeln!(writer, "Linear constraints\t{}", stats.linear_constraints)?;
    writeln!(writer, "Conic constraints\t{}", stats.conic_constraints)?;
    writeln!(writer)?;
    writeln!(writer, "COMPONENT\tCONSTRAINTS")?;
    for (component, count) in &stats.by_component {
        writeln!(writer, "{}\t{}", component, count)?;
    }
    writer.flush()?;
    Ok(())
}
