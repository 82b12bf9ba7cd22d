use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use gec_io::load_parameters;
use tabwriter::TabWriter;

pub fn handle(params: &Path, temperatures: &[f64]) -> Result<()> {
    let case = load_parameters(params)
        .with_context(|| format!("loading {}", params.display()))?;
    let comfort = &case.comfort;
    if !comfort.is_convex() {
        tracing::warn!("comfort curve is not convex; the envelope underestimates PPD between breakpoints");
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "TEMP_C\tPPD")?;
    for &temp in temperatures {
        writeln!(writer, "{:.2}\t{:.3}", temp, comfort.envelope(temp))?;
    }
    writer.flush()?;
    Ok(())
}
