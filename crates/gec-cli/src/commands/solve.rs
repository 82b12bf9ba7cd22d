use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use gec_algo::{
    ClarabelBranchAndBound, DispatchModel, DispatchResult, SolveStatus, SolverAdapter,
};
use gec_cli::{load_run_config, RunConfig, SolveArgs, ThermalModel};
use gec_core::{ParameterSet, ThermalDynamics};
use gec_io::{load_parameters, write_artifacts};
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(args: &SolveArgs) -> Result<()> {
    let run_config = match &args.config {
        Some(path) => load_run_config(path)?,
        None => RunConfig::default(),
    };
    let solver_config = run_config.solver_config(args)?;
    let output = run_config.output_config(args);
    let options = run_config.formulation_options(args);

    let mut params = load_parameters(&args.params)
        .with_context(|| format!("loading {}", args.params.display()))?;
    if let Some(kind) = args.thermal {
        select_thermal_model(&mut params, kind);
    }

    let model = DispatchModel::build(&params, options).context("building dispatch model")?;
    for warning in model.diagnostics().iter() {
        warn!("{}", warning);
    }

    let adapter = ClarabelBranchAndBound;
    info!(solver = adapter.name(), "solving");
    let outcome = adapter
        .solve(&model, &solver_config)
        .context("solving dispatch model")?;

    let result = if outcome.has_solution() {
        Some(DispatchResult::extract(&model, &params, &outcome)?)
    } else {
        None
    };
    let iis = if output.save_iis && outcome.status == SolveStatus::Infeasible {
        Some(
            adapter
                .compute_iis(&model, &solver_config)
                .context("computing irreducible infeasible subset")?,
        )
    } else {
        None
    };

    let artifacts = write_artifacts(&output, &model, &outcome, result.as_ref(), iis.as_ref())?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Status\t{}", outcome.status)?;
    writeln!(writer, "Nodes\t{}", outcome.nodes)?;
    writeln!(writer, "Runtime\t{} ms", outcome.runtime.as_millis())?;
    if let Some(result) = &result {
        writeln!(writer, "Objective\t{:.4}", result.objective)?;
        if let Some(gap) = result.gap {
            writeln!(writer, "Gap\t{:.4}", gap)?;
        }
        writeln!(writer, "Electricity\t{:.4}", result.costs.electricity)?;
        writeln!(writer, "Gas\t{:.4}", result.costs.gas)?;
        writeln!(writer, "Comfort\t{:.4}", result.costs.comfort)?;
        if options.soft_constraints.is_some() {
            writeln!(writer, "Slack\t{:.4}", result.costs.slack)?;
        }
    }
    if let Some(report) = &iis {
        writeln!(writer, "IIS constraints\t{}", report.len())?;
        for tag in &report.constraints {
            writeln!(writer, "  {}", tag)?;
        }
    }
    for path in &artifacts.written {
        writeln!(writer, "Wrote\t{}", path.display())?;
    }
    writer.flush()?;

    if result.is_none() {
        bail!("no feasible dispatch found (status: {})", outcome.status);
    }
    Ok(())
}

/// Swap in the reference building of the requested kind unless the file
/// already uses that kind.
fn select_thermal_model(params: &mut ParameterSet, kind: ThermalModel) {
    let current = &params.thermal.dynamics;
    let replacement = match (kind, current) {
        (ThermalModel::Rc, ThermalDynamics::Rc { .. })
        | (ThermalModel::StateSpace, ThermalDynamics::StateSpace { .. }) => return,
        (ThermalModel::Rc, _) => ThermalDynamics::reference_rc(),
        (ThermalModel::StateSpace, _) => ThermalDynamics::reference_state_space(),
    };
    info!(model = ?kind, "using reference thermal model");
    params.thermal.dynamics = replacement;
}
