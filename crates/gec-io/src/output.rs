//! Run artifacts: model text, solution values, IIS, result JSON and CSV series.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gec_algo::{
    ConstraintBody, DispatchModel, DispatchResult, IisReport, LinExpr, SolveOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where and what to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// Stem shared by all artifacts of one run
    pub output_name: String,
    pub save_model: bool,
    pub save_solution: bool,
    pub save_iis: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output_name: default_output_name(),
            save_model: false,
            save_solution: false,
            save_iis: false,
        }
    }
}

/// `YYYYMMDD_HHMM` of the local time.
pub fn default_output_name() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M").to_string()
}

impl OutputConfig {
    /// `<dir>/<name><suffix>`, e.g. `output_path(".lp")` or `output_path("_users.csv")`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}{}", self.output_name, suffix))
    }
}

/// Paths written by [`write_artifacts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Artifacts {
    pub written: Vec<PathBuf>,
}

/// Write every artifact enabled in `config` that the run can provide.
///
/// The result JSON and CSV series need a solution; the IIS file is only
/// written when a report is passed.
pub fn write_artifacts(
    config: &OutputConfig,
    model: &DispatchModel,
    outcome: &SolveOutcome,
    result: Option<&DispatchResult>,
    iis: Option<&IisReport>,
) -> Result<Artifacts> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "creating output directory {}",
            config.output_dir.display()
        )
    })?;
    let mut artifacts = Artifacts::default();
    let mut emit = |path: PathBuf| {
        info!(path = %path.display(), "wrote artifact");
        artifacts.written.push(path);
    };

    if config.save_model {
        let path = config.output_path(".lp");
        write_model(model, &path)?;
        emit(path);
    }
    if config.save_solution && outcome.has_solution() {
        let path = config.output_path(".sol");
        write_solution(model, outcome, &path)?;
        emit(path);
    }
    if let (true, Some(report)) = (config.save_iis, iis) {
        let path = config.output_path(".ilp");
        write_iis(model, report, &path)?;
        emit(path);
    }
    if let Some(result) = result {
        let path = config.output_path(".json");
        write_result_json(result, &path)?;
        emit(path);
        let path = config.output_path("_users.csv");
        write_user_csv(result, &path)?;
        emit(path);
        let path = config.output_path("_buses.csv");
        write_bus_csv(result, &path)?;
        emit(path);
    }
    Ok(artifacts)
}

/// Identifier usable in LP files: every character outside `[A-Za-z0-9_.]` becomes `_`.
fn lp_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect();
    while name.ends_with('_') {
        name.pop();
    }
    name
}

struct LpWriter<'a> {
    model: &'a DispatchModel,
    names: Vec<String>,
    out: String,
}

impl<'a> LpWriter<'a> {
    fn new(model: &'a DispatchModel) -> Self {
        let names = model
            .variables()
            .infos()
            .iter()
            .map(|info| lp_name(&info.name))
            .collect();
        Self {
            model,
            names,
            out: String::new(),
        }
    }

    fn linear(&self, expr: &LinExpr) -> String {
        let mut text = String::new();
        for (var, coeff) in expr.terms() {
            let sign = if coeff < 0.0 { '-' } else { '+' };
            if text.is_empty() && sign == '+' {
                let _ = write!(text, "{} {}", coeff.abs(), self.names[var.index()]);
            } else {
                let _ = write!(text, " {} {} {}", sign, coeff.abs(), self.names[var.index()]);
            }
        }
        if text.is_empty() {
            text.push('0');
        }
        text
    }

    /// Squared term inside a quadratic block.
    fn square(&self, expr: &LinExpr) -> String {
        let mut terms = expr.terms();
        match (terms.next(), terms.next()) {
            (Some((var, c)), None) if c == 1.0 && expr.constant_value() == 0.0 => {
                format!("{} ^2", self.names[var.index()])
            }
            _ => {
                let mut inner = self.linear(expr);
                if expr.constant_value() != 0.0 {
                    let _ = write!(inner, " + {}", expr.constant_value());
                }
                format!("( {} ) ^2", inner)
            }
        }
    }

    fn objective(&mut self) {
        let total = self.model.objective().total();
        self.out.push_str("Minimize\n");
        let _ = writeln!(self.out, " obj: {}", self.linear(&total));
        if total.constant_value() != 0.0 {
            let _ = writeln!(self.out, " \\ constant {}", total.constant_value());
        }
    }

    fn constraints(&mut self, indices: impl Iterator<Item = usize>) {
        self.out.push_str("Subject To\n");
        let constraints = self.model.constraints();
        for i in indices {
            let c = &constraints[i];
            let label = lp_name(&c.tag.to_string());
            let line = match &c.body {
                ConstraintBody::Linear { expr, sense, rhs } => {
                    format!(" {}: {} {} {}", label, self.linear(expr), sense.symbol(), rhs)
                }
                ConstraintBody::SecondOrderCone { bound, terms } => {
                    let lhs: Vec<String> = terms.iter().map(|t| self.square(t)).collect();
                    if bound.is_constant() {
                        format!(
                            " {}: [ {} ] <= {}",
                            label,
                            lhs.join(" + "),
                            bound.constant_value().powi(2)
                        )
                    } else {
                        format!(" {}: [ {} - {} ] <= 0", label, lhs.join(" + "), self.square(bound))
                    }
                }
                ConstraintBody::RotatedCone { terms, y, z } => {
                    let lhs: Vec<String> = terms.iter().map(|t| self.square(t)).collect();
                    format!(
                        " {}: [ {} - ( {} ) * ( {} ) ] <= 0",
                        label,
                        lhs.join(" + "),
                        self.linear(y),
                        self.linear(z)
                    )
                }
            };
            self.out.push_str(&line);
            self.out.push('\n');
        }
    }

    fn bounds_and_binaries(&mut self) {
        self.out.push_str("Bounds\n");
        let infos = self.model.variables().infos();
        for (name, info) in self.names.iter().zip(infos) {
            let line = match (info.lower.is_finite(), info.upper.is_finite()) {
                (false, false) => format!(" {} free", name),
                (true, false) if info.lower == 0.0 => continue,
                (true, false) => format!(" {} >= {}", name, info.lower),
                (false, true) => format!(" -inf <= {} <= {}", name, info.upper),
                (true, true) => format!(" {} <= {} <= {}", info.lower, name, info.upper),
            };
            self.out.push_str(&line);
            self.out.push('\n');
        }
        self.out.push_str("Binaries\n");
        for var in self.model.variables().binaries() {
            let _ = writeln!(self.out, " {}", self.names[var.index()]);
        }
        self.out.push_str("End\n");
    }
}

/// Textual LP-style model description.
pub fn write_model(model: &DispatchModel, path: &Path) -> Result<()> {
    let mut lp = LpWriter::new(model);
    let stats = model.stats();
    let _ = writeln!(
        lp.out,
        "\\ {} variables ({} binary), {} linear and {} conic constraints",
        stats.variables, stats.binaries, stats.linear_constraints, stats.conic_constraints
    );
    lp.objective();
    lp.constraints(0..model.constraints().len());
    lp.bounds_and_binaries();
    fs::write(path, lp.out).with_context(|| format!("writing model to {}", path.display()))
}

/// Irreducible infeasible subset in the same layout as [`write_model`].
pub fn write_iis(model: &DispatchModel, report: &IisReport, path: &Path) -> Result<()> {
    let mut lp = LpWriter::new(model);
    let _ = writeln!(
        lp.out,
        "\\ IIS with {} constraints ({} checks, {})",
        report.len(),
        report.checks,
        if report.complete { "complete" } else { "incomplete" }
    );
    if report.on_relaxation {
        lp.out.push_str("\\ computed on the continuous relaxation\n");
    }
    let indices: Vec<usize> = report
        .constraints
        .iter()
        .filter_map(|tag| model.constraints().iter().position(|c| &c.tag == tag))
        .collect();
    lp.out.push_str("Minimize\n obj: 0\n");
    lp.constraints(indices.into_iter());
    lp.bounds_and_binaries();
    fs::write(path, lp.out).with_context(|| format!("writing IIS to {}", path.display()))
}

/// `name value` per variable, preceded by the objective value.
pub fn write_solution(model: &DispatchModel, outcome: &SolveOutcome, path: &Path) -> Result<()> {
    let values = outcome
        .values
        .as_deref()
        .context("outcome carries no solution values")?;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# Objective value = {}",
        outcome.objective.unwrap_or(f64::NAN)
    );
    for (info, value) in model.variables().infos().iter().zip(values) {
        let _ = writeln!(out, "{} {}", lp_name(&info.name), value);
    }
    fs::write(path, out).with_context(|| format!("writing solution to {}", path.display()))
}

pub fn write_result_json(result: &DispatchResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serializing DispatchResult to JSON")?;
    fs::write(path, json).with_context(|| format!("writing JSON to {}", path.display()))
}

/// One row per user and step.
pub fn write_user_csv(result: &DispatchResult, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    wtr.write_record([
        "t",
        "user",
        "bus",
        "hp_power_mw",
        "hp_on",
        "boiler_heat_mw",
        "boiler_gas_m3h",
        "boiler_on",
        "pv_output_mw",
        "pv_curtailed_mw",
        "indoor_temp_c",
        "heat_mw",
        "ppd",
    ])
    .context("writing CSV header")?;

    for user in &result.users {
        for t in 0..user.hp_power.len() {
            wtr.write_record([
                t.to_string(),
                user.user.to_string(),
                user.bus.to_string(),
                user.hp_power[t].to_string(),
                u8::from(user.hp_on[t]).to_string(),
                user.boiler_heat[t].to_string(),
                user.boiler_gas[t].to_string(),
                u8::from(user.boiler_on[t]).to_string(),
                user.pv_output[t].to_string(),
                user.pv_curtailed[t].to_string(),
                user.indoor_temp[t].to_string(),
                user.heat[t].to_string(),
                user.ppd[t].to_string(),
            ])
            .context("writing CSV record")?;
        }
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}

/// One row per bus and step.
pub fn write_bus_csv(result: &DispatchResult, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating CSV writer for {}", path.display()))?;
    wtr.write_record(["t", "bus", "p_mw", "q_mvar", "v_sq_kv2"])
        .context("writing CSV header")?;

    for bus in &result.buses {
        for t in 0..bus.p.len() {
            wtr.write_record([
                t.to_string(),
                bus.bus.to_string(),
                bus.p[t].to_string(),
                bus.q[t].to_string(),
                bus.v[t].to_string(),
            ])
            .context("writing CSV record")?;
        }
    }
    wtr.flush().context("flushing CSV writer")?;
    Ok(())
}
