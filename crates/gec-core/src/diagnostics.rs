//! Warnings about a dispatch case that do not stop a run.
//!
//! Input checks flag comfort curves the envelope cannot represent exactly and
//! households that have no flexible device. Result extraction flags branch
//! cones that are not tight at the reported point.
//!
//! ```
//! use gec_core::diagnostics::{Concern, Diagnostics};
//!
//! let mut diag = Diagnostics::new();
//! diag.loose_cone(2, 17, 4.2e-3);
//! assert_eq!(diag.of(Concern::SocRelaxation).count(), 1);
//! assert_eq!(diag.summary(), "1 warning (soc-relaxation)");
//! ```

use std::fmt;

use serde::Serialize;

/// What part of the case a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Concern {
    /// Comfort curve or comfort price
    Comfort,
    /// Household device configuration
    Devices,
    /// Branch cone relaxation at a solved point
    SocRelaxation,
}

impl Concern {
    pub fn as_str(self) -> &'static str {
        match self {
            Concern::Comfort => "comfort",
            Concern::Devices => "devices",
            Concern::SocRelaxation => "soc-relaxation",
        }
    }
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub concern: Concern,
    pub message: String,
    /// e.g. "user 1" or "line 3"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.concern, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(step) = self.step {
            write!(f, " at t={}", step)?;
        }
        Ok(())
    }
}

/// Ordered list of warnings for one case or one solved result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn of(&self, concern: Concern) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.concern == concern)
    }

    pub fn comfort(&mut self, message: impl Into<String>) {
        self.warnings.push(Warning {
            concern: Concern::Comfort,
            message: message.into(),
            entity: None,
            step: None,
        });
    }

    pub fn household(&mut self, user: usize, message: impl Into<String>) {
        self.warnings.push(Warning {
            concern: Concern::Devices,
            message: message.into(),
            entity: Some(format!("user {user}")),
            step: None,
        });
    }

    /// Branch cone on `line` at step `t` with relative gap `gap`.
    pub fn loose_cone(&mut self, line: usize, t: usize, gap: f64) {
        self.warnings.push(Warning {
            concern: Concern::SocRelaxation,
            message: format!("branch cone gap {gap:.2e}"),
            entity: Some(format!("line {line}")),
            step: Some(t),
        });
    }

    /// Warning count with the concerns involved, e.g. `2 warnings (comfort, devices)`.
    pub fn summary(&self) -> String {
        if self.warnings.is_empty() {
            return "no warnings".to_string();
        }
        let mut concerns: Vec<Concern> = self.warnings.iter().map(|w| w.concern).collect();
        concerns.sort();
        concerns.dedup();
        let names: Vec<&str> = concerns.iter().map(|c| c.as_str()).collect();
        let n = self.warnings.len();
        format!(
            "{} warning{} ({})",
            n,
            if n == 1 { "" } else { "s" },
            names.join(", ")
        )
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for warning in &self.warnings {
            writeln!(f, "  {}", warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_concerns_once() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "no warnings");
        diag.household(1, "no heat pump and no PV");
        diag.comfort("curve is not convex");
        diag.comfort("price is zero");
        assert_eq!(diag.summary(), "3 warnings (comfort, devices)");
    }

    #[test]
    fn test_loose_cone_display() {
        let mut diag = Diagnostics::new();
        diag.loose_cone(4, 12, 2.5e-3);
        let warning = diag.iter().next().unwrap();
        assert_eq!(
            warning.to_string(),
            "[soc-relaxation] branch cone gap 2.50e-3 (line 4) at t=12"
        );
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let mut diag = Diagnostics::new();
        diag.comfort("a");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json[0]["concern"], "comfort");
        assert!(json[0].get("step").is_none());
    }
}
