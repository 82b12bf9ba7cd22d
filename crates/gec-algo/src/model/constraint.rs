//! Constraint descriptors and the contract every formulation block implements.
//!
//! Blocks never talk to a solver. They return [`Constraint`] descriptors that
//! the builder collects into a [`super::DispatchModel`]; a solver adapter
//! lowers the descriptors into its own representation. Every descriptor
//! carries a [`ConstraintTag`] that is unique within one model, so solver
//! diagnostics (IIS reports, exported models) can name constraints.

use gec_core::ParameterSet;
use serde::Serialize;

use super::expr::{LinExpr, VarId};
use super::variables::VariableSpace;

/// Formulation block a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    Network,
    HeatSource,
    Thermal,
    Coupling,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Network => "network",
            Component::HeatSource => "heat-source",
            Component::Thermal => "thermal",
            Component::Coupling => "coupling",
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one constraint: block, family name and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConstraintTag {
    pub component: Component,
    pub name: &'static str,
    /// Bus, line or user index, depending on the family
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<usize>,
    /// Sub-index within one entity and step (e.g. comfort segment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ConstraintTag {
    pub fn new(component: Component, name: &'static str) -> Self {
        Self {
            component,
            name,
            entity: None,
            time: None,
            index: None,
        }
    }

    pub fn entity(mut self, entity: usize) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn at(mut self, t: usize) -> Self {
        self.time = Some(t);
        self
    }

    pub fn index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl std::fmt::Display for ConstraintTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.component, self.name)?;
        let parts: Vec<String> = [
            self.entity.map(|e| format!("e={e}")),
            self.time.map(|t| format!("t={t}")),
            self.index.map(|k| format!("k={k}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !parts.is_empty() {
            write!(f, "[{}]", parts.join(","))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sense {
    Eq,
    Le,
    Ge,
}

impl Sense {
    pub fn symbol(&self) -> &'static str {
        match self {
            Sense::Eq => "=",
            Sense::Le => "<=",
            Sense::Ge => ">=",
        }
    }
}

/// Mathematical content of a constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintBody {
    /// `expr sense rhs`; `expr` carries no constant
    Linear {
        expr: LinExpr,
        sense: Sense,
        rhs: f64,
    },
    /// `‖terms‖₂ ≤ bound`
    SecondOrderCone { bound: LinExpr, terms: Vec<LinExpr> },
    /// `Σ terms² ≤ y·z` with `y, z ≥ 0`
    RotatedCone {
        terms: Vec<LinExpr>,
        y: LinExpr,
        z: LinExpr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub tag: ConstraintTag,
    pub body: ConstraintBody,
}

impl Constraint {
    /// `lhs sense rhs`, normalized so every constant sits on the right.
    pub fn linear(tag: ConstraintTag, lhs: impl Into<LinExpr>, sense: Sense, rhs: impl Into<LinExpr>) -> Self {
        let lhs: LinExpr = lhs.into();
        let rhs: LinExpr = rhs.into();
        let diff = lhs - rhs;
        let rhs = -diff.constant_value();
        Self {
            tag,
            body: ConstraintBody::Linear {
                expr: diff.without_constant(),
                sense,
                rhs,
            },
        }
    }

    pub fn eq(tag: ConstraintTag, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::linear(tag, lhs, Sense::Eq, rhs)
    }

    pub fn le(tag: ConstraintTag, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::linear(tag, lhs, Sense::Le, rhs)
    }

    pub fn ge(tag: ConstraintTag, lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::linear(tag, lhs, Sense::Ge, rhs)
    }

    pub fn second_order_cone(tag: ConstraintTag, bound: impl Into<LinExpr>, terms: Vec<LinExpr>) -> Self {
        Self {
            tag,
            body: ConstraintBody::SecondOrderCone {
                bound: bound.into(),
                terms,
            },
        }
    }

    pub fn rotated_cone(
        tag: ConstraintTag,
        terms: Vec<LinExpr>,
        y: impl Into<LinExpr>,
        z: impl Into<LinExpr>,
    ) -> Self {
        Self {
            tag,
            body: ConstraintBody::RotatedCone {
                terms,
                y: y.into(),
                z: z.into(),
            },
        }
    }

    pub fn is_conic(&self) -> bool {
        !matches!(self.body, ConstraintBody::Linear { .. })
    }

    /// Variables referenced by the constraint.
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars: Vec<VarId> = match &self.body {
            ConstraintBody::Linear { expr, .. } => expr.terms().map(|(v, _)| v).collect(),
            ConstraintBody::SecondOrderCone { bound, terms } => std::iter::once(bound)
                .chain(terms.iter())
                .flat_map(|e| e.terms().map(|(v, _)| v))
                .collect(),
            ConstraintBody::RotatedCone { terms, y, z } => [y, z]
                .into_iter()
                .chain(terms.iter())
                .flat_map(|e| e.terms().map(|(v, _)| v))
                .collect(),
        };
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    /// Amount by which `values` violates the constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        match &self.body {
            ConstraintBody::Linear { expr, sense, rhs } => {
                let lhs = expr.evaluate(values);
                match sense {
                    Sense::Eq => (lhs - rhs).abs(),
                    Sense::Le => (lhs - rhs).max(0.0),
                    Sense::Ge => (rhs - lhs).max(0.0),
                }
            }
            ConstraintBody::SecondOrderCone { bound, terms } => {
                let norm = terms
                    .iter()
                    .map(|e| e.evaluate(values).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (norm - bound.evaluate(values)).max(0.0)
            }
            ConstraintBody::RotatedCone { terms, y, z } => {
                let sq = terms.iter().map(|e| e.evaluate(values).powi(2)).sum::<f64>();
                let (y, z) = (y.evaluate(values), z.evaluate(values));
                (sq - y * z).max(0.0).max(-y).max(-z)
            }
        }
    }
}

/// One formulation block.
///
/// `contribute` is called once per time step and must be a pure function of
/// its inputs; building the same case twice yields identical descriptors.
pub trait ConstraintModule: Send + Sync {
    fn component(&self) -> Component;

    fn contribute(&self, vars: &VariableSpace, t: usize, params: &ParameterSet) -> Vec<Constraint>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display() {
        let tag = ConstraintTag::new(Component::Thermal, "ppd_segment")
            .entity(2)
            .at(7)
            .index(1);
        assert_eq!(tag.to_string(), "thermal.ppd_segment[e=2,t=7,k=1]");
        let bare = ConstraintTag::new(Component::Network, "slack_voltage").at(0);
        assert_eq!(bare.to_string(), "network.slack_voltage[t=0]");
    }

    #[test]
    fn test_linear_moves_constants_right() {
        let x = VarId::new(0);
        let c = Constraint::le(
            ConstraintTag::new(Component::Coupling, "pv_limit"),
            2.0 * x + 1.0,
            LinExpr::constant(5.0),
        );
        match &c.body {
            ConstraintBody::Linear { expr, sense, rhs } => {
                assert_eq!(expr.coefficient(x), 2.0);
                assert_eq!(expr.constant_value(), 0.0);
                assert_eq!(*sense, Sense::Le);
                assert_eq!(*rhs, 4.0);
            }
            other => panic!("unexpected body {other:?}"),
        }
        assert_eq!(c.violation(&[1.0]), 0.0);
        assert_eq!(c.violation(&[3.0]), 2.0);
    }

    #[test]
    fn test_rotated_cone_violation() {
        let p = VarId::new(0);
        let l = VarId::new(1);
        let v = VarId::new(2);
        let c = Constraint::rotated_cone(
            ConstraintTag::new(Component::Network, "branch_cone"),
            vec![LinExpr::from(p)],
            l,
            v,
        );
        assert_eq!(c.violation(&[2.0, 1.0, 4.0]), 0.0);
        assert_eq!(c.violation(&[3.0, 1.0, 4.0]), 5.0);
        assert_eq!(c.variables(), vec![p, l, v]);
    }
}
