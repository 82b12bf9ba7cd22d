//! Radial network topology.
//!
//! The DistFlow recursion is only well defined on a tree: every non-slack bus
//! is fed by exactly one parent line, and the voltage of a bus follows from
//! its parent along the unique path to bus 0. [`Topology::from_lines`] checks
//! those conditions once, so constraint builders can index parents and
//! children without re-validating.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Index of the slack (transformer) bus.
pub const SLACK_BUS: usize = 0;

/// A distribution line oriented from parent (`start_node`) to child (`end_node`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub start_node: usize,
    pub end_node: usize,
    /// Series resistance in Ω
    pub r_ohm: f64,
    /// Series reactance in Ω
    pub x_ohm: f64,
    /// Rated current in kA
    pub i_nom_ka: f64,
}

impl Line {
    pub fn new(start_node: usize, end_node: usize, r_ohm: f64, x_ohm: f64, i_nom_ka: f64) -> Self {
        Self {
            start_node,
            end_node,
            r_ohm,
            x_ohm,
            i_nom_ka,
        }
    }

    /// |z|² = R² + X²
    pub fn impedance_sq(&self) -> f64 {
        self.r_ohm * self.r_ohm + self.x_ohm * self.x_ohm
    }

    /// Squared thermal current limit in kA².
    pub fn current_limit_sq(&self) -> f64 {
        self.i_nom_ka * self.i_nom_ka
    }
}

/// Validated tree over `n_bus = lines + 1` buses rooted at [`SLACK_BUS`].
#[derive(Debug, Clone)]
pub struct Topology {
    lines: Vec<Line>,
    parent_line: Vec<Option<usize>>,
    child_lines: Vec<Vec<usize>>,
    bfs_order: Vec<usize>,
}

impl Topology {
    /// Validate `lines` as a radial network and index it.
    pub fn from_lines(lines: &[Line]) -> Result<Self, ValidationError> {
        let n_bus = lines.len() + 1;
        let mut parent_line: Vec<Option<usize>> = vec![None; n_bus];
        let mut child_lines: Vec<Vec<usize>> = vec![Vec::new(); n_bus];

        let mut graph: DiGraph<usize, usize> = DiGraph::with_capacity(n_bus, lines.len());
        let nodes: Vec<NodeIndex> = (0..n_bus).map(|bus| graph.add_node(bus)).collect();

        for (idx, line) in lines.iter().enumerate() {
            for bus in [line.start_node, line.end_node] {
                if bus >= n_bus {
                    return Err(ValidationError::BusOutOfRange {
                        line: idx,
                        bus,
                        n_bus,
                    });
                }
            }
            if line.start_node == line.end_node {
                return Err(ValidationError::NotATree(format!(
                    "line {idx} connects bus {} to itself",
                    line.start_node
                )));
            }
            validate_line_rating(idx, line)?;

            if line.end_node == SLACK_BUS {
                return Err(ValidationError::RootHasParent { line: idx });
            }
            if let Some(first) = parent_line[line.end_node] {
                return Err(ValidationError::MultipleParents {
                    bus: line.end_node,
                    first,
                    second: idx,
                });
            }
            parent_line[line.end_node] = Some(idx);
            child_lines[line.start_node].push(idx);
            graph.add_edge(nodes[line.start_node], nodes[line.end_node], idx);
        }

        // n-1 distinct parents cover every non-root bus; a cycle shows up as
        // buses the slack cannot reach.
        let mut visited = vec![false; n_bus];
        let mut bfs_order = Vec::with_capacity(n_bus);
        let mut bfs = Bfs::new(&graph, nodes[SLACK_BUS]);
        while let Some(node) = bfs.next(&graph) {
            let bus = graph[node];
            visited[bus] = true;
            bfs_order.push(bus);
        }
        if let Some(bus) = visited.iter().position(|v| !v) {
            return Err(ValidationError::Unreachable { bus });
        }

        Ok(Self {
            lines: lines.to_vec(),
            parent_line,
            child_lines,
            bfs_order,
        })
    }

    pub fn n_bus(&self) -> usize {
        self.lines.len() + 1
    }

    pub fn n_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> &Line {
        &self.lines[idx]
    }

    /// Line feeding `bus`, `None` for the slack bus.
    pub fn parent_line(&self, bus: usize) -> Option<usize> {
        self.parent_line[bus]
    }

    /// Lines leaving `bus` toward its children.
    pub fn child_lines(&self, bus: usize) -> &[usize] {
        &self.child_lines[bus]
    }

    /// Buses in breadth-first order from the slack bus.
    pub fn bfs_order(&self) -> &[usize] {
        &self.bfs_order
    }

    /// Lines on the unique path from `bus` up to the slack bus, child first.
    pub fn path_to_root(&self, bus: usize) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = bus;
        while let Some(line) = self.parent_line[current] {
            path.push(line);
            current = self.lines[line].start_node;
        }
        path
    }
}

fn validate_line_rating(idx: usize, line: &Line) -> Result<(), ValidationError> {
    let name = format!("lines[{idx}]");
    if !line.r_ohm.is_finite() || line.r_ohm < 0.0 || !line.x_ohm.is_finite() || line.x_ohm < 0.0 {
        return Err(ValidationError::InvalidRating {
            name,
            reason: format!(
                "impedance must be finite and non-negative (R={}, X={})",
                line.r_ohm, line.x_ohm
            ),
        });
    }
    if !line.i_nom_ka.is_finite() || line.i_nom_ka <= 0.0 {
        return Err(ValidationError::InvalidRating {
            name,
            reason: format!("rated current must be positive, got {}", line.i_nom_ka),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(start: usize, end: usize) -> Line {
        Line::new(start, end, 0.05, 0.02, 0.2)
    }

    #[test]
    fn test_feeder_with_branch() {
        // 0 ─ 1 ─ 2
        //     └── 3
        let topo = Topology::from_lines(&[line(0, 1), line(1, 2), line(1, 3)]).unwrap();
        assert_eq!(topo.n_bus(), 4);
        assert_eq!(topo.parent_line(SLACK_BUS), None);
        assert_eq!(topo.parent_line(2), Some(1));
        assert_eq!(topo.child_lines(1), &[1, 2]);
        assert_eq!(topo.path_to_root(3), vec![2, 0]);
        assert_eq!(topo.bfs_order()[0], SLACK_BUS);
        assert_eq!(topo.bfs_order().len(), 4);
    }

    #[test]
    fn test_rejects_multiple_parents() {
        let err = Topology::from_lines(&[line(0, 1), line(0, 2), line(1, 2)]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MultipleParents {
                bus: 2,
                first: 1,
                second: 2
            }
        );
    }

    #[test]
    fn test_rejects_cycle_detached_from_root() {
        // 1 → 2 → 3 → 1 never reaches the slack bus
        let err = Topology::from_lines(&[line(1, 2), line(2, 3), line(3, 1)]).unwrap_err();
        assert!(matches!(err, ValidationError::Unreachable { .. }));
    }

    #[test]
    fn test_rejects_line_into_slack() {
        let err = Topology::from_lines(&[line(1, 0)]).unwrap_err();
        assert_eq!(err, ValidationError::RootHasParent { line: 0 });
    }

    #[test]
    fn test_rejects_out_of_range_bus() {
        let err = Topology::from_lines(&[line(0, 5)]).unwrap_err();
        assert!(matches!(err, ValidationError::BusOutOfRange { bus: 5, .. }));
    }

    #[test]
    fn test_rejects_zero_current_rating() {
        let err = Topology::from_lines(&[Line::new(0, 1, 0.1, 0.1, 0.0)]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRating { .. }));
    }

    #[test]
    fn test_impedance_helpers() {
        let l = Line::new(0, 1, 3.0, 4.0, 0.5);
        assert_eq!(l.impedance_sq(), 25.0);
        assert_eq!(l.current_limit_sq(), 0.25);
    }
}
