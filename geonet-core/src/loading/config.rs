use serde::{Deserialize, Serialize};

/// Tolerances used when turning segments into a graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphBuilderConfig {
    /// Endpoints closer than this (in CRS units) resolve to the same node
    pub snap_tolerance: f64,
    /// Lower bound for edge lengths so degenerate segments never cost zero
    pub min_edge_length: f64,
}

impl Default for GraphBuilderConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: 1e-3,
            min_edge_length: 1e-6,
        }
    }
}
