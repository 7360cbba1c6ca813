//! Street network components - nodes and edges

use geo::{LineString, Point};

use crate::model::WeightMode;

/// Street graph node: a unique (snapped) location shared by segment ends
#[derive(Debug, Clone)]
pub struct StreetNode {
    pub geometry: Point<f64>,
}

/// Street graph edge, one per exploded segment
#[derive(Debug, Clone)]
pub struct StreetEdge {
    /// Index of the segment this edge was built from
    pub segment: usize,
    /// Index of the feature the segment was exploded from
    pub source: usize,
    /// Cumulative euclidean length along the segment, in CRS units
    pub length: f64,
    pub geometry: LineString<f64>,
}

impl StreetEdge {
    /// Traversal cost of the edge under the given weight mode
    pub fn cost(&self, mode: WeightMode) -> f64 {
        match mode {
            WeightMode::Euclidean => self.length,
            WeightMode::Topological => 1.0,
        }
    }
}
