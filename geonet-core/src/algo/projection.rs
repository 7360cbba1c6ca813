//! Projection of node scores onto edges

use super::centrality::MetricResult;
use crate::model::StreetGraph;

/// Value of every edge, in edge index order: the mean of its two endpoint
/// scores. Missing scores count as 0.
pub fn project_to_edges(streets: &StreetGraph, metric: &MetricResult) -> Vec<f64> {
    streets
        .edges()
        .map(|(_, start, end, _)| (metric.score(start) + metric.score(end)) / 2.0)
        .collect()
}
