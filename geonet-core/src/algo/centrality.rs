//! Node centrality metrics over the street graph

use log::{debug, warn};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use super::search::{SearchSpace, Traversal};
use crate::model::{AnalysisParams, AnalysisType, StreetGraph, WeightMode};

/// Score for every node of a street graph
#[derive(Debug, Clone, PartialEq)]
pub struct MetricResult {
    pub analysis: AnalysisType,
    /// Scores indexed by `NodeIndex::index()`
    pub scores: Vec<f64>,
}

impl MetricResult {
    /// Score of a node, 0 for nodes the metric never reached
    pub fn score(&self, node: NodeIndex) -> f64 {
        self.scores.get(node.index()).copied().unwrap_or(0.0)
    }

    pub fn column_name(&self) -> &'static str {
        self.analysis.column_name()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Computes the metric requested by `params`
pub fn compute_metric(streets: &StreetGraph, params: &AnalysisParams) -> MetricResult {
    let scores = match params.analysis_type {
        AnalysisType::Connectivity => degree(streets),
        AnalysisType::Closeness => closeness(streets, params.weight_mode, params.radius),
        AnalysisType::Betweenness => betweenness(streets, params.weight_mode, params.radius),
    };

    MetricResult {
        analysis: params.analysis_type,
        scores,
    }
}

/// Number of incident edges per node; parallel edges count separately and a
/// self-loop counts twice
pub fn degree(streets: &StreetGraph) -> Vec<f64> {
    let mut degrees = vec![0.0; streets.node_count()];
    for (_, start, end, _) in streets.edges() {
        degrees[start.index()] += 1.0;
        degrees[end.index()] += 1.0;
    }
    degrees
}

/// Closeness centrality: `(r - 1) / sum of distances` over the `r` nodes
/// (source included) reachable within `radius`, or within the whole
/// component when no radius is given. Nodes that reach nothing score 0.
pub fn closeness(streets: &StreetGraph, mode: WeightMode, radius: Option<f64>) -> Vec<f64> {
    let hood = streets.neighbourhood(mode);
    let node_count = hood.node_count();
    let traversal = traversal(mode);

    debug!(
        "Computing closeness over {node_count} nodes ({mode}, radius {})",
        radius.map_or_else(|| "global".to_string(), |r| r.to_string())
    );

    (0..node_count)
        .into_par_iter()
        .map_init(
            || SearchSpace::new(node_count),
            |space, source| {
                space.explore(&hood, source, traversal, radius, false);

                let reached = space.reached();
                let total: f64 = reached.iter().map(|&node| space.distance(node)).sum();
                if reached.len() > 1 && total > 0.0 {
                    (reached.len() - 1) as f64 / total
                } else {
                    0.0
                }
            },
        )
        .collect()
}

/// Betweenness centrality using Brandes' algorithm.
///
/// Scores are the fraction of shortest paths between ordered node pairs
/// `(s, t)`, `s != v != t`, that pass through `v`. `radius` is not applied:
/// the computation is always global.
pub fn betweenness(streets: &StreetGraph, mode: WeightMode, radius: Option<f64>) -> Vec<f64> {
    if let Some(radius) = radius {
        warn!("Betweenness is always computed globally, ignoring radius {radius}");
    }

    let hood = streets.neighbourhood(mode);
    let node_count = hood.node_count();
    let traversal = traversal(mode);

    debug!("Computing betweenness over {node_count} nodes ({mode})");

    let mut scores = (0..node_count)
        .into_par_iter()
        .fold(
            || BrandesPartial::new(node_count),
            |mut partial, source| {
                partial.space.explore(&hood, source, traversal, None, true);
                partial
                    .space
                    .accumulate_dependencies(&mut partial.delta, &mut partial.scores);
                partial
            },
        )
        .map(|partial| partial.scores)
        .reduce(
            || vec![0.0; node_count],
            |mut left, right| {
                for (total, value) in left.iter_mut().zip(right) {
                    *total += value;
                }
                left
            },
        );

    if node_count > 2 {
        let scale = 1.0 / ((node_count - 1) * (node_count - 2)) as f64;
        for score in &mut scores {
            *score *= scale;
        }
    }

    scores
}

/// Per-thread accumulation target for betweenness
struct BrandesPartial {
    space: SearchSpace,
    delta: Vec<f64>,
    scores: Vec<f64>,
}

impl BrandesPartial {
    fn new(node_count: usize) -> Self {
        Self {
            space: SearchSpace::new(node_count),
            delta: vec![0.0; node_count],
            scores: vec![0.0; node_count],
        }
    }
}

fn traversal(mode: WeightMode) -> Traversal {
    match mode {
        WeightMode::Euclidean => Traversal::Weighted,
        WeightMode::Topological => Traversal::Unweighted,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::{LineString, line_string};

    use super::*;
    use crate::loading::{GraphBuilderConfig, build_street_graph};
    use crate::model::Segment;

    fn graph(lines: Vec<LineString<f64>>) -> StreetGraph {
        let segments: Vec<Segment> = lines
            .into_iter()
            .enumerate()
            .map(|(source, geometry)| Segment { source, geometry })
            .collect();
        build_street_graph(&segments, &GraphBuilderConfig::default()).unwrap()
    }

    /// Straight path of `n` nodes spaced 10 units apart
    fn path(n: usize) -> StreetGraph {
        graph(
            (0..n - 1)
                .map(|i| {
                    let x = i as f64 * 10.0;
                    line_string![(x: x, y: 0.0), (x: x + 10.0, y: 0.0)]
                })
                .collect(),
        )
    }

    #[test]
    fn degree_counts_self_loops_twice() {
        let streets = graph(vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 15.0, y: 5.0), (x: 10.0, y: 0.0)],
        ]);

        assert_eq!(degree(&streets), vec![2.0, 4.0]);
    }

    #[test]
    fn single_segment_connectivity() {
        let streets = graph(vec![line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]]);
        let result = compute_metric(&streets, &AnalysisParams::new(AnalysisType::Connectivity));
        assert_eq!(result.scores, vec![1.0, 1.0]);
        assert_eq!(result.column_name(), "connectivity");
    }

    #[test]
    fn closeness_on_a_path() {
        let streets = path(3);
        let scores = closeness(&streets, WeightMode::Euclidean, None);
        // ends: 2 / (10 + 20), centre: 2 / (10 + 10)
        assert_relative_eq!(scores[0], 2.0 / 30.0);
        assert_relative_eq!(scores[1], 0.1);
        assert_relative_eq!(scores[2], 2.0 / 30.0);

        let hops = closeness(&streets, WeightMode::Topological, None);
        assert_relative_eq!(hops[0], 2.0 / 3.0);
        assert_relative_eq!(hops[1], 1.0);
    }

    #[test]
    fn closeness_radius_truncates_the_search() {
        let streets = path(5);
        let scores = closeness(&streets, WeightMode::Euclidean, Some(15.0));
        // every node only reaches direct neighbours
        assert_relative_eq!(scores[0], 1.0 / 10.0);
        assert_relative_eq!(scores[2], 2.0 / 20.0);

        let hops = closeness(&streets, WeightMode::Topological, Some(2.0));
        // node 0 reaches 1 and 2 at 1 and 2 hops
        assert_relative_eq!(hops[0], 2.0 / 3.0);
    }

    #[test]
    fn isolated_nodes_have_zero_closeness() {
        let streets = graph(vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 50.0, y: 50.0), (x: 55.0, y: 55.0), (x: 50.0, y: 50.0)],
        ]);

        let scores = closeness(&streets, WeightMode::Euclidean, None);
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[2], 0.0);
        assert!(scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn betweenness_on_a_path_is_symmetric_and_peaks_in_the_middle() {
        let streets = path(5);
        for mode in [WeightMode::Euclidean, WeightMode::Topological] {
            let scores = betweenness(&streets, mode, None);
            assert_eq!(scores[0], 0.0);
            assert_eq!(scores[4], 0.0);
            assert_relative_eq!(scores[1], scores[3]);
            assert!(scores[1] < scores[2]);
            // middle node lies on 4 of the 6 unordered pairs it is not part of
            assert_relative_eq!(scores[2], 4.0 / 6.0);
            assert_relative_eq!(scores[1], 3.0 / 6.0);
        }
    }

    #[test]
    fn betweenness_splits_between_equal_paths() {
        // Square: 0 and 2 are joined by two equally short routes
        let streets = graph(vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
            line_string![(x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            line_string![(x: 0.0, y: 10.0), (x: 0.0, y: 0.0)],
        ]);

        let scores = betweenness(&streets, WeightMode::Euclidean, None);
        for score in &scores {
            assert_relative_eq!(*score, 1.0 / 6.0);
        }
    }

    #[test]
    fn betweenness_ignores_radius() {
        let streets = path(5);
        let global = betweenness(&streets, WeightMode::Euclidean, None);
        let bounded = betweenness(&streets, WeightMode::Euclidean, Some(5.0));
        assert_eq!(global, bounded);
    }
}
