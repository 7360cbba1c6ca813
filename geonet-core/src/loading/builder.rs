use geo::{Coord, Distance, Euclidean, LineString, Point};
use log::{info, trace};
use petgraph::graph::NodeIndex;

use super::config::GraphBuilderConfig;
use crate::{
    Error,
    model::{Segment, StreetEdge, StreetGraph},
};

/// Builds the primal street graph: segment ends become nodes, segments
/// become edges.
///
/// Endpoints within `snap_tolerance` of an existing node are merged into it.
/// Zero-length segments and self-loops are kept as degenerate edges.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for negative or non-finite tolerances
/// and [`Error::EmptyGraph`] when no segment produced an edge.
pub fn build_street_graph(
    segments: &[Segment],
    config: &GraphBuilderConfig,
) -> Result<StreetGraph, Error> {
    validate_config(config)?;

    let mut streets = StreetGraph::new();

    for (index, segment) in segments.iter().enumerate() {
        let (Some(&first), Some(&last)) = (segment.geometry.0.first(), segment.geometry.0.last())
        else {
            continue;
        };

        let start = resolve_node(&mut streets, first, config.snap_tolerance);
        let end = resolve_node(&mut streets, last, config.snap_tolerance);

        let length = line_length(&segment.geometry).max(config.min_edge_length);
        streets.add_edge(
            start,
            end,
            StreetEdge {
                segment: index,
                source: segment.source,
                length,
                geometry: segment.geometry.clone(),
            },
        );
    }

    if streets.is_empty() {
        return Err(Error::EmptyGraph);
    }

    info!(
        "Built street graph with {} nodes and {} edges from {} segments",
        streets.node_count(),
        streets.edge_count(),
        segments.len()
    );

    Ok(streets)
}

/// Cumulative euclidean length over every vertex of the line
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.lines()
        .map(|part| Euclidean.distance(part.start_point(), part.end_point()))
        .sum()
}

fn resolve_node(streets: &mut StreetGraph, coord: Coord<f64>, tolerance: f64) -> NodeIndex {
    let point = Point::from(coord);

    if let Some((node, distance)) = streets.nearest_node(&point)
        && distance <= tolerance
    {
        trace!("Snapped endpoint {coord:?} onto node {} ({distance:.6} away)", node.index());
        return node;
    }

    streets.add_node(point)
}

fn validate_config(config: &GraphBuilderConfig) -> Result<(), Error> {
    if !config.snap_tolerance.is_finite() || config.snap_tolerance < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "snap tolerance must be finite and non-negative, got {}",
            config.snap_tolerance
        )));
    }

    if !config.min_edge_length.is_finite() || config.min_edge_length <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "minimum edge length must be finite and positive, got {}",
            config.min_edge_length
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use geo::line_string;

    use super::*;

    fn segment(source: usize, geometry: LineString<f64>) -> Segment {
        Segment { source, geometry }
    }

    #[test]
    fn shared_endpoints_become_one_node() {
        let segments = vec![
            segment(0, line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)]),
            segment(1, line_string![(x: 100.0, y: 0.0), (x: 100.0, y: 50.0)]),
            segment(2, line_string![(x: 100.0, y: 0.0), (x: 180.0, y: 0.0)]),
        ];

        let streets = build_street_graph(&segments, &GraphBuilderConfig::default()).unwrap();
        assert_eq!(streets.node_count(), 4);
        assert_eq!(streets.edge_count(), 3);

        let hub = streets.nearest_node(&Point::new(100.0, 0.0)).unwrap().0;
        let incident = streets
            .edges()
            .filter(|(_, a, b, _)| *a == hub || *b == hub)
            .count();
        assert_eq!(incident, 3);
    }

    #[test]
    fn near_duplicate_coordinates_snap_within_tolerance() {
        let segments = vec![
            segment(0, line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]),
            segment(1, line_string![(x: 10.000_4, y: 0.000_2), (x: 20.0, y: 0.0)]),
            segment(2, line_string![(x: 20.5, y: 0.0), (x: 30.0, y: 0.0)]),
        ];

        let streets = build_street_graph(&segments, &GraphBuilderConfig::default()).unwrap();
        // 0-10 and 10-20 share a node, 20 and 20.5 are farther apart than the tolerance
        assert_eq!(streets.node_count(), 5);
    }

    #[test]
    fn length_follows_intermediate_vertices() {
        let segments = vec![segment(
            0,
            line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 4.0), (x: 6.0, y: 0.0)],
        )];

        let streets = build_street_graph(&segments, &GraphBuilderConfig::default()).unwrap();
        let (_, _, _, edge) = streets.edges().next().unwrap();
        assert_relative_eq!(edge.length, 10.0);
    }

    #[test]
    fn degenerate_segments_are_kept_with_positive_length() {
        let segments = vec![
            segment(0, line_string![(x: 5.0, y: 5.0), (x: 5.0, y: 5.0)]),
            segment(
                1,
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 0.0)],
            ),
        ];

        let config = GraphBuilderConfig::default();
        let streets = build_street_graph(&segments, &config).unwrap();
        assert_eq!(streets.edge_count(), 2);
        assert_eq!(streets.node_count(), 2);

        for (_, a, b, edge) in streets.edges() {
            assert_eq!(a, b);
            assert!(edge.length >= config.min_edge_length);
        }
    }

    #[test]
    fn no_segments_is_an_empty_graph() {
        assert!(matches!(
            build_street_graph(&[], &GraphBuilderConfig::default()),
            Err(Error::EmptyGraph)
        ));
    }

    #[test]
    fn rejects_negative_tolerance() {
        let config = GraphBuilderConfig {
            snap_tolerance: -1.0,
            ..GraphBuilderConfig::default()
        };
        assert!(matches!(
            build_street_graph(&[], &config),
            Err(Error::InvalidParameter(_))
        ));
    }
}
