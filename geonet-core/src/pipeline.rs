//! End-to-end network analysis: ingest, graph, metric, projection,
//! classification and assembly of the output features.

use std::time::Instant;

use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::info;
use serde::Serialize;
use serde_json::json;

use crate::{
    Error,
    algo::{Classification, MetricResult, classify_or_default, compute_metric, project_to_edges},
    loading::{
        GraphBuilderConfig, Reprojector, SphericalMercator, build_street_graph, explode_features,
        working_crs_for,
    },
    model::{AnalysisParams, Crs, FeatureSet, StreetGraph},
};

/// Reference system of the output features
pub const OUTPUT_CRS: Crs = Crs::Geographic;

/// Counts describing one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub features: usize,
    pub segments: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// Result of [`run_network_analysis`]
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    /// One line feature per graph edge, in WGS84
    pub collection: FeatureCollection,
    /// Class bounds, usable as a map legend
    pub classification: Classification,
    pub summary: AnalysisSummary,
}

/// Runs the analysis with the default graph tolerances and the built-in
/// reprojector
///
/// # Errors
///
/// See [`run_network_analysis_with`].
pub fn run_network_analysis(
    features: &FeatureSet,
    params: &AnalysisParams,
) -> Result<AnalysisOutput, Error> {
    run_network_analysis_with(
        features,
        params,
        &GraphBuilderConfig::default(),
        &SphericalMercator,
    )
}

/// Runs the whole analysis pipeline on `features`.
///
/// # Errors
///
/// Fails without partial output on invalid parameters, invalid geometry,
/// reprojection failures or an empty graph. An input system the reprojector
/// cannot bring back to WGS84 is refused before any graph is built. Classification problems never
/// fail the run, they degrade to a single class.
pub fn run_network_analysis_with(
    features: &FeatureSet,
    params: &AnalysisParams,
    builder_config: &GraphBuilderConfig,
    reprojector: &dyn Reprojector,
) -> Result<AnalysisOutput, Error> {
    params.validate()?;
    let started = Instant::now();

    let working_crs = working_crs_for(features.crs);
    if !reprojector.supports(working_crs, OUTPUT_CRS) {
        return Err(Error::Reprojection {
            from: working_crs,
            to: OUTPUT_CRS,
            reason: "the reprojector cannot produce the output system".to_string(),
        });
    }

    let ingested = explode_features(features, reprojector)?;
    let streets = build_street_graph(&ingested.segments, builder_config)?;

    let metric = compute_metric(&streets, params);
    info!(
        "Computed {} for {} nodes in {:.2?}",
        metric.column_name(),
        metric.len(),
        started.elapsed()
    );

    let values = project_to_edges(&streets, &metric);
    let classification =
        classify_or_default(&values, params.classification_method, params.class_count);

    let collection = assemble_features(
        features,
        &streets,
        &metric,
        &values,
        &classification,
        ingested.crs,
        reprojector,
    )?;

    let summary = AnalysisSummary {
        features: features.len(),
        segments: ingested.segments.len(),
        nodes: streets.node_count(),
        edges: streets.edge_count(),
    };
    info!(
        "Analysis finished in {:.2?}: {} features, {} segments, {} nodes, {} edges, {} classes",
        started.elapsed(),
        summary.features,
        summary.segments,
        summary.nodes,
        summary.edges,
        classification.k
    );

    Ok(AnalysisOutput {
        collection,
        classification,
        summary,
    })
}

/// Builds the output collection: one feature per edge carrying the source
/// feature's attributes plus `value`, `class_id`, the metric column,
/// `length`, `node_start` and `node_end`, reprojected to WGS84.
///
/// # Errors
///
/// Returns [`Error::Reprojection`] when the geometry cannot be moved back to
/// WGS84.
pub fn assemble_features(
    features: &FeatureSet,
    streets: &StreetGraph,
    metric: &MetricResult,
    values: &[f64],
    classification: &Classification,
    working_crs: Crs,
    reprojector: &dyn Reprojector,
) -> Result<FeatureCollection, Error> {
    let column = metric.column_name();

    let output_features = streets
        .edges()
        .enumerate()
        .map(|(position, (_, start, end, edge))| {
            let value = values.get(position).copied().unwrap_or(0.0);
            let class_id = classification.class_ids.get(position).copied().unwrap_or(0);

            let mut properties = features
                .features
                .get(edge.source)
                .map(|feature| feature.properties.clone())
                .unwrap_or_default();
            properties.insert("value".to_string(), json!(value));
            properties.insert("class_id".to_string(), json!(class_id));
            properties.insert(column.to_string(), json!(value));
            properties.insert("length".to_string(), json!(edge.length));
            properties.insert("node_start".to_string(), json!(start.index()));
            properties.insert("node_end".to_string(), json!(end.index()));

            let geometry = reprojector.reproject(&edge.geometry, working_crs, OUTPUT_CRS)?;

            Ok(Feature {
                bbox: None,
                geometry: Some(Geometry::new(GeoJsonValue::from(&geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(FeatureCollection {
        features: output_features,
        bbox: None,
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geo::line_string;
    use serde_json::Value;

    use super::*;
    use crate::model::{AnalysisType, ClassificationMethod, LineFeature, Properties};

    fn named(name: &str) -> Properties {
        json!({ "name": name }).as_object().cloned().unwrap()
    }

    fn t_junction() -> FeatureSet {
        FeatureSet::new(
            vec![
                LineFeature::new(
                    line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)],
                    named("west"),
                ),
                LineFeature::new(
                    line_string![(x: 100.0, y: 0.0), (x: 200.0, y: 0.0)],
                    named("east"),
                ),
                LineFeature::new(
                    line_string![(x: 100.0, y: 0.0), (x: 100.0, y: 100.0)],
                    named("north"),
                ),
            ],
            Crs::WebMercator,
        )
    }

    #[test]
    fn output_carries_original_and_new_attributes() {
        let output = run_network_analysis(
            &t_junction(),
            &AnalysisParams::new(AnalysisType::Connectivity),
        )
        .unwrap();

        assert_eq!(
            output.summary,
            AnalysisSummary {
                features: 3,
                segments: 3,
                nodes: 4,
                edges: 3,
            }
        );
        assert_eq!(output.collection.features.len(), 3);

        let names: Vec<&str> = output
            .collection
            .features
            .iter()
            .map(|f| f.property("name").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(names, vec!["west", "east", "north"]);

        for feature in &output.collection.features {
            assert_eq!(feature.property("value"), Some(&json!(2.0)));
            assert_eq!(feature.property("connectivity"), Some(&json!(2.0)));
            assert_eq!(feature.property("class_id"), Some(&json!(0)));
            assert!(feature.property("length").is_some());
        }
    }

    #[test]
    fn output_geometry_is_geographic() {
        let output = run_network_analysis(
            &t_junction(),
            &AnalysisParams::new(AnalysisType::Closeness),
        )
        .unwrap();

        let geometry = output.collection.features[1].geometry.clone().unwrap();
        let geo::Geometry::LineString(line) = geo::Geometry::<f64>::try_from(geometry).unwrap()
        else {
            panic!("expected a line string");
        };
        // 200 m east of the origin is well under a hundredth of a degree
        assert!(line.0[1].x > 0.0017 && line.0[1].x < 0.0018);
        assert!(line.0[1].y.abs() < 1e-12);
    }

    #[test]
    fn empty_input_is_an_empty_graph() {
        let result = run_network_analysis(
            &FeatureSet::new(Vec::new(), Crs::WebMercator),
            &AnalysisParams::new(AnalysisType::Closeness),
        );
        assert!(matches!(result, Err(Error::EmptyGraph)));
    }

    /// Delegates to [`SphericalMercator`] and counts the geometries it moves
    #[derive(Default)]
    struct CountingReprojector {
        calls: AtomicUsize,
    }

    impl Reprojector for CountingReprojector {
        fn reproject(
            &self,
            geometry: &geo::LineString<f64>,
            from: Crs,
            to: Crs,
        ) -> Result<geo::LineString<f64>, Error> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            SphericalMercator.reproject(geometry, from, to)
        }

        fn supports(&self, from: Crs, to: Crs) -> bool {
            SphericalMercator.supports(from, to)
        }
    }

    #[test]
    fn unsupported_input_system_fails_before_the_graph_is_built() {
        let mut features = t_junction();
        features.crs = Crs::Projected(32643);
        let reprojector = CountingReprojector::default();

        let result = run_network_analysis_with(
            &features,
            &AnalysisParams::new(AnalysisType::Betweenness),
            &GraphBuilderConfig::default(),
            &reprojector,
        );

        assert!(matches!(
            result,
            Err(Error::Reprojection {
                from: Crs::Projected(32643),
                to: Crs::Geographic,
                ..
            })
        ));
        assert_eq!(reprojector.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn invalid_parameters_fail_before_any_work() {
        let mut params = AnalysisParams::new(AnalysisType::Betweenness);
        params.class_count = 0;
        params.classification_method = ClassificationMethod::Quantile;
        assert!(matches!(
            run_network_analysis(&t_junction(), &params),
            Err(Error::InvalidParameter(_))
        ));
    }
}
