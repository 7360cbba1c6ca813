//! Geometry ingest: explode multi-part features into single-part segments
//! expressed in a metric reference system.

use log::{debug, info};

use super::crs::Reprojector;
use crate::{
    Error,
    model::{Crs, FeatureSet, Segment},
};

/// Reference system used for distance computations when the input is
/// geographic
pub const WORKING_CRS: Crs = Crs::WebMercator;

/// Reference system the segments of an input in `input` end up in
pub fn working_crs_for(input: Crs) -> Crs {
    if input.is_projected() { input } else { WORKING_CRS }
}

/// Segments ready for graph construction
#[derive(Debug, Clone)]
pub struct IngestedSegments {
    pub segments: Vec<Segment>,
    /// Reference system of the segment coordinates (always projected)
    pub crs: Crs,
}

/// Explodes every feature into its parts and moves them into linear units.
///
/// Segment order follows feature order, then part order within a feature.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] for a feature without parts, a part
/// with fewer than two coordinates or a non-finite coordinate, and
/// [`Error::Reprojection`] when the reprojector rejects the input system.
/// Either aborts the whole ingest.
pub fn explode_features(
    features: &FeatureSet,
    reprojector: &dyn Reprojector,
) -> Result<IngestedSegments, Error> {
    let target_crs = working_crs_for(features.crs);

    if target_crs != features.crs {
        info!(
            "Input is in {}, reprojecting {} features to {}",
            features.crs,
            features.len(),
            target_crs
        );
    }

    let mut segments = Vec::with_capacity(features.len());
    for (source, feature) in features.features.iter().enumerate() {
        if feature.geometry.0.is_empty() {
            return Err(Error::InvalidGeometry(format!(
                "feature {source} has no line parts"
            )));
        }

        for (part_index, part) in feature.geometry.iter().enumerate() {
            validate_part(part, source, part_index)?;

            let geometry = reprojector.reproject(part, features.crs, target_crs)?;
            validate_part(&geometry, source, part_index)?;

            segments.push(Segment { source, geometry });
        }
    }

    debug!(
        "Exploded {} features into {} segments",
        features.len(),
        segments.len()
    );

    Ok(IngestedSegments {
        segments,
        crs: target_crs,
    })
}

fn validate_part(
    part: &geo::LineString<f64>,
    source: usize,
    part_index: usize,
) -> Result<(), Error> {
    if part.0.len() < 2 {
        return Err(Error::InvalidGeometry(format!(
            "feature {source} part {part_index} has {} coordinate(s), at least 2 are required",
            part.0.len()
        )));
    }
    if part.coords().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Error::InvalidGeometry(format!(
            "feature {source} part {part_index} has non-finite coordinates"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::{MultiLineString, line_string};
    use serde_json::json;

    use super::*;
    use crate::loading::crs::SphericalMercator;
    use crate::model::{LineFeature, Properties};

    fn props(name: &str) -> Properties {
        json!({ "name": name }).as_object().cloned().unwrap()
    }

    #[test]
    fn explodes_multi_part_features_in_order() {
        let features = FeatureSet::new(
            vec![
                LineFeature::new(
                    line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
                    props("a"),
                ),
                LineFeature::new(
                    MultiLineString::new(vec![
                        line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
                        line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)],
                    ]),
                    props("b"),
                ),
            ],
            Crs::Projected(32633),
        );

        let ingested = explode_features(&features, &SphericalMercator).unwrap();
        assert_eq!(ingested.crs, Crs::Projected(32633));
        let sources: Vec<usize> = ingested.segments.iter().map(|s| s.source).collect();
        assert_eq!(sources, vec![0, 1, 1]);
        assert_eq!(
            ingested.segments[2].geometry,
            line_string![(x: 10.0, y: 0.0), (x: 20.0, y: 0.0)]
        );
    }

    #[test]
    fn geographic_input_is_projected() {
        let features = FeatureSet::new(
            vec![LineFeature::new(
                line_string![(x: 0.0, y: 0.0), (x: 0.001, y: 0.0)],
                Properties::new(),
            )],
            Crs::Geographic,
        );

        let ingested = explode_features(&features, &SphericalMercator).unwrap();
        assert_eq!(ingested.crs, Crs::WebMercator);
        let end = ingested.segments[0].geometry.0[1];
        assert!((end.x - 111.319_490_793).abs() < 1e-6);
    }

    #[test]
    fn malformed_parts_abort() {
        let single_point = FeatureSet::new(
            vec![LineFeature::new(
                line_string![(x: 0.0, y: 0.0)],
                Properties::new(),
            )],
            Crs::WebMercator,
        );
        assert!(matches!(
            explode_features(&single_point, &SphericalMercator),
            Err(Error::InvalidGeometry(_))
        ));

        let not_finite = FeatureSet::new(
            vec![LineFeature::new(
                line_string![(x: 0.0, y: 0.0), (x: f64::NAN, y: 1.0)],
                Properties::new(),
            )],
            Crs::WebMercator,
        );
        assert!(explode_features(&not_finite, &SphericalMercator).is_err());

        let no_parts = FeatureSet::new(
            vec![LineFeature::new(
                MultiLineString::<f64>::new(vec![]),
                Properties::new(),
            )],
            Crs::WebMercator,
        );
        assert!(explode_features(&no_parts, &SphericalMercator).is_err());
    }
}
