//! `GeoJSON` reading and writing

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use geo::MultiLineString;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use log::debug;

use crate::{
    Error,
    model::{Crs, FeatureSet, LineFeature},
};

/// Reads a `GeoJSON` file into a [`FeatureSet`]
///
/// # Errors
///
/// Returns [`Error::IoError`] if the file cannot be opened, [`Error::GeoJson`]
/// if it is not valid `GeoJSON` and [`Error::InvalidGeometry`] if a feature
/// carries anything but line geometry.
pub fn read_feature_set(path: &Path) -> Result<FeatureSet, Error> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to open file '{}': {}", path.display(), e),
        )
    })?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .map_err(|e| Error::GeoJson(format!("{}: {e}", path.display())))?;

    let features = feature_set_from_geojson(geojson)?;
    debug!(
        "Read {} features in {} from {}",
        features.len(),
        features.crs,
        path.display()
    );
    Ok(features)
}

/// Parses `GeoJSON` text into a [`FeatureSet`]
///
/// # Errors
///
/// See [`read_feature_set`].
pub fn parse_feature_set(text: &str) -> Result<FeatureSet, Error> {
    let geojson = text
        .parse::<GeoJson>()
        .map_err(|e| Error::GeoJson(e.to_string()))?;
    feature_set_from_geojson(geojson)
}

/// Converts any `GeoJSON` object holding line geometry into a [`FeatureSet`].
///
/// A collection without a legacy `crs` member is WGS84, as RFC 7946 demands.
///
/// # Errors
///
/// Returns [`Error::InvalidGeometry`] for features without geometry or with
/// non-line geometry.
pub fn feature_set_from_geojson(geojson: GeoJson) -> Result<FeatureSet, Error> {
    match geojson {
        GeoJson::FeatureCollection(collection) => feature_set_from_collection(collection),
        GeoJson::Feature(feature) => {
            let crs = declared_crs(feature.foreign_members.as_ref());
            let feature = line_feature(feature, 0)?;
            Ok(FeatureSet::new(vec![feature], crs))
        }
        GeoJson::Geometry(geometry) => {
            let crs = declared_crs(geometry.foreign_members.as_ref());
            let geometry = line_geometry(geometry, 0)?;
            Ok(FeatureSet::new(
                vec![LineFeature::new(geometry, JsonObject::new())],
                crs,
            ))
        }
    }
}

/// Converts a parsed feature collection into a [`FeatureSet`]
///
/// # Errors
///
/// See [`feature_set_from_geojson`].
pub fn feature_set_from_collection(collection: FeatureCollection) -> Result<FeatureSet, Error> {
    let crs = declared_crs(collection.foreign_members.as_ref());
    let features = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| line_feature(feature, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureSet::new(features, crs))
}

/// Writes a feature collection as pretty-printed `GeoJSON` and returns the
/// number of features written
///
/// # Errors
///
/// Returns [`Error::IoError`] when the file cannot be created or written.
pub fn write_feature_collection(
    collection: &FeatureCollection,
    path: &Path,
) -> Result<usize, Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, collection).map_err(std::io::Error::from)?;
    writer.flush()?;

    debug!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(collection.features.len())
}

fn declared_crs(foreign_members: Option<&JsonObject>) -> Crs {
    foreign_members
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(serde_json::Value::as_str)
        .and_then(Crs::from_name)
        .unwrap_or_default()
}

fn line_feature(feature: Feature, index: usize) -> Result<LineFeature, Error> {
    let geometry = feature.geometry.ok_or_else(|| {
        Error::InvalidGeometry(format!("feature {index} has no geometry"))
    })?;
    let geometry = line_geometry(geometry, index)?;

    Ok(LineFeature::new(geometry, feature.properties.unwrap_or_default()))
}

fn line_geometry(geometry: Geometry, index: usize) -> Result<MultiLineString<f64>, Error> {
    let geometry = geo::Geometry::<f64>::try_from(geometry)
        .map_err(|e| Error::InvalidGeometry(format!("feature {index}: {e}")))?;

    match geometry {
        geo::Geometry::LineString(line) => Ok(MultiLineString::new(vec![line])),
        geo::Geometry::MultiLineString(lines) => Ok(lines),
        other => Err(Error::InvalidGeometry(format!(
            "feature {index} is a {} but line geometry is required",
            geometry_name(&other)
        ))),
    }
}

fn geometry_name(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
