//! Input features and their exploded single-part segments

use std::fmt;

use geo::{LineString, MultiLineString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Opaque attribute bag carried by a feature
pub type Properties = Map<String, JsonValue>;

/// Coordinate reference system of a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326)
    #[default]
    Geographic,
    /// Spherical Web Mercator in metres (EPSG:3857)
    WebMercator,
    /// Any other projected system, identified by its EPSG code and assumed
    /// to use linear units
    Projected(u32),
}

impl Crs {
    pub fn is_projected(self) -> bool {
        !matches!(self, Crs::Geographic)
    }

    pub fn epsg(self) -> u32 {
        match self {
            Crs::Geographic => 4326,
            Crs::WebMercator => 3857,
            Crs::Projected(code) => code,
        }
    }

    /// Maps an EPSG code to a reference system. Geographic datums that stay
    /// within a few metres of WGS84 are read as WGS84.
    pub fn from_epsg(code: u32) -> Self {
        match code {
            4326 | 4269 | 4258 | 4283 | 7844 | 4617 | 4167 | 4674 | 4490 | 4612 | 6668 => {
                Crs::Geographic
            }
            3857 | 900_913 | 3785 => Crs::WebMercator,
            other => Crs::Projected(other),
        }
    }

    /// Parses the CRS names found in legacy `GeoJSON` `crs` members, e.g.
    /// `EPSG:3857`, `urn:ogc:def:crs:EPSG::3857` or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.to_ascii_uppercase().ends_with("CRS84") {
            return Some(Crs::Geographic);
        }
        name.rsplit(':')
            .next()
            .and_then(|code| code.parse::<u32>().ok())
            .map(Crs::from_epsg)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// One input record: a possibly multi-part polyline plus its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub geometry: MultiLineString<f64>,
    pub properties: Properties,
}

impl LineFeature {
    pub fn new(geometry: impl Into<MultiLineString<f64>>, properties: Properties) -> Self {
        Self {
            geometry: geometry.into(),
            properties,
        }
    }
}

/// Feature collection together with the CRS its coordinates are expressed in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub features: Vec<LineFeature>,
    pub crs: Crs,
}

impl FeatureSet {
    pub fn new(features: Vec<LineFeature>, crs: Crs) -> Self {
        Self { features, crs }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Single-part polyline produced by exploding a [`LineFeature`]
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index of the originating feature in its [`FeatureSet`]
    pub source: usize,
    pub geometry: LineString<f64>,
}
