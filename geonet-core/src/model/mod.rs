//! Data model for street network analysis
//!
//! Contains input features, analysis parameters and the street graph.

pub mod feature;
pub mod params;
pub mod streets;

pub use feature::{Crs, FeatureSet, LineFeature, Properties, Segment};
pub use params::{
    AnalysisParams, AnalysisType, ClassificationMethod, MAX_CLASS_COUNT, WeightMode, parse_radius,
};
pub use streets::{IndexedPoint, Neighbourhood, StreetEdge, StreetGraph, StreetNode};
