// Re-export key components
pub use crate::algo::{Classification, MetricResult, classify_or_default, compute_metric};
pub use crate::loading::geojson::{
    feature_set_from_collection, parse_feature_set, read_feature_set, write_feature_collection,
};
pub use crate::loading::{GraphBuilderConfig, Reprojector, SphericalMercator, build_street_graph};
pub use crate::model::{
    AnalysisParams, AnalysisType, ClassificationMethod, Crs, FeatureSet, LineFeature,
    MAX_CLASS_COUNT, Properties, WeightMode, parse_radius,
};
pub use crate::pipeline::{
    AnalysisOutput, AnalysisSummary, run_network_analysis, run_network_analysis_with,
};

pub use crate::Error;
