//! Street network analysis: builds a primal graph from line features,
//! computes node centrality, projects it onto the street segments and
//! classifies the result for display.

pub mod algo;
mod error;
pub mod loading;
pub mod model;
pub mod pipeline;
pub mod prelude;

pub use error::Error;
pub use loading::{GraphBuilderConfig, Reprojector, SphericalMercator};
pub use model::{
    AnalysisParams, AnalysisType, ClassificationMethod, Crs, FeatureSet, LineFeature, StreetGraph,
    WeightMode,
};
pub use pipeline::{AnalysisOutput, AnalysisSummary, run_network_analysis, run_network_analysis_with};
