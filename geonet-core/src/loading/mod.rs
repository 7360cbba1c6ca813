//! This module is responsible for loading line features from vector data,
//! moving them into a metric reference system and building the street graph.

mod builder;
mod config;
pub mod crs;
pub mod geojson;
mod ingest;

pub use builder::{build_street_graph, line_length};
pub use config::GraphBuilderConfig;
pub use crs::{Reprojector, SphericalMercator};
pub use ingest::{IngestedSegments, WORKING_CRS, explode_features, working_crs_for};
