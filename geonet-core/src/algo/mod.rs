//! Graph metrics, their projection onto edges and value classification

pub mod centrality;
pub mod classify;
pub mod projection;
pub mod search;

pub use centrality::{MetricResult, betweenness, closeness, compute_metric, degree};
pub use classify::{Classification, classify, classify_or_default};
pub use projection::project_to_edges;
