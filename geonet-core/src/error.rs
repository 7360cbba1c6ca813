use thiserror::Error;

use crate::model::Crs;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("No segments could be resolved into graph edges")]
    EmptyGraph,
    #[error("Unknown analysis type: {0}")]
    UnknownAnalysisType(String),
    #[error("Unsupported classification method: {0}")]
    UnsupportedClassificationMethod(String),
    #[error("Unknown weight mode: {0}")]
    UnknownWeightMode(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Failed to reproject from {from} to {to}: {reason}")]
    Reprojection { from: Crs, to: Crs, reason: String },
    #[error("Missing sidecar files: {0}")]
    MissingSidecarFiles(String),
    #[error("Classification error: {0}")]
    Classification(String),
    /// Unreadable input `GeoJSON`
    #[error("GeoJSON error: {0}")]
    GeoJson(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the
    /// environment. Transports use this to pick a client or server status.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Error::IoError(_) | Error::Classification(_))
    }
}
