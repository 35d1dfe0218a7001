use thiserror::Error;

use crate::cache::ServiceCacheError;

/// Failures of the metadata store.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata storage error: {0}")]
    Storage(#[from] ServiceCacheError),

    /// A stored record no longer decodes.
    #[error("Corrupt metadata record {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Failed to encode metadata record: {0}")]
    Encode(String),
}

/// Failures talking to the ingestion-status collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestionError {
    /// The collaborator has no record of the file.
    #[error("No such file: {0}")]
    UnknownFile(String),

    /// Transport failure or undecodable reply.
    #[error("Ingestion service unavailable: {0}")]
    Unavailable(String),
}
