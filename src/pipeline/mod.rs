//! The document aggregation pipeline: batch lifecycle, per-document intake
//! and extraction, timeline synthesis, and visit scribing.

pub mod batch;
pub mod intake;
pub mod scribe;
pub mod synthesis;

use thiserror::Error;

use crate::ai::AiError;
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("batch not found: {0}")]
    BatchNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("generation failed: {0}")]
    Generation(#[from] AiError),
}

impl PipelineError {
    /// Re-tag a store-level NotFound to the entity the caller asked about.
    pub(crate) fn from_lookup(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => match entity_type.as_str() {
                "patient" => Self::PatientNotFound(id),
                "batch" => Self::BatchNotFound(id),
                "document" => Self::DocumentNotFound(id),
                _ => Self::Database(DatabaseError::NotFound { entity_type, id }),
            },
            other => Self::Database(other),
        }
    }
}
