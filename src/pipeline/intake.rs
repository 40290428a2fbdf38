//! Document intake: persist an upload, attach it to its batch, run vision
//! extraction, and record the outcome.
//!
//! An extraction failure is data, not an error: the document is kept with a
//! failure reason and the upload still succeeds.

use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

use super::PipelineError;
use crate::ai::VisionExtractor;
use crate::db::{batch_store, document_store, patient_store};
use crate::models::{ExtractionOutcome, ScannedDocument};

pub struct DocumentIntake {
    extractor: Box<dyn VisionExtractor>,
}

impl DocumentIntake {
    pub fn new(extractor: Box<dyn VisionExtractor>) -> Self {
        Self { extractor }
    }

    pub fn ingest(
        &self,
        conn: &Connection,
        patient_id: &str,
        batch_id: &str,
        file_name: &str,
        image: &Path,
    ) -> Result<ScannedDocument, PipelineError> {
        patient_store::get(conn, patient_id).map_err(PipelineError::from_lookup)?;
        let batch = batch_store::get_by_id(conn, batch_id).map_err(PipelineError::from_lookup)?;
        if batch.patient_id != patient_id {
            return Err(PipelineError::InvalidState(format!(
                "batch {} does not belong to patient {}",
                batch_id, patient_id
            )));
        }
        if !batch.status.is_active() {
            return Err(PipelineError::InvalidState(format!(
                "batch {} is already {}",
                batch_id, batch.status
            )));
        }

        let doc = document_store::create(conn, patient_id, batch_id, file_name)?;
        let position = batch_store::attach_document(conn, batch_id, &doc.id)?;

        let outcome = match self.extractor.extract(image) {
            Ok(payload) => {
                info!(
                    document_id = %doc.id,
                    position,
                    medications = payload.medications.len(),
                    "extraction completed"
                );
                ExtractionOutcome::Extracted(payload)
            }
            Err(e) => {
                warn!(document_id = %doc.id, position, "extraction failed: {e}");
                ExtractionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        document_store::update_extraction(conn, &doc.id, &outcome)?;

        Ok(document_store::get_by_id(conn, &doc.id)?)
    }
}
