//! Batch lifecycle orchestration.
//!
//! A batch moves pending → processing → completed | failed. Completion runs
//! synthesis; a degraded timeline still completes the batch, while a failed
//! generation call fails it and writes no timeline at all.

use rusqlite::Connection;
use tracing::{error, info};

use super::synthesis::TimelineSynthesizer;
use super::PipelineError;
use crate::db::{batch_store, document_store, patient_store, timeline_store};
use crate::models::{BatchStatus, DocumentBatch, Timeline};

pub struct BatchTracker {
    synthesizer: TimelineSynthesizer,
}

impl BatchTracker {
    pub fn new(synthesizer: TimelineSynthesizer) -> Self {
        Self { synthesizer }
    }

    /// Start a scanning batch for the patient. Idempotent while a batch is
    /// active: repeated calls return the same batch.
    pub fn start_batch(
        &self,
        conn: &Connection,
        patient_id: &str,
    ) -> Result<DocumentBatch, PipelineError> {
        patient_store::get(conn, patient_id).map_err(PipelineError::from_lookup)?;
        let batch =
            batch_store::create_if_no_active(conn, patient_id).map_err(PipelineError::from)?;
        info!(batch_id = %batch.id, patient_id, "batch active");
        Ok(batch)
    }

    /// Close the batch and synthesize the patient's timeline from it.
    pub fn request_completion(
        &self,
        conn: &Connection,
        batch_id: &str,
    ) -> Result<Timeline, PipelineError> {
        let batch = batch_store::get_by_id(conn, batch_id).map_err(PipelineError::from_lookup)?;
        if !batch.status.is_active() {
            return Err(PipelineError::InvalidState(format!(
                "batch {} is already {}",
                batch.id, batch.status
            )));
        }

        let documents = document_store::list_by_batch(conn, batch_id)?;
        if documents.is_empty() {
            return Err(PipelineError::InvalidState(
                "no documents in batch".to_string(),
            ));
        }

        if batch.status == BatchStatus::Pending {
            batch_store::set_status(conn, batch_id, BatchStatus::Processing)?;
        }

        let patient =
            patient_store::get(conn, &batch.patient_id).map_err(PipelineError::from_lookup)?;

        match self.synthesizer.synthesize(&batch, &documents, &patient) {
            Ok(timeline) => {
                timeline_store::replace_for_patient(conn, &timeline)?;
                batch_store::set_status(conn, batch_id, BatchStatus::Completed)?;
                info!(
                    batch_id,
                    events = timeline.events.len(),
                    degraded = timeline.is_degraded(),
                    "batch completed"
                );
                Ok(timeline)
            }
            Err(e) => {
                error!(batch_id, "timeline generation failed: {e}");
                batch_store::set_status(conn, batch_id, BatchStatus::Failed)?;
                Err(PipelineError::Generation(e))
            }
        }
    }

    pub fn timeline_for_patient(
        &self,
        conn: &Connection,
        patient_id: &str,
    ) -> Result<Option<Timeline>, PipelineError> {
        patient_store::get(conn, patient_id).map_err(PipelineError::from_lookup)?;
        Ok(timeline_store::get_for_patient(conn, patient_id)?)
    }
}
