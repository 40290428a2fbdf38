//! Batch and document endpoints: start a scanning batch, upload prescription
//! images into it, close it to synthesize the timeline, and read the results.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{read_file_part, stage_upload};
use crate::api::error::ApiError;
use crate::api::router::{run_blocking, AppState};
use crate::db::sqlite::open_database;
use crate::db::{batch_store, document_store};
use crate::models::{
    DocumentBatch, DocumentStatus, ExtractionOutcome, PrescriptionPayload, ScannedDocument,
    Timeline,
};

/// Wire shape for a document: the extraction sum type flattened into the
/// status / payload / failure_reason triple clients expect.
#[derive(Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub patient_id: String,
    pub batch_id: String,
    pub file_name: String,
    pub status: DocumentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<PrescriptionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub position: u32,
    pub uploaded_at: chrono::NaiveDateTime,
}

impl From<ScannedDocument> for DocumentResponse {
    fn from(doc: ScannedDocument) -> Self {
        let status = doc.status();
        let (payload, failure_reason) = match doc.extraction {
            ExtractionOutcome::Pending => (None, None),
            ExtractionOutcome::Extracted(payload) => (Some(payload), None),
            ExtractionOutcome::Failed { reason } => (None, Some(reason)),
        };
        Self {
            id: doc.id,
            patient_id: doc.patient_id,
            batch_id: doc.batch_id,
            file_name: doc.file_name,
            status,
            payload,
            failure_reason,
            position: doc.position,
            uploaded_at: doc.uploaded_at,
        }
    }
}

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

/// `POST /api/patients/:id/batches` — start (or rejoin) the active batch.
pub async fn start_batch(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<DocumentBatch>, ApiError> {
    let db_path = state.db_path.clone();
    let tracker = state.tracker.clone();
    let batch = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(tracker.start_batch(&conn, &patient_id)?)
    })
    .await?;
    Ok(Json(batch))
}

/// `POST /api/batches/:id/documents` — upload one prescription image into
/// the batch and run extraction on it.
pub async fn upload(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<DocumentResponse>, ApiError> {
    let (file_name, bytes) = read_file_part(multipart).await?;

    let db_path = state.db_path.clone();
    let uploads_dir = state.uploads_dir.clone();
    let intake = state.intake.clone();
    let doc = run_blocking(move || {
        let staged = stage_upload(&uploads_dir, &file_name, &bytes)?;
        let conn = open_database(&db_path)?;
        let batch = batch_store::get_by_id(&conn, &batch_id)
            .map_err(crate::pipeline::PipelineError::from_lookup)
            .map_err(ApiError::from)?;
        Ok(intake.ingest(&conn, &batch.patient_id, &batch_id, &file_name, &staged)?)
    })
    .await?;
    Ok(Json(doc.into()))
}

/// `POST /api/batches/:id/complete` — close the batch and synthesize the
/// patient timeline from its documents.
pub async fn complete(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> Result<Json<Timeline>, ApiError> {
    let db_path = state.db_path.clone();
    let tracker = state.tracker.clone();
    let timeline = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(tracker.request_completion(&conn, &batch_id)?)
    })
    .await?;
    Ok(Json(timeline))
}

/// `GET /api/patients/:id/timeline` — the patient's current timeline.
pub async fn timeline(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Timeline>, ApiError> {
    let db_path = state.db_path.clone();
    let tracker = state.tracker.clone();
    let timeline = run_blocking(move || {
        let conn = open_database(&db_path)?;
        tracker
            .timeline_for_patient(&conn, &patient_id)
            .map_err(ApiError::from)?
            .ok_or_else(|| ApiError::NotFound(format!("timeline for patient {patient_id}")))
    })
    .await?;
    Ok(Json(timeline))
}

/// `GET /api/patients/:id/documents` — recent documents, newest first.
pub async fn list_documents(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let db_path = state.db_path.clone();
    let limit = query.limit.unwrap_or(state.recent_documents_limit);
    let docs = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(document_store::list_by_patient(&conn, &patient_id, limit)?)
    })
    .await?;
    Ok(Json(docs.into_iter().map(DocumentResponse::from).collect()))
}

/// `GET /api/patients/:id/batches` — the patient's batches, newest first.
pub async fn list_batches(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<DocumentBatch>>, ApiError> {
    let db_path = state.db_path.clone();
    let batches = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(batch_store::list_by_patient(&conn, &patient_id)?)
    })
    .await?;
    Ok(Json(batches))
}
