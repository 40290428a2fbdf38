//! Visit scribing endpoints: upload a consultation recording, read back the
//! structured notes.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;

use super::documents::LimitQuery;
use super::{read_file_part, stage_upload};
use crate::api::error::ApiError;
use crate::api::router::{run_blocking, AppState};
use crate::db::note_store;
use crate::db::sqlite::open_database;
use crate::models::VisitNote;

/// `POST /api/patients/:id/visits` — transcribe a recording and store the
/// structured SOAP note.
pub async fn record(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<VisitNote>, ApiError> {
    let (file_name, bytes) = read_file_part(multipart).await?;

    let db_path = state.db_path.clone();
    let uploads_dir = state.uploads_dir.clone();
    let scribe = state.scribe.clone();
    let note = run_blocking(move || {
        let staged = stage_upload(&uploads_dir, &file_name, &bytes)?;
        let conn = open_database(&db_path)?;
        Ok(scribe.record_visit(&conn, &patient_id, &staged, Some(&file_name))?)
    })
    .await?;
    Ok(Json(note))
}

/// `GET /api/patients/:id/visits` — recent visit notes, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<VisitNote>>, ApiError> {
    let db_path = state.db_path.clone();
    let limit = query.limit.unwrap_or(state.recent_notes_limit);
    let notes = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(note_store::list_by_patient(&conn, &patient_id, limit)?)
    })
    .await?;
    Ok(Json(notes))
}
