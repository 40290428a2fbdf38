//! Patient registry endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::router::{run_blocking, AppState};
use crate::db::patient_store;
use crate::db::sqlite::open_database;
use crate::models::Patient;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `POST /api/patients` — register a patient.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<Patient>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let db_path = state.db_path.clone();
    let patient = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(patient_store::create(
            &conn,
            payload.name.trim(),
            payload.age,
            payload.gender.as_deref(),
            payload.phone.as_deref(),
        )?)
    })
    .await?;
    Ok(Json(patient))
}

/// `GET /api/patients` — all registered patients, newest first.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    let db_path = state.db_path.clone();
    let patients = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(patient_store::list(&conn)?)
    })
    .await?;
    Ok(Json(patients))
}

/// `GET /api/patients/:id`
pub async fn detail(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let db_path = state.db_path.clone();
    let patient = run_blocking(move || {
        let conn = open_database(&db_path)?;
        Ok(patient_store::get(&conn, &patient_id)?)
    })
    .await?;
    Ok(Json(patient))
}
