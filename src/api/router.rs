//! API router and shared handler state.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::error::ApiError;
use crate::pipeline::batch::BatchTracker;
use crate::pipeline::intake::DocumentIntake;
use crate::pipeline::scribe::VisitScribe;

/// Maximum upload size (16 MB) — covers phone camera photos and short
/// consultation recordings.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Everything a handler needs. Cheap to clone; the collaborators are shared.
#[derive(Clone)]
pub struct AppState {
    pub db_path: Arc<PathBuf>,
    pub uploads_dir: Arc<PathBuf>,
    pub tracker: Arc<BatchTracker>,
    pub intake: Arc<DocumentIntake>,
    pub scribe: Arc<VisitScribe>,
    pub recent_notes_limit: u32,
    pub recent_documents_limit: u32,
}

/// Build the API router. Routes are nested under `/api/`.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/patients",
            post(endpoints::patients::register).get(endpoints::patients::list),
        )
        .route("/patients/:id", get(endpoints::patients::detail))
        .route(
            "/patients/:id/batches",
            post(endpoints::documents::start_batch).get(endpoints::documents::list_batches),
        )
        .route(
            "/patients/:id/documents",
            get(endpoints::documents::list_documents),
        )
        .route(
            "/patients/:id/timeline",
            get(endpoints::documents::timeline),
        )
        .route(
            "/patients/:id/visits",
            post(endpoints::notes::record).get(endpoints::notes::list),
        )
        .route(
            "/batches/:id/documents",
            post(endpoints::documents::upload),
        )
        .route(
            "/batches/:id/complete",
            post(endpoints::documents::complete),
        );

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run a blocking pipeline call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::ai::mock::{MockTextGenerator, MockTranscriber, MockVisionExtractor};
    use crate::db::sqlite::open_database;
    use crate::pipeline::synthesis::TimelineSynthesizer;

    fn test_state(dir: &tempfile::TempDir, reply: &str) -> AppState {
        let db_path = dir.path().join("test.db");
        // create schema up front so handlers only open
        open_database(&db_path).unwrap();

        AppState {
            db_path: Arc::new(db_path),
            uploads_dir: Arc::new(dir.path().join("uploads")),
            tracker: Arc::new(BatchTracker::new(TimelineSynthesizer::new(Box::new(
                MockTextGenerator::replying(reply),
            )))),
            intake: Arc::new(DocumentIntake::new(Box::new(
                MockVisionExtractor::extracting_named("Metformin"),
            ))),
            scribe: Arc::new(
                VisitScribe::new(
                    Box::new(MockTranscriber::completing("bukhar hai")),
                    Box::new(MockTextGenerator::replying(r#"{"subjective":"fever"}"#)),
                )
                .with_polling(Duration::ZERO, Duration::from_millis(5)),
            ),
            recent_notes_limit: 5,
            recent_documents_limit: 10,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));
        let (status, body) = send(&router, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_and_fetch_patient() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));

        let (status, body) = send(
            &router,
            post_json(
                "/api/patients",
                serde_json::json!({"name": "Ramesh Kumar", "age": 54}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = body["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("PAT_"));

        let (status, body) = send(&router, get(&format!("/api/patients/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ramesh Kumar");
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));
        let (status, body) = send(
            &router,
            post_json("/api/patients", serde_json::json!({"name": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unknown_patient_is_404_with_error_body() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));
        let (status, body) = send(&router, get("/api/patients/PAT_NOBODY01")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn start_batch_twice_returns_the_same_batch() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));

        let (_, patient) = send(
            &router,
            post_json("/api/patients", serde_json::json!({"name": "P"})),
        )
        .await;
        let uri = format!("/api/patients/{}/batches", patient["id"].as_str().unwrap());

        let (status, first) = send(&router, post_empty(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["status"], "pending");
        let (_, second) = send(&router, post_empty(&uri)).await;
        assert_eq!(first["id"], second["id"]);
    }

    #[tokio::test]
    async fn completing_an_empty_batch_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));

        let (_, patient) = send(
            &router,
            post_json("/api/patients", serde_json::json!({"name": "P"})),
        )
        .await;
        let (_, batch) = send(
            &router,
            post_empty(&format!(
                "/api/patients/{}/batches",
                patient["id"].as_str().unwrap()
            )),
        )
        .await;

        let (status, body) = send(
            &router,
            post_empty(&format!("/api/batches/{}/complete", batch["id"].as_str().unwrap())),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no documents"));
    }

    #[tokio::test]
    async fn missing_timeline_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let router = api_router(test_state(&dir, "{}"));

        let (_, patient) = send(
            &router,
            post_json("/api/patients", serde_json::json!({"name": "P"})),
        )
        .await;
        let (status, _) = send(
            &router,
            get(&format!(
                "/api/patients/{}/timeline",
                patient["id"].as_str().unwrap()
            )),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
