use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use arogya::ai::{GeminiClient, TranscribeClient};
use arogya::api::{api_router, AppState};
use arogya::config::AppConfig;
use arogya::db::sqlite::open_database;
use arogya::pipeline::batch::BatchTracker;
use arogya::pipeline::intake::DocumentIntake;
use arogya::pipeline::scribe::VisitScribe;
use arogya::pipeline::synthesis::TimelineSynthesizer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.uploads_dir)?;

    // Open once at startup so migrations run before the first request.
    open_database(&config.database_path)?;
    info!(db = %config.database_path.display(), "database ready");

    let gemini = || {
        GeminiClient::new(
            &config.gemini_base_url,
            &config.gemini_api_key,
            &config.gemini_model,
            config.gemini_timeout_secs,
        )
    };
    let transcriber = TranscribeClient::new(
        &config.transcribe_base_url,
        &config.transcribe_api_key,
        config.gemini_timeout_secs,
    );

    let state = AppState {
        db_path: Arc::new(config.database_path.clone()),
        uploads_dir: Arc::new(config.uploads_dir.clone()),
        tracker: Arc::new(BatchTracker::new(TimelineSynthesizer::new(Box::new(
            gemini(),
        )))),
        intake: Arc::new(DocumentIntake::new(Box::new(gemini()))),
        scribe: Arc::new(VisitScribe::new(Box::new(transcriber), Box::new(gemini()))),
        recent_notes_limit: config.recent_notes_limit,
        recent_documents_limit: config.recent_documents_limit,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, api_router(state)).await?;
    Ok(())
}
