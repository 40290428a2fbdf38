//! Runtime configuration, read once at startup from the environment.

use std::path::PathBuf;

/// All knobs the server reads. Every field has a default so a bare
/// `arogya-server` starts against local paths; the Gemini key is the one
/// value that has no sensible default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub gemini_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_timeout_secs: u64,
    pub transcribe_base_url: String,
    pub transcribe_api_key: String,
    /// How many visit notes a patient summary view shows by default.
    pub recent_notes_limit: u32,
    /// How many documents a patient summary view shows by default.
    pub recent_documents_limit: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env_var("AROGYA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);

        Self {
            bind_addr: env_var("AROGYA_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string()),
            database_path: env_var("AROGYA_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("arogya.db")),
            uploads_dir: env_var("AROGYA_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("uploads")),
            gemini_base_url: env_var("GEMINI_BASE_URL")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            gemini_api_key: env_var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env_var("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
            gemini_timeout_secs: env_u64("GEMINI_TIMEOUT_SECS", 120),
            transcribe_base_url: env_var("TRANSCRIBE_BASE_URL")
                .unwrap_or_else(|| "http://localhost:9090".to_string()),
            transcribe_api_key: env_var("TRANSCRIBE_API_KEY").unwrap_or_default(),
            recent_notes_limit: env_u64("AROGYA_RECENT_NOTES", 5) as u32,
            recent_documents_limit: env_u64("AROGYA_RECENT_DOCUMENTS", 10) as u32,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env_var(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Per-user application data directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arogya")
}
