//! AI collaborator seams.
//!
//! The pipeline talks to three narrow traits — text generation, vision
//! extraction, transcription — so every stage can run against mocks in
//! tests and against the hosted clients in production. The clients are
//! blocking; async callers go through `spawn_blocking`.

mod gemini;
mod transcribe;

pub use gemini::GeminiClient;
pub use transcribe::TranscribeClient;

use std::path::Path;

use thiserror::Error;

use crate::models::PrescriptionPayload;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("cannot reach AI service: {0}")]
    Connection(String),

    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("unusable AI response: {0}")]
    ResponseParsing(String),
}

/// Free-text generation from a single prompt.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Structured extraction from one prescription image.
pub trait VisionExtractor: Send + Sync {
    fn extract(&self, image: &Path) -> Result<PrescriptionPayload, AiError>;
}

#[derive(Debug, Clone)]
pub enum TranscriptionJobStatus {
    InProgress,
    Completed(String),
    Failed(String),
}

/// Asynchronous transcription service: submit a job, poll its status.
pub trait Transcriber: Send + Sync {
    fn start_job(&self, audio: &Path) -> Result<String, AiError>;
    fn job_status(&self, job_id: &str) -> Result<TranscriptionJobStatus, AiError>;
}

/// Strip a Markdown code fence from a model reply, leaving the JSON body.
///
/// Models are instructed to answer with bare JSON but frequently wrap it in
/// ```` ```json ... ``` ```` anyway. Replies without a fence pass through
/// trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}


// ═══════════════════════════════════════════════════════════════════════════
// Mocks
// ═══════════════════════════════════════════════════════════════════════════
