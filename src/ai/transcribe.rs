use std::path::Path;

use serde::Deserialize;

use super::{AiError, Transcriber, TranscriptionJobStatus};

/// Client for the hosted transcription service: submit an audio file, then
/// poll the job until it leaves `in_progress`.
pub struct TranscribeClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl TranscribeClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }

    fn check(&self, response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, AiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct JobCreated {
    id: String,
}

#[derive(Deserialize)]
struct JobState {
    status: String,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Transcriber for TranscribeClient {
    fn start_job(&self, audio: &Path) -> Result<String, AiError> {
        let bytes = std::fs::read(audio)
            .map_err(|e| AiError::HttpClient(format!("cannot read audio: {e}")))?;
        let mime = mime_guess::from_path(audio)
            .first_or_octet_stream()
            .to_string();

        let url = format!("{}/v1/jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", mime)
            .body(bytes)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AiError::Connection(self.base_url.clone())
                } else {
                    AiError::HttpClient(e.to_string())
                }
            })?;

        let created: JobCreated = self
            .check(response)?
            .json()
            .map_err(|e| AiError::ResponseParsing(e.to_string()))?;
        Ok(created.id)
    }

    fn job_status(&self, job_id: &str) -> Result<TranscriptionJobStatus, AiError> {
        let url = format!("{}/v1/jobs/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    AiError::Connection(self.base_url.clone())
                } else {
                    AiError::HttpClient(e.to_string())
                }
            })?;

        let state: JobState = self
            .check(response)?
            .json()
            .map_err(|e| AiError::ResponseParsing(e.to_string()))?;

        match state.status.as_str() {
            "completed" => Ok(TranscriptionJobStatus::Completed(
                state.transcript.unwrap_or_default(),
            )),
            "failed" => Ok(TranscriptionJobStatus::Failed(
                state.error.unwrap_or_else(|| "unknown".to_string()),
            )),
            _ => Ok(TranscriptionJobStatus::InProgress),
        }
    }
}
