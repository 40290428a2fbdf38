use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::{strip_code_fences, AiError, TextGenerator, VisionExtractor};
use crate::models::PrescriptionPayload;

const EXTRACTION_PROMPT: &str = "\
Analyze this prescription image and extract the medical information.
Return ONLY valid JSON in this exact format, with no additional text:
{
  \"doctor_name\": \"name or null\",
  \"date\": \"date as written or null\",
  \"medications\": [
    {\"name\": \"...\", \"dosage\": \"...\", \"frequency\": \"...\", \"duration\": \"...\"}
  ],
  \"diagnosis\": \"diagnosis or null\",
  \"instructions\": \"special instructions or null\"
}
The prescription may be handwritten and may mix English with Hindi or other
Indian languages. Transcribe medication names as written.";

/// Hosted Gemini client used for both text generation and prescription image
/// extraction.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        }
    }

    fn generate_content(&self, parts: Vec<Part>) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                AiError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                AiError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                AiError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| AiError::ResponseParsing(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| AiError::ResponseParsing("response contained no text".to_string()))
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, AiError> {
        self.generate_content(vec![Part::text(prompt)])
    }
}

impl VisionExtractor for GeminiClient {
    fn extract(&self, image: &Path) -> Result<PrescriptionPayload, AiError> {
        let bytes = std::fs::read(image)
            .map_err(|e| AiError::HttpClient(format!("cannot read image: {e}")))?;
        let mime = mime_guess::from_path(image)
            .first_or_octet_stream()
            .to_string();
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);

        let reply = self.generate_content(vec![
            Part::text(EXTRACTION_PROMPT),
            Part::inline_image(&mime, data),
        ])?;

        serde_json::from_str(strip_code_fences(&reply))
            .map_err(|e| AiError::ResponseParsing(format!("not a prescription payload: {e}")))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Wire types for the generateContent endpoint
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline_image(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
