use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::DocumentStatus;
use super::timeline::Medication;

/// Structured data extracted from one prescription image by the vision
/// collaborator. Values are trusted as-is from the extraction step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrescriptionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Outcome of the per-document extraction step.
///
/// A sum type rather than a nullable map, so synthesis can only read a
/// payload that actually exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Extraction has not finished yet.
    Pending,
    /// Extraction succeeded with a structured payload.
    Extracted(PrescriptionPayload),
    /// Extraction failed; the document is excluded from synthesis.
    Failed { reason: String },
}

impl ExtractionOutcome {
    pub fn payload(&self) -> Option<&PrescriptionPayload> {
        match self {
            Self::Extracted(payload) => Some(payload),
            _ => None,
        }
    }
}

/// One uploaded document. Created on upload, mutated exactly once when
/// extraction finishes, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedDocument {
    pub id: String,
    pub patient_id: String,
    pub batch_id: String,
    pub file_name: String,
    pub extraction: ExtractionOutcome,
    /// Position within the batch (1-based); 0 until attached.
    pub position: u32,
    pub uploaded_at: NaiveDateTime,
}

impl ScannedDocument {
    /// Status is derived from the extraction outcome — there is no separate
    /// status field to drift out of sync.
    pub fn status(&self) -> DocumentStatus {
        match self.extraction {
            ExtractionOutcome::Pending => DocumentStatus::Processing,
            ExtractionOutcome::Extracted(_) => DocumentStatus::Completed,
            ExtractionOutcome::Failed { .. } => DocumentStatus::Failed,
        }
    }
}
