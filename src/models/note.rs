use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A structured SOAP note produced from a visit recording transcript.
///
/// `error` is set when structuring degraded to the deterministic fallback
/// (the raw transcript is always preserved alongside).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoapNote {
    #[serde(default)]
    pub subjective: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub assessment: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A persisted visit note: SOAP structure plus the raw transcript it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitNote {
    pub id: String,
    pub patient_id: String,
    pub soap: SoapNote,
    pub raw_transcript: String,
    pub audio_file: Option<String>,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soap_note_defaults_fill_missing_fields() {
        let note: SoapNote = serde_json::from_str(r#"{"subjective":"headache"}"#).unwrap();
        assert_eq!(note.subjective, "headache");
        assert_eq!(note.objective, "");
        assert!(note.medications.is_empty());
        assert!(note.error.is_none());
    }
}
