//! Visit scribing: transcribe a consultation recording, structure it into a
//! SOAP note, and persist the result with the raw transcript.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use super::PipelineError;
use crate::ai::{strip_code_fences, AiError, TextGenerator, Transcriber, TranscriptionJobStatus};
use crate::db::{note_store, patient_store, DatabaseError};
use crate::models::{SoapNote, VisitNote};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_POLL_BUDGET: Duration = Duration::from_secs(300);

const SOAP_PROMPT_HEADER: &str = "\
You are an expert medical scribe working in a Primary Healthcare Center in India.

IMPORTANT CONTEXT:
- The conversation below is a SPEECH-TO-TEXT TRANSCRIPT from an audio recording between a nurse and a patient
- The transcript may contain errors, mishearings, incomplete sentences, and background noise artifacts
- Medicine names are OFTEN INCORRECT in STT - use your medical knowledge to correct common Indian medicine names
- The conversation may be in Hindi, English, or mixed (Hinglish)
- Infer and extract medical information even from casual, colloquial language

TASK:
Convert this messy nurse-patient conversation into a clean, structured SOAP note.

CONVERSATION TRANSCRIPT (RAW STT OUTPUT):
";

const SOAP_PROMPT_FOOTER: &str = r#"

INSTRUCTIONS:
1. **Subjective**: Extract what the PATIENT says about their symptoms, complaints, history.
2. **Objective**: Extract what the NURSE observes or measures - vitals, examination findings.
3. **Assessment**: Make a preliminary diagnosis or health assessment based on symptoms.
4. **Plan**: Extract treatment recommendations, prescriptions, follow-up instructions. Correct garbled medicine names (e.g., "para sit a mole" -> "Paracetamol").
5. **Chief Complaint**: One concise sentence summarizing the main medical issue.
6. **Medications**: List all medicines mentioned with corrected spellings.

Return ONLY valid JSON (no markdown, no code blocks):
{
    "subjective": "Patient's main complaints and symptoms in their own words",
    "objective": "Observable facts: vitals, physical examination findings",
    "assessment": "Likely diagnosis or medical assessment",
    "plan": "Treatment plan, medications, follow-up instructions",
    "chief_complaint": "Primary reason for visit (one sentence)",
    "medications": ["List any medications mentioned"],
    "language": "hindi/english/mixed"
}

Be concise, medically accurate, and professionally worded.
"#;

#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("transcription did not finish within {budget_secs}s")]
    Timeout { budget_secs: u64 },

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

pub struct VisitScribe {
    transcriber: Box<dyn Transcriber>,
    llm: Box<dyn TextGenerator>,
    poll_interval: Duration,
    poll_budget: Duration,
}

impl VisitScribe {
    pub fn new(transcriber: Box<dyn Transcriber>, llm: Box<dyn TextGenerator>) -> Self {
        Self {
            transcriber,
            llm,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_budget: DEFAULT_POLL_BUDGET,
        }
    }

    #[cfg(test)]
    pub fn with_polling(mut self, interval: Duration, budget: Duration) -> Self {
        self.poll_interval = interval;
        self.poll_budget = budget;
        self
    }

    /// Submit the recording and poll until the transcript is ready.
    pub fn transcribe(&self, audio: &Path) -> Result<String, ScribeError> {
        let job_id = self.transcriber.start_job(audio)?;
        info!(job_id, "transcription job submitted");

        let mut elapsed = Duration::ZERO;
        loop {
            match self.transcriber.job_status(&job_id)? {
                TranscriptionJobStatus::Completed(transcript) => return Ok(transcript),
                TranscriptionJobStatus::Failed(reason) => {
                    return Err(ScribeError::TranscriptionFailed(reason))
                }
                TranscriptionJobStatus::InProgress => {
                    if elapsed >= self.poll_budget {
                        return Err(ScribeError::Timeout {
                            budget_secs: self.poll_budget.as_secs(),
                        });
                    }
                    std::thread::sleep(self.poll_interval);
                    elapsed += self.poll_interval.max(Duration::from_millis(1));
                }
            }
        }
    }

    /// Structure a transcript into a SOAP note. An unusable reply degrades
    /// to a fallback note that preserves the transcript head; only the
    /// generation call itself is an error.
    pub fn soap_note(&self, transcript: &str) -> Result<SoapNote, ScribeError> {
        let prompt = format!("{SOAP_PROMPT_HEADER}{transcript}{SOAP_PROMPT_FOOTER}");
        let reply = self.llm.generate(&prompt)?;

        match serde_json::from_str::<SoapNote>(strip_code_fences(&reply)) {
            Ok(note) => Ok(note),
            Err(e) => {
                warn!("SOAP reply unusable, falling back: {e}");
                Ok(fallback_note(transcript, &e.to_string()))
            }
        }
    }

    /// Full scribing flow: transcribe, structure, persist.
    pub fn record_visit(
        &self,
        conn: &Connection,
        patient_id: &str,
        audio: &Path,
        audio_file: Option<&str>,
    ) -> Result<VisitNote, ScribeError> {
        patient_store::get(conn, patient_id).map_err(|e| match PipelineError::from_lookup(e) {
            PipelineError::PatientNotFound(id) => ScribeError::PatientNotFound(id),
            PipelineError::Database(db) => ScribeError::Database(db),
            other => ScribeError::TranscriptionFailed(other.to_string()),
        })?;

        let transcript = self.transcribe(audio)?;
        let soap = self.soap_note(&transcript)?;
        let note = note_store::create(conn, patient_id, &soap, &transcript, audio_file)?;
        info!(note_id = %note.id, patient_id, "visit note recorded");
        Ok(note)
    }
}

fn fallback_note(transcript: &str, error: &str) -> SoapNote {
    let head: String = transcript.chars().take(200).collect();
    SoapNote {
        subjective: format!("{head}..."),
        objective: "Pending examination".to_string(),
        assessment: "Requires physician review".to_string(),
        plan: "To be determined by doctor".to_string(),
        chief_complaint: "See full transcript".to_string(),
        medications: Vec::new(),
        language: "unknown".to_string(),
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{MockTextGenerator, MockTranscriber};
    use crate::db::sqlite::open_memory_database;

    const SOAP_REPLY: &str = r#"{
        "subjective": "Headache for 3 days",
        "objective": "BP 130/85",
        "assessment": "Tension headache",
        "plan": "Paracetamol 500mg TDS",
        "chief_complaint": "Headache",
        "medications": ["Paracetamol"],
        "language": "mixed"
    }"#;

    fn fast(transcriber: MockTranscriber, llm: MockTextGenerator) -> VisitScribe {
        VisitScribe::new(Box::new(transcriber), Box::new(llm))
            .with_polling(Duration::ZERO, Duration::from_millis(5))
    }

    #[test]
    fn polls_until_transcript_is_ready() {
        let scribe = fast(
            MockTranscriber::scripted(vec![
                TranscriptionJobStatus::InProgress,
                TranscriptionJobStatus::InProgress,
                TranscriptionJobStatus::Completed("sir mein dard hai".into()),
            ]),
            MockTextGenerator::replying(SOAP_REPLY),
        );
        let transcript = scribe.transcribe(Path::new("visit.mp3")).unwrap();
        assert_eq!(transcript, "sir mein dard hai");
    }

    #[test]
    fn failed_job_surfaces_the_reason() {
        let scribe = fast(
            MockTranscriber::scripted(vec![TranscriptionJobStatus::Failed(
                "audio too short".into(),
            )]),
            MockTextGenerator::replying(SOAP_REPLY),
        );
        let result = scribe.transcribe(Path::new("visit.mp3"));
        assert!(matches!(
            result,
            Err(ScribeError::TranscriptionFailed(ref reason)) if reason == "audio too short"
        ));
    }

    #[test]
    fn stuck_job_times_out() {
        let scribe = fast(
            MockTranscriber::scripted(vec![TranscriptionJobStatus::InProgress]),
            MockTextGenerator::replying(SOAP_REPLY),
        );
        let result = scribe.transcribe(Path::new("visit.mp3"));
        assert!(matches!(result, Err(ScribeError::Timeout { .. })));
    }

    #[test]
    fn good_reply_becomes_soap_note() {
        let scribe = fast(
            MockTranscriber::completing("t"),
            MockTextGenerator::replying(SOAP_REPLY),
        );
        let note = scribe.soap_note("transcript").unwrap();
        assert_eq!(note.assessment, "Tension headache");
        assert_eq!(note.medications, vec!["Paracetamol"]);
        assert!(note.error.is_none());
    }

    #[test]
    fn unusable_reply_degrades_to_fallback_note() {
        let scribe = fast(
            MockTranscriber::completing("t"),
            MockTextGenerator::replying("no json here"),
        );
        let transcript = "a".repeat(300);
        let note = scribe.soap_note(&transcript).unwrap();
        assert_eq!(note.subjective.chars().count(), 203); // 200 chars + "..."
        assert_eq!(note.objective, "Pending examination");
        assert_eq!(note.plan, "To be determined by doctor");
        assert_eq!(note.language, "unknown");
        assert!(note.error.is_some());
    }

    #[test]
    fn record_visit_persists_note_with_transcript() {
        let conn = open_memory_database().unwrap();
        let patient = patient_store::create(&conn, "P", None, None, None).unwrap();
        let scribe = fast(
            MockTranscriber::completing("bukhar aur khansi"),
            MockTextGenerator::replying(SOAP_REPLY),
        );

        let note = scribe
            .record_visit(&conn, &patient.id, Path::new("visit.mp3"), Some("visit.mp3"))
            .unwrap();
        assert_eq!(note.raw_transcript, "bukhar aur khansi");

        let listed = note_store::list_by_patient(&conn, &patient.id, 5).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].soap.chief_complaint, "Headache");
    }

    #[test]
    fn record_visit_requires_known_patient() {
        let conn = open_memory_database().unwrap();
        let scribe = fast(
            MockTranscriber::completing("t"),
            MockTextGenerator::replying(SOAP_REPLY),
        );
        let result = scribe.record_visit(&conn, "PAT_NOBODY01", Path::new("a.mp3"), None);
        assert!(matches!(result, Err(ScribeError::PatientNotFound(_))));
    }
}
