use tracing::{info, warn};

use super::fallback::build_fallback;
use super::parser::parse_timeline_reply;
use super::prompt::build_timeline_prompt;
use crate::ai::{AiError, TextGenerator};
use crate::models::{new_entity_id, DocumentBatch, Patient, ScannedDocument, Timeline};

/// Turns a batch of extracted documents into a patient timeline.
///
/// Only the generation call itself can fail. An unusable reply degrades to
/// the deterministic fallback timeline with its `error` field set, so the
/// batch still completes.
pub struct TimelineSynthesizer {
    llm: Box<dyn TextGenerator>,
}

impl TimelineSynthesizer {
    pub fn new(llm: Box<dyn TextGenerator>) -> Self {
        Self { llm }
    }

    pub fn synthesize(
        &self,
        batch: &DocumentBatch,
        documents: &[ScannedDocument],
        patient: &Patient,
    ) -> Result<Timeline, AiError> {
        let payloads: Vec<_> = documents
            .iter()
            .filter_map(|doc| doc.extraction.payload())
            .collect();
        info!(
            batch_id = %batch.id,
            documents = documents.len(),
            extracted = payloads.len(),
            "synthesizing timeline"
        );

        let prompt = build_timeline_prompt(patient, &payloads);
        let reply = self.llm.generate(&prompt)?;

        let timeline = match parse_timeline_reply(&reply) {
            Ok(parsed) => Timeline {
                id: new_entity_id("TL"),
                patient_id: patient.id.clone(),
                batch_id: batch.id.clone(),
                events: parsed.events,
                current_medications: parsed.current_medications,
                chronic_conditions: parsed.chronic_conditions,
                allergies: parsed.allergies,
                summary: parsed.summary,
                error: None,
                generated_at: chrono::Utc::now().naive_utc(),
            },
            Err(e) => {
                warn!(batch_id = %batch.id, "timeline reply unusable, falling back: {e}");
                let fallback = build_fallback(documents);
                Timeline {
                    id: new_entity_id("TL"),
                    patient_id: patient.id.clone(),
                    batch_id: batch.id.clone(),
                    events: fallback.events,
                    current_medications: Vec::new(),
                    chronic_conditions: Vec::new(),
                    allergies: Vec::new(),
                    summary: fallback.summary,
                    error: Some(e.to_string()),
                    generated_at: chrono::Utc::now().naive_utc(),
                }
            }
        };
        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MockTextGenerator;
    use crate::models::{BatchStatus, ExtractionOutcome, Medication, PrescriptionPayload};

    fn patient() -> Patient {
        Patient {
            id: "PAT_00000001".into(),
            name: "Ramesh Kumar".into(),
            age: Some(54),
            gender: None,
            phone: None,
            registered_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn batch() -> DocumentBatch {
        DocumentBatch {
            id: "BATCH_00000001".into(),
            patient_id: "PAT_00000001".into(),
            document_ids: vec![],
            status: BatchStatus::Processing,
            created_at: chrono::Utc::now().naive_utc(),
            completed_at: None,
        }
    }

    fn doc(position: u32, extraction: ExtractionOutcome) -> ScannedDocument {
        ScannedDocument {
            id: format!("DOC_0000000{position}"),
            patient_id: "PAT_00000001".into(),
            batch_id: "BATCH_00000001".into(),
            file_name: format!("rx{position}.jpg"),
            extraction,
            position,
            uploaded_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn extracted(medication: &str) -> ExtractionOutcome {
        ExtractionOutcome::Extracted(PrescriptionPayload {
            medications: vec![Medication::named(medication)],
            ..Default::default()
        })
    }

    #[test]
    fn good_reply_becomes_full_timeline() {
        let reply = r#"{"timeline_events":[{"event_type":"prescription","description":"Started Metformin"}],"summary":"Diabetic patient."}"#;
        let synthesizer = TimelineSynthesizer::new(Box::new(MockTextGenerator::replying(reply)));

        let timeline = synthesizer
            .synthesize(&batch(), &[doc(1, extracted("Metformin"))], &patient())
            .unwrap();
        assert!(!timeline.is_degraded());
        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.summary, "Diabetic patient.");
        assert_eq!(timeline.batch_id, "BATCH_00000001");
    }

    #[test]
    fn failed_extractions_are_excluded_from_the_prompt() {
        let generator = MockTextGenerator::replying(r#"{"summary":"ok"}"#);
        let prompt = generator.prompt_handle();
        let docs = vec![
            doc(1, extracted("Metformin")),
            doc(
                2,
                ExtractionOutcome::Failed {
                    reason: "blurred".into(),
                },
            ),
        ];

        let synthesizer = TimelineSynthesizer::new(Box::new(generator));
        synthesizer.synthesize(&batch(), &docs, &patient()).unwrap();

        let sent = prompt.lock().unwrap().clone().unwrap();
        assert!(sent.contains("Metformin"));
        assert!(!sent.contains("blurred"));
    }

    #[test]
    fn unusable_reply_degrades_to_fallback() {
        let synthesizer = TimelineSynthesizer::new(Box::new(MockTextGenerator::replying(
            "Sorry, I cannot help with that.",
        )));
        let docs = vec![doc(1, extracted("Metformin")), doc(2, extracted("Aspirin"))];

        let timeline = synthesizer.synthesize(&batch(), &docs, &patient()).unwrap();
        assert!(timeline.is_degraded());
        assert_eq!(timeline.events.len(), 2);
        assert_eq!(timeline.events[0].description, "Document 1");
        assert!(timeline.summary.contains("2 prescription documents"));
        assert!(timeline.current_medications.is_empty());
    }

    #[test]
    fn generation_failure_propagates() {
        let synthesizer =
            TimelineSynthesizer::new(Box::new(MockTextGenerator::failing("connection refused")));
        let result = synthesizer.synthesize(&batch(), &[doc(1, extracted("X"))], &patient());
        assert!(matches!(result, Err(AiError::Connection(_))));
    }
}
