//! Deterministic fallback timeline, used when the model reply is unusable.
//! One event per successfully extracted document, in batch order; numbering
//! counts every document in the batch so positions stay stable.

use crate::models::{ScannedDocument, TimelineEvent, TimelineEventType};

pub(super) struct FallbackTimeline {
    pub events: Vec<TimelineEvent>,
    pub summary: String,
}

pub(super) fn build_fallback(documents: &[ScannedDocument]) -> FallbackTimeline {
    let events = documents
        .iter()
        .enumerate()
        .filter_map(|(i, doc)| {
            let payload = doc.extraction.payload()?;
            Some(TimelineEvent {
                date: "Unknown".to_string(),
                event_type: TimelineEventType::Prescription,
                description: format!("Document {}", i + 1),
                medications: payload.medications.clone(),
                doctor: payload.doctor_name.clone(),
                notes: Some("Extracted from scanned document".to_string()),
            })
        })
        .collect();

    FallbackTimeline {
        events,
        summary: format!(
            "Patient has {} prescription documents on file. Individual analysis completed.",
            documents.len()
        ),
    }
}
