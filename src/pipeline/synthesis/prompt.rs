//! Prompt construction for timeline synthesis.

use crate::models::{Patient, PrescriptionPayload};

/// Build the synthesis prompt from the patient header and the extracted
/// payloads of the batch, in attachment order.
pub(super) fn build_timeline_prompt(patient: &Patient, payloads: &[&PrescriptionPayload]) -> String {
    let age = patient
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let payload_json =
        serde_json::to_string_pretty(payloads).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a medical data analyst. Analyze these prescription documents and create a comprehensive medical timeline.

PATIENT: {name} (Age: {age})

PRESCRIPTION DOCUMENTS:
{payload_json}

Create a structured medical timeline with the following:

1. **Timeline Events**: Chronological list of all medical visits/prescriptions
2. **Current Medications**: Active medications the patient should be taking
3. **Chronic Conditions**: Any recurring health issues mentioned
4. **Medication History**: All medications prescribed over time
5. **Important Notes**: Drug allergies, special instructions, patterns

Return ONLY valid JSON (no markdown):
{{
    "timeline_events": [
        {{
            "date": "YYYY-MM-DD or approximate",
            "event_type": "prescription|diagnosis|visit",
            "description": "Brief description",
            "medications": [
                {{
                    "name": "Medicine name",
                    "dosage": "Dosage",
                    "frequency": "TDS/BD/OD",
                    "duration": "Duration",
                    "prescribed_date": "Date",
                    "doctor": "Doctor name"
                }}
            ],
            "doctor": "Doctor name",
            "notes": "Additional notes"
        }}
    ],
    "current_medications": [
        {{
            "name": "Active medicine",
            "dosage": "Dosage",
            "frequency": "Frequency",
            "duration": "Ongoing",
            "prescribed_date": "Latest date",
            "doctor": "Latest doctor"
        }}
    ],
    "chronic_conditions": ["Condition 1", "Condition 2"],
    "allergies": ["Known allergies if mentioned"],
    "summary": "2-3 sentence comprehensive medical summary of the patient's health history"
}}

Important:
- Sort timeline events chronologically (oldest to newest)
- Identify currently active medications
- Note any concerning patterns or drug interactions
- If dates are unclear, estimate based on context
"#,
        name = patient.name,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Medication;

    fn patient(age: Option<u32>) -> Patient {
        Patient {
            id: "PAT_00000001".into(),
            name: "Ramesh Kumar".into(),
            age,
            gender: None,
            phone: None,
            registered_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn prompt_carries_patient_and_payloads() {
        let payload = PrescriptionPayload {
            medications: vec![Medication::named("Metformin")],
            ..Default::default()
        };
        let prompt = build_timeline_prompt(&patient(Some(54)), &[&payload]);
        assert!(prompt.contains("Ramesh Kumar"));
        assert!(prompt.contains("Age: 54"));
        assert!(prompt.contains("Metformin"));
        assert!(prompt.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn missing_age_prints_unknown() {
        let prompt = build_timeline_prompt(&patient(None), &[]);
        assert!(prompt.contains("Age: Unknown"));
    }
}
