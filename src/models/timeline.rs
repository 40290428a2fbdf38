use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::TimelineEventType;

/// One medication entry as extracted or synthesized. All fields beyond the
/// name are opaque strings taken verbatim from the extraction step — dosage
/// units and frequency codes ("TDS", "BD", "OD") are not normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescribed_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
}

impl Medication {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            dosage: None,
            frequency: None,
            duration: None,
            prescribed_date: None,
            doctor: None,
        }
    }
}

/// A single entry in the synthesized medical timeline. The date is whatever
/// the summarizer produced — possibly approximate, not guaranteed parseable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub date: String,
    pub event_type: TimelineEventType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The synthesized medical timeline for one patient. Exactly one is retained
/// per patient — each successful synthesis replaces the previous one.
///
/// `error` is set only when synthesis degraded to the deterministic fallback,
/// so downstream consumers cannot mistake a degraded timeline for a full one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub id: String,
    pub patient_id: String,
    pub batch_id: String,
    pub events: Vec<TimelineEvent>,
    pub current_medications: Vec<Medication>,
    pub chronic_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub generated_at: NaiveDateTime,
}

impl Timeline {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}
