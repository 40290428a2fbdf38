//! Lenient parsing of the model's timeline reply.
//!
//! The reply must be a JSON object overall; inside it, individual events or
//! medications that fail to deserialize are dropped with a warning instead
//! of discarding the whole reply.

use serde::Deserialize;
use tracing::warn;

use super::SynthesisError;
use crate::ai::strip_code_fences;
use crate::models::{Medication, TimelineEvent};

#[derive(Debug, Deserialize)]
struct RawTimeline {
    #[serde(default)]
    timeline_events: Vec<serde_json::Value>,
    #[serde(default)]
    current_medications: Vec<serde_json::Value>,
    #[serde(default)]
    chronic_conditions: Vec<String>,
    #[serde(default)]
    allergies: Vec<String>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug)]
pub(super) struct ParsedTimeline {
    pub events: Vec<TimelineEvent>,
    pub current_medications: Vec<Medication>,
    pub chronic_conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub summary: String,
}

pub(super) fn parse_timeline_reply(reply: &str) -> Result<ParsedTimeline, SynthesisError> {
    let body = strip_code_fences(reply);
    if body.is_empty() {
        return Err(SynthesisError::MalformedResponse("empty reply".to_string()));
    }

    let raw: RawTimeline = serde_json::from_str(body)
        .map_err(|e| SynthesisError::JsonParsing(e.to_string()))?;

    Ok(ParsedTimeline {
        events: collect_lenient(raw.timeline_events, "timeline event"),
        current_medications: collect_lenient(raw.current_medications, "medication"),
        chronic_conditions: raw.chronic_conditions,
        allergies: raw.allergies,
        summary: raw.summary,
    })
}

fn collect_lenient<T: serde::de::DeserializeOwned>(
    values: Vec<serde_json::Value>,
    what: &str,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("dropping unreadable {what} from model reply: {e}");
                None
            }
        })
        .collect()
}
