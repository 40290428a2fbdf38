//! Timeline persistence. One timeline per patient: each synthesis replaces
//! the previous one inside a single transaction, backed by a unique index on
//! `patient_id` so a bug here surfaces as a constraint error, not a duplicate.

use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite::{parse_datetime, DATETIME_FORMAT};
use super::DatabaseError;
use crate::models::{Medication, Timeline, TimelineEvent};

pub fn replace_for_patient(conn: &Connection, timeline: &Timeline) -> Result<(), DatabaseError> {
    let events = to_json("timeline", &timeline.id, &timeline.events)?;
    let medications = to_json("timeline", &timeline.id, &timeline.current_medications)?;
    let conditions = to_json("timeline", &timeline.id, &timeline.chronic_conditions)?;
    let allergies = to_json("timeline", &timeline.id, &timeline.allergies)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM timelines WHERE patient_id = ?1",
        params![timeline.patient_id],
    )?;
    tx.execute(
        "INSERT INTO timelines
            (id, patient_id, batch_id, events, current_medications,
             chronic_conditions, allergies, summary, error, generated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            timeline.id,
            timeline.patient_id,
            timeline.batch_id,
            events,
            medications,
            conditions,
            allergies,
            timeline.summary,
            timeline.error,
            timeline.generated_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn get_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<Timeline>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, batch_id, events, current_medications,
                    chronic_conditions, allergies, summary, error, generated_at
             FROM timelines WHERE patient_id = ?1",
            params![patient_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            },
        )
        .optional()?;

    let Some((id, patient_id, batch_id, events, medications, conditions, allergies, summary, error, generated_at)) =
        row
    else {
        return Ok(None);
    };

    let events: Vec<TimelineEvent> = from_json("timeline", &id, &events)?;
    let current_medications: Vec<Medication> = from_json("timeline", &id, &medications)?;
    let chronic_conditions: Vec<String> = from_json("timeline", &id, &conditions)?;
    let allergies: Vec<String> = from_json("timeline", &id, &allergies)?;
    let generated_at = parse_datetime("timeline", &id, &generated_at)?;

    Ok(Some(Timeline {
        id,
        patient_id,
        batch_id,
        events,
        current_medications,
        chronic_conditions,
        allergies,
        summary,
        error,
        generated_at,
    }))
}

fn to_json<T: serde::Serialize>(
    entity_type: &str,
    id: &str,
    value: &T,
) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::CorruptRecord {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
        reason: format!("unserializable column: {e}"),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(
    entity_type: &str,
    id: &str,
    raw: &str,
) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::CorruptRecord {
        entity_type: entity_type.to_string(),
        id: id.to_string(),
        reason: format!("unreadable column: {e}"),
    })
}
