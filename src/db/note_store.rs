//! Visit note persistence. The SOAP structure is stored as one JSON column;
//! the raw transcript is kept verbatim next to it.

use rusqlite::{params, Connection};

use super::sqlite::{now_utc_text, parse_datetime};
use super::DatabaseError;
use crate::models::{new_entity_id, SoapNote, VisitNote};

pub fn create(
    conn: &Connection,
    patient_id: &str,
    soap: &SoapNote,
    raw_transcript: &str,
    audio_file: Option<&str>,
) -> Result<VisitNote, DatabaseError> {
    let id = new_entity_id("NOTE");
    let soap_json = serde_json::to_string(soap).map_err(|e| DatabaseError::CorruptRecord {
        entity_type: "visit_note".to_string(),
        id: id.clone(),
        reason: format!("unserializable soap: {e}"),
    })?;
    let now = now_utc_text();

    conn.execute(
        "INSERT INTO visit_notes (id, patient_id, soap, raw_transcript, audio_file, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, patient_id, soap_json, raw_transcript, audio_file, now],
    )?;

    Ok(VisitNote {
        id: id.clone(),
        patient_id: patient_id.to_string(),
        soap: soap.clone(),
        raw_transcript: raw_transcript.to_string(),
        audio_file: audio_file.map(|s| s.to_string()),
        created_at: parse_datetime("visit_note", &id, &now)?,
    })
}

/// Most recent notes for a patient, newest first.
pub fn list_by_patient(
    conn: &Connection,
    patient_id: &str,
    limit: u32,
) -> Result<Vec<VisitNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, soap, raw_transcript, audio_file, created_at
         FROM visit_notes
         WHERE patient_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![patient_id, limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
        let (id, patient_id, soap_json, raw_transcript, audio_file, created_at) = row?;
        let soap: SoapNote =
            serde_json::from_str(&soap_json).map_err(|e| DatabaseError::CorruptRecord {
                entity_type: "visit_note".to_string(),
                id: id.clone(),
                reason: format!("unreadable soap: {e}"),
            })?;
        let created_at = parse_datetime("visit_note", &id, &created_at)?;
        notes.push(VisitNote {
            id,
            patient_id,
            soap,
            raw_transcript,
            audio_file,
            created_at,
        });
    }
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::patient_store;
    use crate::db::sqlite::open_memory_database;

    fn soap(subjective: &str) -> SoapNote {
        SoapNote {
            subjective: subjective.to_string(),
            objective: "BP 130/85".to_string(),
            assessment: "Hypertension, controlled".to_string(),
            plan: "Continue current medication".to_string(),
            chief_complaint: "Follow-up".to_string(),
            medications: vec!["Amlodipine 5mg".to_string()],
            language: "hindi".to_string(),
            error: None,
        }
    }

    #[test]
    fn create_and_list_notes() {
        let conn = open_memory_database().unwrap();
        let patient = patient_store::create(&conn, "P", None, None, None).unwrap();

        let note = create(&conn, &patient.id, &soap("headache"), "transcript text", None).unwrap();
        assert!(note.id.starts_with("NOTE_"));

        let notes = list_by_patient(&conn, &patient.id, 5).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].soap.subjective, "headache");
        assert_eq!(notes[0].raw_transcript, "transcript text");
    }

    #[test]
    fn list_honors_limit() {
        let conn = open_memory_database().unwrap();
        let patient = patient_store::create(&conn, "P", None, None, None).unwrap();
        for i in 0..4 {
            create(&conn, &patient.id, &soap(&format!("visit {i}")), "t", None).unwrap();
        }
        assert_eq!(list_by_patient(&conn, &patient.id, 2).unwrap().len(), 2);
        assert_eq!(list_by_patient(&conn, &patient.id, 10).unwrap().len(), 4);
    }
}
