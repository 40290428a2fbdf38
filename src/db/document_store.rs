//! Scanned document persistence.
//!
//! Documents are written once on upload and mutated exactly once, through
//! [`update_extraction`], when the extraction step finishes. The `status`
//! column is a projection of the extraction outcome kept for indexing.

use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite::{now_utc_text, parse_datetime};
use super::DatabaseError;
use crate::models::{ExtractionOutcome, PrescriptionPayload, ScannedDocument};

const SELECT_COLUMNS: &str =
    "id, patient_id, batch_id, file_name, status, payload, failure_reason, position, uploaded_at";

/// New document, not yet attached to a batch position, extraction pending.
pub fn create(
    conn: &Connection,
    patient_id: &str,
    batch_id: &str,
    file_name: &str,
) -> Result<ScannedDocument, DatabaseError> {
    let id = crate::models::new_entity_id("DOC");
    conn.execute(
        "INSERT INTO documents
            (id, patient_id, batch_id, file_name, status, payload, failure_reason, position, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, 'processing', NULL, NULL, 0, ?5)",
        params![id, patient_id, batch_id, file_name, now_utc_text()],
    )?;
    get_by_id(conn, &id)
}

pub fn get_by_id(conn: &Connection, document_id: &str) -> Result<ScannedDocument, DatabaseError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM documents WHERE id = ?1"),
        params![document_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("document", document_id))?
    .into_document()
}

/// Attached documents of a batch, in attachment order.
pub fn list_by_batch(
    conn: &Connection,
    batch_id: &str,
) -> Result<Vec<ScannedDocument>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM documents
         WHERE batch_id = ?1 AND position > 0
         ORDER BY position ASC"
    ))?;
    let rows = stmt.query_map(params![batch_id], map_row)?;
    collect_documents(rows)
}

/// Most recent documents for a patient, newest first.
pub fn list_by_patient(
    conn: &Connection,
    patient_id: &str,
    limit: u32,
) -> Result<Vec<ScannedDocument>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM documents
         WHERE patient_id = ?1
         ORDER BY uploaded_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![patient_id, limit], map_row)?;
    collect_documents(rows)
}

/// The single mutation point for a document: record how extraction ended.
pub fn update_extraction(
    conn: &Connection,
    document_id: &str,
    outcome: &ExtractionOutcome,
) -> Result<(), DatabaseError> {
    let (status, payload, failure_reason) = persisted_outcome(outcome)?;
    let changed = conn.execute(
        "UPDATE documents SET status = ?1, payload = ?2, failure_reason = ?3 WHERE id = ?4",
        params![status, payload, failure_reason, document_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("document", document_id));
    }
    Ok(())
}

pub fn set_position(
    conn: &Connection,
    document_id: &str,
    position: u32,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE documents SET position = ?1 WHERE id = ?2",
        params![position, document_id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("document", document_id));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Row mapping
// ═══════════════════════════════════════════════════════════════════════════

struct DocumentRow {
    id: String,
    patient_id: String,
    batch_id: String,
    file_name: String,
    status: String,
    payload: Option<String>,
    failure_reason: Option<String>,
    position: u32,
    uploaded_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        batch_id: row.get(2)?,
        file_name: row.get(3)?,
        status: row.get(4)?,
        payload: row.get(5)?,
        failure_reason: row.get(6)?,
        position: row.get(7)?,
        uploaded_at: row.get(8)?,
    })
}

impl DocumentRow {
    fn into_document(self) -> Result<ScannedDocument, DatabaseError> {
        let extraction = match self.status.as_str() {
            "processing" => ExtractionOutcome::Pending,
            "completed" => {
                let raw = self.payload.as_deref().unwrap_or("{}");
                let payload: PrescriptionPayload = serde_json::from_str(raw).map_err(|e| {
                    DatabaseError::CorruptRecord {
                        entity_type: "document".to_string(),
                        id: self.id.clone(),
                        reason: format!("unreadable payload: {e}"),
                    }
                })?;
                ExtractionOutcome::Extracted(payload)
            }
            "failed" => ExtractionOutcome::Failed {
                reason: self
                    .failure_reason
                    .unwrap_or_else(|| "unknown".to_string()),
            },
            other => {
                return Err(DatabaseError::InvalidEnum {
                    field: "documents.status".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let uploaded_at = parse_datetime("document", &self.id, &self.uploaded_at)?;
        Ok(ScannedDocument {
            id: self.id,
            patient_id: self.patient_id,
            batch_id: self.batch_id,
            file_name: self.file_name,
            extraction,
            position: self.position,
            uploaded_at,
        })
    }
}

fn collect_documents(
    rows: impl Iterator<Item = rusqlite::Result<DocumentRow>>,
) -> Result<Vec<ScannedDocument>, DatabaseError> {
    let mut docs = Vec::new();
    for row in rows {
        docs.push(row?.into_document()?);
    }
    Ok(docs)
}

fn persisted_outcome(
    outcome: &ExtractionOutcome,
) -> Result<(&'static str, Option<String>, Option<String>), DatabaseError> {
    Ok(match outcome {
        ExtractionOutcome::Pending => ("processing", None, None),
        ExtractionOutcome::Extracted(payload) => {
            let json = serde_json::to_string(payload).map_err(|e| {
                DatabaseError::ConstraintViolation(format!("unserializable payload: {e}"))
            })?;
            ("completed", Some(json), None)
        }
        ExtractionOutcome::Failed { reason } => ("failed", None, Some(reason.clone())),
    })
}
