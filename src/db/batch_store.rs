//! Batch persistence and the single-active-batch rule.
//!
//! "At most one pending or processing batch per patient" is enforced here
//! with a conditional insert, not by a check-then-insert in the caller, so
//! concurrent starts cannot race past each other.

use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite::{now_utc_text, parse_datetime};
use super::DatabaseError;
use crate::models::{new_entity_id, BatchStatus, DocumentBatch};

/// Create a fresh pending batch for the patient unless an active one already
/// exists, and return whichever batch is active afterwards.
pub fn create_if_no_active(
    conn: &Connection,
    patient_id: &str,
) -> Result<DocumentBatch, DatabaseError> {
    let candidate_id = new_entity_id("BATCH");
    conn.execute(
        "INSERT INTO batches (id, patient_id, status, created_at)
         SELECT ?1, ?2, 'pending', ?3
         WHERE NOT EXISTS (
             SELECT 1 FROM batches
             WHERE patient_id = ?2 AND status IN ('pending', 'processing')
         )",
        params![candidate_id, patient_id, now_utc_text()],
    )?;

    // Either our insert landed or another active batch pre-existed.
    get_active_for_patient(conn, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("batch", &candidate_id))
}

pub fn get_active_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<DocumentBatch>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, status, created_at, completed_at
             FROM batches
             WHERE patient_id = ?1 AND status IN ('pending', 'processing')",
            params![patient_id],
            map_row,
        )
        .optional()?;
    match row {
        Some(row) => Ok(Some(row.into_batch(conn)?)),
        None => Ok(None),
    }
}

pub fn get_by_id(conn: &Connection, batch_id: &str) -> Result<DocumentBatch, DatabaseError> {
    conn.query_row(
        "SELECT id, patient_id, status, created_at, completed_at
         FROM batches WHERE id = ?1",
        params![batch_id],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DatabaseError::not_found("batch", batch_id))?
    .into_batch(conn)
}

pub fn list_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<DocumentBatch>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, status, created_at, completed_at
         FROM batches WHERE patient_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![patient_id], map_row)?;
    let mut batches = Vec::new();
    for row in rows {
        batches.push(row?.into_batch(conn)?);
    }
    Ok(batches)
}

/// Attach an already-saved document to the batch, assigning it the next
/// 1-based position. Returns the assigned position.
pub fn attach_document(
    conn: &Connection,
    batch_id: &str,
    document_id: &str,
) -> Result<u32, DatabaseError> {
    let batch = get_by_id(conn, batch_id)?;
    if !batch.status.is_active() {
        return Err(DatabaseError::ConstraintViolation(format!(
            "cannot attach to {} batch {}",
            batch.status, batch.id
        )));
    }

    let next: u32 = conn.query_row(
        "SELECT COUNT(*) + 1 FROM documents WHERE batch_id = ?1 AND position > 0",
        params![batch_id],
        |row| row.get(0),
    )?;
    super::document_store::set_position(conn, document_id, next)?;
    Ok(next)
}

/// Move the batch to `next`, rejecting transitions the lifecycle does not
/// allow. `completed_at` is stamped only when the batch completes.
pub fn set_status(
    conn: &Connection,
    batch_id: &str,
    next: BatchStatus,
) -> Result<(), DatabaseError> {
    let batch = get_by_id(conn, batch_id)?;
    if !batch.status.can_transition_to(next) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "batch {} cannot move from {} to {}",
            batch_id, batch.status, next
        )));
    }

    let completed_at = match next {
        BatchStatus::Completed => Some(now_utc_text()),
        _ => None,
    };
    conn.execute(
        "UPDATE batches SET status = ?1, completed_at = ?2 WHERE id = ?3",
        params![next.as_str(), completed_at, batch_id],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Row mapping
// ═══════════════════════════════════════════════════════════════════════════

struct BatchRow {
    id: String,
    patient_id: String,
    status: String,
    created_at: String,
    completed_at: Option<String>,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BatchRow> {
    Ok(BatchRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        status: row.get(2)?,
        created_at: row.get(3)?,
        completed_at: row.get(4)?,
    })
}

impl BatchRow {
    fn into_batch(self, conn: &Connection) -> Result<DocumentBatch, DatabaseError> {
        let status = BatchStatus::from_str(&self.status)?;
        let created_at = parse_datetime("batch", &self.id, &self.created_at)?;
        let completed_at = self
            .completed_at
            .map(|raw| parse_datetime("batch", &self.id, &raw))
            .transpose()?;

        let mut stmt = conn.prepare(
            "SELECT id FROM documents WHERE batch_id = ?1 AND position > 0 ORDER BY position ASC",
        )?;
        let document_ids = stmt
            .query_map(params![self.id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentBatch {
            id: self.id,
            patient_id: self.patient_id,
            document_ids,
            status,
            created_at,
            completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::db::{document_store, patient_store};

    fn patient(conn: &Connection) -> String {
        patient_store::create(conn, "Test Patient", None, None, None)
            .unwrap()
            .id
    }

    #[test]
    fn create_is_idempotent_while_batch_active() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);

        let first = create_if_no_active(&conn, &patient_id).unwrap();
        let second = create_if_no_active(&conn, &patient_id).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, BatchStatus::Pending);
    }

    #[test]
    fn terminal_batch_frees_the_slot() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);

        let first = create_if_no_active(&conn, &patient_id).unwrap();
        set_status(&conn, &first.id, BatchStatus::Processing).unwrap();
        set_status(&conn, &first.id, BatchStatus::Failed).unwrap();

        let second = create_if_no_active(&conn, &patient_id).unwrap();
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn attach_assigns_upload_order_positions() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);
        let batch = create_if_no_active(&conn, &patient_id).unwrap();

        let a = document_store::create(&conn, &patient_id, &batch.id, "a.jpg").unwrap();
        let b = document_store::create(&conn, &patient_id, &batch.id, "b.jpg").unwrap();
        assert_eq!(attach_document(&conn, &batch.id, &a.id).unwrap(), 1);
        assert_eq!(attach_document(&conn, &batch.id, &b.id).unwrap(), 2);

        let reloaded = get_by_id(&conn, &batch.id).unwrap();
        assert_eq!(reloaded.document_ids, vec![a.id, b.id]);
    }

    #[test]
    fn attach_rejects_terminal_batch() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);
        let batch = create_if_no_active(&conn, &patient_id).unwrap();
        let doc = document_store::create(&conn, &patient_id, &batch.id, "a.jpg").unwrap();

        set_status(&conn, &batch.id, BatchStatus::Processing).unwrap();
        set_status(&conn, &batch.id, BatchStatus::Completed).unwrap();

        assert!(matches!(
            attach_document(&conn, &batch.id, &doc.id),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);
        let batch = create_if_no_active(&conn, &patient_id).unwrap();

        // pending cannot jump straight to completed
        assert!(matches!(
            set_status(&conn, &batch.id, BatchStatus::Completed),
            Err(DatabaseError::ConstraintViolation(_))
        ));

        set_status(&conn, &batch.id, BatchStatus::Processing).unwrap();
        set_status(&conn, &batch.id, BatchStatus::Completed).unwrap();

        // terminal states accept nothing further
        assert!(matches!(
            set_status(&conn, &batch.id, BatchStatus::Failed),
            Err(DatabaseError::ConstraintViolation(_))
        ));
    }

    #[test]
    fn completed_at_is_set_only_on_completion() {
        let conn = open_memory_database().unwrap();
        let patient_id = patient(&conn);
        let batch = create_if_no_active(&conn, &patient_id).unwrap();
        assert!(batch.completed_at.is_none());

        set_status(&conn, &batch.id, BatchStatus::Processing).unwrap();
        assert!(get_by_id(&conn, &batch.id).unwrap().completed_at.is_none());

        set_status(&conn, &batch.id, BatchStatus::Completed).unwrap();
        assert!(get_by_id(&conn, &batch.id).unwrap().completed_at.is_some());
    }
}
