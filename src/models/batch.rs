use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::BatchStatus;

/// A scanning batch: the unit of timeline synthesis. Documents attach in
/// upload order; the list grows only while the batch is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBatch {
    pub id: String,
    pub patient_id: String,
    /// Attached document ids in upload order.
    pub document_ids: Vec<String>,
    pub status: BatchStatus,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}
