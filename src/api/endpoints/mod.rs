pub mod documents;
pub mod health;
pub mod notes;
pub mod patients;

use std::path::PathBuf;

use crate::api::error::ApiError;

/// Persist an uploaded part to the uploads directory under a unique name,
/// keeping the original extension so MIME sniffing works downstream.
pub(crate) fn stage_upload(
    uploads_dir: &std::path::Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, ApiError> {
    std::fs::create_dir_all(uploads_dir)
        .map_err(|e| ApiError::Internal(format!("uploads directory: {e}")))?;

    let extension = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    let staged = uploads_dir.join(format!(
        "{}.{}",
        crate::models::new_entity_id("UP"),
        extension
    ));
    std::fs::write(&staged, bytes).map_err(|e| ApiError::Internal(format!("staging: {e}")))?;
    Ok(staged)
}

/// Pull the first file field out of a multipart body.
pub(crate) async fn read_file_part(
    mut multipart: axum::extract::Multipart,
) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("multipart: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .unwrap_or("upload.bin")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("multipart: {e}")))?;
            if bytes.is_empty() {
                return Err(ApiError::BadRequest("empty file".to_string()));
            }
            return Ok((file_name, bytes.to_vec()));
        }
    }
    Err(ApiError::BadRequest("missing file field".to_string()))
}
