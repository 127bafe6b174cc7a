//! Upload intake and summary handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Multipart, State};
use axum::Json;
use chrono::Utc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use validator::Validate;
use vidrelay_models::{
    validate_upload_name, NotebookOutputForm, StoredUpload, SummaryResponse, UploadId,
    UploadRejection, UploadResponse,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field that carries the video.
const FILE_FIELD: &str = "file";

/// Accept a video, publish it to the dataset and re-run the notebook.
pub async fn upload_video(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    // Fields without a filename are plain form values, not files
    let field = loop {
        match multipart.next_field().await? {
            Some(field) if field.name() == Some(FILE_FIELD) && field.file_name().is_some() => {
                break field
            }
            Some(_) => continue,
            None => return Err(reject(UploadRejection::MissingFilePart)),
        }
    };

    let original_name = field.file_name().unwrap_or_default().to_string();
    let stored_name = validate_upload_name(&original_name).map_err(reject)?;

    let id = UploadId::new();
    let upload_dir = prepare_upload_dir(&state.config.upload_dir).await?;
    let path = upload_dir.join(&stored_name);
    let size_bytes = store_field(field, &path, &id).await?;

    let upload = StoredUpload {
        id,
        original_name,
        stored_name,
        path,
        size_bytes,
        uploaded_by: user.uid,
        received_at: Utc::now(),
    };

    info!(
        upload_id = %upload.id,
        user = %upload.uploaded_by,
        path = %upload.path.display(),
        size_bytes = upload.size_bytes,
        "Upload stored"
    );
    metrics::record_upload_accepted(upload.size_bytes);

    let mut messages = vec![format!("File saved at {}", upload.path.display())];

    // The cycle runs to completion even if this request is dropped, so the
    // counter and the notebook session stay consistent.
    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::spawn(async move { pipeline.process_upload(&upload).await })
        .await
        .map_err(|e| ApiError::internal(format!("Upload cycle aborted: {}", e)))??;

    messages.push("Video uploaded & dataset updated!".to_string());
    messages.push(if outcome.notebook_triggered {
        "Notebook re-run triggered successfully!".to_string()
    } else {
        "Notebook run failed or did not complete.".to_string()
    });

    Ok(Json(UploadResponse {
        summary: outcome.summary,
        notebook_triggered: outcome.notebook_triggered,
        messages,
    }))
}

/// Receive the notebook's text output and relay it for summarization.
pub async fn receive_notebook_output(
    State(state): State<AppState>,
    _user: AuthUser,
    form: Result<Form<NotebookOutputForm>, FormRejection>,
) -> ApiResult<Json<SummaryResponse>> {
    let Form(form) = form.map_err(|e| ApiError::bad_request(e.body_text()))?;
    form.validate()?;

    // Detached so the chat session is always quit
    let pipeline = Arc::clone(&state.pipeline);
    let summary = tokio::spawn(async move { pipeline.relay_summary(&form.output).await })
        .await
        .map_err(|e| ApiError::internal(format!("Summary relay aborted: {}", e)))??;

    Ok(Json(SummaryResponse {
        summary: Some(summary),
    }))
}

/// Return the most recent summary, if any.
pub async fn get_summary(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Json<SummaryResponse> {
    Json(SummaryResponse {
        summary: state.pipeline.pending_summary().await,
    })
}

fn reject(rejection: UploadRejection) -> ApiError {
    warn!(reason = rejection.reason(), "Upload rejected: {}", rejection);
    metrics::record_upload_rejected(rejection.reason());
    ApiError::Rejected(rejection)
}

/// Create the upload directory and resolve it to an absolute path.
async fn prepare_upload_dir(dir: &Path) -> ApiResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        ApiError::internal(format!(
            "Failed to create upload directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    tokio::fs::canonicalize(dir).await.map_err(|e| {
        ApiError::internal(format!(
            "Failed to resolve upload directory {}: {}",
            dir.display(),
            e
        ))
    })
}

/// Stream a multipart field to `path`.
///
/// The bytes go to a per-upload temporary name next to `path` and are then
/// renamed into place, so a concurrent upload with the same name never sees
/// a truncated file. The temporary file is removed on error.
async fn store_field(mut field: Field<'_>, path: &Path, id: &UploadId) -> ApiResult<u64> {
    let tmp_path = partial_path(path, id);
    let mut file = File::create(&tmp_path).await.map_err(|e| {
        ApiError::internal(format!("Failed to create {}: {}", tmp_path.display(), e))
    })?;

    let result: ApiResult<u64> = async {
        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await.map_err(|e| {
                ApiError::internal(format!("Failed to write {}: {}", tmp_path.display(), e))
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| {
            ApiError::internal(format!("Failed to flush {}: {}", tmp_path.display(), e))
        })?;
        Ok(written)
    }
    .await;
    drop(file);

    let result = match result {
        Ok(written) => tokio::fs::rename(&tmp_path, path)
            .await
            .map(|()| written)
            .map_err(|e| {
                ApiError::internal(format!("Failed to store {}: {}", path.display(), e))
            }),
        Err(e) => Err(e),
    };

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }

    result
}

/// Hidden temporary name for an upload in flight.
fn partial_path(path: &Path, id: &UploadId) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.part", name, id))
}
