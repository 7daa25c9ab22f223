//! Blob handlers.
//!
//! Every handler derives the blob key from the full request URI (path plus
//! query). Bodies are streamed in both directions; blobs are never buffered
//! in memory.

use crate::errors::LockerError;
use crate::observability::metrics::record_blob_operation;
use crate::routes::AppState;
use crate::storage::{blob_key, StorageError};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;

/// Handler for GET /{path}
///
/// Streams the blob with status 200, or 404 if it does not exist.
#[instrument(skip_all, name = "locker.blobs.get", fields(key = tracing::field::Empty))]
pub async fn get_blob(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<Response, LockerError> {
    let key = blob_key(&uri);
    tracing::Span::current().record("key", key.as_str());

    let (file, len) = state
        .store
        .open(&key)
        .await
        .inspect_err(|e| record_blob_operation("get", outcome(e)))?;

    record_blob_operation("get", "ok");

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));

    Ok(response)
}

/// Handler for PUT /{path}
///
/// Stores the request body under the derived key. Returns 201, or 422 if a
/// blob with that key already exists (the existing blob is left untouched).
#[instrument(skip_all, name = "locker.blobs.put", fields(key = tracing::field::Empty))]
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    body: Body,
) -> Result<StatusCode, LockerError> {
    let key = blob_key(&uri);
    tracing::Span::current().record("key", key.as_str());

    let stream = body.into_data_stream().map_err(std::io::Error::other);
    let mut reader = StreamReader::new(stream);

    let bytes = state
        .store
        .create(&key, &mut reader)
        .await
        .inspect_err(|e| record_blob_operation("put", outcome(e)))?;

    record_blob_operation("put", "created");
    tracing::info!(target: "locker.blobs", bytes = bytes, "Blob stored");

    Ok(StatusCode::CREATED)
}

/// Handler for DELETE /{path}
///
/// Returns 200 once the blob is removed, or 404 if it does not exist.
#[instrument(skip_all, name = "locker.blobs.delete", fields(key = tracing::field::Empty))]
pub async fn delete_blob(
    State(state): State<Arc<AppState>>,
    uri: Uri,
) -> Result<StatusCode, LockerError> {
    let key = blob_key(&uri);
    tracing::Span::current().record("key", key.as_str());

    state
        .store
        .remove(&key)
        .await
        .inspect_err(|e| record_blob_operation("delete", outcome(e)))?;

    record_blob_operation("delete", "deleted");
    tracing::info!(target: "locker.blobs", "Blob deleted");

    Ok(StatusCode::OK)
}

fn outcome(err: &StorageError) -> &'static str {
    match err {
        StorageError::NotFound => "not_found",
        StorageError::AlreadyExists => "already_exists",
        StorageError::Io(_) => "io_error",
    }
}
