//! HTTP handlers translating requests into store calls

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use crate::store::{KvStore, StoreError, StoreStats};

/// Shared application state
pub type AppState = Arc<KvStore>;

/// Path prefix of the single-key routes
const KEY_PREFIX: &str = "/key/";

const KEY_NOT_FOUND: &str = "Key not found";
const INVALID_BODY: &str = "Invalid or missing request body";

/// Plain-text error response, newline terminated
fn text_error(status: StatusCode, message: &str) -> Response {
    (status, format!("{}\n", message)).into_response()
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            StoreError::NotFound(_) => text_error(StatusCode::NOT_FOUND, KEY_NOT_FOUND),
        }
    }
}

/// Key taken verbatim from the raw request path, without percent-decoding
///
/// Only called behind the `/key/*key` route, which never matches an empty key.
fn key_from_uri(uri: &Uri) -> &str {
    uri.path().strip_prefix(KEY_PREFIX).unwrap_or_default()
}

/// GET / - list every key as a JSON array
pub async fn list_keys(State(store): State<AppState>) -> Json<Vec<String>> {
    let keys = store.list_keys();
    debug!("Listing {} keys", keys.len());
    Json(keys)
}

/// GET /key/{key} - return the raw value
pub async fn get_key(State(store): State<AppState>, uri: Uri) -> Response {
    let key = key_from_uri(&uri);

    match store.get(key) {
        Ok(value) => value.into_response(),
        Err(e) => e.into_response(),
    }
}

/// PUT /key/{key} - store the request body as the value
pub async fn put_key(
    State(store): State<AppState>,
    uri: Uri,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let key = key_from_uri(&uri);

    let body = match body {
        Ok(body) if !body.is_empty() => body,
        Ok(_) => {
            debug!("PUT {}: empty body", uri.path());
            return text_error(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
        Err(e) => {
            debug!("PUT {}: unreadable body: {}", uri.path(), e);
            return text_error(StatusCode::BAD_REQUEST, INVALID_BODY);
        }
    };

    store.put(key, body);
    StatusCode::OK.into_response()
}

/// DELETE /key/{key} - remove the entry
pub async fn delete_key(State(store): State<AppState>, uri: Uri) -> Response {
    let key = key_from_uri(&uri);

    match store.delete(key) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Any method on /key/ - an empty key never names an entry
pub async fn empty_key() -> Response {
    text_error(StatusCode::NOT_FOUND, KEY_NOT_FOUND)
}

/// GET /stats - store statistics
pub async fn stats_handler(State(store): State<AppState>) -> Json<StoreStats> {
    Json(store.stats())
}
