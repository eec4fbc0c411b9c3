//! Request handlers for the chargeback API.
//!
//! Every endpoint is safe to retry:
//!
//! - `GET /chargebacks` is a pure read.
//! - `POST /chargebacks/:id` creates once; a retry gets the stored
//!   record back with 200 instead of 201 and writes nothing.
//! - `PUT /chargebacks/:id` skips the write when the payload matches
//!   what is stored, and reports which case happened in the
//!   `X-Idempotency-Write` response header.
//! - `DELETE /chargebacks/:id` succeeds whether or not the record
//!   exists; the desired end state holds either way.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use disputedb_core::RecordDraft;

use crate::error::ApiError;
use crate::wire::{ApiPayload, ApiRecord, DeleteResponse};
use crate::AppState;

/// Header reporting whether a `PUT` performed an effective write.
pub static IDEMPOTENCY_WRITE: HeaderName = HeaderName::from_static("x-idempotency-write");

/// `GET /chargebacks` — all records, ordered by id.
///
/// An empty store yields `[]`, never `null`.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ApiRecord>>, ApiError> {
    let records = state.store.list()?;
    Ok(Json(records.into_iter().map(ApiRecord::from).collect()))
}

/// `POST /chargebacks/:id` — create once.
///
/// 201 with the new record on first creation; 200 with the stored
/// record, byte-for-byte the same on every retry, when the id already
/// exists. The id in the path is the idempotency key; the body carries
/// only the mutable fields.
pub async fn create(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApiPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let draft = RecordDraft::new(id, payload.into());
    let (record, created) = state.store.create(draft)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiRecord::from(record))).into_response())
}

/// `PUT /chargebacks/:id` — compare-before-write replace.
///
/// Always 200 with the record now stored; `X-Idempotency-Write` tells
/// the caller whether the store actually wrote. 404 if the id does not
/// exist — updates never create.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ApiPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(bad_body)?;
    let (record, written) = state.store.update(&id, payload.into())?;

    let flag = if written { "true" } else { "false" };
    Ok((
        [(IDEMPOTENCY_WRITE.clone(), flag)],
        Json(ApiRecord::from(record)),
    )
        .into_response())
}

/// `DELETE /chargebacks/:id` — converge on absence.
///
/// 200 with `{"deleted": id}` in both the deleted and already-absent
/// cases; the end state is identical, so the responses are too.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.store.delete(&id)?;
    Ok(Json(DeleteResponse { deleted: id }))
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("invalid JSON body: {rejection}"))
}
