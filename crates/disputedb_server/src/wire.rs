//! JSON wire types.
//!
//! The HTTP API speaks camelCase JSON with timestamps as integer
//! microseconds since the Unix epoch; the integer form round-trips
//! exactly, so a client can echo a record back without drift.

use serde::{Deserialize, Serialize};

use disputedb_core::{Record, RecordPayload};

/// A dispute record as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
    /// Unique identifier and idempotency key.
    pub id: String,
    /// Disputed amount in the smallest currency unit.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Free-text reason.
    pub reason: String,
    /// Creation instant, microseconds since the Unix epoch.
    pub created_at: i64,
    /// Last effective write, microseconds since the Unix epoch.
    pub updated_at: i64,
}

impl From<Record> for ApiRecord {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            amount: record.amount,
            currency: record.currency,
            reason: record.reason,
            created_at: record.created_at.as_micros(),
            updated_at: record.updated_at.as_micros(),
        }
    }
}

/// Request body for create and update.
///
/// All three fields are required; a request missing any of them is
/// rejected before it reaches the store. Extra fields are ignored, so a
/// client may echo a whole record it previously received straight back
/// as a request body. The record id comes from the path, never from the
/// body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiPayload {
    /// Disputed amount in the smallest currency unit.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Free-text reason.
    pub reason: String,
}

impl From<ApiPayload> for RecordPayload {
    fn from(payload: ApiPayload) -> Self {
        Self {
            amount: payload.amount,
            currency: payload.currency,
            reason: payload.reason,
        }
    }
}

/// Response body for delete: the id whose absence is now guaranteed.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// The deleted (or already absent) id.
    pub deleted: String,
}
