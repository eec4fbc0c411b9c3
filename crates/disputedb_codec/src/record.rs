//! The dispute record and its client-facing payload types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A UTC instant with microsecond precision.
///
/// Stored and transmitted as integer microseconds since the Unix epoch,
/// which round-trips exactly through CBOR and JSON. Sub-microsecond
/// precision is deliberately discarded at capture time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from microseconds since the Unix epoch.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Returns the raw microsecond value.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Captures the current UTC time.
    #[must_use]
    pub fn now() -> Self {
        let micros = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_micros()).unwrap_or(i64::MAX),
            // Clock before the epoch; clamp rather than panic.
            Err(e) => -i64::try_from(e.duration().as_micros()).unwrap_or(i64::MAX),
        };
        Self(micros)
    }

    /// Returns this timestamp advanced by one microsecond.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// A financial-dispute record.
///
/// `id` is client-supplied and doubles as both the storage key and the
/// idempotency key: every operation referencing the same id produces the
/// same outcome no matter how many times it is retried. `amount` is the
/// disputed amount in the smallest currency unit; integer arithmetic
/// avoids the floating-point drift that matters in money handling.
///
/// Field order is fixed and part of the storage format: the codec
/// serializes fields in declaration order, which is what makes encoding
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier and idempotency key. Immutable after creation.
    pub id: String,
    /// Disputed amount in the smallest currency unit (e.g. cents).
    pub amount: i64,
    /// Currency code (ISO 4217 style, e.g. "USD").
    pub currency: String,
    /// Free-text reason the dispute was raised.
    pub reason: String,
    /// UTC instant of the first successful creation. Never changes.
    pub created_at: Timestamp,
    /// UTC instant of the most recent effective write.
    ///
    /// Equals `created_at` until an update actually mutates one of the
    /// client-mutable fields.
    pub updated_at: Timestamp,
}

/// The client-mutable fields of a record.
///
/// This is the full set of fields an update may change; id and
/// timestamps are never client-supplied. An update replaces all three
/// values wholesale (PUT semantics) — a zero amount or empty string is a
/// real, intentional value, not "unset".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// Disputed amount in the smallest currency unit.
    pub amount: i64,
    /// Currency code.
    pub currency: String,
    /// Free-text reason.
    pub reason: String,
}

impl RecordPayload {
    /// Field-by-field comparison against a stored record.
    ///
    /// This is the write-avoidance check: if nothing differs, the update
    /// is skipped entirely. Any field added to this struct must also be
    /// compared here, or updates to it would be silently dropped.
    #[must_use]
    pub fn differs_from(&self, record: &Record) -> bool {
        self.amount != record.amount
            || self.currency != record.currency
            || self.reason != record.reason
    }

    /// Overwrites the three mutable fields of `record` with this payload.
    pub fn apply_to(self, record: &mut Record) {
        record.amount = self.amount;
        record.currency = self.currency;
        record.reason = self.reason;
    }
}

/// A candidate record for creation: the idempotency key plus the
/// client-mutable fields. Timestamps are stamped by the store at first
/// successful creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDraft {
    /// Client-generated idempotency key.
    pub id: String,
    /// Initial values for the mutable fields.
    pub payload: RecordPayload,
}

impl RecordDraft {
    /// Creates a draft from an id and payload.
    #[must_use]
    pub fn new(id: impl Into<String>, payload: RecordPayload) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Materializes the draft into a full record with both timestamps
    /// set to `now`.
    #[must_use]
    pub fn into_record(self, now: Timestamp) -> Record {
        Record {
            id: self.id,
            amount: self.payload.amount,
            currency: self.payload.currency,
            reason: self.payload.reason,
            created_at: now,
            updated_at: now,
        }
    }
}
