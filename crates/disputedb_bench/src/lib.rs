//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use disputedb_codec::{Record, RecordPayload, Timestamp};

/// A payload with a reason of the given length, for sizing runs.
#[must_use]
pub fn payload_with_reason_len(len: usize) -> RecordPayload {
    RecordPayload {
        amount: 2500,
        currency: "USD".into(),
        reason: "x".repeat(len),
    }
}

/// A fully populated record for codec benchmarks.
#[must_use]
pub fn sample_record(reason_len: usize) -> Record {
    Record {
        id: "cb_benchmark".into(),
        amount: 2500,
        currency: "USD".into(),
        reason: "x".repeat(reason_len),
        created_at: Timestamp::from_micros(1_700_000_000_000_000),
        updated_at: Timestamp::from_micros(1_700_000_000_000_000),
    }
}

/// Sequential record ids, zero padded so they sort in creation order.
#[must_use]
pub fn generate_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("cb_{i:08}")).collect()
}
