//! The idempotent dispute-record store.
//!
//! Every operation runs as exactly one engine transaction, so a retried
//! request either observes the previous attempt's full effect or none of
//! it. Creates are first-write-wins, updates compare before writing, and
//! deletes of absent records succeed without touching the log.

use std::sync::Arc;
use tracing::debug;

use disputedb_codec::{decode_record, encode_record, Record, RecordDraft, RecordPayload, Timestamp};

use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};

/// Bucket holding all dispute records, keyed by record id.
const BUCKET: &str = "chargebacks";

/// CRUD over dispute records with idempotency built into every write.
///
/// The boolean in write results reports whether the store actually
/// mutated state: `false` from [`create`](Self::create) means the id
/// already existed, `false` from [`update`](Self::update) means the
/// payload matched what was stored. Either way the returned record is
/// the one now durable under that id.
#[derive(Debug, Clone)]
pub struct RecordStore {
    engine: Arc<Engine>,
}

impl RecordStore {
    /// Creates a store over `engine`, creating its bucket if needed.
    pub fn new(engine: Arc<Engine>) -> CoreResult<Self> {
        engine.create_bucket_if_missing(BUCKET)?;
        Ok(Self { engine })
    }

    /// A shared handle to the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Creates the record, or returns the existing one if the id is
    /// already taken.
    ///
    /// First write wins: a replayed create returns the stored record
    /// byte-for-byte unchanged, with `false` marking it as a replay.
    /// Timestamps are stamped only on the first successful attempt.
    pub fn create(&self, draft: RecordDraft) -> CoreResult<(Record, bool)> {
        self.engine.write(|txn| {
            if let Some(bytes) = txn.get(BUCKET, &draft.id)? {
                let existing = decode_record(&bytes)?;
                debug!(id = %existing.id, "create replayed, returning stored record");
                return Ok((existing, false));
            }

            let record = draft.into_record(Timestamp::now());
            txn.put(BUCKET, &record.id, encode_record(&record)?)?;
            debug!(id = %record.id, "created record");
            Ok((record, true))
        })
    }

    /// Fetches the record under `id`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotFound`] if no record exists.
    pub fn get(&self, id: &str) -> CoreResult<Record> {
        self.engine.read(|txn| {
            let bytes = txn
                .get(BUCKET, id)?
                .ok_or_else(|| CoreError::not_found(id))?;
            Ok(decode_record(&bytes)?)
        })
    }

    /// Replaces the record's mutable fields with `payload`.
    ///
    /// The payload is compared field by field against the stored record
    /// first; if nothing differs, no write happens, `updated_at` stays
    /// put, and the flag comes back `false`. On an effective write
    /// `updated_at` advances strictly past its previous value even if
    /// the clock has not ticked.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::NotFound`] if no record exists under
    /// `id`; updates never create.
    pub fn update(&self, id: &str, payload: RecordPayload) -> CoreResult<(Record, bool)> {
        self.engine.write(|txn| {
            let bytes = txn
                .get(BUCKET, id)?
                .ok_or_else(|| CoreError::not_found(id))?;
            let mut record = decode_record(&bytes)?;

            if !payload.differs_from(&record) {
                debug!(id, "update matched stored record, skipping write");
                return Ok((record, false));
            }

            payload.apply_to(&mut record);
            record.updated_at = Timestamp::now().max(record.updated_at.next());
            txn.put(BUCKET, id, encode_record(&record)?)?;
            debug!(id, "updated record");
            Ok((record, true))
        })
    }

    /// Deletes the record under `id`.
    ///
    /// Succeeds whether or not the record exists; deleting an absent id
    /// writes nothing to the log.
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        self.engine.write(|txn| {
            let existed = txn.delete(BUCKET, id)?;
            debug!(id, existed, "delete");
            Ok(())
        })
    }

    /// Returns every record, ordered by id.
    ///
    /// An empty store yields an empty vector.
    pub fn list(&self) -> CoreResult<Vec<Record>> {
        self.engine.read(|txn| {
            txn.scan(BUCKET)?
                .into_iter()
                .map(|(_, bytes)| Ok(decode_record(&bytes)?))
                .collect()
        })
    }

    /// Number of records in the store.
    pub fn count(&self) -> CoreResult<usize> {
        self.engine.read(|txn| txn.len(BUCKET))
    }
}
