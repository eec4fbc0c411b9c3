//! # DisputeDB Codec
//!
//! The dispute [`Record`] type and its deterministic byte codec.
//!
//! Records are stored as CBOR with a fixed field order, so the same
//! logical record always serializes to the same bytes and timestamps
//! round-trip exactly (they are integer microseconds, never floats).
//! The store encodes immediately before every write and decodes
//! immediately after every read; nothing is cached in encoded form.
//!
//! ## Usage
//!
//! ```
//! use disputedb_codec::{encode_record, decode_record, Record, Timestamp};
//!
//! let record = Record {
//!     id: "cb_42".into(),
//!     amount: 1000,
//!     currency: "USD".into(),
//!     reason: "duplicate charge".into(),
//!     created_at: Timestamp::from_micros(1_700_000_000_000_000),
//!     updated_at: Timestamp::from_micros(1_700_000_000_000_000),
//! };
//! let bytes = encode_record(&record).unwrap();
//! assert_eq!(decode_record(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod record;

pub use error::{CodecError, CodecResult};
pub use record::{Record, RecordDraft, RecordPayload, Timestamp};

/// Encodes a record to its canonical CBOR bytes.
///
/// Deterministic: encoding the same record twice yields identical bytes.
///
/// # Errors
///
/// Returns [`CodecError::EncodingFailed`] if serialization fails.
pub fn encode_record(record: &Record) -> CodecResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes a record from CBOR bytes.
///
/// # Errors
///
/// Returns [`CodecError::DecodingFailed`] on malformed or truncated
/// input, including input that parses as CBOR but is missing required
/// fields.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    ciborium::from_reader(bytes).map_err(|e: ciborium::de::Error<std::io::Error>| {
        CodecError::decoding_failed(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            id: "cb_1001".into(),
            amount: 2599,
            currency: "EUR".into(),
            reason: "goods not received".into(),
            created_at: Timestamp::from_micros(1_706_000_000_123_456),
            updated_at: Timestamp::from_micros(1_706_000_500_654_321),
        }
    }

    #[test]
    fn roundtrip_preserves_every_field() {
        let record = sample();
        let bytes = encode_record(&record).unwrap();
        assert_eq!(decode_record(&bytes).unwrap(), record);
    }

    #[test]
    fn encoding_is_deterministic() {
        let record = sample();
        assert_eq!(
            encode_record(&record).unwrap(),
            encode_record(&record).unwrap()
        );
    }

    #[test]
    fn timestamps_roundtrip_exactly() {
        let mut record = sample();
        record.created_at = Timestamp::from_micros(1);
        record.updated_at = Timestamp::from_micros(i64::MAX);
        let decoded = decode_record(&encode_record(&record).unwrap()).unwrap();
        assert_eq!(decoded.created_at.as_micros(), 1);
        assert_eq!(decoded.updated_at.as_micros(), i64::MAX);
    }

    #[test]
    fn negative_amount_roundtrips() {
        let mut record = sample();
        record.amount = -125_000;
        let decoded = decode_record(&encode_record(&record).unwrap()).unwrap();
        assert_eq!(decoded.amount, -125_000);
    }

    #[test]
    fn empty_strings_are_real_values() {
        let mut record = sample();
        record.currency = String::new();
        record.reason = String::new();
        let decoded = decode_record(&encode_record(&record).unwrap()).unwrap();
        assert_eq!(decoded.currency, "");
        assert_eq!(decoded.reason, "");
    }

    #[test]
    fn truncated_input_is_rejected() {
        let bytes = encode_record(&sample()).unwrap();
        let result = decode_record(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let result = decode_record(&[0xFF, 0x00, 0xAB, 0x17]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(decode_record(&[]).is_err());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        // A valid CBOR integer is not a record.
        let mut buf = Vec::new();
        ciborium::into_writer(&42u64, &mut buf).unwrap();
        assert!(decode_record(&buf).is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            "[a-zA-Z0-9_-]{1,40}",
            any::<i64>(),
            "[A-Z]{0,4}",
            ".{0,80}",
            any::<i64>(),
            any::<i64>(),
        )
            .prop_map(|(id, amount, currency, reason, created, updated)| Record {
                id,
                amount,
                currency,
                reason,
                created_at: Timestamp::from_micros(created),
                updated_at: Timestamp::from_micros(updated),
            })
    }

    proptest! {
        #[test]
        fn any_record_roundtrips(record in arb_record()) {
            let bytes = encode_record(&record).unwrap();
            prop_assert_eq!(decode_record(&bytes).unwrap(), record);
        }

        #[test]
        fn decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode_record(&bytes);
        }
    }
}
