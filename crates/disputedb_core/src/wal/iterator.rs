//! WAL frame iterator.

use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::wal::record::{compute_crc32, WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
use crate::wal::writer::FRAME_HEADER_LEN;

/// Iterates over decoded records in a WAL buffer.
///
/// A truncated frame at the end of the buffer is treated as the end of
/// the log rather than corruption: it is the expected residue of a
/// crash mid-append, and everything before it is intact. Bad magic, an
/// unknown version or type, or a checksum mismatch anywhere is real
/// corruption and surfaces as an error.
pub struct WalIterator {
    data: Vec<u8>,
    offset: usize,
    done: bool,
}

impl WalIterator {
    /// Creates an iterator over a fully read log buffer.
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            offset: 0,
            done: false,
        }
    }

    /// Offset of the next frame to decode.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset as u64
    }

    fn next_record(&mut self) -> CoreResult<Option<WalRecord>> {
        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            return Ok(None);
        }
        if remaining < FRAME_HEADER_LEN {
            warn!(
                offset = self.offset,
                remaining, "torn WAL frame header at end of log, ignoring tail"
            );
            return Ok(None);
        }

        let start = self.offset;
        let header = &self.data[start..start + FRAME_HEADER_LEN];

        if header[0..4] != WAL_MAGIC {
            return Err(CoreError::wal_corruption(format!(
                "bad magic at offset {start}"
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != WAL_VERSION {
            return Err(CoreError::wal_corruption(format!(
                "unsupported WAL version {version} at offset {start}"
            )));
        }

        let record_type = WalRecordType::from_byte(header[6]).ok_or_else(|| {
            CoreError::wal_corruption(format!(
                "unknown record type {} at offset {start}",
                header[6]
            ))
        })?;

        let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]) as usize;
        let frame_len = FRAME_HEADER_LEN + payload_len + 4;
        if remaining < frame_len {
            warn!(
                offset = start,
                needed = frame_len,
                remaining,
                "torn WAL frame at end of log, ignoring tail"
            );
            return Ok(None);
        }

        let payload_end = start + FRAME_HEADER_LEN + payload_len;
        let payload = &self.data[start + FRAME_HEADER_LEN..payload_end];

        let stored_crc = u32::from_le_bytes(
            self.data[payload_end..payload_end + 4]
                .try_into()
                .expect("4 bytes"),
        );
        let computed_crc = compute_crc32(&self.data[start..payload_end]);
        if stored_crc != computed_crc {
            return Err(CoreError::wal_corruption(format!(
                "checksum mismatch at offset {start}: stored {stored_crc:#010x}, computed {computed_crc:#010x}"
            )));
        }

        let record = WalRecord::decode_payload(record_type, payload)?;
        self.offset = payload_end + 4;
        Ok(Some(record))
    }
}

impl Iterator for WalIterator {
    type Item = CoreResult<WalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SequenceNumber, TransactionId};
    use crate::wal::writer::WalManager;
    use disputedb_storage::InMemoryBackend;

    fn log_with(records: &[WalRecord]) -> Vec<u8> {
        let backend = InMemoryBackend::new();
        {
            let wal = WalManager::new(Box::new(backend.clone()));
            for record in records {
                wal.append(record).unwrap();
            }
        }
        backend.data()
    }

    fn sample_records() -> Vec<WalRecord> {
        vec![
            WalRecord::Begin {
                txid: TransactionId::new(1),
            },
            WalRecord::Put {
                txid: TransactionId::new(1),
                bucket: "chargebacks".into(),
                key: "cb_1".into(),
                value: vec![9, 9, 9],
            },
            WalRecord::Commit {
                txid: TransactionId::new(1),
                sequence: SequenceNumber::new(1),
            },
        ]
    }

    #[test]
    fn empty_log_yields_nothing() {
        let mut iter = WalIterator::new(Vec::new());
        assert!(iter.next().is_none());
    }

    #[test]
    fn torn_tail_ends_iteration_cleanly() {
        let records = sample_records();
        let mut data = log_with(&records);
        // Chop into the last frame, simulating a crash mid-append.
        data.truncate(data.len() - 5);

        let decoded: Vec<WalRecord> = WalIterator::new(data)
            .collect::<CoreResult<_>>()
            .unwrap();
        assert_eq!(decoded, records[..2]);
    }

    #[test]
    fn torn_header_ends_iteration_cleanly() {
        let records = sample_records();
        let mut data = log_with(&records[..1]);
        // Leave fewer bytes than a frame header after the first record.
        data.extend_from_slice(&WAL_MAGIC[..3]);

        let decoded: Vec<WalRecord> = WalIterator::new(data)
            .collect::<CoreResult<_>>()
            .unwrap();
        assert_eq!(decoded, records[..1]);
    }

    #[test]
    fn offset_stops_at_the_last_complete_frame() {
        let records = sample_records();
        let intact_len = log_with(&records[..2]).len() as u64;
        let mut data = log_with(&records);
        data.truncate(data.len() - 5);

        let mut iter = WalIterator::new(data);
        while let Some(record) = iter.next() {
            record.unwrap();
        }
        // The torn tail begins exactly where the intact prefix ends.
        assert_eq!(iter.offset(), intact_len);
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut data = log_with(&sample_records());
        data[0] = b'X';
        let result: CoreResult<Vec<WalRecord>> = WalIterator::new(data).collect();
        assert!(matches!(result, Err(CoreError::WalCorruption { .. })));
    }

    #[test]
    fn flipped_payload_bit_is_corruption() {
        let mut data = log_with(&sample_records());
        let mid = data.len() / 2;
        data[mid] ^= 0x01;
        let result: CoreResult<Vec<WalRecord>> = WalIterator::new(data).collect();
        assert!(matches!(result, Err(CoreError::WalCorruption { .. })));
    }

    #[test]
    fn iteration_stops_after_error() {
        let mut data = log_with(&sample_records());
        data[0] = b'X';
        let mut iter = WalIterator::new(data);
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
        // The offset still points at the frame that failed to decode.
        assert_eq!(iter.offset(), 0);
    }
}
