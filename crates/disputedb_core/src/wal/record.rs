//! WAL record types and payload serialization.

use crate::error::{CoreError, CoreResult};
use crate::types::{SequenceNumber, TransactionId};

/// Magic bytes identifying a WAL record.
pub const WAL_MAGIC: [u8; 4] = *b"DWAL";

/// Current WAL format version.
pub const WAL_VERSION: u16 = 1;

/// Largest value payload a `Put` record may carry.
///
/// The frame uses a 4-byte length field; larger payloads would produce
/// undecodable records.
pub const MAX_VALUE_SIZE: usize = u32::MAX as usize;

/// Type tag of a WAL record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WalRecordType {
    /// Begin a transaction.
    Begin = 1,
    /// Create a named bucket.
    CreateBucket = 2,
    /// Put a key/value pair.
    Put = 3,
    /// Delete a key.
    Delete = 4,
    /// Commit a transaction.
    Commit = 5,
    /// Checkpoint marker written by compaction.
    Checkpoint = 6,
}

impl WalRecordType {
    /// Parses a type byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Begin),
            2 => Some(Self::CreateBucket),
            3 => Some(Self::Put),
            4 => Some(Self::Delete),
            5 => Some(Self::Commit),
            6 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Returns the type byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single WAL record.
///
/// Buckets and keys are UTF-8 strings; values are the codec's opaque
/// bytes. `CreateBucket` is written outside any transaction and applied
/// unconditionally on replay, so bucket names survive restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// Begin a transaction.
    Begin {
        /// Transaction id.
        txid: TransactionId,
    },
    /// Create a named bucket (idempotent on replay).
    CreateBucket {
        /// Bucket name.
        bucket: String,
    },
    /// Put a key/value pair into a bucket.
    Put {
        /// Transaction id.
        txid: TransactionId,
        /// Target bucket.
        bucket: String,
        /// Record key.
        key: String,
        /// Encoded record bytes.
        value: Vec<u8>,
    },
    /// Delete a key from a bucket.
    Delete {
        /// Transaction id.
        txid: TransactionId,
        /// Target bucket.
        bucket: String,
        /// Record key.
        key: String,
    },
    /// Commit a transaction.
    Commit {
        /// Transaction id.
        txid: TransactionId,
        /// Sequence number assigned to this commit.
        sequence: SequenceNumber,
    },
    /// Checkpoint marker recorded after a compaction snapshot.
    Checkpoint {
        /// Committed sequence at the time of the snapshot.
        sequence: SequenceNumber,
    },
}

impl WalRecord {
    /// Returns the record's type tag.
    #[must_use]
    pub fn record_type(&self) -> WalRecordType {
        match self {
            Self::Begin { .. } => WalRecordType::Begin,
            Self::CreateBucket { .. } => WalRecordType::CreateBucket,
            Self::Put { .. } => WalRecordType::Put,
            Self::Delete { .. } => WalRecordType::Delete,
            Self::Commit { .. } => WalRecordType::Commit,
            Self::Checkpoint { .. } => WalRecordType::Checkpoint,
        }
    }

    /// Returns the transaction id, if the record belongs to one.
    #[must_use]
    pub fn txid(&self) -> Option<TransactionId> {
        match self {
            Self::Begin { txid }
            | Self::Put { txid, .. }
            | Self::Delete { txid, .. }
            | Self::Commit { txid, .. } => Some(*txid),
            Self::CreateBucket { .. } | Self::Checkpoint { .. } => None,
        }
    }

    /// Serializes the record payload (frame envelope excluded).
    ///
    /// # Errors
    ///
    /// Fails if a `Put` value exceeds [`MAX_VALUE_SIZE`].
    pub fn encode_payload(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();

        match self {
            Self::Begin { txid } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
            }

            Self::CreateBucket { bucket } => {
                write_str(&mut buf, bucket)?;
            }

            Self::Put {
                txid,
                bucket,
                key,
                value,
            } => {
                if value.len() > MAX_VALUE_SIZE {
                    return Err(CoreError::invalid_operation(format!(
                        "value too large for WAL record: {} bytes",
                        value.len()
                    )));
                }
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                write_str(&mut buf, bucket)?;
                write_str(&mut buf, key)?;
                let len = value.len() as u32;
                buf.extend_from_slice(&len.to_le_bytes());
                buf.extend_from_slice(value);
            }

            Self::Delete { txid, bucket, key } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                write_str(&mut buf, bucket)?;
                write_str(&mut buf, key)?;
            }

            Self::Commit { txid, sequence } => {
                buf.extend_from_slice(&txid.as_u64().to_le_bytes());
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }

            Self::Checkpoint { sequence } => {
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Deserializes a record from its type tag and payload.
    pub fn decode_payload(record_type: WalRecordType, payload: &[u8]) -> CoreResult<Self> {
        let mut cursor = Cursor::new(payload);

        let record = match record_type {
            WalRecordType::Begin => Self::Begin {
                txid: TransactionId::new(cursor.read_u64()?),
            },

            WalRecordType::CreateBucket => Self::CreateBucket {
                bucket: cursor.read_str()?,
            },

            WalRecordType::Put => {
                let txid = TransactionId::new(cursor.read_u64()?);
                let bucket = cursor.read_str()?;
                let key = cursor.read_str()?;
                let len = cursor.read_u32()? as usize;
                let value = cursor.read_bytes(len)?;
                Self::Put {
                    txid,
                    bucket,
                    key,
                    value,
                }
            }

            WalRecordType::Delete => Self::Delete {
                txid: TransactionId::new(cursor.read_u64()?),
                bucket: cursor.read_str()?,
                key: cursor.read_str()?,
            },

            WalRecordType::Commit => Self::Commit {
                txid: TransactionId::new(cursor.read_u64()?),
                sequence: SequenceNumber::new(cursor.read_u64()?),
            },

            WalRecordType::Checkpoint => Self::Checkpoint {
                sequence: SequenceNumber::new(cursor.read_u64()?),
            },
        };

        cursor.finish()?;
        Ok(record)
    }
}

/// Writes a length-prefixed UTF-8 string.
fn write_str(buf: &mut Vec<u8>, s: &str) -> CoreResult<()> {
    let len = u32::try_from(s.len())
        .map_err(|_| CoreError::invalid_operation("string too large for WAL record"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Bounds-checked payload reader.
struct Cursor<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> CoreResult<Vec<u8>> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&e| e <= self.payload.len())
            .ok_or_else(|| CoreError::wal_corruption("unexpected end of payload"))?;
        let bytes = self.payload[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> CoreResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("4 bytes")))
    }

    fn read_u64(&mut self) -> CoreResult<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    fn read_str(&mut self) -> CoreResult<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| CoreError::wal_corruption("invalid UTF-8 string"))
    }

    /// Rejects trailing bytes after a fully decoded record.
    fn finish(self) -> CoreResult<()> {
        if self.pos == self.payload.len() {
            Ok(())
        } else {
            Err(CoreError::wal_corruption(format!(
                "trailing bytes in record: consumed {} of {}",
                self.pos,
                self.payload.len()
            )))
        }
    }
}

/// Computes a CRC32 checksum (IEEE polynomial).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
