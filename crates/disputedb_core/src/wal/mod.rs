//! Write-ahead log.
//!
//! Commits are made durable by appending framed records to an
//! append-only log before the in-memory state is published. On open the
//! log is replayed; only transactions with a `Commit` record take
//! effect.

mod iterator;
mod record;
mod writer;

pub use iterator::WalIterator;
pub use record::{WalRecord, WalRecordType, WAL_MAGIC, WAL_VERSION};
pub use writer::WalManager;
