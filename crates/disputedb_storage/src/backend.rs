//! Storage backend trait.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// Backends do not interpret the bytes they hold; the WAL layer in
/// `disputedb_core` owns all framing. The contract every implementation
/// must honor:
///
/// - `append` returns the offset the data landed at, which equals the
///   store size before the call.
/// - `read_at` returns exactly the bytes previously appended at that
///   offset, and fails rather than short-reads.
/// - After `flush` returns, appended data has reached the OS; after
///   `sync`, it survives process and power loss.
/// - `truncate` discards everything at and after the given offset.
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with `ReadPastEnd` if the range extends beyond the current
    /// size, or with `Io` on an underlying I/O failure.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` at the end of the store and returns its offset.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes pending writes to the OS.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces data and metadata onto durable media.
    ///
    /// Stronger than `flush`: after this returns, appended bytes survive
    /// a crash.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes (the next append offset).
    fn size(&self) -> StorageResult<u64>;

    /// Shrinks the store to `new_size` bytes.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` is larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
