//! Storage engine: WAL-backed buckets with snapshot reads and a single
//! writer.
//!
//! All state lives in an immutable [`Arc`]'d map of buckets. A commit
//! appends its records to the WAL, then swaps in a new map; readers
//! clone the `Arc` and keep a consistent point-in-time view for as long
//! as they hold it, without blocking the writer.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use disputedb_storage::{FileBackend, InMemoryBackend, StorageBackend};

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::lock::StoreLock;
use crate::types::{SequenceNumber, TransactionId};
use crate::wal::{WalManager, WalRecord};

/// Bucket name to sorted key/value map.
type State = BTreeMap<String, BTreeMap<String, Vec<u8>>>;

/// A WAL-backed storage engine.
///
/// One writer at a time; any number of concurrent snapshot readers.
/// File-backed engines hold an exclusive advisory lock for their whole
/// lifetime, so a second process opening the same store fails fast.
pub struct Engine {
    wal: WalManager,
    state: RwLock<Arc<State>>,
    write_lock: Mutex<()>,
    next_txid: AtomicU64,
    next_seq: AtomicU64,
    committed_seq: AtomicU64,
    sync_on_commit: bool,
    is_open: AtomicBool,
    path: Option<PathBuf>,
    lock: Mutex<Option<StoreLock>>,
}

impl Engine {
    /// Opens the store at `path` with default configuration.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, EngineConfig::default())
    }

    /// Opens the store at `path`.
    ///
    /// Acquires the store's file lock, then replays the WAL. Only
    /// transactions whose `Commit` record made it to disk take effect;
    /// a torn record at the tail of the log is discarded.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing and `create_if_missing` is off, if
    /// the lock is held by another process past `lock_timeout`, or if
    /// the log is corrupted.
    pub fn open_with_config(path: impl AsRef<Path>, config: EngineConfig) -> CoreResult<Self> {
        let path = path.as_ref();
        if !config.create_if_missing && !path.exists() {
            return Err(CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("store file does not exist: {}", path.display()),
            )));
        }

        let lock = StoreLock::acquire(path, config.lock_timeout)?;
        let backend = FileBackend::open_with_create_dirs(path)?;
        let mut engine = Self::from_backend(Box::new(backend), config)?;
        engine.path = Some(path.to_path_buf());
        *engine.lock.lock() = Some(lock);

        info!(
            path = %path.display(),
            sequence = engine.committed_seq.load(Ordering::SeqCst),
            "opened store"
        );
        Ok(engine)
    }

    /// Opens an ephemeral in-memory engine.
    ///
    /// Nothing survives drop; useful for tests and scratch stores.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::from_backend(Box::new(InMemoryBackend::new()), EngineConfig::default())
    }

    fn from_backend(backend: Box<dyn StorageBackend>, config: EngineConfig) -> CoreResult<Self> {
        let wal = WalManager::new(backend);
        let replay = replay_wal(&wal)?;

        Ok(Self {
            wal,
            state: RwLock::new(Arc::new(replay.state)),
            write_lock: Mutex::new(()),
            next_txid: AtomicU64::new(replay.max_txid + 1),
            next_seq: AtomicU64::new(replay.max_seq + 1),
            committed_seq: AtomicU64::new(replay.max_seq),
            sync_on_commit: config.sync_on_commit,
            is_open: AtomicBool::new(true),
            path: None,
            lock: Mutex::new(None),
        })
    }

    /// Ensures a bucket exists, creating and logging it if absent.
    ///
    /// Idempotent: an existing bucket is left untouched and nothing is
    /// written.
    pub fn create_bucket_if_missing(&self, name: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        self.check_open()?;

        if self.state.read().contains_key(name) {
            return Ok(());
        }

        self.wal.append(&WalRecord::CreateBucket {
            bucket: name.to_string(),
        })?;
        self.wal.flush()?;
        if self.sync_on_commit {
            self.wal.sync()?;
        }

        let mut guard = self.state.write();
        let mut next = (**guard).clone();
        next.insert(name.to_string(), BTreeMap::new());
        *guard = Arc::new(next);

        debug!(bucket = name, "created bucket");
        Ok(())
    }

    /// Runs a read-only closure against a point-in-time snapshot.
    ///
    /// The snapshot is taken when the closure starts; concurrent commits
    /// do not become visible inside it.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTxn) -> CoreResult<T>) -> CoreResult<T> {
        self.check_open()?;
        let snapshot = Arc::clone(&self.state.read());
        let txn = ReadTxn { snapshot };
        f(&txn)
    }

    /// Runs a read-write closure as a single atomic transaction.
    ///
    /// The closure's writes are buffered; if it returns `Ok`, they are
    /// appended to the WAL under one `Begin`/`Commit` pair, flushed,
    /// synced per configuration, and only then published to readers. If
    /// it returns `Err`, nothing reaches the log or the state. A
    /// transaction that buffered no writes commits nothing and appends
    /// no records at all.
    pub fn write<T>(&self, f: impl FnOnce(&mut WriteTxn) -> CoreResult<T>) -> CoreResult<T> {
        let _guard = self.write_lock.lock();
        self.check_open()?;

        let base = Arc::clone(&self.state.read());
        let mut txn = WriteTxn {
            base,
            pending: BTreeMap::new(),
        };

        let value = f(&mut txn)?;

        if txn.pending.is_empty() {
            return Ok(value);
        }

        let txid = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        let sequence = SequenceNumber::new(self.next_seq.fetch_add(1, Ordering::SeqCst));

        self.wal.append(&WalRecord::Begin { txid })?;
        for (bucket, ops) in &txn.pending {
            for (key, op) in ops {
                let record = match op {
                    Some(value) => WalRecord::Put {
                        txid,
                        bucket: bucket.clone(),
                        key: key.clone(),
                        value: value.clone(),
                    },
                    None => WalRecord::Delete {
                        txid,
                        bucket: bucket.clone(),
                        key: key.clone(),
                    },
                };
                self.wal.append(&record)?;
            }
        }
        self.wal.append(&WalRecord::Commit { txid, sequence })?;
        self.wal.flush()?;
        if self.sync_on_commit {
            self.wal.sync()?;
        }

        // Durable on disk; publish to readers.
        let mut next = (*txn.base).clone();
        apply_pending(&mut next, &txn.pending);
        *self.state.write() = Arc::new(next);
        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);

        debug!(%txid, %sequence, "committed transaction");
        Ok(value)
    }

    /// Rewrites the WAL down to one snapshot of the live state.
    ///
    /// Replayed history, aborted transactions, and overwritten versions
    /// are dropped. For a file-backed engine the snapshot is written to
    /// a temporary sibling, synced, and renamed over the store, so a
    /// crash at any point leaves either the old or the new log intact.
    pub fn compact(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        self.check_open()?;

        let snapshot = Arc::clone(&self.state.read());
        let sequence = SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst));
        let old_size = self.wal.size()?;

        match &self.path {
            Some(path) => {
                let tmp_path = path.with_extension("compact");
                let tmp = FileBackend::open(&tmp_path)?;
                let mut tmp: Box<dyn StorageBackend> = Box::new(tmp);
                tmp.truncate(0)?;

                let fresh = WalManager::new(tmp);
                write_snapshot(&fresh, &snapshot, sequence)?;
                fresh.sync()?;
                drop(fresh);

                std::fs::rename(&tmp_path, path)?;
                let reopened = FileBackend::open(path)?;
                self.wal.replace_backend(Box::new(reopened));
            }
            None => {
                self.wal.clear()?;
                write_snapshot(&self.wal, &snapshot, sequence)?;
                self.wal.flush()?;
            }
        }

        info!(
            old_size,
            new_size = self.wal.size()?,
            %sequence,
            "compacted store"
        );
        Ok(())
    }

    /// Flushes, syncs, and marks the engine closed.
    ///
    /// Idempotent; later calls return `Ok` without touching the log.
    /// Reads and writes after close fail with [`CoreError::EngineClosed`].
    pub fn close(&self) -> CoreResult<()> {
        let _guard = self.write_lock.lock();
        if !self.is_open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.wal.flush()?;
        self.wal.sync()?;
        self.lock.lock().take();

        if let Some(path) = &self.path {
            info!(path = %path.display(), "closed store");
        }
        Ok(())
    }

    /// Sequence number of the latest committed transaction.
    #[must_use]
    pub fn committed_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Current WAL size in bytes.
    pub fn wal_size(&self) -> CoreResult<u64> {
        self.wal.size()
    }

    /// Path of the store file, if file-backed.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn check_open(&self) -> CoreResult<()> {
        if self.is_open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::EngineClosed)
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "error closing engine on drop");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("path", &self.path)
            .field("open", &self.is_open.load(Ordering::SeqCst))
            .field(
                "committed_seq",
                &self.committed_seq.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

/// A read-only view over a point-in-time snapshot.
pub struct ReadTxn {
    snapshot: Arc<State>,
}

impl ReadTxn {
    /// Reads the value under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::BucketMissing`] if the bucket was never
    /// created.
    pub fn get(&self, bucket: &str, key: &str) -> CoreResult<Option<Vec<u8>>> {
        let entries = self
            .snapshot
            .get(bucket)
            .ok_or_else(|| CoreError::bucket_missing(bucket))?;
        Ok(entries.get(key).cloned())
    }

    /// Returns every key/value pair in the bucket, in key order.
    pub fn scan(&self, bucket: &str) -> CoreResult<Vec<(String, Vec<u8>)>> {
        let entries = self
            .snapshot
            .get(bucket)
            .ok_or_else(|| CoreError::bucket_missing(bucket))?;
        Ok(entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Number of entries in the bucket.
    pub fn len(&self, bucket: &str) -> CoreResult<usize> {
        let entries = self
            .snapshot
            .get(bucket)
            .ok_or_else(|| CoreError::bucket_missing(bucket))?;
        Ok(entries.len())
    }
}

/// A buffered read-write transaction.
///
/// Reads see the transaction's own pending writes layered over the
/// snapshot it started from.
pub struct WriteTxn {
    base: Arc<State>,
    // None marks a pending delete.
    pending: BTreeMap<String, BTreeMap<String, Option<Vec<u8>>>>,
}

impl WriteTxn {
    /// Reads the value under `key` as this transaction would leave it.
    pub fn get(&self, bucket: &str, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.check_bucket(bucket)?;
        if let Some(ops) = self.pending.get(bucket) {
            if let Some(op) = ops.get(key) {
                return Ok(op.clone());
            }
        }
        Ok(self
            .base
            .get(bucket)
            .and_then(|entries| entries.get(key).cloned()))
    }

    /// Buffers a put of `value` under `key`.
    pub fn put(&mut self, bucket: &str, key: &str, value: Vec<u8>) -> CoreResult<()> {
        self.check_bucket(bucket)?;
        self.pending
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Some(value));
        Ok(())
    }

    /// Buffers a delete of `key` if it exists in this transaction's
    /// view. Returns whether the key existed.
    ///
    /// Deleting an absent key buffers nothing, so a transaction that
    /// only deletes absent keys stays empty and writes no log records.
    pub fn delete(&mut self, bucket: &str, key: &str) -> CoreResult<bool> {
        let existed = self.get(bucket, key)?.is_some();
        if existed {
            self.pending
                .entry(bucket.to_string())
                .or_default()
                .insert(key.to_string(), None);
        }
        Ok(existed)
    }

    fn check_bucket(&self, bucket: &str) -> CoreResult<()> {
        if self.base.contains_key(bucket) {
            Ok(())
        } else {
            Err(CoreError::bucket_missing(bucket))
        }
    }
}

struct Replay {
    state: State,
    max_txid: u64,
    max_seq: u64,
}

/// Replays the WAL into a fresh state map.
///
/// Operations are staged per transaction and applied only when that
/// transaction's `Commit` record is seen; anything left staged when the
/// log ends was never committed and is dropped.
fn replay_wal(wal: &WalManager) -> CoreResult<Replay> {
    let mut state = State::new();
    let mut staged: BTreeMap<u64, Vec<StagedOp>> = BTreeMap::new();
    let mut max_txid = 0u64;
    let mut max_seq = 0u64;
    let mut records = 0u64;

    for record in wal.iter()? {
        records += 1;
        match record? {
            WalRecord::Begin { txid } => {
                max_txid = max_txid.max(txid.as_u64());
                staged.entry(txid.as_u64()).or_default();
            }
            WalRecord::CreateBucket { bucket } => {
                state.entry(bucket).or_default();
            }
            WalRecord::Put {
                txid,
                bucket,
                key,
                value,
            } => {
                max_txid = max_txid.max(txid.as_u64());
                staged
                    .entry(txid.as_u64())
                    .or_default()
                    .push(StagedOp::Put { bucket, key, value });
            }
            WalRecord::Delete { txid, bucket, key } => {
                max_txid = max_txid.max(txid.as_u64());
                staged
                    .entry(txid.as_u64())
                    .or_default()
                    .push(StagedOp::Delete { bucket, key });
            }
            WalRecord::Commit { txid, sequence } => {
                max_txid = max_txid.max(txid.as_u64());
                max_seq = max_seq.max(sequence.as_u64());
                if let Some(ops) = staged.remove(&txid.as_u64()) {
                    for op in ops {
                        match op {
                            StagedOp::Put { bucket, key, value } => {
                                state.entry(bucket).or_default().insert(key, value);
                            }
                            StagedOp::Delete { bucket, key } => {
                                if let Some(entries) = state.get_mut(&bucket) {
                                    entries.remove(&key);
                                }
                            }
                        }
                    }
                }
            }
            WalRecord::Checkpoint { sequence } => {
                max_seq = max_seq.max(sequence.as_u64());
            }
        }
    }

    if !staged.is_empty() {
        debug!(
            abandoned = staged.len(),
            "dropping uncommitted transactions found during replay"
        );
    }
    debug!(records, max_seq, "replayed WAL");

    Ok(Replay {
        state,
        max_txid,
        max_seq,
    })
}

enum StagedOp {
    Put {
        bucket: String,
        key: String,
        value: Vec<u8>,
    },
    Delete {
        bucket: String,
        key: String,
    },
}

fn apply_pending(state: &mut State, pending: &BTreeMap<String, BTreeMap<String, Option<Vec<u8>>>>) {
    for (bucket, ops) in pending {
        let entries = state.entry(bucket.clone()).or_default();
        for (key, op) in ops {
            match op {
                Some(value) => {
                    entries.insert(key.clone(), value.clone());
                }
                None => {
                    entries.remove(key);
                }
            }
        }
    }
}

/// Writes one snapshot of `state` as a minimal log.
fn write_snapshot(wal: &WalManager, state: &State, sequence: SequenceNumber) -> CoreResult<()> {
    for bucket in state.keys() {
        wal.append(&WalRecord::CreateBucket {
            bucket: bucket.clone(),
        })?;
    }

    let has_entries = state.values().any(|entries| !entries.is_empty());
    if has_entries {
        let txid = TransactionId::new(1);
        wal.append(&WalRecord::Begin { txid })?;
        for (bucket, entries) in state {
            for (key, value) in entries {
                wal.append(&WalRecord::Put {
                    txid,
                    bucket: bucket.clone(),
                    key: key.clone(),
                    value: value.clone(),
                })?;
            }
        }
        wal.append(&WalRecord::Commit { txid, sequence })?;
    }

    wal.append(&WalRecord::Checkpoint { sequence })?;
    Ok(())
}
