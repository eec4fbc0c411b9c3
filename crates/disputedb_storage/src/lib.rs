//! # DisputeDB Storage
//!
//! Append-only byte-store backends for DisputeDB.
//!
//! A backend is an **opaque byte store**: it reads, appends, flushes, and
//! truncates raw bytes and knows nothing about WAL framing, buckets, or
//! records. All format interpretation happens one layer up, in
//! `disputedb_core`.
//!
//! Two backends are provided:
//!
//! - [`FileBackend`] — persistent storage on top of OS file APIs.
//! - [`InMemoryBackend`] — a `Vec<u8>` for tests and ephemeral engines.
//!
//! ## Example
//!
//! ```rust
//! use disputedb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"log entry").unwrap();
//! assert_eq!(backend.read_at(offset, 9).unwrap(), b"log entry");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
