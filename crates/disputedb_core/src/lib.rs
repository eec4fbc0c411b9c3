//! DisputeDB core: an embedded, durable, single-writer store for
//! financial-dispute records.
//!
//! The [`Engine`] provides WAL-backed buckets with snapshot-isolated
//! reads and atomic write transactions; [`RecordStore`] layers the
//! dispute-record CRUD operations on top, with idempotency guarantees
//! baked into every write:
//!
//! - creates are first-write-wins; a retried create returns the stored
//!   record unchanged,
//! - updates compare the incoming payload against the stored record and
//!   skip the write when nothing differs,
//! - deletes of absent records succeed without logging anything.
//!
//! ```no_run
//! use std::sync::Arc;
//! use disputedb_core::{Engine, RecordDraft, RecordPayload, RecordStore};
//!
//! # fn main() -> disputedb_core::CoreResult<()> {
//! let engine = Arc::new(Engine::open("disputes.db")?);
//! let store = RecordStore::new(Arc::clone(&engine))?;
//!
//! let draft = RecordDraft::new(
//!     "cb_1001",
//!     RecordPayload {
//!         amount: 2500,
//!         currency: "USD".into(),
//!         reason: "fraudulent".into(),
//!     },
//! );
//! let (record, created) = store.create(draft)?;
//! assert!(created);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod store;
pub mod types;
pub mod wal;

pub use config::EngineConfig;
pub use engine::{Engine, ReadTxn, WriteTxn};
pub use error::{CoreError, CoreResult};
pub use lock::StoreLock;
pub use store::RecordStore;
pub use types::{SequenceNumber, TransactionId};

pub use disputedb_codec::{Record, RecordDraft, RecordPayload, Timestamp};
