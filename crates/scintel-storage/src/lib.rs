//! Snapshot persistence.
//!
//! Every file is replaced atomically (temp file, fsync, rename), so a run
//! that dies half-way leaves the previously published document in place.
//! [`writer::SnapshotWriter`] decides whether a run's snapshot replaces the
//! current one and back-fills failed pillars from it.

pub mod atomic;
pub mod error;
pub mod hash;
pub mod store;
pub mod writer;


pub use store::{BreakerStore, SnapshotStore};
pub use writer::{SnapshotWriter, WriteOutcome};
