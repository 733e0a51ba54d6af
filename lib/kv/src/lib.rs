//! TTL key-value storage for the qualtrack session subsystem.
//!
//! Keys follow a namespaced convention: `session:<userId>`,
//! `refresh:<token>`. Every entry carries a TTL; expiry is the store's
//! responsibility, callers never run their own timers.
//!
//! The [`KVStore`] trait deliberately exposes a three-way [`Presence`]
//! answer for existence checks: "the key is gone" and "the store cannot
//! answer" lead to opposite decisions in the session layer (reject vs.
//! degrade), so a boolean would lose the distinction.

pub mod error;
pub mod memory;
pub mod redb;
pub mod traits;

pub use error::KVError;
pub use memory::MemoryStore;
pub use redb::RedbStore;
pub use traits::{KVStore, Presence};
