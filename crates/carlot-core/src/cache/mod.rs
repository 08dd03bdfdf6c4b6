//! Local persistence used as the fallback when the API is unreachable.
//!
//! The whole collection lives under one key as a JSON array of cars and is
//! rewritten in full on every change. Storage is reached through the
//! `KeyValueStore` port so the file-backed store can be swapped for an
//! in-memory one.

pub mod error;
pub mod local;
pub mod store;

pub use error::StorageError;
pub use local::{LocalSource, CARS_STORAGE_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
