//! Carlot core: data access for a car inventory that keeps working offline.
//!
//! The API is the primary source. When it can't be reached, every
//! operation transparently falls back to a local JSON collection, and
//! listings report which side served them.
//!
//! - `api`: `RemoteSource` trait and the reqwest `ApiClient`
//! - `cache`: `LocalSource` over a `KeyValueStore` (file or memory)
//! - `query`: brand filter, search and pagination
//! - `inventory`: the `Inventory` coordinator tying the two sources together
//! - `config`: persisted settings and directory layout

pub mod api;
pub mod cache;
pub mod config;
pub mod inventory;
pub mod models;
pub mod query;
pub mod utils;

pub use api::{ApiClient, ApiError, RemoteSource};
pub use cache::{FileStore, KeyValueStore, LocalSource, MemoryStore, StorageError};
pub use config::Config;
pub use inventory::{ApiState, ApiStatus, CarPage, Inventory, Source, Stored};
pub use models::{Car, CarPatch, NewCar, ValidationError};
pub use query::{Query, QueryPage};
