//! Remote source: the REST collection endpoint for cars.
//!
//! `RemoteSource` is the seam the fallback coordinator talks to;
//! `ApiClient` is the reqwest implementation. Any transport failure or
//! non-2xx status is reported as an `ApiError` and treated by callers as
//! the API being unavailable.

pub mod client;
pub mod error;
pub mod remote;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use error::ApiError;
pub use remote::RemoteSource;
