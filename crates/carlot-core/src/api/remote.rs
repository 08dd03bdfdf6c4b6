use std::future::Future;

use crate::models::{Car, NewCar};

use super::ApiError;

/// Operations the remote collection endpoint supports.
///
/// Updates are not part of the remote contract; edits only ever touch
/// local storage.
pub trait RemoteSource: Send + Sync {
    /// Fetch the whole collection, in server order.
    fn list(&self) -> impl Future<Output = Result<Vec<Car>, ApiError>> + Send;

    /// Create a car and return the server's record, including its assigned id.
    fn create(&self, car: &NewCar) -> impl Future<Output = Result<Car, ApiError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}
