//! Data models for the car inventory.
//!
//! - `Car`: a stored vehicle listing
//! - `NewCar`: the create payload (a car without an id)
//! - `CarPatch`: a partial update, merged field by field
//! - `ValidationError`: why a create payload or patch was rejected
//! - `seed_cars`: the built-in example collection used when local storage is empty

pub mod car;

pub use car::{cars_from_json, max_year, seed_cars, Car, CarPatch, NewCar, ValidationError, MIN_YEAR};
