use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{cars_from_json, seed_cars, Car, CarPatch, NewCar};

use super::{KeyValueStore, StorageError};

/// Key the collection is stored under
pub const CARS_STORAGE_KEY: &str = "car-management-cars";

/// Characters used for the random part of locally generated ids
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random part of locally generated ids
const ID_SUFFIX_LEN: usize = 9;

/// The local car collection.
///
/// Every operation reads the stored collection fresh, so independent
/// handles over the same store never see stale data. Storage failures are
/// logged and swallowed: reads fall back to the seed collection and writes
/// become no-ops.
pub struct LocalSource<S> {
    store: S,
}

impl<S: KeyValueStore> LocalSource<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the stored collection.
    ///
    /// `Ok(None)` means nothing was ever written; `Err(Corrupt)` means
    /// something was written but it is not a JSON array.
    pub fn load(&self) -> Result<Option<Vec<Car>>, StorageError> {
        let raw = match self.store.get(CARS_STORAGE_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let value: Value = serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        match value {
            Value::Array(items) => Ok(Some(cars_from_json(items))),
            _ => Err(StorageError::Corrupt("stored value is not an array".to_string())),
        }
    }

    /// The stored collection, or the seed collection if there is none.
    /// The seed is written back so later reads agree with this one.
    pub fn read_all(&self) -> Vec<Car> {
        match self.load() {
            Ok(Some(cars)) => cars,
            Ok(None) => {
                info!("Local storage is empty, seeding example cars");
                self.reseed()
            }
            Err(e) => {
                warn!(error = %e, "Error reading from local storage, reseeding");
                self.reseed()
            }
        }
    }

    fn reseed(&self) -> Vec<Car> {
        let cars = seed_cars();
        self.write_all(&cars);
        cars
    }

    /// Replace the stored collection.
    pub fn try_write_all(&self, cars: &[Car]) -> Result<(), StorageError> {
        let contents = serde_json::to_string(cars)?;
        self.store.set(CARS_STORAGE_KEY, &contents)
    }

    /// Replace the stored collection, logging instead of failing.
    pub fn write_all(&self, cars: &[Car]) {
        if let Err(e) = self.try_write_all(cars) {
            warn!(error = %e, count = cars.len(), "Error saving to local storage");
        }
    }

    /// Append a car under a freshly generated id.
    pub fn create(&self, car: NewCar) -> Car {
        let mut cars = self.read_all();

        let mut id = generate_id();
        while cars.iter().any(|c| c.id == id) {
            id = generate_id();
        }

        let car = Car::from_new(id, car);
        cars.push(car.clone());
        self.write_all(&cars);

        debug!(id = %car.id, "Created car in local storage");
        car
    }

    /// Merge `patch` into the car with `id`. Returns false if there is no such car.
    pub fn update(&self, id: &str, patch: CarPatch) -> bool {
        let mut cars = self.read_all();
        let Some(car) = cars.iter_mut().find(|c| c.id == id) else {
            return false;
        };

        car.apply_patch(patch);
        self.write_all(&cars);

        debug!(id, "Updated car in local storage");
        true
    }

    /// Remove the car with `id`. Returns false if there is no such car.
    pub fn delete(&self, id: &str) -> bool {
        let mut cars = self.read_all();
        let before = cars.len();
        cars.retain(|c| c.id != id);

        if cars.len() == before {
            return false;
        }

        self.write_all(&cars);
        debug!(id, "Deleted car from local storage");
        true
    }

    pub fn get_by_id(&self, id: &str) -> Option<Car> {
        self.read_all().into_iter().find(|c| c.id == id)
    }

    /// Distinct non-empty brands in first-seen order
    pub fn brands(&self) -> Vec<String> {
        let mut brands: Vec<String> = Vec::new();
        for car in self.read_all() {
            if !car.brand.is_empty() && !brands.contains(&car.brand) {
                brands.push(car.brand);
            }
        }
        brands
    }
}

/// Millisecond timestamp followed by random base36 characters.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    fn kia() -> NewCar {
        NewCar {
            brand: "Kia".to_string(),
            model: "Soul".to_string(),
            year: 2021,
            color: "Green".to_string(),
            price: 18000.0,
            vin: None,
            description: None,
            thumbnails: None,
        }
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("quota exceeded")))
        }
    }

    #[test]
    fn test_read_all_seeds_empty_store() {
        let local = LocalSource::new(MemoryStore::new());
        assert!(local.load().expect("load").is_none());

        let cars = local.read_all();
        assert_eq!(cars, seed_cars());

        // Seed was persisted
        assert_eq!(local.load().expect("load"), Some(seed_cars()));
    }

    #[test]
    fn test_read_all_reseeds_corrupt_store() {
        let store = MemoryStore::new();
        store.set(CARS_STORAGE_KEY, r#"{"not":"a list"}"#).expect("set");
        let local = LocalSource::new(store);

        assert!(matches!(local.load(), Err(StorageError::Corrupt(_))));
        assert_eq!(local.read_all().len(), 5);
        assert_eq!(local.load().expect("load").map(|c| c.len()), Some(5));
    }

    #[test]
    fn test_read_all_keeps_empty_list() {
        let local = LocalSource::new(MemoryStore::new());
        local.write_all(&[]);
        assert!(local.read_all().is_empty());
    }

    #[test]
    fn test_write_read_is_idempotent() {
        let local = LocalSource::new(MemoryStore::new());
        let mut cars = local.read_all();
        cars.push(Car::from_new("x1".to_string(), kia()));
        local.write_all(&cars);

        let first = local.read_all();
        local.write_all(&first);
        let second = local.read_all();

        assert_eq!(first, second);
        assert_eq!(second.len(), 6);
    }

    #[test]
    fn test_rewrite_keeps_loosely_typed_records() {
        let store = MemoryStore::new();
        store
            .set(
                CARS_STORAGE_KEY,
                r#"[
                    {"id":"1","brand":"Kia","model":"Soul","year":2021,"color":"Green","price":18000},
                    {"id":"2","brand":"Fiat","model":"Panda","year":2012.0,"price":"9000"}
                ]"#,
            )
            .expect("set");
        let local = LocalSource::new(store);

        let first = local.read_all();
        local.write_all(&first);

        let raw = local.store().get(CARS_STORAGE_KEY).expect("get").expect("stored");
        let stored: Vec<Value> = serde_json::from_str(&raw).expect("stored array");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1]["price"], serde_json::json!(9000.0));

        let second = local.read_all();
        assert_eq!(first, second);
        assert_eq!(second[1].year, 2012);
        assert_eq!(second[1].color, "");
    }

    #[test]
    fn test_failing_store_never_errors_outward() {
        let local = LocalSource::new(FailingStore);
        assert_eq!(local.read_all().len(), 5);
        local.write_all(&[]);

        let created = local.create(kia());
        assert!(!created.id.is_empty());
        assert!(local.delete("1"));
    }

    #[test]
    fn test_create_appends_with_fresh_id() {
        let local = LocalSource::new(MemoryStore::new());
        let before = local.read_all();

        let created = local.create(kia());
        let after = local.read_all();

        assert_eq!(after.len(), before.len() + 1);
        assert!(!created.id.is_empty());
        assert!(before.iter().all(|c| c.id != created.id));
        assert_eq!(after.last(), Some(&created));
    }

    #[test]
    fn test_update_merges_fields() {
        let local = LocalSource::new(MemoryStore::new());
        let updated = local.update(
            "2",
            CarPatch {
                price: Some(21000.0),
                ..Default::default()
            },
        );
        assert!(updated);

        let civic = local.get_by_id("2").expect("civic");
        assert_eq!(civic.price, 21000.0);
        assert_eq!(civic.model, "Civic");
    }

    #[test]
    fn test_update_missing_id_does_not_write() {
        let local = LocalSource::new(MemoryStore::new());
        assert!(!local.update("nope", CarPatch::default()));
        // Read seeded the store, but nothing else changed
        assert_eq!(local.read_all(), seed_cars());
    }

    #[test]
    fn test_delete() {
        let local = LocalSource::new(MemoryStore::new());
        assert!(local.delete("3"));
        assert!(!local.delete("3"));
        assert_eq!(local.read_all().len(), 4);
        assert!(local.get_by_id("3").is_none());
    }

    #[test]
    fn test_brands_distinct_in_order() {
        let local = LocalSource::new(MemoryStore::new());
        let mut extra = kia();
        extra.brand = "Honda".to_string();
        local.create(extra);
        let mut blank = kia();
        blank.brand = String::new();
        local.create(blank);

        assert_eq!(local.brands(), vec!["Toyota", "Honda", "BMW", "Ford", "Mercedes"]);
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        assert!(id.len() > ID_SUFFIX_LEN);
        let (prefix, suffix) = id.split_at(id.len() - ID_SUFFIX_LEN);
        assert!(prefix.parse::<i64>().is_ok());
        assert!(suffix.bytes().all(|b| ID_ALPHABET.contains(&b)));
        assert_ne!(generate_id(), generate_id());
    }
}
