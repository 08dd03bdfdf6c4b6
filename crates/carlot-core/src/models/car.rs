use chrono::{Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Earliest model year accepted for new or edited cars
pub const MIN_YEAR: i32 = 1900;

/// A stored car.
///
/// Parsing is lenient so records written by other clients survive a
/// read/write cycle: numeric ids become strings, numeric strings become
/// numbers, and missing fields take empty defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Car {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub brand: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub model: String,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: i32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_thumbnails", skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<String>>,
}

/// A car that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewCar {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<String>>,
}

/// Partial update. `None` fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CarPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Vec<String>>,
}

/// A car field that fails the inventory's rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Year must be between {min} and {max}, got {year}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("Price must not be negative, got {0}")]
    NegativePrice(f64),
}

/// Latest model year accepted: next calendar year
pub fn max_year() -> i32 {
    Utc::now().year() + 1
}

fn check_required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

fn check_year(year: i32) -> Result<(), ValidationError> {
    let max = max_year();
    if !(MIN_YEAR..=max).contains(&year) {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: MIN_YEAR,
            max,
        });
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), ValidationError> {
    if price.is_nan() || price < 0.0 {
        return Err(ValidationError::NegativePrice(price));
    }
    Ok(())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let year = scalar_to_f64(Value::deserialize(deserializer)?)
        .map(f64::trunc)
        .filter(|y| (i32::MIN as f64..=i32::MAX as f64).contains(y))
        .map(|y| y as i32);
    Ok(year.unwrap_or_default())
}

fn lenient_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_f64(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_thumbnails<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.into_iter().filter_map(scalar_to_string).collect()),
        Value::String(url) => Some(vec![url]),
        _ => None,
    })
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn scalar_to_f64(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

impl Car {
    pub fn from_new(id: String, car: NewCar) -> Self {
        Self {
            id,
            brand: car.brand,
            model: car.model,
            year: car.year,
            color: car.color,
            price: car.price,
            vin: car.vin,
            description: car.description,
            thumbnails: car.thumbnails,
        }
    }

    /// Shallow merge: every field present in the patch replaces the stored one.
    pub fn apply_patch(&mut self, patch: CarPatch) {
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        if let Some(model) = patch.model {
            self.model = model;
        }
        if let Some(year) = patch.year {
            self.year = year;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if patch.vin.is_some() {
            self.vin = patch.vin;
        }
        if patch.description.is_some() {
            self.description = patch.description;
        }
        if patch.thumbnails.is_some() {
            self.thumbnails = patch.thumbnails;
        }
    }

    /// "Toyota Camry"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }

    pub fn thumbnails(&self) -> &[String] {
        self.thumbnails.as_deref().unwrap_or(&[])
    }
}

impl NewCar {
    /// Check the required fields, the year range and the price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_required("Brand", &self.brand)?;
        check_required("Model", &self.model)?;
        check_year(self.year)?;
        check_required("Color", &self.color)?;
        check_price(self.price)
    }

    /// Append an image URL, skipping blanks and duplicates.
    pub fn add_thumbnail(&mut self, url: &str) {
        let url = url.trim();
        if url.is_empty() {
            return;
        }
        let thumbnails = self.thumbnails.get_or_insert_with(Vec::new);
        if !thumbnails.iter().any(|t| t == url) {
            thumbnails.push(url.to_string());
        }
    }
}

impl CarPatch {
    /// Same rules as `NewCar::validate`, for the fields being changed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref brand) = self.brand {
            check_required("Brand", brand)?;
        }
        if let Some(ref model) = self.model {
            check_required("Model", model)?;
        }
        if let Some(year) = self.year {
            check_year(year)?;
        }
        if let Some(ref color) = self.color {
            check_required("Color", color)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        Ok(())
    }
}

/// Convert JSON array items into cars. Every object is kept; anything
/// else (strings, numbers, nested arrays) is not a car and is skipped.
pub fn cars_from_json(items: Vec<Value>) -> Vec<Car> {
    let total = items.len();
    let cars: Vec<Car> = items
        .into_iter()
        .filter_map(|item| {
            if !item.is_object() {
                warn!("Skipping car record that is not an object");
                return None;
            }
            match serde_json::from_value::<Car>(item) {
                Ok(car) => Some(car),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed car record");
                    None
                }
            }
        })
        .collect();

    if cars.len() < total {
        warn!(kept = cars.len(), total, "Dropped malformed car records");
    }
    cars
}

struct Seed {
    id: &'static str,
    brand: &'static str,
    model: &'static str,
    year: i32,
    color: &'static str,
    price: f64,
    vin: &'static str,
    description: &'static str,
    thumbnails: &'static [&'static str],
}

const SEED: [Seed; 5] = [
    Seed {
        id: "1",
        brand: "Toyota",
        model: "Camry",
        year: 2023,
        color: "Silver",
        price: 28000.0,
        vin: "1HGBH41JXMN109186",
        description: "Reliable sedan with excellent fuel economy",
        thumbnails: &[
            "https://images.unsplash.com/photo-1621007947382-bb3c3994e3fb?w=500&h=300&fit=crop",
            "https://images.unsplash.com/photo-1605559424843-9e4c228bf1c2?w=500&h=300&fit=crop",
        ],
    },
    Seed {
        id: "2",
        brand: "Honda",
        model: "Civic",
        year: 2022,
        color: "Blue",
        price: 24000.0,
        vin: "2HGFC2F59NH123456",
        description: "Compact car perfect for city driving",
        thumbnails: &["https://images.unsplash.com/photo-1606664515524-ed2f786a0bd6?w=500&h=300&fit=crop"],
    },
    Seed {
        id: "3",
        brand: "BMW",
        model: "X5",
        year: 2023,
        color: "Black",
        price: 65000.0,
        vin: "5UXCR6C0XN9123456",
        description: "Luxury SUV with premium features",
        thumbnails: &["https://images.unsplash.com/photo-1555215695-3004980ad54e?w=500&h=300&fit=crop"],
    },
    Seed {
        id: "4",
        brand: "Ford",
        model: "F-150",
        year: 2023,
        color: "Red",
        price: 45000.0,
        vin: "1FTFW1ET5NFC12345",
        description: "America's best-selling truck",
        thumbnails: &["https://images.unsplash.com/photo-1594736797933-d0401ba2fe65?w=500&h=300&fit=crop"],
    },
    Seed {
        id: "5",
        brand: "Mercedes",
        model: "C-Class",
        year: 2022,
        color: "White",
        price: 55000.0,
        vin: "WDDGF4HB1NR123456",
        description: "Elegant luxury sedan",
        thumbnails: &["https://images.unsplash.com/photo-1618843479313-40f8afb4b4d8?w=500&h=300&fit=crop"],
    },
];

/// Example inventory written to local storage the first time it is read.
pub fn seed_cars() -> Vec<Car> {
    SEED.iter()
        .map(|s| Car {
            id: s.id.to_string(),
            brand: s.brand.to_string(),
            model: s.model.to_string(),
            year: s.year,
            color: s.color.to_string(),
            price: s.price,
            vin: Some(s.vin.to_string()),
            description: Some(s.description.to_string()),
            thumbnails: Some(s.thumbnails.iter().map(|t| t.to_string()).collect()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_car_with_missing_optionals() {
        let json = r#"{"id":"abc","brand":"Kia","model":"Soul","year":2021,"color":"Green","price":18000}"#;
        let car: Car = serde_json::from_str(json).expect("Failed to parse car");
        assert_eq!(car.id, "abc");
        assert_eq!(car.vin, None);
        assert!(car.thumbnails().is_empty());

        // Absent optionals stay absent on the way back out
        let out = serde_json::to_string(&car).expect("Failed to serialize car");
        assert!(!out.contains("vin"));
        assert!(!out.contains("thumbnails"));
    }

    #[test]
    fn test_parse_car_with_numeric_id() {
        let json = r#"{"id":42,"brand":"Kia","model":"Soul","year":2021,"color":"Green","price":18000.5}"#;
        let car: Car = serde_json::from_str(json).expect("Failed to parse car");
        assert_eq!(car.id, "42");
        assert_eq!(car.price, 18000.5);
    }

    #[test]
    fn test_apply_patch_keeps_unspecified_fields() {
        let mut car = seed_cars().remove(0);
        car.apply_patch(CarPatch {
            price: Some(26500.0),
            color: Some("Gray".to_string()),
            ..Default::default()
        });

        assert_eq!(car.id, "1");
        assert_eq!(car.brand, "Toyota");
        assert_eq!(car.model, "Camry");
        assert_eq!(car.color, "Gray");
        assert_eq!(car.price, 26500.0);
        assert_eq!(car.vin.as_deref(), Some("1HGBH41JXMN109186"));
        assert_eq!(car.thumbnails().len(), 2);
    }

    #[test]
    fn test_add_thumbnail_skips_blank_and_duplicate() {
        let mut car = NewCar {
            brand: "Kia".to_string(),
            model: "Soul".to_string(),
            year: 2021,
            color: "Green".to_string(),
            price: 18000.0,
            vin: None,
            description: None,
            thumbnails: None,
        };
        car.add_thumbnail("https://img/1.jpg");
        car.add_thumbnail("  ");
        car.add_thumbnail("https://img/2.jpg");
        car.add_thumbnail("https://img/1.jpg");

        assert_eq!(
            car.thumbnails,
            Some(vec!["https://img/1.jpg".to_string(), "https://img/2.jpg".to_string()])
        );
    }

    #[test]
    fn test_parse_loosely_typed_car() {
        let json = r#"{"id":7,"brand":"Fiat","model":500,"year":"2019","price":"9000.5","vin":null,"thumbnails":["a.jpg",3]}"#;
        let car: Car = serde_json::from_str(json).expect("Failed to parse car");
        assert_eq!(car.id, "7");
        assert_eq!(car.model, "500");
        assert_eq!(car.year, 2019);
        assert_eq!(car.color, "");
        assert_eq!(car.price, 9000.5);
        assert_eq!(car.vin, None);
        assert_eq!(car.thumbnails, Some(vec!["a.jpg".to_string(), "3".to_string()]));

        let car: Car = serde_json::from_str(r#"{"id":"8","year":2020.0,"price":"cheap"}"#).expect("parse");
        assert_eq!(car.year, 2020);
        assert_eq!(car.price, 0.0);
    }

    #[test]
    fn test_cars_from_json_keeps_objects_only() {
        let items = vec![
            serde_json::json!({"id":"1","brand":"Kia","model":"Soul","year":2021,"color":"Green","price":18000}),
            serde_json::json!("garbage"),
            serde_json::json!({"id":"2","brand":"Kia","model":"Rio","year":"new","color":"Red","price":"9000"}),
        ];
        let cars = cars_from_json(items);
        let ids: Vec<&str> = cars.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(cars[1].year, 0);
        assert_eq!(cars[1].price, 9000.0);
    }

    fn soul() -> NewCar {
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

    #[test]
    fn test_validate_year_bounds() {
        let with_year = |year| NewCar { year, ..soul() };
        let max = max_year();

        assert_eq!(
            with_year(1899).validate(),
            Err(ValidationError::YearOutOfRange {
                year: 1899,
                min: MIN_YEAR,
                max
            })
        );
        assert!(with_year(1900).validate().is_ok());
        assert!(with_year(max).validate().is_ok());
        assert!(matches!(
            with_year(max + 1).validate(),
            Err(ValidationError::YearOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_price_and_required_fields() {
        assert!(NewCar { price: 0.0, ..soul() }.validate().is_ok());
        assert_eq!(
            NewCar { price: -0.01, ..soul() }.validate(),
            Err(ValidationError::NegativePrice(-0.01))
        );
        assert!(NewCar { price: f64::NAN, ..soul() }.validate().is_err());

        let blank = |s: &str| s.to_string();
        assert_eq!(
            NewCar { brand: blank(""), ..soul() }.validate(),
            Err(ValidationError::Required("Brand"))
        );
        assert_eq!(
            NewCar { model: blank("  "), ..soul() }.validate(),
            Err(ValidationError::Required("Model"))
        );
        assert_eq!(
            NewCar { color: blank(""), ..soul() }.validate(),
            Err(ValidationError::Required("Color"))
        );
    }

    #[test]
    fn test_validate_patch_checks_present_fields_only() {
        assert!(CarPatch::default().validate().is_ok());
        assert!(CarPatch {
            vin: Some(String::new()),
            ..Default::default()
        }
        .validate()
        .is_ok());

        assert_eq!(
            CarPatch {
                color: Some(String::new()),
                ..Default::default()
            }
            .validate(),
            Err(ValidationError::Required("Color"))
        );
        assert!(CarPatch {
            year: Some(max_year() + 1),
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(CarPatch {
            price: Some(-5.0),
            ..Default::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_seed_ids_are_unique() {
        let cars = seed_cars();
        assert_eq!(cars.len(), 5);
        for (i, car) in cars.iter().enumerate() {
            assert!(cars[i + 1..].iter().all(|other| other.id != car.id));
        }
    }
}
