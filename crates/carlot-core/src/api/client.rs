//! HTTP client for the remote car collection.
//!
//! One collection URL serves every operation:
//! `GET {url}`, `POST {url}`, `DELETE {url}/{id}`.

use std::time::Duration;

use reqwest::{header, Client, Url};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{cars_from_json, Car, NewCar};

use super::{ApiError, RemoteSource};

// ============================================================================
// Constants
// ============================================================================

/// Collection endpoint used when nothing else is configured
pub const DEFAULT_API_URL: &str = "https://json-api.uz/api/project/fn37/cars";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the car collection.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for the given collection URL with the default timeout
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{id}` with the id percent-encoded as a single path segment
    fn car_url(&self, id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(id);
        }
        url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    pub async fn fetch_cars(&self) -> Result<Vec<Car>, ApiError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let cars = parse_car_list(&text)?;

        debug!(count = cars.len(), "Fetched cars from API");
        Ok(cars)
    }

    pub async fn create_car(&self, car: &NewCar) -> Result<Car, ApiError> {
        let response = self
            .client
            .post(self.base_url.clone())
            .header(header::ACCEPT, "application/json")
            .json(car)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let created = parse_created_car(&text, car);

        debug!(id = %created.id, "Created car via API");
        Ok(created)
    }

    pub async fn delete_car(&self, id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.car_url(id))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::check_response(response).await?;

        debug!(id, "Deleted car via API");
        Ok(())
    }
}

impl RemoteSource for ApiClient {
    async fn list(&self) -> Result<Vec<Car>, ApiError> {
        self.fetch_cars().await
    }

    async fn create(&self, car: &NewCar) -> Result<Car, ApiError> {
        self.create_car(car).await
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.delete_car(id).await
    }
}

/// Parse a list response. Anything other than a JSON array is an empty
/// collection; array entries that are not cars are skipped.
fn parse_car_list(text: &str) -> Result<Vec<Car>, ApiError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse car list: {e}")))?;

    match value {
        Value::Array(items) => Ok(cars_from_json(items)),
        other => {
            warn!(kind = json_kind(&other), "Car list response is not an array, treating as empty");
            Ok(Vec::new())
        }
    }
}

/// The server echoes the created record. Whatever it sends back is laid
/// over the submitted fields, so a bare `{"id": ...}` still yields a full car.
fn parse_created_car(text: &str, submitted: &NewCar) -> Car {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Create response is not JSON");
            Value::Null
        }
    };

    let mut fields = match serde_json::to_value(submitted) {
        Ok(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    match value {
        Value::Object(echoed) => fields.extend(echoed),
        other => warn!(kind = json_kind(&other), "Create response is not an object"),
    }
    if !fields.contains_key("id") {
        warn!("Create response did not include an id");
    }

    serde_json::from_value(Value::Object(fields)).unwrap_or_else(|e| {
        warn!(error = %e, "Could not read created car, keeping submitted fields");
        Car::from_new(String::new(), submitted.clone())
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
