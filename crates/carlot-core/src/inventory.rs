//! Fallback coordination between the API and local storage.
//!
//! Every operation makes exactly one API attempt. If it fails for any
//! reason (transport error, non-2xx status, unparseable body) the same
//! operation is served from local storage instead, and the caller is told
//! which source answered.
//!
//! Conflict policy: remote wins on read. A successful API list replaces the
//! local collection wholesale. Nothing written locally is ever pushed back
//! to the API, so a car created offline stays local-only, and an API-side
//! delete leaves any cached copy in place until the next successful list.
//! Edits and single-car lookups only ever touch local storage.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::RemoteSource;
use crate::cache::{KeyValueStore, LocalSource};
use crate::models::{Car, CarPatch, NewCar};
use crate::query::{self, Query};

/// Which side served an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Remote,
    Local,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Remote => write!(f, "API"),
            Source::Local => write!(f, "local storage"),
        }
    }
}

/// One page of a listing plus where the data came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPage {
    pub cars: Vec<Car>,
    pub total_cars: usize,
    pub total_pages: usize,
    pub using_local_storage: bool,
}

/// A value produced by a write, tagged with the source that accepted it.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored<T> {
    pub value: T,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiState {
    Online,
    Offline,
}

impl fmt::Display for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiState::Online => write!(f, "API Online"),
            ApiState::Offline => write!(f, "API Offline"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub state: ApiState,
    pub checked_at: DateTime<Utc>,
}

impl ApiStatus {
    pub fn is_online(&self) -> bool {
        self.state == ApiState::Online
    }
}

pub struct Inventory<R, S> {
    remote: R,
    local: LocalSource<S>,
    /// Set by the most recent `fetch_collection`
    using_local_storage: AtomicBool,
}

impl<R: RemoteSource, S: KeyValueStore> Inventory<R, S> {
    pub fn new(remote: R, store: S) -> Self {
        Self {
            remote,
            local: LocalSource::new(store),
            using_local_storage: AtomicBool::new(false),
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn local(&self) -> &LocalSource<S> {
        &self.local
    }

    /// Whether the most recent listing was served from local storage.
    pub fn using_local_storage(&self) -> bool {
        self.using_local_storage.load(Ordering::Relaxed)
    }

    /// List cars through `query`, preferring the API.
    ///
    /// A successful API response is cached locally in full before
    /// filtering. On failure the local collection is used instead; that
    /// path cannot fail.
    pub async fn fetch_collection(&self, query: &Query) -> CarPage {
        let (cars, using_local_storage) = match self.remote.list().await {
            Ok(cars) => {
                debug!(count = cars.len(), "Caching API result in local storage");
                self.local.write_all(&cars);
                (cars, false)
            }
            Err(e) => {
                warn!(error = %e, "API fetch failed, using local storage");
                (self.local.read_all(), true)
            }
        };
        self.using_local_storage.store(using_local_storage, Ordering::Relaxed);

        let page = query::apply(&cars, query);
        CarPage {
            cars: page.cars,
            total_cars: page.total_cars,
            total_pages: page.total_pages,
            using_local_storage,
        }
    }

    /// Create a car through the API, or locally if the API is unavailable.
    pub async fn create_car(&self, car: NewCar) -> Stored<Car> {
        match self.remote.create(&car).await {
            Ok(created) => {
                info!(id = %created.id, "Car added via API");
                Stored {
                    value: created,
                    source: Source::Remote,
                }
            }
            Err(e) => {
                warn!(error = %e, "API add failed, using local storage");
                let created = self.local.create(car);
                info!(id = %created.id, "Car added to local storage");
                Stored {
                    value: created,
                    source: Source::Local,
                }
            }
        }
    }

    /// Delete a car through the API, or locally if the API refuses.
    ///
    /// `None` means neither source deleted it: the API failed and the id
    /// is not in local storage either.
    pub async fn delete_car(&self, id: &str) -> Option<Source> {
        match self.remote.delete(id).await {
            Ok(()) => {
                info!(id, "Car deleted via API");
                Some(Source::Remote)
            }
            Err(e) => {
                warn!(id, error = %e, "API delete failed, using local storage");
                if self.local.delete(id) {
                    info!(id, "Car deleted from local storage");
                    Some(Source::Local)
                } else {
                    warn!(id, "Car not found in local storage");
                    None
                }
            }
        }
    }

    /// Edit a car in local storage. Returns false if there is no such car.
    pub fn update_car(&self, id: &str, patch: CarPatch) -> bool {
        self.local.update(id, patch)
    }

    /// Look a car up in local storage.
    pub fn get_car(&self, id: &str) -> Option<Car> {
        self.local.get_by_id(id)
    }

    /// Brands present in local storage, for offering filter choices.
    pub fn brands(&self) -> Vec<String> {
        self.local.brands()
    }

    /// Check the API once with a list request.
    pub async fn check_status(&self) -> ApiStatus {
        let state = match self.remote.list().await {
            Ok(_) => ApiState::Online,
            Err(e) => {
                debug!(error = %e, "API status check failed");
                ApiState::Offline
            }
        };
        ApiStatus {
            state,
            checked_at: Utc::now(),
        }
    }
}
