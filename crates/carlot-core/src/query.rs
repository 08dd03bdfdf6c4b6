//! Client-side filtering and pagination over a full collection.
//!
//! The same query runs against whichever source served the collection.
//! Brand filtering is an exact, case-insensitive match; search is a
//! case-insensitive substring match over brand or model. Results keep the
//! input order.

use serde::{Deserialize, Serialize};

use crate::models::Car;
use crate::utils::{contains_ignore_case, eq_ignore_case};

/// Brand value meaning "don't filter by brand"
pub const ALL_BRANDS: &str = "all";

/// Page size when none is given
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// A requested view of the collection. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub brand: Option<String>,
    pub search: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl Query {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            brand: None,
            search: None,
            page,
            limit,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Brand to filter on, if any. Empty and "all" mean no filter.
    fn brand_filter(&self) -> Option<&str> {
        self.brand
            .as_deref()
            .filter(|b| !b.is_empty() && !b.eq_ignore_ascii_case(ALL_BRANDS))
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }

    /// Zero is treated as one
    fn effective_limit(&self) -> usize {
        self.limit.max(1)
    }

    /// Zero-based index of the first item on the requested page
    fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.effective_limit())
    }

    pub fn matches(&self, car: &Car) -> bool {
        if let Some(brand) = self.brand_filter() {
            if !eq_ignore_case(&car.brand, brand) {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            if !contains_ignore_case(&car.brand, term) && !contains_ignore_case(&car.model, term) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage {
    pub cars: Vec<Car>,
    /// Number of cars matching the filters, across all pages
    pub total_cars: usize,
    /// `ceil(total_cars / limit)`; 0 when nothing matches
    pub total_pages: usize,
}

/// Filter `cars` by the query and cut out the requested page.
/// A page past the end is empty, not an error.
pub fn apply(cars: &[Car], query: &Query) -> QueryPage {
    let filtered: Vec<&Car> = cars.iter().filter(|car| query.matches(car)).collect();

    let limit = query.effective_limit();
    let total_cars = filtered.len();
    let total_pages = total_cars.div_ceil(limit);

    let page = filtered
        .into_iter()
        .skip(query.offset())
        .take(limit)
        .cloned()
        .collect();

    QueryPage {
        cars: page,
        total_cars,
        total_pages,
    }
}
