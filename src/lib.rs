pub mod collection;
pub mod document;
pub mod errors;
pub mod logger;
pub mod query;
pub mod reports;
pub mod service;
pub mod tour;
pub mod types;

use crate::collection::{Collection, ScopedCollection};
use crate::service::TourService;
use std::sync::Arc;

pub use crate::errors::StoreError;

/// The main catalog struct: one in-memory tours collection plus the service
/// layer that fronts it. The scoped read handle it hands out carries the
/// secret-tour visibility rule; there is no public read path without it.
pub struct TourCatalog {
    collection: Arc<Collection>,
    service: TourService,
}

impl TourCatalog {
    #[must_use]
    pub fn new() -> Self {
        let collection = Arc::new(Collection::new("tours"));
        let service = TourService::new(collection.clone());
        Self { collection, service }
    }

    /// Same catalog, with a query observer attached to the listing path.
    #[must_use]
    pub fn with_observer(observer: Arc<dyn query::QueryObserver>) -> Self {
        let collection = Arc::new(Collection::new("tours"));
        let service = TourService::new(collection.clone()).with_observer(observer);
        Self { collection, service }
    }

    #[must_use]
    pub fn tours(&self) -> &TourService {
        &self.service
    }

    /// Scoped read handle for building queries and reports directly.
    #[must_use]
    pub fn scope(&self) -> ScopedCollection {
        self.service.scope().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

impl Default for TourCatalog {
    fn default() -> Self {
        Self::new()
    }
}
