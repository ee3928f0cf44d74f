use crate::collection::{Collection, ScopedCollection};
use crate::document::Document;
use crate::errors::StoreError;
use crate::query::telemetry::QueryObserver;
use crate::query::{FindResult, find_tours};
use crate::reports::{self, DifficultyStats, MonthlyPlan};
use crate::tour::{self, Tour, VERSION_FIELD};
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use std::sync::Arc;

/// CRUD and listing surface for the tours collection. Reads go through the
/// scoped handle so the secret-tour rule holds on every path, point reads
/// included.
pub struct TourService {
    collection: Arc<Collection>,
    scope: ScopedCollection,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl TourService {
    #[must_use]
    pub fn new(collection: Arc<Collection>) -> Self {
        let scope = ScopedCollection::new(collection.clone(), tour::standing_filter());
        Self { collection, scope, observer: None }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn scope(&self) -> &ScopedCollection {
        &self.scope
    }

    /// Validates and stores a new tour; the revision counter starts at 0.
    pub fn create(&self, tour: &Tour) -> Result<DocumentId, StoreError> {
        tour.validate()?;
        self.check_unique_name(&tour.name, None)?;
        let mut data = tour.to_document();
        data.insert(VERSION_FIELD, Bson::Int32(0));
        Ok(self.collection.insert_document(Document::new(data)))
    }

    /// Point read. A secret tour is reported as missing, same as the
    /// listing path.
    pub fn get(&self, id: &DocumentId) -> Result<Tour, StoreError> {
        let doc = self
            .scope
            .find_document(id)
            .ok_or_else(|| StoreError::NoSuchDocument(id.to_string()))?;
        Tour::from_document(&doc.data)
    }

    /// Partial update: merge the patch into the stored document, re-derive
    /// the slug when the name changes, re-validate, then bump the revision
    /// counter. Nothing is written when validation fails. The lookup is
    /// scoped, so a secret tour cannot be updated by id either.
    pub fn update(&self, id: &DocumentId, patch: &BsonDocument) -> Result<Tour, StoreError> {
        let current = self
            .scope
            .find_document(id)
            .ok_or_else(|| StoreError::NoSuchDocument(id.to_string()))?;
        let mut data = current.data.clone();
        for (k, v) in patch {
            if k.as_str() == VERSION_FIELD || k.as_str() == "slug" {
                continue;
            }
            data.insert(k.clone(), v.clone());
        }

        let updated = Tour::from_document(&data)?;
        updated.validate()?;
        if updated.name != Tour::from_document(&current.data)?.name {
            self.check_unique_name(&updated.name, Some(id))?;
        }
        data.insert("slug", updated.slug());
        let version = match current.data.get(VERSION_FIELD) {
            Some(Bson::Int32(v)) => v + 1,
            _ => 1,
        };
        data.insert(VERSION_FIELD, Bson::Int32(version));

        self.collection.update_document(id, data);
        Ok(updated)
    }

    /// Scoped like the other read-then-write paths: a secret tour is
    /// reported as missing rather than deleted.
    pub fn delete(&self, id: &DocumentId) -> Result<(), StoreError> {
        if self.scope.find_document(id).is_some() && self.collection.delete_document(id) {
            Ok(())
        } else {
            Err(StoreError::NoSuchDocument(id.to_string()))
        }
    }

    /// The single listing entry point: translate the raw query parameters
    /// and execute against the scoped collection.
    pub fn find(&self, params: &[(String, String)]) -> Result<FindResult, StoreError> {
        let mut query = find_tours(&self.scope, params);
        if let Some(obs) = &self.observer {
            query = query.observe(obs.clone());
        }
        query.run()
    }

    /// Canned "top 5 best-rated, cheapest first" parameter set. The
    /// transport layer prepends these to the request's own parameters.
    #[must_use]
    pub fn top_tours_alias() -> Vec<(String, String)> {
        vec![
            ("limit".to_string(), "5".to_string()),
            ("sort".to_string(), "-ratingsAverage,price".to_string()),
        ]
    }

    pub fn tour_stats(&self) -> Result<Vec<DifficultyStats>, StoreError> {
        reports::tour_stats(&self.scope).inspect_err(|e| {
            log::warn!("tour stats aggregation failed: {e}");
        })
    }

    pub fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, StoreError> {
        reports::monthly_plan(&self.scope, year).inspect_err(|e| {
            log::warn!("monthly plan aggregation failed: {e}");
        })
    }

    /// Name uniqueness spans the whole collection, hidden documents
    /// included, so a secret tour still blocks a duplicate name.
    fn check_unique_name(&self, name: &str, except: Option<&DocumentId>) -> Result<(), StoreError> {
        // raw ids on purpose: uniqueness is storage-wide, not visibility-wide
        for id in self.collection.list_ids() {
            if Some(&id) == except {
                continue;
            }
            if let Some(doc) = self.collection.find_document(&id)
                && doc.data.get_str("name").is_ok_and(|n| n == name)
            {
                return Err(StoreError::Validation(format!(
                    "a tour named {name:?} already exists"
                )));
            }
        }
        Ok(())
    }
}
