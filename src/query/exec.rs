use crate::collection::ScopedCollection;
use crate::document::Document;
use crate::errors::StoreError;
use crate::tour::{self, FieldType};
use bson::Bson;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;

use super::eval::{apply_projection, compare_docs, eval_filter};
use super::params::translate;
use super::telemetry::{QueryEvent, QueryObserver};
use super::types::{Filter, FilterSpec, MAX_LIMIT, QueryDescriptor};

/// Entry point for the listing path: raw query parameters plus a scoped
/// collection handle become a lazy, not-yet-run query.
#[must_use]
pub fn find_tours(scope: &ScopedCollection, params: &[(String, String)]) -> FindQuery {
    FindQuery::new(scope.clone(), translate(params))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FindResult {
    pub docs: Vec<Document>,
    /// Documents matching the filters before pagination.
    pub total: usize,
}

/// A fully described but unexecuted query. Nothing touches the store until
/// [`FindQuery::run`]; the descriptor is immutable, so the
/// filter → sort → project → paginate order is fixed by construction.
pub struct FindQuery {
    scope: ScopedCollection,
    descriptor: QueryDescriptor,
    observer: Option<Arc<dyn QueryObserver>>,
}

impl FindQuery {
    #[must_use]
    pub fn new(scope: ScopedCollection, descriptor: QueryDescriptor) -> Self {
        Self { scope, descriptor, observer: None }
    }

    /// Attaches an observability hook; one [`QueryEvent`] is emitted per run.
    #[must_use]
    pub fn observe(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Executes the query: coerce + filter, count, sort, project, paginate.
    ///
    /// # Errors
    /// `PageOutOfRange` when the requested page starts past the last
    /// matching document (page 1 of an empty result is fine and empty).
    pub fn run(&self) -> Result<FindResult, StoreError> {
        let started = Instant::now();
        let filter = compile_filters(&self.descriptor.filters);

        let mut docs: Vec<Document> = self
            .scope
            .visible_docs()
            .into_iter()
            .filter(|d| eval_filter(&d.data, &filter))
            .collect();
        let total = docs.len();

        docs.sort_by(|a, b| compare_docs(&a.data, &b.data, &self.descriptor.sort));
        for d in &mut docs {
            d.data = apply_projection(&d.data, &self.descriptor.projection);
        }

        let page = self.descriptor.pagination.page;
        let limit = self.descriptor.pagination.limit.min(MAX_LIMIT);
        let skip = usize::try_from(self.descriptor.pagination.skip()).unwrap_or(usize::MAX);
        let out_of_range = skip >= total && page > 1;
        let docs: Vec<Document> = if skip >= total {
            Vec::new()
        } else {
            let end = skip.saturating_add(usize::try_from(limit).unwrap_or(usize::MAX)).min(total);
            docs[skip..end].to_vec()
        };

        if let Some(obs) = &self.observer {
            obs.observe(&QueryEvent {
                collection: self.scope.name().to_string(),
                filter: format!("{filter:?}"),
                duration_ms: started.elapsed().as_millis(),
                total,
                returned: docs.len(),
                skip: self.descriptor.pagination.skip(),
                limit,
            });
        }

        if out_of_range {
            return Err(StoreError::PageOutOfRange { page, total });
        }
        Ok(FindResult { docs, total })
    }
}

/// Coerces the descriptor's raw filter triples into a runtime predicate.
/// A value that cannot be coerced to its field's storage type yields a
/// never-matching arm rather than an error.
fn compile_filters(specs: &[FilterSpec]) -> Filter {
    if specs.is_empty() {
        return Filter::True;
    }
    let parts = specs
        .iter()
        .map(|spec| match coerce_value(&spec.field, &spec.value) {
            Some(value) => Filter::Cmp { field: spec.field.clone(), op: spec.op, value },
            None => Filter::nothing(),
        })
        .collect();
    Filter::And(parts)
}

fn coerce_value(field: &str, raw: &str) -> Option<Bson> {
    match tour::field_type(field) {
        FieldType::Number => raw.trim().parse::<f64>().ok().map(Bson::Double),
        FieldType::Date => parse_date(raw),
        FieldType::Boolean => match raw.trim() {
            "true" => Some(Bson::Boolean(true)),
            "false" => Some(Bson::Boolean(false)),
            _ => None,
        },
        FieldType::Text => Some(Bson::String(raw.to_string())),
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(raw: &str) -> Option<Bson> {
    let raw = raw.trim();
    let millis = if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        dt.timestamp_millis()
    } else {
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
        date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis()
    };
    Some(Bson::DateTime(bson::DateTime::from_millis(millis)))
}
