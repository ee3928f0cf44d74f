use crate::document::Document;
use crate::query::eval::eval_filter;
use crate::query::types::Filter;
use crate::types::DocumentId;
use bson::Document as BsonDocument;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory document collection. Insertion order is preserved so listing
/// results are deterministic when sort keys tie.
pub struct Collection {
    name: String,
    store: RwLock<Store>,
}

#[derive(Default)]
struct Store {
    order: Vec<DocumentId>,
    docs: HashMap<DocumentId, Document>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), store: RwLock::new(Store::default()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn insert_document(&self, document: Document) -> DocumentId {
        let id = document.id.clone();
        let mut store = self.store.write();
        store.order.push(id.clone());
        store.docs.insert(id.clone(), document);
        id
    }

    /// Raw, unscoped lookup. Read paths go through [`ScopedCollection`];
    /// this stays crate-private so the standing predicate cannot be skipped
    /// by accident.
    pub(crate) fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.store.read().docs.get(id).cloned()
    }

    pub(crate) fn update_document(&self, id: &DocumentId, new_data: BsonDocument) -> bool {
        let mut store = self.store.write();
        if let Some(doc) = store.docs.get_mut(id) {
            doc.update(new_data);
            true
        } else {
            false
        }
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let mut store = self.store.write();
        if store.docs.remove(id).is_some() {
            store.order.retain(|x| x != id);
            true
        } else {
            false
        }
    }

    pub(crate) fn list_ids(&self) -> Vec<DocumentId> {
        self.store.read().order.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read handle that composes a standing predicate into every find-style
/// access, the collection-wide visibility rule for listing, point reads,
/// counts and aggregation. The query and report layers only ever accept
/// this type, never the raw [`Collection`].
#[derive(Clone)]
pub struct ScopedCollection {
    collection: Arc<Collection>,
    standing: Filter,
}

impl ScopedCollection {
    #[must_use]
    pub fn new(collection: Arc<Collection>, standing: Filter) -> Self {
        Self { collection, standing }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    /// Point read honoring the standing predicate: a hidden document is
    /// indistinguishable from a missing one.
    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.collection
            .find_document(id)
            .filter(|d| eval_filter(&d.data, &self.standing))
    }

    /// All documents the standing predicate admits, in insertion order.
    #[must_use]
    pub fn visible_docs(&self) -> Vec<Document> {
        self.collection
            .list_ids()
            .into_iter()
            .filter_map(|id| self.collection.find_document(&id))
            .filter(|d| eval_filter(&d.data, &self.standing))
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.visible_docs().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{Bson, doc};

    #[test]
    fn insert_find_update_delete_roundtrip() {
        let col = Collection::new("tours");
        let id = col.insert_document(Document::new(doc! {"name": "a"}));
        assert_eq!(col.len(), 1);
        assert!(col.update_document(&id, doc! {"name": "b"}));
        assert_eq!(col.find_document(&id).unwrap().data.get_str("name").unwrap(), "b");
        assert!(col.delete_document(&id));
        assert!(col.find_document(&id).is_none());
        assert!(col.is_empty());
    }

    #[test]
    fn scoped_handle_hides_documents_failing_the_standing_predicate() {
        let col = Arc::new(Collection::new("tours"));
        let visible = col.insert_document(Document::new(doc! {"secretTour": false}));
        let hidden = col.insert_document(Document::new(doc! {"secretTour": true}));
        let unset = col.insert_document(Document::new(doc! {"name": "no flag at all"}));

        let scope = ScopedCollection::new(
            col,
            Filter::Not(Box::new(Filter::Cmp {
                field: "secretTour".into(),
                op: crate::query::types::CmpOp::Eq,
                value: Bson::Boolean(true),
            })),
        );
        assert!(scope.find_document(&visible).is_some());
        assert!(scope.find_document(&hidden).is_none());
        assert!(scope.find_document(&unset).is_some());
        assert_eq!(scope.count(), 2);
    }
}
