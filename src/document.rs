use crate::types::DocumentId;
use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};

/// A stored record: an id plus its BSON body and bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        let now = Utc::now();
        Self { id: DocumentId::new(), data, created_at: now, updated_at: now }
    }

    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.updated_at = Utc::now();
    }
}
