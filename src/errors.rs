use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested page starts past the last matching document. Recoverable;
    /// callers decide between an empty body and a 404-class response.
    #[error("page {page} is out of range: {total} matching documents")]
    PageOutOfRange { page: u64, total: usize },

    #[error("aggregation error: {0}")]
    Aggregation(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("document not found: {0}")]
    NoSuchDocument(String),

    #[error("malformed document: {0}")]
    MalformedDocument(String),
}
