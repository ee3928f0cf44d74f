use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_LIMIT: u64 = 10_000;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// Keys with dedicated meaning in a listing query string; they never become
/// document filters.
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Field the default sort falls back to when the query string names none.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// One filter triple as translated from the query string. The value stays a
/// raw string; it is coerced against the field's storage type at execution
/// time, not at translation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub op: CmpOp,
    pub value: String,
}

/// Which fields of each matching document survive into the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// Everything except the internal revision field.
    ExcludeInternal,
    /// Exactly the named fields.
    Include(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub const fn skip(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

/// Immutable description of a listing request, produced once per request by
/// the translator and consumed by the executor. Filter order follows the
/// original query-parameter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub filters: Vec<FilterSpec>,
    pub sort: Vec<SortSpec>,
    pub projection: Projection,
    pub pagination: Pagination,
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: vec![SortSpec { field: DEFAULT_SORT_FIELD.to_string(), order: Order::Desc }],
            projection: Projection::ExcludeInternal,
            pagination: Pagination::default(),
        }
    }
}

/// Runtime predicate evaluated against document bodies. Built either by the
/// executor (from coerced `FilterSpec`s) or as a collection's standing
/// visibility rule.
#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Not(Box<Filter>),
    Cmp { field: String, op: CmpOp, value: Bson },
}

impl Filter {
    /// A predicate no document satisfies.
    #[must_use]
    pub fn nothing() -> Self {
        Self::Not(Box::new(Self::True))
    }
}
