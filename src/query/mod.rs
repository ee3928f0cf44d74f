pub mod telemetry;

pub(crate) mod eval;
mod exec;
mod params;
pub(crate) mod types;

pub use exec::{FindQuery, FindResult, find_tours};
pub use params::translate;
pub use telemetry::{LogObserver, MemoryObserver, QueryEvent, QueryObserver};
pub use types::{
    CmpOp, DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_SORT_FIELD, Filter, FilterSpec, Order,
    Pagination, Projection, QueryDescriptor, RESERVED_KEYS, SortSpec,
};
