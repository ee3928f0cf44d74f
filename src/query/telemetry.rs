use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Structured record of one executed listing query, handed to whatever
/// observer the caller attached. Replaces ad-hoc timing output: the executor
/// never logs on its own.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub collection: String,
    pub filter: String,
    pub duration_ms: u128,
    pub total: usize,
    pub returned: usize,
    pub skip: u64,
    pub limit: u64,
}

pub trait QueryObserver: Send + Sync {
    fn observe(&self, event: &QueryEvent);
}

#[derive(Debug, Default)]
pub struct Metrics {
    pub queries_total: AtomicU64,
    pub queries_slow_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub queries_slow_total: u64,
}

/// Default observer: one structured line per query via `log`, with a
/// slow-query threshold and process-lifetime counters.
pub struct LogObserver {
    slow_query_ms: u64,
    metrics: Metrics,
}

impl LogObserver {
    #[must_use]
    pub fn new(slow_query_ms: u64) -> Self {
        Self { slow_query_ms, metrics: Metrics::default() }
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_total: self.metrics.queries_total.load(Ordering::Relaxed),
            queries_slow_total: self.metrics.queries_slow_total.load(Ordering::Relaxed),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(500)
    }
}

impl QueryObserver for LogObserver {
    fn observe(&self, event: &QueryEvent) {
        self.metrics.queries_total.fetch_add(1, Ordering::Relaxed);
        let slow = event.duration_ms >= u128::from(self.slow_query_ms);
        if slow {
            self.metrics.queries_slow_total.fetch_add(1, Ordering::Relaxed);
        }
        let line = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "collection": event.collection,
            "filter": event.filter,
            "duration_ms": u64::try_from(event.duration_ms).unwrap_or(u64::MAX),
            "total": event.total,
            "returned": event.returned,
            "skip": event.skip,
            "limit": event.limit,
            "slow": slow,
        })
        .to_string();
        if slow {
            log::warn!("{line}");
        } else {
            log::debug!("{line}");
        }
    }
}

/// Observer that buffers events in memory so tests can assert on them.
#[derive(Default)]
pub struct MemoryObserver {
    events: RwLock<Vec<QueryEvent>>,
}

impl MemoryObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn take(&self) -> Vec<QueryEvent> {
        std::mem::take(&mut *self.events.write())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl QueryObserver for MemoryObserver {
    fn observe(&self, event: &QueryEvent) {
        self.events.write().push(event.clone());
    }
}
