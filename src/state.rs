use crate::config::AppConfig;
use crate::db::{self, DbPool};
use crate::errors::{AppError, AppResult};
use crate::models::black_scholes::BlackScholesMerton;
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub calculations_priced: AtomicU64,
    pub calculations_failed: AtomicU64,
    pub batches_processed: AtomicU64,
    pub records_deleted: AtomicU64,
    pub requests_rejected: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            calculations_priced: AtomicU64::new(0),
            calculations_failed: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            records_deleted: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            calculations_priced: self.calculations_priced.load(Ordering::Relaxed),
            calculations_failed: self.calculations_failed.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for PerfCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub calculations_priced: u64,
    pub calculations_failed: u64,
    pub batches_processed: u64,
    pub records_deleted: u64,
    pub requests_rejected: u64,
}

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub pricer: BlackScholesMerton,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Arc<Self> {
        Arc::new(Self {
            config,
            db,
            pricer: BlackScholesMerton::new(),
            counters: PerfCounters::new(),
        })
    }

    /// Release the state and close the database. Fails, leaving the
    /// connection open, while a router or handler still holds a clone.
    pub fn close(self: Arc<Self>) -> AppResult<()> {
        let state = Arc::try_unwrap(self)
            .map_err(|_| AppError::Database("close: state still shared".into()))?;
        db::close_db(state.db)
    }

    #[inline]
    pub fn record_priced(&self, n: u64) {
        self.counters.calculations_priced.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failed(&self, n: u64) {
        self.counters.calculations_failed.fetch_add(n, Ordering::Relaxed);
    }
}
