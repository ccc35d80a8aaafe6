//! Record store seam.
//!
//! The planner only needs a handful of quarter operations from whatever
//! persists quarters. [`RecordStore`] names them; the implementations are a
//! Redis-backed store for the server, an HTTP client for talking to a running
//! server, and an in-memory store.

pub mod http;
pub mod memory;
pub mod redis;

use async_trait::async_trait;

use crate::dataset::model::WorkingDataset;
use crate::error::CapResult;
use crate::quarter::model::{Quarter, QuarterSummary, QuarterUpdate};

pub use self::http::HttpStore;
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Quarter persistence as the planner sees it.
///
/// A failed call must leave the store as it was; callers keep their in-memory
/// state untouched when one fails.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All quarters, most recently created first, without datasets.
    async fn list_quarters(&self) -> CapResult<Vec<QuarterSummary>>;

    /// The active quarter, if any.
    async fn get_active_quarter(&self) -> CapResult<Option<Quarter>>;

    async fn get_quarter(&self, id: &str) -> CapResult<Quarter>;

    async fn create_quarter(&self, name: &str, data: &WorkingDataset) -> CapResult<Quarter>;

    async fn update_quarter(&self, id: &str, update: QuarterUpdate) -> CapResult<Quarter>;

    /// Make `id` the only active quarter.
    async fn activate_quarter(&self, id: &str) -> CapResult<Quarter>;

    /// Remove a quarter. Does not pick a new active quarter.
    async fn delete_quarter(&self, id: &str) -> CapResult<()>;

    /// Overwrite the baseline of a quarter with `data`.
    async fn set_baseline(&self, id: &str, data: &WorkingDataset) -> CapResult<Quarter>;
}
