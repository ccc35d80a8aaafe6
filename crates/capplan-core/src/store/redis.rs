//! Redis-backed record store.

use async_trait::async_trait;
use capplan_redis::quarters::{self as queries, QuarterRecord as StoredQuarter};
use capplan_redis::{RedisError, RedisPool};
use uuid::Uuid;

use super::RecordStore;
use crate::dataset::model::WorkingDataset;
use crate::error::{CapError, CapResult};
use crate::quarter::model::{parse_baseline_text, Quarter, QuarterSummary, QuarterUpdate};

/// A [`RecordStore`] persisting quarters in Redis.
#[derive(Clone)]
pub struct RedisStore {
    pool: RedisPool,
}

impl RedisStore {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Connect using `CAPPLAN_REDIS_URL` / `REDIS_URL` or the default URL.
    pub async fn from_env() -> CapResult<Self> {
        Ok(Self::new(capplan_redis::init_pool_from_env().await?))
    }

    pub async fn connect(redis_url: &str) -> CapResult<Self> {
        Ok(Self::new(capplan_redis::init_pool(redis_url).await?))
    }
}

/// Map a store not-found onto the domain error for `id`.
fn not_found_as_quarter(id: &str) -> impl Fn(RedisError) -> CapError + '_ {
    move |e| match e {
        RedisError::NotFound(_) => CapError::QuarterNotFound(id.to_string()),
        e => CapError::Store(e),
    }
}

fn to_quarter(stored: StoredQuarter) -> CapResult<Quarter> {
    let baseline_data = parse_baseline_text(&stored.row.id, stored.baseline.as_deref());
    Ok(Quarter {
        data: WorkingDataset::from_json(&stored.dataset)?,
        baseline_data,
        id: stored.row.id,
        name: stored.row.name,
        is_active: stored.is_active,
        created_at: stored.row.created_at,
        updated_at: stored.row.updated_at,
    })
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn list_quarters(&self) -> CapResult<Vec<QuarterSummary>> {
        let rows = queries::list_quarters(&self.pool).await?;
        let active = queries::active_quarter_id(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| QuarterSummary {
                is_active: active.as_deref() == Some(row.id.as_str()),
                id: row.id,
                name: row.name,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn get_active_quarter(&self) -> CapResult<Option<Quarter>> {
        let Some(id) = queries::active_quarter_id(&self.pool).await? else {
            return Ok(None);
        };
        match queries::get_quarter(&self.pool, &id).await {
            Ok(stored) => to_quarter(stored).map(Some),
            Err(RedisError::NotFound(_)) => {
                tracing::warn!(quarter_id = %id, "Active register points at a missing quarter");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_quarter(&self, id: &str) -> CapResult<Quarter> {
        let stored = queries::get_quarter(&self.pool, id)
            .await
            .map_err(not_found_as_quarter(id))?;
        to_quarter(stored)
    }

    async fn create_quarter(&self, name: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        let id = Uuid::new_v4().to_string();
        queries::create_quarter(&self.pool, &id, name, &data.to_json()?).await?;
        tracing::info!(quarter_id = %id, name, "Quarter created");
        self.get_quarter(&id).await
    }

    async fn update_quarter(&self, id: &str, update: QuarterUpdate) -> CapResult<Quarter> {
        let dataset = update.data.as_ref().map(WorkingDataset::to_json).transpose()?;
        queries::update_quarter(&self.pool, id, update.name.as_deref(), dataset.as_deref())
            .await
            .map_err(not_found_as_quarter(id))?;
        self.get_quarter(id).await
    }

    async fn activate_quarter(&self, id: &str) -> CapResult<Quarter> {
        queries::activate_quarter(&self.pool, id)
            .await
            .map_err(not_found_as_quarter(id))?;
        tracing::info!(quarter_id = %id, "Quarter activated");
        self.get_quarter(id).await
    }

    async fn delete_quarter(&self, id: &str) -> CapResult<()> {
        queries::delete_quarter(&self.pool, id)
            .await
            .map_err(not_found_as_quarter(id))?;
        tracing::info!(quarter_id = %id, "Quarter deleted");
        Ok(())
    }

    async fn set_baseline(&self, id: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        queries::set_baseline(&self.pool, id, &data.to_json()?)
            .await
            .map_err(not_found_as_quarter(id))?;
        tracing::info!(quarter_id = %id, "Baseline set");
        self.get_quarter(id).await
    }
}
