//! In-process record store.
//!
//! Datasets are kept as serialized text, the way the Redis store keeps them,
//! so reads go through the same parsing as a real store.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::RecordStore;
use crate::dataset::model::WorkingDataset;
use crate::error::{CapError, CapResult};
use crate::quarter::model::{parse_baseline_text, Quarter, QuarterSummary, QuarterUpdate};

#[derive(Debug, Clone)]
struct StoredQuarter {
    id: String,
    name: String,
    dataset: String,
    baseline: Option<String>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Default)]
struct Inner {
    /// Insertion order; listed newest first.
    quarters: Vec<StoredQuarter>,
    active: Option<String>,
}

impl Inner {
    fn find(&self, id: &str) -> CapResult<&StoredQuarter> {
        self.quarters
            .iter()
            .find(|q| q.id == id)
            .ok_or_else(|| CapError::QuarterNotFound(id.to_string()))
    }

    fn find_mut(&mut self, id: &str) -> CapResult<&mut StoredQuarter> {
        self.quarters
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| CapError::QuarterNotFound(id.to_string()))
    }

    fn quarter(&self, id: &str) -> CapResult<Quarter> {
        let stored = self.find(id)?;
        Ok(Quarter {
            id: stored.id.clone(),
            name: stored.name.clone(),
            is_active: self.active.as_deref() == Some(id),
            data: WorkingDataset::from_json(&stored.dataset)?,
            baseline_data: parse_baseline_text(id, stored.baseline.as_deref()),
            created_at: stored.created_at.clone(),
            updated_at: stored.updated_at.clone(),
        })
    }
}

/// A [`RecordStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw baseline text as-is, bypassing serialization.
    pub async fn put_raw_baseline(&self, id: &str, text: &str) -> CapResult<()> {
        let mut inner = self.inner.write().await;
        inner.find_mut(id)?.baseline = Some(text.to_string());
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_quarters(&self) -> CapResult<Vec<QuarterSummary>> {
        let inner = self.inner.read().await;
        Ok(inner
            .quarters
            .iter()
            .rev()
            .map(|q| QuarterSummary {
                id: q.id.clone(),
                name: q.name.clone(),
                is_active: inner.active.as_deref() == Some(q.id.as_str()),
                created_at: q.created_at.clone(),
                updated_at: q.updated_at.clone(),
            })
            .collect())
    }

    async fn get_active_quarter(&self) -> CapResult<Option<Quarter>> {
        let inner = self.inner.read().await;
        match inner.active.as_deref() {
            Some(id) => inner.quarter(id).map(Some),
            None => Ok(None),
        }
    }

    async fn get_quarter(&self, id: &str) -> CapResult<Quarter> {
        self.inner.read().await.quarter(id)
    }

    async fn create_quarter(&self, name: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        let id = Uuid::new_v4().to_string();
        let dataset = data.to_json()?;
        let mut inner = self.inner.write().await;
        inner.quarters.push(StoredQuarter {
            id: id.clone(),
            name: name.to_string(),
            dataset,
            baseline: None,
            created_at: now(),
            updated_at: now(),
        });
        inner.quarter(&id)
    }

    async fn update_quarter(&self, id: &str, update: QuarterUpdate) -> CapResult<Quarter> {
        let dataset = update.data.as_ref().map(WorkingDataset::to_json).transpose()?;
        let mut inner = self.inner.write().await;
        let stored = inner.find_mut(id)?;
        if let Some(name) = update.name {
            stored.name = name;
        }
        if let Some(dataset) = dataset {
            stored.dataset = dataset;
        }
        stored.updated_at = now();
        inner.quarter(id)
    }

    async fn activate_quarter(&self, id: &str) -> CapResult<Quarter> {
        let mut inner = self.inner.write().await;
        inner.find(id)?;
        inner.active = Some(id.to_string());
        inner.quarter(id)
    }

    async fn delete_quarter(&self, id: &str) -> CapResult<()> {
        let mut inner = self.inner.write().await;
        inner.find(id)?;
        inner.quarters.retain(|q| q.id != id);
        if inner.active.as_deref() == Some(id) {
            inner.active = None;
        }
        Ok(())
    }

    async fn set_baseline(&self, id: &str, data: &WorkingDataset) -> CapResult<Quarter> {
        let baseline = data.to_json()?;
        let mut inner = self.inner.write().await;
        let stored = inner.find_mut(id)?;
        stored.baseline = Some(baseline);
        stored.updated_at = now();
        inner.quarter(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_activation_is_exclusive() {
        let store = MemoryStore::new();
        let a = store.create_quarter("Q1", &WorkingDataset::default()).await.unwrap();
        let b = store.create_quarter("Q2", &WorkingDataset::default()).await.unwrap();

        store.activate_quarter(&a.id).await.unwrap();
        store.activate_quarter(&b.id).await.unwrap();

        let active: Vec<_> = store
            .list_quarters()
            .await
            .unwrap()
            .into_iter()
            .filter(|q| q.is_active)
            .map(|q| q.id)
            .collect();
        assert_eq!(active, vec![b.id.clone()]);
        assert_eq!(store.get_active_quarter().await.unwrap().unwrap().id, b.id);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = MemoryStore::new();
        store.create_quarter("Q1", &WorkingDataset::default()).await.unwrap();
        store.create_quarter("Q2", &WorkingDataset::default()).await.unwrap();
        let names: Vec<_> = store
            .list_quarters()
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.name)
            .collect();
        assert_eq!(names, vec!["Q2", "Q1"]);
    }

    #[tokio::test]
    async fn test_missing_quarter_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_quarter("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.activate_quarter("nope").await.is_err());
        assert!(store.delete_quarter("nope").await.is_err());
        assert!(store.get_active_quarter().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_stored_baseline_reads_as_none() {
        let store = MemoryStore::new();
        let q = store.create_quarter("Q1", &WorkingDataset::default()).await.unwrap();
        store.put_raw_baseline(&q.id, "{\"projects\": [").await.unwrap();
        assert!(store.get_quarter(&q.id).await.unwrap().baseline_data.is_none());
    }

    #[tokio::test]
    async fn test_delete_clears_active_register() {
        let store = MemoryStore::new();
        let q = store.create_quarter("Q1", &WorkingDataset::default()).await.unwrap();
        store.activate_quarter(&q.id).await.unwrap();
        store.delete_quarter(&q.id).await.unwrap();
        assert!(store.get_active_quarter().await.unwrap().is_none());
        assert!(store.list_quarters().await.unwrap().is_empty());
    }
}
