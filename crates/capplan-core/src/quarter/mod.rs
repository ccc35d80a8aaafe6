//! Quarter lifecycle: creation, renaming, activation and deletion.

pub mod model;

use crate::dataset::model::WorkingDataset;
use crate::error::{CapError, CapResult};
use crate::store::RecordStore;
use model::{Quarter, QuarterSummary, QuarterUpdate};

fn validate_name(name: &str) -> CapResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CapError::validation("quarter name is required"));
    }
    Ok(name)
}

/// Create a new quarter.
pub async fn create_quarter<S: RecordStore + ?Sized>(
    store: &S,
    name: &str,
    data: &WorkingDataset,
) -> CapResult<Quarter> {
    let name = validate_name(name)?;
    store.create_quarter(name, data).await
}

/// Rename a quarter.
pub async fn rename_quarter<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
    name: &str,
) -> CapResult<Quarter> {
    let name = validate_name(name)?;
    store
        .update_quarter(
            id,
            QuarterUpdate {
                name: Some(name.to_string()),
                data: None,
            },
        )
        .await
}

/// List all quarters.
pub async fn list_quarters<S: RecordStore + ?Sized>(store: &S) -> CapResult<Vec<QuarterSummary>> {
    store.list_quarters().await
}

/// Get the active quarter, failing when none is active.
pub async fn require_active_quarter<S: RecordStore + ?Sized>(store: &S) -> CapResult<Quarter> {
    store
        .get_active_quarter()
        .await?
        .ok_or(CapError::NoActiveQuarter)
}

/// Delete a quarter.
///
/// When the deleted quarter was active, the most recently created remaining
/// quarter becomes active; with none left, no quarter is active. Returns the
/// newly activated quarter, if any.
pub async fn delete_quarter<S: RecordStore + ?Sized>(
    store: &S,
    id: &str,
) -> CapResult<Option<QuarterSummary>> {
    let quarters = store.list_quarters().await?;
    let target = quarters
        .iter()
        .find(|q| q.id == id)
        .ok_or_else(|| CapError::QuarterNotFound(id.to_string()))?;
    let was_active = target.is_active;

    store.delete_quarter(id).await?;
    tracing::info!(quarter_id = %id, was_active, "Quarter deleted");

    if !was_active {
        return Ok(None);
    }
    match quarters.into_iter().find(|q| q.id != id) {
        Some(next) => {
            let activated = store.activate_quarter(&next.id).await?;
            tracing::info!(quarter_id = %activated.id, "Active quarter reassigned");
            Ok(Some(activated.summary()))
        }
        None => Ok(None),
    }
}
