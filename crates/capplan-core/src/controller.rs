//! Quarter controller: drives the view state against a record store.
//!
//! Edits are synchronous and local (`state_mut()`); only the explicit save,
//! set-baseline, snapshot and quarter operations talk to the store. A store
//! failure is returned to the caller and leaves the view state as it was.

use std::sync::Arc;

use crate::dataset::model::WorkingDataset;
use crate::error::{CapError, CapResult};
use crate::quarter::{self, model::Quarter, model::QuarterUpdate};
use crate::store::RecordStore;
use crate::view::{LoadTarget, Mutation, Rejection, ViewMode, ViewState};

pub struct QuarterController<S: RecordStore + ?Sized> {
    store: Arc<S>,
    state: ViewState,
}

impl<S: RecordStore + ?Sized> QuarterController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: ViewState::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Mutable access for local edits.
    pub fn state_mut(&mut self) -> &mut ViewState {
        &mut self.state
    }

    fn current_quarter_id(&self) -> CapResult<String> {
        self.state
            .quarter_id()
            .map(str::to_string)
            .ok_or(CapError::Rejected(Rejection::NoQuarter))
    }

    /// Run one store round-trip under a load ticket. The result is applied
    /// only if no later load or transition superseded the ticket.
    async fn load(&mut self, target: LoadTarget) -> CapResult<()> {
        let ticket = self.state.begin_load(target)?;
        let result = self.store.get_quarter(ticket.quarter_id()).await;
        match result {
            Ok(quarter) => Ok(self.state.apply_load(ticket, quarter)?),
            Err(e) => {
                self.state.abandon_load(&ticket);
                Err(e)
            }
        }
    }

    /// Load the active quarter. Returns its id, or `None` when no quarter is
    /// active (the state is then cleared).
    pub async fn load_active(&mut self) -> CapResult<Option<String>> {
        match self.store.get_active_quarter().await? {
            Some(quarter) => {
                let id = quarter.id.clone();
                self.state.load_quarter(quarter);
                Ok(Some(id))
            }
            None => {
                self.state.clear();
                Ok(None)
            }
        }
    }

    /// Switch to another quarter, landing in LIVE.
    pub async fn select_quarter(&mut self, id: &str) -> CapResult<()> {
        self.load(LoadTarget::Quarter(id.to_string())).await
    }

    /// Activate a quarter in the store and switch to it.
    pub async fn activate_quarter(&mut self, id: &str) -> CapResult<()> {
        let quarter = self.store.activate_quarter(id).await?;
        self.state.load_quarter(quarter);
        Ok(())
    }

    /// Delete a quarter after confirmation, reassigning the active flag when
    /// needed. When the selected quarter goes away, the newly active quarter is
    /// loaded (or the state cleared).
    pub async fn delete_quarter(
        &mut self,
        id: &str,
        confirm: &impl crate::view::Confirm,
    ) -> CapResult<()> {
        let name = self.store.get_quarter(id).await?.name;
        if !confirm.confirm(&format!("Delete quarter '{}'?", name)) {
            return Err(Rejection::Unconfirmed.into());
        }
        quarter::delete_quarter(self.store.as_ref(), id).await?;
        if self.state.quarter_id() == Some(id) {
            self.load_active().await?;
        }
        Ok(())
    }

    /// Switch between LIVE and BASELINE.
    ///
    /// LIVE always reloads the live data and drops any snapshot edits.
    /// BASELINE is refused when the quarter has no baseline.
    pub async fn switch_view(&mut self, mode: ViewMode) -> CapResult<()> {
        match mode {
            ViewMode::Live => self.load(LoadTarget::Live).await,
            ViewMode::Baseline => self.load(LoadTarget::Baseline).await,
        }
    }

    /// "Edit Snapshot": start editing a copy of the baseline.
    pub fn edit_snapshot(&mut self) -> Mutation {
        self.state.begin_baseline_edit()
    }

    /// "Save Snapshot": persist the edited copy as the baseline and return to
    /// the locked baseline view.
    pub async fn save_snapshot(&mut self) -> CapResult<()> {
        let ticket = self.state.begin_load(LoadTarget::SaveSnapshot)?;
        let data = self.state.working().clone();
        let result = self.store.set_baseline(ticket.quarter_id(), &data).await;
        match result {
            Ok(quarter) => {
                tracing::info!(quarter_id = %quarter.id, "Snapshot saved");
                Ok(self.state.apply_load(ticket, quarter)?)
            }
            Err(e) => {
                self.state.abandon_load(&ticket);
                Err(e)
            }
        }
    }

    /// "Cancel": reload the stored baseline, discarding snapshot edits.
    pub async fn cancel_snapshot_edit(&mut self) -> CapResult<()> {
        self.load(LoadTarget::DiscardSnapshotEdits).await
    }

    /// Persist the live working data.
    pub async fn save(&mut self) -> CapResult<Quarter> {
        if self.state.mode() != ViewMode::Live {
            return Err(Rejection::NotInLiveView.into());
        }
        let id = self.current_quarter_id()?;
        let update = QuarterUpdate {
            name: None,
            data: Some(self.state.working().clone()),
        };
        let quarter = self.store.update_quarter(&id, update).await?;
        tracing::info!(quarter_id = %id, "Quarter saved");
        Ok(quarter)
    }

    /// Freeze the live working data as the new baseline.
    pub async fn set_baseline(&mut self) -> CapResult<()> {
        let ticket = self.state.begin_load(LoadTarget::FreezeBaseline)?;
        let data: WorkingDataset = self.state.working().clone();
        let result = self.store.set_baseline(ticket.quarter_id(), &data).await;
        match result {
            Ok(quarter) => {
                tracing::info!(quarter_id = %quarter.id, "Baseline frozen from live data");
                Ok(self.state.apply_load(ticket, quarter)?)
            }
            Err(e) => {
                self.state.abandon_load(&ticket);
                Err(e)
            }
        }
    }
}
