//! View-state machine for one quarter.
//!
//! ```text
//!            select baseline             Edit Snapshot
//!   LIVE ───────────────────▶ BASELINE ─────────────────▶ BASELINE
//!    ▲                         locked  ◀───────────────── editing
//!    │                                  Save / Cancel
//!    └──────────── switch to LIVE (from any state) ──────────┘
//! ```
//!
//! LIVE shows and edits the quarter's live data. BASELINE-locked shows the
//! frozen baseline as-is and rejects every edit. BASELINE-editing edits a copy
//! of the baseline that is only persisted by saving the snapshot.
//!
//! Store round-trips go through [`LoadTicket`]s: a ticket is taken before the
//! request and handed back with the result. Any later load request or local
//! transition invalidates outstanding tickets, so a late result for a quarter
//! or mode the user already left is discarded instead of applied.

mod edit;

pub use edit::{Confirm, Direction, ProjectField, SprintField, TechReviewField};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::model::WorkingDataset;
use crate::diff::BaselineDiff;
use crate::quarter::model::Quarter;

/// Which dataset the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Live,
    Baseline,
}

/// Combined view mode and edit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Live,
    BaselineLocked,
    BaselineEditing,
}

/// A refused operation. State is left untouched whenever one is returned.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("the baseline is read-only; edit the snapshot first")]
    Locked,

    #[error("no such entity")]
    NotFound,

    #[error("removal was not confirmed")]
    Unconfirmed,

    #[error("already at the edge of the list")]
    AtBoundary,

    #[error("the sprint does not exist for this team")]
    UnknownSprint,

    #[error("assign a tech lead before scheduling the review")]
    NoTechLead,

    #[error("this quarter has no baseline")]
    NoBaseline,

    #[error("no quarter is loaded")]
    NoQuarter,

    #[error("the snapshot is not being edited")]
    NotEditing,

    #[error("only possible while viewing the baseline")]
    NotInBaselineView,

    #[error("only possible in the live view")]
    NotInLiveView,

    #[error("a newer load superseded this result")]
    Stale,

    #[error("no id is left for a new entry")]
    IdsExhausted,
}

/// Outcome of a state operation.
pub type Mutation<T = ()> = Result<T, Rejection>;

/// What a store round-trip will do to the state once it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    /// Switch to another quarter; always lands in LIVE.
    Quarter(String),
    /// Return to LIVE, reloading the live data.
    Live,
    /// Show the baseline (locked), refreshing it first.
    Baseline,
    /// Reload the baseline and overwrite the working copy with it.
    DiscardSnapshotEdits,
    /// The edited snapshot is being persisted.
    SaveSnapshot,
    /// The live data is being frozen as the new baseline.
    FreezeBaseline,
}

/// Proof of a pending store round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    quarter_id: String,
    target: LoadTarget,
}

impl LoadTicket {
    /// Quarter the round-trip is for.
    pub fn quarter_id(&self) -> &str {
        &self.quarter_id
    }

    pub fn target(&self) -> &LoadTarget {
        &self.target
    }
}

/// Editable planning state of the selected quarter.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    quarter_id: Option<String>,
    working: WorkingDataset,
    baseline: Option<WorkingDataset>,
    mode: ViewMode,
    editing_baseline: bool,
    generation: u64,
    pending: Option<LoadTicket>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quarter_id(&self) -> Option<&str> {
        self.quarter_id.as_deref()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn is_editing_baseline(&self) -> bool {
        self.editing_baseline
    }

    pub fn phase(&self) -> Phase {
        match (self.mode, self.editing_baseline) {
            (ViewMode::Live, _) => Phase::Live,
            (ViewMode::Baseline, false) => Phase::BaselineLocked,
            (ViewMode::Baseline, true) => Phase::BaselineEditing,
        }
    }

    /// Edits are refused while the baseline is shown without editing it.
    pub fn is_locked(&self) -> bool {
        self.phase() == Phase::BaselineLocked
    }

    pub fn baseline(&self) -> Option<&WorkingDataset> {
        self.baseline.as_ref()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// The editable arrays: live data in LIVE, the snapshot copy while editing.
    pub fn working(&self) -> &WorkingDataset {
        &self.working
    }

    /// The dataset to show and aggregate: the baseline itself while locked,
    /// the working arrays otherwise.
    pub fn display(&self) -> &WorkingDataset {
        match (self.phase(), &self.baseline) {
            (Phase::BaselineLocked, Some(baseline)) => baseline,
            _ => &self.working,
        }
    }

    /// Baseline comparison, available only in LIVE with a baseline present.
    pub fn diff(&self) -> Option<BaselineDiff<'_>> {
        match (self.mode, &self.baseline) {
            (ViewMode::Live, Some(baseline)) => Some(BaselineDiff::new(Some(baseline))),
            _ => None,
        }
    }

    /// Whether a store round-trip is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Replace the state with a freshly fetched quarter, in LIVE.
    pub fn load_quarter(&mut self, quarter: Quarter) {
        self.invalidate_pending();
        self.enter_live(quarter);
    }

    /// Drop the selected quarter, e.g. after it was deleted.
    pub fn clear(&mut self) {
        self.invalidate_pending();
        self.quarter_id = None;
        self.working = WorkingDataset::default();
        self.baseline = None;
        self.mode = ViewMode::Live;
        self.editing_baseline = false;
    }

    /// Validate a transition that needs a store round-trip and take a ticket
    /// for it. Supersedes any outstanding ticket.
    pub fn begin_load(&mut self, target: LoadTarget) -> Mutation<LoadTicket> {
        let quarter_id = match &target {
            LoadTarget::Quarter(id) => id.clone(),
            _ => self.quarter_id.clone().ok_or(Rejection::NoQuarter)?,
        };
        match target {
            LoadTarget::Quarter(_) | LoadTarget::Live => {}
            LoadTarget::Baseline => {
                if self.baseline.is_none() {
                    return Err(Rejection::NoBaseline);
                }
            }
            LoadTarget::DiscardSnapshotEdits => {
                if self.mode != ViewMode::Baseline {
                    return Err(Rejection::NotInBaselineView);
                }
            }
            LoadTarget::SaveSnapshot => {
                if !self.editing_baseline {
                    return Err(Rejection::NotEditing);
                }
            }
            LoadTarget::FreezeBaseline => {
                if self.mode != ViewMode::Live {
                    return Err(Rejection::NotInLiveView);
                }
            }
        }

        self.generation += 1;
        let ticket = LoadTicket {
            generation: self.generation,
            quarter_id,
            target,
        };
        self.pending = Some(ticket.clone());
        Ok(ticket)
    }

    /// Forget a ticket whose round-trip failed. State stays as it was.
    pub fn abandon_load(&mut self, ticket: &LoadTicket) {
        if self.pending.as_ref() == Some(ticket) {
            self.pending = None;
        }
    }

    /// Apply the quarter a round-trip returned.
    ///
    /// Returns [`Rejection::Stale`] without touching state when the ticket was
    /// superseded or the result is for another quarter.
    pub fn apply_load(&mut self, ticket: LoadTicket, quarter: Quarter) -> Mutation {
        if self.pending.as_ref() != Some(&ticket) || quarter.id != ticket.quarter_id {
            tracing::debug!(
                quarter_id = %ticket.quarter_id,
                target = ?ticket.target,
                "Discarding stale load result"
            );
            return Err(Rejection::Stale);
        }
        if !matches!(ticket.target, LoadTarget::Quarter(_))
            && self.quarter_id.as_deref() != Some(ticket.quarter_id.as_str())
        {
            return Err(Rejection::Stale);
        }
        self.pending = None;

        match ticket.target {
            LoadTarget::Quarter(_) | LoadTarget::Live => {
                self.enter_live(quarter);
                Ok(())
            }
            LoadTarget::Baseline => match quarter.baseline_data {
                Some(baseline) => {
                    self.baseline = Some(baseline);
                    self.mode = ViewMode::Baseline;
                    self.editing_baseline = false;
                    Ok(())
                }
                None => {
                    self.baseline = None;
                    Err(Rejection::NoBaseline)
                }
            },
            LoadTarget::DiscardSnapshotEdits => match quarter.baseline_data {
                Some(baseline) => {
                    self.working = baseline.clone();
                    self.baseline = Some(baseline);
                    self.mode = ViewMode::Baseline;
                    self.editing_baseline = false;
                    Ok(())
                }
                None => {
                    self.enter_live(quarter);
                    Err(Rejection::NoBaseline)
                }
            },
            LoadTarget::SaveSnapshot => {
                self.baseline = quarter.baseline_data;
                self.editing_baseline = false;
                if self.baseline.is_none() {
                    self.mode = ViewMode::Live;
                }
                Ok(())
            }
            LoadTarget::FreezeBaseline => {
                self.baseline = quarter.baseline_data;
                Ok(())
            }
        }
    }

    /// Start editing a copy of the baseline ("Edit Snapshot").
    pub fn begin_baseline_edit(&mut self) -> Mutation {
        if self.mode != ViewMode::Baseline {
            return Err(Rejection::NotInBaselineView);
        }
        let baseline = self.baseline.clone().ok_or(Rejection::NoBaseline)?;
        if self.editing_baseline {
            return Ok(());
        }
        self.invalidate_pending();
        self.working = baseline;
        self.editing_baseline = true;
        tracing::debug!(quarter_id = ?self.quarter_id, "Editing baseline snapshot");
        Ok(())
    }

    fn enter_live(&mut self, quarter: Quarter) {
        self.quarter_id = Some(quarter.id);
        self.working = quarter.data;
        self.baseline = quarter.baseline_data;
        self.mode = ViewMode::Live;
        self.editing_baseline = false;
    }

    fn invalidate_pending(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}
