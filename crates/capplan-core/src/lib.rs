//! Capplan Core Library
//!
//! Domain model and planning logic for quarterly capacity planning: the
//! editable working dataset, the live/baseline view-state machine, balance
//! aggregation, baseline diffing, and the record store the quarters live in.

pub mod aggregate;
pub mod controller;
pub mod dataset;
pub mod diff;
pub mod error;
pub mod quarter;
pub mod store;
pub mod view;

pub use controller::QuarterController;
pub use dataset::model::{Project, Sprint, Team, TechReview, WorkingDataset};
pub use error::{CapError, CapResult};
pub use store::RecordStore;
pub use view::{Rejection, ViewMode, ViewState};
