//! CLI command definitions and handlers.

use anyhow::Result;
use capplan_core::store::{HttpStore, RedisStore};
use capplan_core::view::{Confirm, Mutation};
use capplan_core::{QuarterController, RecordStore, ViewMode, ViewState};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

pub mod project;
pub mod quarter;
pub mod review;
pub mod serve;
pub mod sprint;
pub mod status;

/// Capplan - Quarterly Capacity Planning
#[derive(Parser)]
#[command(name = "capplan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Redis connection URL (falls back to REDIS_URL)
    #[arg(long, global = true, env = "CAPPLAN_REDIS_URL")]
    pub redis_url: Option<String>,

    /// Base URL of a running `capplan serve`; bypasses Redis
    #[arg(long, global = true, env = "CAPPLAN_API_URL")]
    pub api: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST server
    Serve(serve::ServeArgs),

    /// Manage quarters
    #[command(subcommand)]
    Quarter(quarter::QuarterCommands),

    /// Show the status strip and sprint balances
    Status(status::StatusArgs),

    /// Compare the live plan against its baseline
    Diff(status::DiffArgs),

    /// Manage projects (epics)
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Manage team sprints
    #[command(subcommand)]
    Sprint(sprint::SprintCommands),

    /// Manage tech reviews
    #[command(subcommand)]
    Review(review::ReviewCommands),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let store = self.open_store().await?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, store).await,
            Commands::Quarter(cmd) => quarter::execute(cmd, store).await,
            Commands::Status(args) => status::execute_status(args, store).await,
            Commands::Diff(args) => status::execute_diff(args, store).await,
            Commands::Project(cmd) => project::execute(cmd, store).await,
            Commands::Sprint(cmd) => sprint::execute(cmd, store).await,
            Commands::Review(cmd) => review::execute(cmd, store).await,
        }
    }

    async fn open_store(&self) -> Result<Arc<dyn RecordStore>> {
        if let Some(api) = &self.api {
            tracing::debug!(api = %api, "Using HTTP record store");
            return Ok(Arc::new(HttpStore::new(api.clone())));
        }
        let store = match &self.redis_url {
            Some(url) => RedisStore::connect(url).await?,
            None => RedisStore::from_env().await?,
        };
        Ok(Arc::new(store))
    }
}

pub type Controller = QuarterController<dyn RecordStore>;

/// Quarter selection and snapshot flag shared by the edit commands.
#[derive(Args)]
pub struct EditTarget {
    /// Quarter ID (defaults to the active quarter)
    #[arg(short, long)]
    pub quarter: Option<String>,

    /// Apply the edit to the baseline snapshot instead of the live plan
    #[arg(long)]
    pub snapshot: bool,
}

/// Load the given quarter, or the active one, in LIVE.
pub async fn open_quarter(store: Arc<dyn RecordStore>, quarter: Option<&str>) -> Result<Controller> {
    let mut controller = QuarterController::new(store);
    match quarter {
        Some(id) => controller.select_quarter(id).await?,
        None => {
            controller.load_active().await?.ok_or_else(|| {
                anyhow::anyhow!("No active quarter. Run 'capplan quarter activate <id>' first.")
            })?;
        }
    }
    Ok(controller)
}

/// Apply one edit and persist it.
///
/// Live edits are saved to the quarter. Snapshot edits go through Edit
/// Snapshot, the edit, then Save Snapshot.
pub async fn apply_edit<T>(
    controller: &mut Controller,
    snapshot: bool,
    edit: impl FnOnce(&mut ViewState) -> Mutation<T>,
) -> Result<T> {
    if snapshot {
        controller.switch_view(ViewMode::Baseline).await?;
        controller.edit_snapshot()?;
        let value = edit(controller.state_mut())?;
        controller.save_snapshot().await?;
        Ok(value)
    } else {
        let value = edit(controller.state_mut())?;
        controller.save().await?;
        Ok(value)
    }
}

/// Interactive removal confirmation, skipped with `--yes`.
pub struct Prompt {
    pub assume_yes: bool,
}

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}
