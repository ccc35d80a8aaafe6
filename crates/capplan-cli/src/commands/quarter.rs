//! Quarter management commands.

use anyhow::{Context, Result};
use capplan_core::quarter::{self, model::parse_dataset};
use capplan_core::{QuarterController, RecordStore, WorkingDataset};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Prompt;
use crate::output;

#[derive(Subcommand)]
pub enum QuarterCommands {
    /// List all quarters
    List,

    /// Create a new quarter
    Create(CreateQuarterArgs),

    /// Show a quarter (defaults to the active one)
    Show {
        /// Quarter ID
        quarter_id: Option<String>,
    },

    /// Make a quarter the active one
    Activate {
        /// Quarter ID
        quarter_id: String,
    },

    /// Rename a quarter
    Rename {
        /// Quarter ID
        quarter_id: String,

        /// New name
        name: String,
    },

    /// Delete a quarter
    Delete {
        /// Quarter ID
        quarter_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Freeze the live plan as the quarter's baseline
    Baseline {
        /// Quarter ID (defaults to the active quarter)
        quarter_id: Option<String>,
    },
}

#[derive(Args)]
pub struct CreateQuarterArgs {
    /// Quarter name
    pub name: String,

    /// Seed the plan from a dataset JSON file
    #[arg(long)]
    pub from: Option<PathBuf>,

    /// Activate the new quarter
    #[arg(long)]
    pub activate: bool,
}

fn read_dataset(path: &Path) -> Result<WorkingDataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(parse_dataset(value)?)
}

pub async fn execute(cmd: QuarterCommands, store: Arc<dyn RecordStore>) -> Result<()> {
    match cmd {
        QuarterCommands::List => {
            let quarters = quarter::list_quarters(store.as_ref()).await?;
            output::print_quarters_table(&quarters);
        }

        QuarterCommands::Create(args) => {
            let data = match &args.from {
                Some(path) => read_dataset(path)?,
                None => WorkingDataset::default(),
            };
            let mut created = quarter::create_quarter(store.as_ref(), &args.name, &data).await?;
            if args.activate {
                created = store.activate_quarter(&created.id).await?;
            }
            println!(
                "{} Created quarter: {} ({})",
                "✓".green().bold(),
                created.name.cyan(),
                created.id.dimmed()
            );
        }

        QuarterCommands::Show { quarter_id } => {
            let shown = match quarter_id {
                Some(id) => store.get_quarter(&id).await?,
                None => quarter::require_active_quarter(store.as_ref()).await?,
            };
            output::print_quarter(&shown);
            let dangling = shown.data.dangling_fields();
            if !dangling.is_empty() {
                println!();
                println!(
                    "{} {} cell(s) reference sprints that no longer exist",
                    "!".yellow().bold(),
                    dangling.len()
                );
            }
        }

        QuarterCommands::Activate { quarter_id } => {
            let activated = store.activate_quarter(&quarter_id).await?;
            println!(
                "{} Active quarter: {}",
                "✓".green().bold(),
                activated.name.cyan()
            );
        }

        QuarterCommands::Rename { quarter_id, name } => {
            let renamed = quarter::rename_quarter(store.as_ref(), &quarter_id, &name).await?;
            println!(
                "{} Renamed quarter {} to {}",
                "✓".green().bold(),
                quarter_id.dimmed(),
                renamed.name.cyan()
            );
        }

        QuarterCommands::Delete { quarter_id, yes } => {
            let mut controller = QuarterController::new(store);
            controller
                .delete_quarter(&quarter_id, &Prompt { assume_yes: yes })
                .await?;
            println!("{} Deleted quarter {}", "✓".green().bold(), quarter_id.dimmed());
            if let Some(active) = controller.store().get_active_quarter().await? {
                println!("  Active quarter is now {}", active.name.cyan());
            }
        }

        QuarterCommands::Baseline { quarter_id } => {
            let mut controller = super::open_quarter(store, quarter_id.as_deref()).await?;
            controller.set_baseline().await?;
            println!(
                "{} Baseline frozen for {}",
                "✓".green().bold(),
                controller.state().quarter_id().unwrap_or_default().dimmed()
            );
        }
    }

    Ok(())
}
