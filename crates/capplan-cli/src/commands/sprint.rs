//! Sprint commands.

use anyhow::{bail, Result};
use capplan_core::aggregate::sprint_rollups;
use capplan_core::dataset::model::SprintId;
use capplan_core::view::{Confirm, Rejection, SprintField};
use capplan_core::{RecordStore, Team};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::sync::Arc;

use super::{apply_edit, open_quarter, EditTarget, Prompt};
use crate::output;

#[derive(Subcommand)]
pub enum SprintCommands {
    /// List sprints with capacity and balance
    List {
        /// Only this team (backend, android, ios)
        #[arg(short, long)]
        team: Option<Team>,

        /// Quarter ID (defaults to the active quarter)
        #[arg(short, long)]
        quarter: Option<String>,
    },

    /// Add a sprint to a team
    Add(AddSprintArgs),

    /// Set a sprint's name or capacity
    Set(SetSprintArgs),

    /// Remove a sprint and every allocation made to it
    Remove {
        /// Team (backend, android, ios)
        team: Team,

        /// Sprint ID
        sprint_id: SprintId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        target: EditTarget,
    },
}

#[derive(Args)]
pub struct AddSprintArgs {
    /// Team (backend, android, ios)
    pub team: Team,

    /// Sprint name
    #[arg(long)]
    pub name: Option<String>,

    /// Capacity
    #[arg(long)]
    pub capacity: Option<String>,

    #[command(flatten)]
    pub target: EditTarget,
}

#[derive(Args)]
pub struct SetSprintArgs {
    /// Team (backend, android, ios)
    pub team: Team,

    /// Sprint ID
    pub sprint_id: SprintId,

    /// Field: name or capacity
    pub field: String,

    /// New value
    pub value: String,

    #[command(flatten)]
    pub target: EditTarget,
}

fn parse_field(field: &str, value: String) -> Result<SprintField> {
    match field {
        "name" => Ok(SprintField::Name(value)),
        "capacity" => Ok(SprintField::Capacity(value)),
        other => bail!("Unknown sprint field '{}' (expected name or capacity)", other),
    }
}

pub async fn execute(cmd: SprintCommands, store: Arc<dyn RecordStore>) -> Result<()> {
    match cmd {
        SprintCommands::List { team, quarter } => {
            let controller = open_quarter(store, quarter.as_deref()).await?;
            let dataset = controller.state().working();
            let teams: Vec<Team> = match team {
                Some(team) => vec![team],
                None => Team::ALL.to_vec(),
            };
            for team in teams {
                output::print_sprint_rollups(team, &sprint_rollups(dataset, team));
            }
        }

        SprintCommands::Add(args) => {
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            let mut fields = Vec::new();
            if let Some(name) = args.name {
                fields.push(SprintField::Name(name));
            }
            if let Some(capacity) = args.capacity {
                fields.push(SprintField::Capacity(capacity));
            }

            let team = args.team;
            let id = apply_edit(&mut controller, args.target.snapshot, |state| {
                let id = state.add_sprint(team)?;
                for field in fields {
                    state.update_sprint(team, id, field)?;
                }
                Ok(id)
            })
            .await?;

            println!(
                "{} Added {} sprint {}",
                "✓".green().bold(),
                team.label().cyan(),
                id.to_string().dimmed()
            );
        }

        SprintCommands::Set(args) => {
            let field = parse_field(&args.field, args.value.clone())?;
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            apply_edit(&mut controller, args.target.snapshot, |state| {
                state.update_sprint(args.team, args.sprint_id, field)
            })
            .await?;
            println!(
                "{} {} sprint {}: {} = {}",
                "✓".green().bold(),
                args.team.label(),
                args.sprint_id.to_string().dimmed(),
                args.field.cyan(),
                args.value
            );
        }

        SprintCommands::Remove {
            team,
            sprint_id,
            yes,
            target,
        } => {
            let mut controller = open_quarter(store, target.quarter.as_deref()).await?;
            let prompt = Prompt { assume_yes: yes };
            apply_edit(&mut controller, target.snapshot, |state| {
                let name = state
                    .working()
                    .sprint(team, sprint_id)
                    .map(|s| s.name.clone())
                    .ok_or(Rejection::NotFound)?;
                if !prompt.confirm(&format!("Delete {} sprint '{}'?", team.label(), name)) {
                    return Err(Rejection::Unconfirmed);
                }
                state.delete_sprint(team, sprint_id)
            })
            .await?;
            println!(
                "{} Removed {} sprint {}",
                "✓".green().bold(),
                team.label(),
                sprint_id.to_string().dimmed()
            );
        }
    }

    Ok(())
}
