//! Project (epic) commands.

use anyhow::{bail, Result};
use capplan_core::dataset::model::{EntityId, NumericField};
use capplan_core::view::{Direction, ProjectField};
use capplan_core::RecordStore;
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use std::sync::Arc;

use super::{apply_edit, open_quarter, EditTarget, Prompt};
use crate::output;

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// List projects with effort and balance per team
    List {
        /// Quarter ID (defaults to the active quarter)
        #[arg(short, long)]
        quarter: Option<String>,
    },

    /// Add a project
    Add(AddProjectArgs),

    /// Set one project field
    Set(SetProjectArgs),

    /// Move a project up or down the list
    Move {
        /// Project ID
        project_id: EntityId,

        #[arg(value_enum)]
        direction: MoveDirection,

        #[command(flatten)]
        target: EditTarget,
    },

    /// Remove a project
    Remove {
        /// Project ID
        project_id: EntityId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        target: EditTarget,
    },
}

#[derive(Args)]
pub struct AddProjectArgs {
    /// Epic name
    pub epic: String,

    /// Product owner
    #[arg(long)]
    pub owner: Option<String>,

    /// Technical owner
    #[arg(long)]
    pub tech_owner: Option<String>,

    #[command(flatten)]
    pub target: EditTarget,
}

#[derive(Args)]
pub struct SetProjectArgs {
    /// Project ID
    pub project_id: EntityId,

    /// Field: epic, owner, tech_owner, backend, android, ios, or an
    /// allocation such as backend_2
    pub field: String,

    /// New value
    pub value: String,

    #[command(flatten)]
    pub target: EditTarget,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(d: MoveDirection) -> Self {
        match d {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

/// Turn a field name and value into a typed edit.
pub fn parse_field(field: &str, value: String) -> Result<ProjectField> {
    let edit = match field {
        "epic" => ProjectField::Epic(value),
        "owner" => ProjectField::Owner(value),
        "tech_owner" | "techOwner" => ProjectField::TechOwner(value),
        other => match other.parse::<NumericField>() {
            Ok(NumericField::Effort(team)) => ProjectField::Effort(team, value),
            Ok(NumericField::Allocation(key)) => {
                ProjectField::Allocation(key.team, key.sprint_id, value)
            }
            Err(e) => bail!("Unknown project field '{}': {}", other, e),
        },
    };
    Ok(edit)
}

pub async fn execute(cmd: ProjectCommands, store: Arc<dyn RecordStore>) -> Result<()> {
    match cmd {
        ProjectCommands::List { quarter } => {
            let controller = open_quarter(store, quarter.as_deref()).await?;
            let state = controller.state();
            output::print_projects_table(state.working(), state.diff());
        }

        ProjectCommands::Add(args) => {
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            let mut fields = vec![ProjectField::Epic(args.epic.clone())];
            if let Some(owner) = args.owner {
                fields.push(ProjectField::Owner(owner));
            }
            if let Some(tech_owner) = args.tech_owner {
                fields.push(ProjectField::TechOwner(tech_owner));
            }

            let id = apply_edit(&mut controller, args.target.snapshot, |state| {
                let id = state.add_project()?;
                for field in fields {
                    state.update_project(id, field)?;
                }
                Ok(id)
            })
            .await?;

            println!(
                "{} Added project: {} ({})",
                "✓".green().bold(),
                args.epic.cyan(),
                id.to_string().dimmed()
            );
        }

        ProjectCommands::Set(args) => {
            let field = parse_field(&args.field, args.value.clone())?;
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            apply_edit(&mut controller, args.target.snapshot, |state| {
                state.update_project(args.project_id, field)
            })
            .await?;

            println!(
                "{} Project {}: {} = {}",
                "✓".green().bold(),
                args.project_id.to_string().dimmed(),
                args.field.cyan(),
                args.value
            );
        }

        ProjectCommands::Move {
            project_id,
            direction,
            target,
        } => {
            let mut controller = open_quarter(store, target.quarter.as_deref()).await?;
            apply_edit(&mut controller, target.snapshot, |state| {
                state.move_project(project_id, direction.into())
            })
            .await?;
            println!("{} Moved project {}", "✓".green().bold(), project_id.to_string().dimmed());
        }

        ProjectCommands::Remove {
            project_id,
            yes,
            target,
        } => {
            let mut controller = open_quarter(store, target.quarter.as_deref()).await?;
            let prompt = Prompt { assume_yes: yes };
            apply_edit(&mut controller, target.snapshot, |state| {
                state.delete_project(project_id, &prompt)
            })
            .await?;
            println!(
                "{} Removed project {}",
                "✓".green().bold(),
                project_id.to_string().dimmed()
            );
        }
    }

    Ok(())
}
