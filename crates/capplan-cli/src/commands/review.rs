//! Tech review commands.

use anyhow::{bail, Result};
use capplan_core::dataset::model::{EntityId, SprintId};
use capplan_core::view::{Rejection, TechReviewField};
use capplan_core::RecordStore;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::sync::Arc;

use super::{apply_edit, open_quarter, EditTarget, Prompt};
use crate::output;

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// List tech reviews and the backend sprints they are scheduled in
    List {
        /// Quarter ID (defaults to the active quarter)
        #[arg(short, long)]
        quarter: Option<String>,
    },

    /// Add a tech review
    Add(AddReviewArgs),

    /// Set a review's epic or tech lead
    Set(SetReviewArgs),

    /// Flip the review toggle for a backend sprint
    Toggle {
        /// Review ID
        review_id: EntityId,

        /// Backend sprint ID
        sprint_id: SprintId,

        #[command(flatten)]
        target: EditTarget,
    },

    /// Remove a tech review
    Remove {
        /// Review ID
        review_id: EntityId,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        target: EditTarget,
    },
}

#[derive(Args)]
pub struct AddReviewArgs {
    /// Epic name
    pub epic: String,

    /// Tech lead
    #[arg(long)]
    pub tech_lead: Option<String>,

    #[command(flatten)]
    pub target: EditTarget,
}

#[derive(Args)]
pub struct SetReviewArgs {
    /// Review ID
    pub review_id: EntityId,

    /// Field: epic or tech_lead
    pub field: String,

    /// New value
    pub value: String,

    #[command(flatten)]
    pub target: EditTarget,
}

fn parse_field(field: &str, value: String) -> Result<TechReviewField> {
    match field {
        "epic" => Ok(TechReviewField::Epic(value)),
        "tech_lead" | "techLead" => Ok(TechReviewField::TechLead(value)),
        other => bail!("Unknown review field '{}' (expected epic or tech_lead)", other),
    }
}

pub async fn execute(cmd: ReviewCommands, store: Arc<dyn RecordStore>) -> Result<()> {
    match cmd {
        ReviewCommands::List { quarter } => {
            let controller = open_quarter(store, quarter.as_deref()).await?;
            output::print_reviews(controller.state().working());
        }

        ReviewCommands::Add(args) => {
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            let mut fields = vec![TechReviewField::Epic(args.epic.clone())];
            if let Some(lead) = args.tech_lead {
                fields.push(TechReviewField::TechLead(lead));
            }

            let id = apply_edit(&mut controller, args.target.snapshot, |state| {
                let id = state.add_tech_review()?;
                for field in fields {
                    state.update_tech_review(id, field)?;
                }
                Ok(id)
            })
            .await?;

            println!(
                "{} Added tech review: {} ({})",
                "✓".green().bold(),
                args.epic.cyan(),
                id.to_string().dimmed()
            );
        }

        ReviewCommands::Set(args) => {
            let field = parse_field(&args.field, args.value.clone())?;
            let mut controller = open_quarter(store, args.target.quarter.as_deref()).await?;
            apply_edit(&mut controller, args.target.snapshot, |state| {
                state.update_tech_review(args.review_id, field)
            })
            .await?;
            println!(
                "{} Review {}: {} = {}",
                "✓".green().bold(),
                args.review_id.to_string().dimmed(),
                args.field.cyan(),
                args.value
            );
        }

        ReviewCommands::Toggle {
            review_id,
            sprint_id,
            target,
        } => {
            let mut controller = open_quarter(store, target.quarter.as_deref()).await?;
            let scheduled = apply_edit(&mut controller, target.snapshot, |state| {
                let current = state
                    .working()
                    .tech_review(review_id)
                    .ok_or(Rejection::NotFound)?
                    .sprints
                    .get(&sprint_id)
                    .copied()
                    .unwrap_or(false);
                state.update_tech_review(review_id, TechReviewField::Scheduled(sprint_id, !current))?;
                Ok(!current)
            })
            .await?;
            println!(
                "{} Review {} {} in sprint {}",
                "✓".green().bold(),
                review_id.to_string().dimmed(),
                if scheduled { "scheduled".green() } else { "unscheduled".yellow() },
                sprint_id
            );
        }

        ReviewCommands::Remove {
            review_id,
            yes,
            target,
        } => {
            let mut controller = open_quarter(store, target.quarter.as_deref()).await?;
            let prompt = Prompt { assume_yes: yes };
            apply_edit(&mut controller, target.snapshot, |state| {
                state.delete_tech_review(review_id, &prompt)
            })
            .await?;
            println!(
                "{} Removed tech review {}",
                "✓".green().bold(),
                review_id.to_string().dimmed()
            );
        }
    }

    Ok(())
}
