//! Status strip and baseline diff.

use anyhow::Result;
use capplan_core::aggregate::{sprint_rollups, status_strip};
use capplan_core::{RecordStore, Team, ViewMode};
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// Quarter ID (defaults to the active quarter)
    #[arg(short, long)]
    pub quarter: Option<String>,

    /// Show the frozen baseline instead of the live plan
    #[arg(long)]
    pub baseline: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Quarter ID (defaults to the active quarter)
    #[arg(short, long)]
    pub quarter: Option<String>,
}

pub async fn execute_status(args: StatusArgs, store: Arc<dyn RecordStore>) -> Result<()> {
    let mut controller = super::open_quarter(store, args.quarter.as_deref()).await?;
    if args.baseline {
        controller.switch_view(ViewMode::Baseline).await?;
    }

    let state = controller.state();
    let dataset = state.display();

    output::print_view_banner(state);
    println!();
    output::print_status_strip(&status_strip(dataset));
    println!();
    for team in Team::ALL {
        output::print_sprint_rollups(team, &sprint_rollups(dataset, team));
    }
    println!();
    output::print_projects_table(dataset, state.diff());

    Ok(())
}

pub async fn execute_diff(args: DiffArgs, store: Arc<dyn RecordStore>) -> Result<()> {
    let controller = super::open_quarter(store, args.quarter.as_deref()).await?;
    let state = controller.state();

    match state.diff() {
        Some(diff) => {
            output::print_diff_report(&diff.changes(state.working()));
        }
        _ => println!(
            "{}",
            "This quarter has no baseline. Run 'capplan quarter baseline' first.".dimmed()
        ),
    }

    Ok(())
}
