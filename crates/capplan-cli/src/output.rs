//! Terminal output formatting.

use capplan_core::aggregate::{project_rollup, scheduled_reviews, SprintRollup, TeamSummary};
use capplan_core::dataset::model::NumericField;
use capplan_core::diff::{BaselineDiff, DiffReport};
use capplan_core::quarter::model::{Quarter, QuarterSummary};
use capplan_core::view::ViewState;
use capplan_core::{Team, WorkingDataset};
use colored::{ColoredString, Colorize};

/// Format a figure with up to three decimals and no trailing zeros.
pub fn fmt_num(value: f64) -> String {
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Red when over-committed, green when spare, plain when even.
fn balance(value: f64) -> ColoredString {
    let text = fmt_num(value);
    if value < 0.0 {
        text.red().bold()
    } else if value > 0.0 {
        text.green()
    } else {
        text.normal()
    }
}

/// Print quarters as a table.
pub fn print_quarters_table(quarters: &[QuarterSummary]) {
    if quarters.is_empty() {
        println!("{}", "No quarters found.".dimmed());
        return;
    }

    println!("{:<38} {:<24} {:<8} {:<26}", "ID", "Name", "Active", "Created");
    println!("{}", "─".repeat(98));

    for quarter in quarters {
        let active = if quarter.is_active {
            "●".green().bold()
        } else {
            "".normal()
        };
        println!(
            "{:<38} {:<24} {:<8} {:<26}",
            quarter.id.dimmed(),
            truncate(&quarter.name, 22),
            active,
            quarter.created_at.dimmed()
        );
    }
}

/// Print a quarter header.
pub fn print_quarter(quarter: &Quarter) {
    println!(
        "{} {}",
        quarter.name.cyan().bold(),
        format!("({})", quarter.id).dimmed()
    );
    println!();
    println!(
        "{}: {}",
        "Active".bold(),
        if quarter.is_active { "yes".green() } else { "no".dimmed() }
    );
    println!(
        "{}: {}",
        "Baseline".bold(),
        if quarter.baseline_data.is_some() {
            "frozen".yellow()
        } else {
            "none".dimmed()
        }
    );
    println!("{}: {}", "Projects".bold(), quarter.data.projects.len());
    println!("{}: {}", "Updated".bold(), quarter.updated_at.dimmed());
}

/// Which dataset is on screen.
pub fn print_view_banner(state: &ViewState) {
    let label = if state.is_locked() {
        "BASELINE (read-only)".yellow().bold()
    } else if state.is_editing_baseline() {
        "BASELINE (editing snapshot)".yellow()
    } else {
        "LIVE".green().bold()
    };
    println!("{} {}", "View:".bold(), label);
}

/// Print the persistent status strip: one line per team.
pub fn print_status_strip(summaries: &[TeamSummary]) {
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10}",
        "Team", "Capacity", "Required", "Allocated", "Balance"
    );
    println!("{}", "─".repeat(54));
    for summary in summaries {
        println!(
            "{:<10} {:>10} {:>10} {:>10} {:>10}",
            summary.team.label().bold(),
            fmt_num(summary.capacity),
            fmt_num(summary.required),
            fmt_num(summary.allocated),
            balance(summary.balance)
        );
    }
}

/// Print one team's sprints with their balances.
pub fn print_sprint_rollups(team: Team, rollups: &[SprintRollup]) {
    println!("{}", format!("{} sprints", team.label()).bold());
    if rollups.is_empty() {
        println!("  {}", "No sprints.".dimmed());
        return;
    }
    for rollup in rollups {
        println!(
            "  {:<4} {:<20} capacity {:>6}  allocated {:>6}  balance {:>6}",
            rollup.sprint_id.to_string().dimmed(),
            truncate(&rollup.name, 18),
            fmt_num(rollup.capacity),
            fmt_num(rollup.allocated),
            balance(rollup.balance)
        );
    }
}

/// Print projects with per-team effort and balance. Cells that differ from
/// the baseline are marked with `*`.
pub fn print_projects_table(dataset: &WorkingDataset, diff: Option<BaselineDiff<'_>>) {
    if dataset.projects.is_empty() {
        println!("{}", "No projects found.".dimmed());
        return;
    }

    println!(
        "{:<5} {:<26} {:<14} {:>14} {:>14} {:>14}",
        "ID", "Epic", "Owner", "Backend", "Android", "iOS"
    );
    println!("{}", "─".repeat(92));

    for project in &dataset.projects {
        let new = diff.map_or(false, |d| d.is_new_project(project.id));
        let epic = if new {
            format!("{} +", truncate(&project.epic, 22)).green()
        } else {
            truncate(&project.epic, 24).normal()
        };
        let cells: Vec<String> = Team::ALL
            .iter()
            .map(|team| {
                let rollup = project_rollup(dataset, project, *team);
                let changed = diff.map_or(false, |d| {
                    d.marker(project, NumericField::Effort(*team)).changed
                });
                format!(
                    "{}{}/{}",
                    if changed { "*" } else { "" },
                    fmt_num(rollup.required),
                    fmt_num(rollup.balance)
                )
            })
            .collect();
        println!(
            "{:<5} {:<26} {:<14} {:>14} {:>14} {:>14}",
            project.id.to_string().dimmed(),
            epic,
            truncate(&project.owner, 12),
            cells[0],
            cells[1],
            cells[2]
        );
    }
    println!("{}", "effort/balance per team".dimmed());
}

/// Print tech reviews with the backend sprints they are scheduled in.
pub fn print_reviews(dataset: &WorkingDataset) {
    if dataset.tech_reviews.is_empty() {
        println!("{}", "No tech reviews found.".dimmed());
        return;
    }

    println!("{:<5} {:<26} {:<16} {}", "ID", "Epic", "Tech lead", "Sprints");
    println!("{}", "─".repeat(70));
    for review in &dataset.tech_reviews {
        let sprints: Vec<String> = dataset
            .backend_sprints
            .iter()
            .filter(|s| review.is_scheduled(s.id))
            .map(|s| s.name.clone())
            .collect();
        let lead = if review.has_tech_lead() {
            review.tech_lead.normal()
        } else {
            "unassigned".dimmed()
        };
        println!(
            "{:<5} {:<26} {:<16} {}",
            review.id.to_string().dimmed(),
            truncate(&review.epic, 24),
            lead,
            sprints.join(", ")
        );
    }

    println!();
    for sprint in &dataset.backend_sprints {
        let epics = scheduled_reviews(dataset, sprint.id);
        if !epics.is_empty() {
            println!("  {} {}", sprint.name.bold(), epics.join(", ").cyan());
        }
    }
}

/// Print changed cells and added or removed projects.
pub fn print_diff_report(report: &DiffReport) {
    if report.is_empty() {
        println!("{}", "No changes since the baseline.".dimmed());
        return;
    }

    if !report.changed_cells.is_empty() {
        println!("{}", "Changed cells".bold());
        for change in &report.changed_cells {
            println!(
                "  {:<5} {:<24} {:<12} {} → {}",
                change.project_id.to_string().dimmed(),
                truncate(&change.epic, 22),
                change.field.cyan(),
                fmt_num(change.previous).dimmed(),
                fmt_num(change.current).yellow()
            );
        }
    }
    if !report.new_projects.is_empty() {
        println!("{} {}", "New projects:".bold(), join_ids(&report.new_projects).green());
    }
    if !report.removed_projects.is_empty() {
        println!(
            "{} {}",
            "Removed projects:".bold(),
            join_ids(&report.removed_projects).red()
        );
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(", ")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(5.0), "5");
        assert_eq!(fmt_num(-4.0), "-4");
        assert_eq!(fmt_num(2.5), "2.5");
        assert_eq!(fmt_num(2.25), "2.25");
        assert_eq!(fmt_num(-0.75), "-0.75");
        assert_eq!(fmt_num(0.1 + 0.2), "0.3");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(40.0), "40");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Checkout", 10), "Checkout");
        assert_eq!(truncate("Payments platform", 10), "Payment...");
        assert_eq!(truncate("Café rewrite", 7), "Café...");
    }
}
