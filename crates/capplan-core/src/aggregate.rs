//! Balance arithmetic over a dataset.
//!
//! Every figure here goes through [`parse_number`], so blanks and garbage
//! count as zero everywhere a balance is computed.
//!
//! Sign conventions differ by level:
//! - project balance = required - allocated (positive: still to place)
//! - sprint and team balance = capacity - demand (positive: spare capacity)

use serde::{Deserialize, Serialize};

use crate::dataset::model::{
    AllocationKey, EntityId, NumericField, Project, Sprint, SprintId, Team, WorkingDataset,
};

/// Parse a cell as a number. Empty, blank, non-numeric and non-finite text
/// all read as `0`.
pub fn parse_number(value: &str) -> f64 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// [`parse_number`] for a cell that may be absent.
pub fn parse_optional(value: Option<&str>) -> f64 {
    value.map_or(0.0, parse_number)
}

/// Sum a numeric field over all projects.
pub fn sum_field(projects: &[Project], field: NumericField) -> f64 {
    projects.iter().map(|p| parse_optional(p.value(field))).sum()
}

/// Total capacity of a sprint list.
pub fn sum_capacity(sprints: &[Sprint]) -> f64 {
    sprints.iter().map(|s| parse_number(&s.capacity)).sum()
}

/// Effort of one project placed into the given team sprints.
pub fn project_allocated(project: &Project, team: Team, sprints: &[Sprint]) -> f64 {
    sprints
        .iter()
        .map(|s| parse_number(project.allocation(team, s.id)))
        .sum()
}

/// Required effort minus allocated effort for one project and team.
pub fn project_balance(project: &Project, team: Team, sprints: &[Sprint]) -> f64 {
    parse_number(project.effort(team)) - project_allocated(project, team, sprints)
}

/// Effort all projects placed into one sprint.
pub fn sprint_allocated(projects: &[Project], team: Team, sprint_id: SprintId) -> f64 {
    sum_field(
        projects,
        NumericField::Allocation(AllocationKey::new(team, sprint_id)),
    )
}

/// Capacity minus allocated effort for one sprint; `None` if the sprint does
/// not exist.
pub fn sprint_balance(dataset: &WorkingDataset, team: Team, sprint_id: SprintId) -> Option<f64> {
    let sprint = dataset.sprint(team, sprint_id)?;
    Some(parse_number(&sprint.capacity) - sprint_allocated(&dataset.projects, team, sprint_id))
}

/// Total team capacity minus total required effort.
pub fn team_balance(dataset: &WorkingDataset, team: Team) -> f64 {
    sum_capacity(dataset.sprints(team)) - sum_field(&dataset.projects, NumericField::Effort(team))
}

/// Per-team rollup shown in the status strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: Team,
    pub capacity: f64,
    pub required: f64,
    pub allocated: f64,
    pub balance: f64,
}

pub fn team_summary(dataset: &WorkingDataset, team: Team) -> TeamSummary {
    let sprints = dataset.sprints(team);
    TeamSummary {
        team,
        capacity: sum_capacity(sprints),
        required: sum_field(&dataset.projects, NumericField::Effort(team)),
        allocated: dataset
            .projects
            .iter()
            .map(|p| project_allocated(p, team, sprints))
            .sum(),
        balance: team_balance(dataset, team),
    }
}

/// One summary per team, in display order.
pub fn status_strip(dataset: &WorkingDataset) -> Vec<TeamSummary> {
    Team::ALL.iter().map(|t| team_summary(dataset, *t)).collect()
}

/// Figures for one project and team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRollup {
    pub project_id: EntityId,
    pub team: Team,
    pub required: f64,
    pub allocated: f64,
    pub balance: f64,
}

pub fn project_rollup(dataset: &WorkingDataset, project: &Project, team: Team) -> ProjectRollup {
    let sprints = dataset.sprints(team);
    let allocated = project_allocated(project, team, sprints);
    let required = parse_number(project.effort(team));
    ProjectRollup {
        project_id: project.id,
        team,
        required,
        allocated,
        balance: required - allocated,
    }
}

/// Figures for one sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintRollup {
    pub team: Team,
    pub sprint_id: SprintId,
    pub name: String,
    pub capacity: f64,
    pub allocated: f64,
    pub balance: f64,
}

pub fn sprint_rollups(dataset: &WorkingDataset, team: Team) -> Vec<SprintRollup> {
    dataset
        .sprints(team)
        .iter()
        .map(|sprint| {
            let capacity = parse_number(&sprint.capacity);
            let allocated = sprint_allocated(&dataset.projects, team, sprint.id);
            SprintRollup {
                team,
                sprint_id: sprint.id,
                name: sprint.name.clone(),
                capacity,
                allocated,
                balance: capacity - allocated,
            }
        })
        .collect()
}

/// Epics of tech reviews scheduled in a backend sprint.
pub fn scheduled_reviews(dataset: &WorkingDataset, sprint_id: SprintId) -> Vec<&str> {
    dataset
        .tech_reviews
        .iter()
        .filter(|r| r.is_scheduled(sprint_id))
        .map(|r| r.epic.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::model::TechReview;

    fn scenario() -> WorkingDataset {
        let mut project = Project::new(1);
        project.backend = Some("10".to_string());
        project
            .allocations
            .insert(AllocationKey::new(Team::Backend, 1), "4".to_string());
        WorkingDataset {
            projects: vec![project],
            backend_sprints: vec![Sprint {
                id: 1,
                name: "S1".to_string(),
                capacity: "6".to_string(),
            }],
            ..WorkingDataset::default()
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("   "), 0.0);
        assert_eq!(parse_number("abc"), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
        assert_eq!(parse_number("inf"), 0.0);
        assert_eq!(parse_number(" 2.5 "), 2.5);
        assert_eq!(parse_number("-3"), -3.0);
        assert_eq!(parse_optional(None), 0.0);
    }

    #[test]
    fn test_single_project_single_sprint() {
        let data = scenario();
        let project = &data.projects[0];
        let sprints = data.sprints(Team::Backend);

        assert_eq!(project_allocated(project, Team::Backend, sprints), 4.0);
        assert_eq!(project_balance(project, Team::Backend, sprints), 6.0);
        assert_eq!(sprint_allocated(&data.projects, Team::Backend, 1), 4.0);
        assert_eq!(sprint_balance(&data, Team::Backend, 1), Some(2.0));
        assert_eq!(team_balance(&data, Team::Backend), -4.0);
    }

    #[test]
    fn test_empty_dataset_balances_are_zero() {
        let data = WorkingDataset::default();
        for team in Team::ALL {
            assert_eq!(team_balance(&data, team), 0.0);
        }
        assert_eq!(sprint_balance(&data, Team::Ios, 1), None);
    }

    #[test]
    fn test_team_balance_matches_components() {
        let mut data = scenario();
        let mut second = Project::new(2);
        second.backend = Some("x".to_string());
        second.android = Some("3".to_string());
        data.projects.push(second);
        data.android_sprints.push(Sprint {
            id: 1,
            name: String::new(),
            capacity: "".to_string(),
        });

        for team in Team::ALL {
            let expected = sum_capacity(data.sprints(team))
                - sum_field(&data.projects, NumericField::Effort(team));
            assert_eq!(team_balance(&data, team), expected);
        }
        assert_eq!(team_balance(&data, Team::Android), -3.0);
    }

    #[test]
    fn test_allocations_outside_team_sprints_are_ignored() {
        let mut data = scenario();
        data.projects[0]
            .allocations
            .insert(AllocationKey::new(Team::Backend, 99), "50".to_string());
        let project = &data.projects[0];
        assert_eq!(
            project_allocated(project, Team::Backend, data.sprints(Team::Backend)),
            4.0
        );
    }

    #[test]
    fn test_status_strip() {
        let strip = status_strip(&scenario());
        assert_eq!(strip.len(), 3);
        assert_eq!(
            strip[0],
            TeamSummary {
                team: Team::Backend,
                capacity: 6.0,
                required: 10.0,
                allocated: 4.0,
                balance: -4.0,
            }
        );
        assert_eq!(strip[2].balance, 0.0);
    }

    #[test]
    fn test_rollups() {
        let data = scenario();
        let rollup = project_rollup(&data, &data.projects[0], Team::Backend);
        assert_eq!(rollup.balance, 6.0);
        let sprints = sprint_rollups(&data, Team::Backend);
        assert_eq!(sprints.len(), 1);
        assert_eq!(sprints[0].balance, 2.0);
    }

    #[test]
    fn test_scheduled_reviews_skip_missing_lead() {
        let mut data = scenario();
        let mut led = TechReview::new(1);
        led.epic = "Payments".to_string();
        led.tech_lead = "Kim".to_string();
        led.sprints.insert(1, true);
        let mut unled = TechReview::new(2);
        unled.epic = "Search".to_string();
        unled.sprints.insert(1, true);
        data.tech_reviews = vec![led, unled];

        assert_eq!(scheduled_reviews(&data, 1), vec!["Payments"]);
    }
}
