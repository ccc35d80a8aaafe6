//! Edits to the working dataset.
//!
//! Every operation checks the lock first: while the baseline is shown without
//! being edited, all of them return [`Rejection::Locked`] and change nothing.

use crate::dataset::model::{
    AllocationKey, EntityId, Project, Sprint, SprintId, Team, TechReview, WorkingDataset,
};
use crate::dataset::next_id;

use super::{Mutation, Rejection, ViewState};

/// Asks the user before a removal.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A decision made up front, e.g. `--yes` on the command line.
impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A project field with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectField {
    Epic(String),
    Owner(String),
    TechOwner(String),
    /// Required effort of a team.
    Effort(Team, String),
    /// Effort placed into one of the team's sprints.
    Allocation(Team, SprintId, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SprintField {
    Name(String),
    Capacity(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TechReviewField {
    Epic(String),
    TechLead(String),
    /// Review toggle for a backend sprint.
    Scheduled(SprintId, bool),
}

fn reject<T>(op: &'static str, rejection: Rejection) -> Mutation<T> {
    tracing::debug!(op, %rejection, "Edit rejected");
    Err(rejection)
}

/// Id for a new row. Ids still present in the baseline stay taken, so a row
/// added after a deletion is never matched against the deleted row.
fn fresh_id(
    op: &'static str,
    working: impl IntoIterator<Item = EntityId>,
    baseline: Vec<EntityId>,
) -> Mutation<EntityId> {
    match next_id(working.into_iter().chain(baseline)) {
        Some(id) => Ok(id),
        None => reject(op, Rejection::IdsExhausted),
    }
}

impl ViewState {
    fn baseline_ids(&self, ids: impl Fn(&WorkingDataset) -> Vec<EntityId>) -> Vec<EntityId> {
        self.baseline().map(ids).unwrap_or_default()
    }

    fn editable(&mut self, op: &'static str) -> Mutation<&mut WorkingDataset> {
        if self.is_locked() {
            return reject(op, Rejection::Locked);
        }
        Ok(&mut self.working)
    }

    /// Append a blank project with an empty allocation cell for every sprint
    /// of every team.
    pub fn add_project(&mut self) -> Mutation<EntityId> {
        let taken = self.baseline_ids(|b| b.projects.iter().map(|p| p.id).collect());
        let data = self.editable("add_project")?;
        let id = fresh_id("add_project", data.projects.iter().map(|p| p.id), taken)?;
        let mut project = Project::new(id);
        for team in Team::ALL {
            for sprint in data.sprints(team) {
                project
                    .allocations
                    .insert(AllocationKey::new(team, sprint.id), String::new());
            }
        }
        data.projects.push(project);
        Ok(id)
    }

    pub fn update_project(&mut self, id: EntityId, field: ProjectField) -> Mutation {
        let data = self.editable("update_project")?;
        if let ProjectField::Allocation(team, sprint_id, _) = &field {
            if data.sprint(*team, *sprint_id).is_none() {
                return reject("update_project", Rejection::UnknownSprint);
            }
        }
        let Some(project) = data.projects.iter_mut().find(|p| p.id == id) else {
            return reject("update_project", Rejection::NotFound);
        };
        match field {
            ProjectField::Epic(v) => project.epic = v,
            ProjectField::Owner(v) => project.owner = v,
            ProjectField::TechOwner(v) => project.tech_owner = v,
            ProjectField::Effort(team, v) => project.set_effort(team, v),
            ProjectField::Allocation(team, sprint_id, v) => {
                project
                    .allocations
                    .insert(AllocationKey::new(team, sprint_id), v);
            }
        }
        Ok(())
    }

    pub fn delete_project(&mut self, id: EntityId, confirm: &impl Confirm) -> Mutation {
        let data = self.editable("delete_project")?;
        let Some(index) = data.projects.iter().position(|p| p.id == id) else {
            return reject("delete_project", Rejection::NotFound);
        };
        let prompt = format!("Delete project '{}'?", data.projects[index].epic);
        if !confirm.confirm(&prompt) {
            return reject("delete_project", Rejection::Unconfirmed);
        }
        data.projects.remove(index);
        Ok(())
    }

    /// Swap a project with its neighbour. Order is persisted.
    pub fn move_project(&mut self, id: EntityId, direction: Direction) -> Mutation {
        let data = self.editable("move_project")?;
        let Some(index) = data.projects.iter().position(|p| p.id == id) else {
            return reject("move_project", Rejection::NotFound);
        };
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => Some(index + 1).filter(|i| *i < data.projects.len()),
        };
        let Some(target) = target else {
            return reject("move_project", Rejection::AtBoundary);
        };
        data.projects.swap(index, target);
        Ok(())
    }

    /// Append a blank sprint and an empty allocation cell for it on every
    /// project. Backend sprints also get an unset toggle on every tech review.
    pub fn add_sprint(&mut self, team: Team) -> Mutation<SprintId> {
        let taken = self.baseline_ids(|b| b.sprints(team).iter().map(|s| s.id).collect());
        let data = self.editable("add_sprint")?;
        let id = fresh_id("add_sprint", data.sprints(team).iter().map(|s| s.id), taken)?;
        data.sprints_mut(team).push(Sprint::new(id));
        let key = AllocationKey::new(team, id);
        for project in &mut data.projects {
            project.allocations.insert(key, String::new());
        }
        if team == Team::Backend {
            for review in &mut data.tech_reviews {
                review.sprints.insert(id, false);
            }
        }
        Ok(id)
    }

    /// Remove a sprint together with every field that references it.
    pub fn delete_sprint(&mut self, team: Team, sprint_id: SprintId) -> Mutation {
        let data = self.editable("delete_sprint")?;
        let sprints = data.sprints_mut(team);
        let Some(index) = sprints.iter().position(|s| s.id == sprint_id) else {
            return reject("delete_sprint", Rejection::NotFound);
        };
        sprints.remove(index);
        let key = AllocationKey::new(team, sprint_id);
        for project in &mut data.projects {
            project.allocations.remove(&key);
        }
        if team == Team::Backend {
            for review in &mut data.tech_reviews {
                review.sprints.remove(&sprint_id);
            }
        }
        Ok(())
    }

    pub fn update_sprint(&mut self, team: Team, sprint_id: SprintId, field: SprintField) -> Mutation {
        let data = self.editable("update_sprint")?;
        let Some(sprint) = data.sprints_mut(team).iter_mut().find(|s| s.id == sprint_id) else {
            return reject("update_sprint", Rejection::NotFound);
        };
        match field {
            SprintField::Name(v) => sprint.name = v,
            SprintField::Capacity(v) => sprint.capacity = v,
        }
        Ok(())
    }

    /// Append a blank tech review with an unset toggle per backend sprint.
    pub fn add_tech_review(&mut self) -> Mutation<EntityId> {
        let taken = self.baseline_ids(|b| b.tech_reviews.iter().map(|r| r.id).collect());
        let data = self.editable("add_tech_review")?;
        let id = fresh_id("add_tech_review", data.tech_reviews.iter().map(|r| r.id), taken)?;
        let mut review = TechReview::new(id);
        review.sprints = data.backend_sprints.iter().map(|s| (s.id, false)).collect();
        data.tech_reviews.push(review);
        Ok(id)
    }

    pub fn update_tech_review(&mut self, id: EntityId, field: TechReviewField) -> Mutation {
        let data = self.editable("update_tech_review")?;
        if let TechReviewField::Scheduled(sprint_id, _) = &field {
            if data.sprint(Team::Backend, *sprint_id).is_none() {
                return reject("update_tech_review", Rejection::UnknownSprint);
            }
        }
        let Some(review) = data.tech_reviews.iter_mut().find(|r| r.id == id) else {
            return reject("update_tech_review", Rejection::NotFound);
        };
        match field {
            TechReviewField::Epic(v) => review.epic = v,
            TechReviewField::TechLead(v) => review.tech_lead = v,
            TechReviewField::Scheduled(sprint_id, on) => {
                if !review.has_tech_lead() {
                    return reject("update_tech_review", Rejection::NoTechLead);
                }
                review.sprints.insert(sprint_id, on);
            }
        }
        Ok(())
    }

    pub fn delete_tech_review(&mut self, id: EntityId, confirm: &impl Confirm) -> Mutation {
        let data = self.editable("delete_tech_review")?;
        let Some(index) = data.tech_reviews.iter().position(|r| r.id == id) else {
            return reject("delete_tech_review", Rejection::NotFound);
        };
        let prompt = format!("Delete tech review '{}'?", data.tech_reviews[index].epic);
        if !confirm.confirm(&prompt) {
            return reject("delete_tech_review", Rejection::Unconfirmed);
        }
        data.tech_reviews.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarter::model::Quarter;
    use crate::view::LoadTarget;

    fn live_state() -> ViewState {
        let mut state = ViewState::new();
        state.load_quarter(Quarter {
            id: "q1".to_string(),
            name: "Q1".to_string(),
            is_active: true,
            data: WorkingDataset::default(),
            baseline_data: Some(WorkingDataset::default()),
            created_at: String::new(),
            updated_at: String::new(),
        });
        state
    }

    fn populated() -> ViewState {
        let mut state = live_state();
        let b1 = state.add_sprint(Team::Backend).unwrap();
        state.add_sprint(Team::Backend).unwrap();
        state.add_sprint(Team::Ios).unwrap();
        let p1 = state.add_project().unwrap();
        state.add_project().unwrap();
        let r1 = state.add_tech_review().unwrap();
        state
            .update_project(p1, ProjectField::Allocation(Team::Backend, b1, "3".to_string()))
            .unwrap();
        state
            .update_tech_review(r1, TechReviewField::TechLead("Kim".to_string()))
            .unwrap();
        state
            .update_tech_review(r1, TechReviewField::Scheduled(b1, true))
            .unwrap();
        state
    }

    fn lock(state: &mut ViewState) {
        let quarter = Quarter {
            id: "q1".to_string(),
            name: "Q1".to_string(),
            is_active: true,
            data: state.working().clone(),
            baseline_data: Some(state.working().clone()),
            created_at: String::new(),
            updated_at: String::new(),
        };
        state.load_quarter(quarter.clone());
        let ticket = state.begin_load(LoadTarget::Baseline).unwrap();
        state.apply_load(ticket, quarter).unwrap();
        assert!(state.is_locked());
    }

    #[test]
    fn test_add_project_has_cell_per_sprint() {
        let state = populated();
        let project = &state.working().projects[1];
        assert_eq!(project.allocations.len(), 3);
        assert_eq!(project.allocation(Team::Ios, 1), "");
    }

    #[test]
    fn test_add_sprint_extends_projects_and_reviews() {
        let mut state = populated();
        let id = state.add_sprint(Team::Backend).unwrap();
        assert_eq!(id, 3);
        let data = state.working();
        assert!(data
            .projects
            .iter()
            .all(|p| p.allocations.contains_key(&AllocationKey::new(Team::Backend, 3))));
        assert_eq!(data.tech_reviews[0].sprints.get(&3), Some(&false));

        state.add_sprint(Team::Android).unwrap();
        assert_eq!(state.working().tech_reviews[0].sprints.len(), 3);
    }

    #[test]
    fn test_delete_sprint_strips_every_reference() {
        let mut state = populated();
        state.delete_sprint(Team::Backend, 1).unwrap();
        let data = state.working();
        let key = AllocationKey::new(Team::Backend, 1);
        assert!(data.projects.iter().all(|p| !p.allocations.contains_key(&key)));
        assert!(data.tech_reviews.iter().all(|r| !r.sprints.contains_key(&1)));
        assert!(data.dangling_fields().is_empty());
    }

    #[test]
    fn test_delete_non_backend_sprint_keeps_review_toggles() {
        let mut state = populated();
        state.delete_sprint(Team::Ios, 1).unwrap();
        let data = state.working();
        assert_eq!(data.tech_reviews[0].sprints.len(), 2);
        assert!(data.ios_sprints.is_empty());
    }

    #[test]
    fn test_locked_state_rejects_every_edit() {
        let mut state = populated();
        lock(&mut state);
        let before = state.working().clone();
        let shown = state.display().clone();

        assert_eq!(state.add_project(), Err(Rejection::Locked));
        assert_eq!(
            state.update_project(1, ProjectField::Epic("x".to_string())),
            Err(Rejection::Locked)
        );
        assert_eq!(state.delete_project(1, &true), Err(Rejection::Locked));
        assert_eq!(state.move_project(2, Direction::Up), Err(Rejection::Locked));
        assert_eq!(state.add_sprint(Team::Android), Err(Rejection::Locked));
        assert_eq!(state.delete_sprint(Team::Backend, 1), Err(Rejection::Locked));
        assert_eq!(
            state.update_sprint(Team::Backend, 1, SprintField::Capacity("9".to_string())),
            Err(Rejection::Locked)
        );
        assert_eq!(state.add_tech_review(), Err(Rejection::Locked));
        assert_eq!(
            state.update_tech_review(1, TechReviewField::Epic("x".to_string())),
            Err(Rejection::Locked)
        );
        assert_eq!(state.delete_tech_review(1, &true), Err(Rejection::Locked));

        assert_eq!(state.working(), &before);
        assert_eq!(state.display(), &shown);
    }

    #[test]
    fn test_editing_snapshot_unlocks_edits() {
        let mut state = populated();
        lock(&mut state);
        state.begin_baseline_edit().unwrap();
        assert_eq!(state.add_project(), Ok(3));
    }

    #[test]
    fn test_update_project_fields() {
        let mut state = populated();
        state
            .update_project(2, ProjectField::Effort(Team::Android, "7".to_string()))
            .unwrap();
        state
            .update_project(2, ProjectField::TechOwner("Lee".to_string()))
            .unwrap();
        let project = state.working().project(2).unwrap();
        assert_eq!(project.android.as_deref(), Some("7"));
        assert_eq!(project.tech_owner, "Lee");

        assert_eq!(
            state.update_project(9, ProjectField::Epic("x".to_string())),
            Err(Rejection::NotFound)
        );
        assert_eq!(
            state.update_project(2, ProjectField::Allocation(Team::Android, 1, "1".to_string())),
            Err(Rejection::UnknownSprint)
        );
    }

    fn live_with_baseline(data: WorkingDataset) -> ViewState {
        let mut state = ViewState::new();
        state.load_quarter(Quarter {
            id: "q1".to_string(),
            name: "Q1".to_string(),
            is_active: true,
            data: data.clone(),
            baseline_data: Some(data),
            created_at: String::new(),
            updated_at: String::new(),
        });
        state
    }

    #[test]
    fn test_added_project_does_not_take_a_baseline_id() {
        let mut state = live_with_baseline(populated().working().clone());
        state.delete_project(2, &true).unwrap();
        let id = state.add_project().unwrap();
        assert_eq!(id, 3);

        let diff = state.diff().unwrap();
        assert!(diff.is_new_project(id));
        let report = diff.changes(state.working());
        assert_eq!(report.new_projects, vec![3]);
        assert_eq!(report.removed_projects, vec![2]);
        assert!(report.changed_cells.is_empty());
    }

    #[test]
    fn test_added_sprint_does_not_take_a_baseline_id() {
        let mut state = live_with_baseline(populated().working().clone());
        state.delete_sprint(Team::Backend, 2).unwrap();
        assert_eq!(state.add_sprint(Team::Backend), Ok(3));
        state.delete_tech_review(1, &true).unwrap();
        assert_eq!(state.add_tech_review(), Ok(2));
    }

    #[test]
    fn test_exhausted_ids_are_rejected() {
        let data: WorkingDataset = serde_json::from_value(serde_json::json!({
            "projects": [{"id": EntityId::MAX, "epic": "Last"}]
        }))
        .unwrap();
        let mut state = ViewState::new();
        state.load_quarter(Quarter {
            id: "q1".to_string(),
            name: "Q1".to_string(),
            is_active: true,
            data,
            baseline_data: None,
            created_at: String::new(),
            updated_at: String::new(),
        });

        assert_eq!(state.add_project(), Err(Rejection::IdsExhausted));
        assert_eq!(state.working().projects.len(), 1);
        assert_eq!(state.add_sprint(Team::Ios), Ok(1));
    }

    #[test]
    fn test_move_project() {
        let mut state = populated();
        state.move_project(2, Direction::Up).unwrap();
        let ids: Vec<_> = state.working().projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 1]);

        assert_eq!(state.move_project(2, Direction::Up), Err(Rejection::AtBoundary));
        assert_eq!(state.move_project(1, Direction::Down), Err(Rejection::AtBoundary));
        assert_eq!(state.move_project(5, Direction::Down), Err(Rejection::NotFound));
    }

    #[test]
    fn test_delete_project_needs_confirmation() {
        let mut state = populated();
        assert_eq!(state.delete_project(1, &false), Err(Rejection::Unconfirmed));
        assert_eq!(state.working().projects.len(), 2);

        let asked = std::cell::Cell::new(false);
        let confirm = |_: &str| {
            asked.set(true);
            true
        };
        state.delete_project(1, &confirm).unwrap();
        assert!(asked.get());
        assert!(state.working().project(1).is_none());
    }

    #[test]
    fn test_review_toggles() {
        let mut state = populated();
        let id = state.add_tech_review().unwrap();
        assert_eq!(state.working().tech_review(id).unwrap().sprints.len(), 2);
        assert_eq!(
            state.update_tech_review(id, TechReviewField::Scheduled(1, true)),
            Err(Rejection::NoTechLead)
        );
        assert_eq!(
            state.update_tech_review(1, TechReviewField::Scheduled(7, true)),
            Err(Rejection::UnknownSprint)
        );
        state.delete_tech_review(id, &true).unwrap();
        assert!(state.working().tech_review(id).is_none());
    }

    #[test]
    fn test_update_sprint() {
        let mut state = populated();
        state
            .update_sprint(Team::Ios, 1, SprintField::Name("iOS 1".to_string()))
            .unwrap();
        state
            .update_sprint(Team::Ios, 1, SprintField::Capacity("12".to_string()))
            .unwrap();
        let sprint = state.working().sprint(Team::Ios, 1).unwrap();
        assert_eq!(sprint.name, "iOS 1");
        assert_eq!(sprint.capacity, "12");
        assert_eq!(
            state.update_sprint(Team::Android, 1, SprintField::Name("x".to_string())),
            Err(Rejection::NotFound)
        );
    }
}
