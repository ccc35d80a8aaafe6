//! Working dataset model and integrity helpers.

pub mod model;

use model::{AllocationKey, EntityId, SprintId, Team, WorkingDataset};

/// A field that references a sprint missing from its team's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DanglingField {
    /// Allocation cell on a project.
    Allocation { project_id: EntityId, key: AllocationKey },
    /// Review toggle on a tech review (backend sprints only).
    ReviewToggle { review_id: EntityId, sprint_id: SprintId },
}

/// Next free id in a list: one past the largest id in use, or `None` when
/// the largest id is already `EntityId::MAX`.
pub fn next_id(ids: impl IntoIterator<Item = EntityId>) -> Option<EntityId> {
    match ids.into_iter().max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

impl WorkingDataset {
    fn has_sprint(&self, team: Team, sprint_id: SprintId) -> bool {
        self.sprints(team).iter().any(|s| s.id == sprint_id)
    }

    /// List allocation cells and review toggles pointing at sprints that no
    /// longer exist.
    pub fn dangling_fields(&self) -> Vec<DanglingField> {
        let mut dangling = Vec::new();
        for project in &self.projects {
            for key in project.allocations.keys() {
                if !self.has_sprint(key.team, key.sprint_id) {
                    dangling.push(DanglingField::Allocation {
                        project_id: project.id,
                        key: *key,
                    });
                }
            }
        }
        for review in &self.tech_reviews {
            for sprint_id in review.sprints.keys() {
                if !self.has_sprint(Team::Backend, *sprint_id) {
                    dangling.push(DanglingField::ReviewToggle {
                        review_id: review.id,
                        sprint_id: *sprint_id,
                    });
                }
            }
        }
        dangling
    }

    /// Remove every dangling field. Returns how many were removed.
    pub fn prune_dangling(&mut self) -> usize {
        let dangling = self.dangling_fields();
        for field in &dangling {
            match field {
                DanglingField::Allocation { project_id, key } => {
                    if let Some(p) = self.projects.iter_mut().find(|p| p.id == *project_id) {
                        p.allocations.remove(key);
                    }
                }
                DanglingField::ReviewToggle { review_id, sprint_id } => {
                    if let Some(r) = self.tech_reviews.iter_mut().find(|r| r.id == *review_id) {
                        r.sprints.remove(sprint_id);
                    }
                }
            }
        }
        dangling.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Project, Sprint, TechReview};

    fn dataset() -> WorkingDataset {
        let mut project = Project::new(1);
        project
            .allocations
            .insert(AllocationKey::new(Team::Backend, 1), "2".to_string());
        project
            .allocations
            .insert(AllocationKey::new(Team::Ios, 9), "3".to_string());
        let mut review = TechReview::new(1);
        review.sprints.insert(1, true);
        review.sprints.insert(4, false);
        WorkingDataset {
            projects: vec![project],
            backend_sprints: vec![Sprint::new(1)],
            tech_reviews: vec![review],
            ..WorkingDataset::default()
        }
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(Vec::new()), Some(1));
        assert_eq!(next_id(vec![3, 9, 4]), Some(10));
        assert_eq!(next_id(vec![2, EntityId::MAX]), None);
    }

    #[test]
    fn test_dangling_fields_detected() {
        let dangling = dataset().dangling_fields();
        assert_eq!(
            dangling,
            vec![
                DanglingField::Allocation {
                    project_id: 1,
                    key: AllocationKey::new(Team::Ios, 9)
                },
                DanglingField::ReviewToggle {
                    review_id: 1,
                    sprint_id: 4
                },
            ]
        );
    }

    #[test]
    fn test_prune_dangling() {
        let mut data = dataset();
        assert_eq!(data.prune_dangling(), 2);
        assert!(data.dangling_fields().is_empty());
        assert_eq!(data.projects[0].allocation(Team::Backend, 1), "2");
    }
}
