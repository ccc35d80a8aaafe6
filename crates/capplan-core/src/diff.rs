//! Cell-level comparison of a dataset against its baseline.

use serde::{Deserialize, Serialize};

use crate::aggregate::parse_number;
use crate::dataset::model::{
    AllocationKey, EntityId, NumericField, Project, Team, WorkingDataset,
};

/// Whether a cell differs from its baseline value.
///
/// An absent baseline value gives nothing to compare against and never counts
/// as a change. A present value, including zero or blank, is compared
/// numerically, so `"5"` and `"5.0"` are equal.
pub fn has_changed(current: &str, baseline: Option<&str>) -> bool {
    match baseline {
        None => false,
        Some(previous) => parse_number(current) != parse_number(previous),
    }
}

/// Highlight state of one cell plus the value it had in the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffMarker {
    pub changed: bool,
    pub previous: Option<f64>,
}

/// One changed numeric cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub project_id: EntityId,
    pub epic: String,
    pub field: String,
    pub current: f64,
    pub previous: f64,
}

/// Everything that differs between a dataset and its baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffReport {
    pub changed_cells: Vec<CellChange>,
    pub new_projects: Vec<EntityId>,
    pub removed_projects: Vec<EntityId>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.changed_cells.is_empty()
            && self.new_projects.is_empty()
            && self.removed_projects.is_empty()
    }
}

/// Compares project cells against a baseline dataset, if there is one.
#[derive(Debug, Clone, Copy)]
pub struct BaselineDiff<'a> {
    baseline: Option<&'a WorkingDataset>,
}

impl<'a> BaselineDiff<'a> {
    pub fn new(baseline: Option<&'a WorkingDataset>) -> Self {
        Self { baseline }
    }

    /// True when the baseline has no project with this id, or there is no
    /// baseline at all.
    pub fn is_new_project(&self, id: EntityId) -> bool {
        self.baseline.map_or(true, |b| b.project(id).is_none())
    }

    /// Baseline value of a project cell.
    pub fn baseline_value(&self, id: EntityId, field: NumericField) -> Option<&'a str> {
        self.baseline?.project(id)?.value(field)
    }

    pub fn marker(&self, project: &Project, field: NumericField) -> DiffMarker {
        let previous = self.baseline_value(project.id, field);
        let current = project.value(field).unwrap_or("");
        DiffMarker {
            changed: has_changed(current, previous),
            previous: previous.map(parse_number),
        }
    }

    /// Markers for every numeric cell of a project: the three effort fields,
    /// then one allocation per sprint that exists in `dataset`.
    pub fn markers(
        &self,
        project: &Project,
        dataset: &WorkingDataset,
    ) -> Vec<(NumericField, DiffMarker)> {
        numeric_fields(dataset)
            .into_iter()
            .map(|field| (field, self.marker(project, field)))
            .collect()
    }

    /// Every changed cell plus added and removed projects.
    pub fn changes(&self, current: &WorkingDataset) -> DiffReport {
        let Some(baseline) = self.baseline else {
            return DiffReport::default();
        };
        let fields = numeric_fields(current);

        let mut report = DiffReport::default();
        for project in &current.projects {
            if baseline.project(project.id).is_none() {
                report.new_projects.push(project.id);
                continue;
            }
            for field in &fields {
                let marker = self.marker(project, *field);
                if let (true, Some(previous)) = (marker.changed, marker.previous) {
                    report.changed_cells.push(CellChange {
                        project_id: project.id,
                        epic: project.epic.clone(),
                        field: field.to_string(),
                        current: parse_number(project.value(*field).unwrap_or("")),
                        previous,
                    });
                }
            }
        }
        report.removed_projects = baseline
            .projects
            .iter()
            .filter(|p| current.project(p.id).is_none())
            .map(|p| p.id)
            .collect();
        report
    }
}

fn numeric_fields(dataset: &WorkingDataset) -> Vec<NumericField> {
    let mut fields: Vec<NumericField> = Team::ALL.iter().map(|t| NumericField::Effort(*t)).collect();
    for team in Team::ALL {
        fields.extend(
            dataset
                .sprints(team)
                .iter()
                .map(|s| NumericField::Allocation(AllocationKey::new(team, s.id))),
        );
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::model::Sprint;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> WorkingDataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_has_changed_rules() {
        assert!(!has_changed("7", None));
        assert!(!has_changed("5", Some("5")));
        assert!(!has_changed("5", Some("5.0")));
        assert!(has_changed("5", Some("3")));
        assert!(has_changed("5", Some("0")));
        assert!(!has_changed("", Some("0")));
    }

    #[test]
    fn test_number_and_text_cells_compare_equal() {
        let current = dataset(json!({"projects": [{"id": 1, "backend": 5}]}));
        let baseline = dataset(json!({"projects": [{"id": 1, "backend": "5"}]}));
        let diff = BaselineDiff::new(Some(&baseline));
        let marker = diff.marker(&current.projects[0], NumericField::Effort(Team::Backend));
        assert!(!marker.changed);
        assert_eq!(marker.previous, Some(5.0));
    }

    #[test]
    fn test_absent_or_null_baseline_effort_is_not_a_change() {
        let current = dataset(json!({"projects": [{"id": 1, "backend": "5", "ios_1": "2"}]}));
        let backend = NumericField::Effort(Team::Backend);
        let ios_1 = NumericField::Allocation(AllocationKey::new(Team::Ios, 1));
        for baseline in [
            dataset(json!({"projects": [{"id": 1}]})),
            dataset(json!({"projects": [{"id": 1, "backend": null, "ios_1": null}]})),
        ] {
            let diff = BaselineDiff::new(Some(&baseline));
            assert_eq!(diff.baseline_value(1, backend), None);
            let marker = diff.marker(&current.projects[0], backend);
            assert!(!marker.changed);
            assert_eq!(marker.previous, None);
            assert!(!diff.marker(&current.projects[0], ios_1).changed);
        }
    }

    #[test]
    fn test_new_project_detection() {
        let baseline = dataset(json!({"projects": [{"id": 1}]}));
        let diff = BaselineDiff::new(Some(&baseline));
        assert!(!diff.is_new_project(1));
        assert!(diff.is_new_project(2));
        assert!(BaselineDiff::new(None).is_new_project(1));
    }

    #[test]
    fn test_baseline_value_lookup() {
        let baseline = dataset(json!({"projects": [{"id": 1, "ios": "3", "ios_2": "1"}]}));
        let diff = BaselineDiff::new(Some(&baseline));
        let ios_2 = NumericField::Allocation(AllocationKey::new(Team::Ios, 2));
        assert_eq!(diff.baseline_value(1, ios_2), Some("1"));
        assert_eq!(diff.baseline_value(2, ios_2), None);
        assert_eq!(BaselineDiff::new(None).baseline_value(1, ios_2), None);
    }

    #[test]
    fn test_markers_cover_efforts_and_allocations() {
        let mut current = dataset(json!({
            "projects": [{"id": 1, "backend": "8", "backend_1": "5"}],
        }));
        current.backend_sprints.push(Sprint::new(1));
        let baseline = dataset(json!({
            "projects": [{"id": 1, "backend": "8", "backend_1": "2"}],
            "backendSprints": [{"id": 1, "name": "S1", "capacity": "10"}]
        }));
        let diff = BaselineDiff::new(Some(&baseline));
        let markers = diff.markers(&current.projects[0], &current);

        assert_eq!(markers.len(), 4);
        let allocation = markers
            .iter()
            .find(|(f, _)| *f == NumericField::Allocation(AllocationKey::new(Team::Backend, 1)))
            .unwrap();
        assert!(allocation.1.changed);
        assert_eq!(allocation.1.previous, Some(2.0));
        assert!(markers.iter().filter(|(_, m)| m.changed).count() == 1);
    }

    #[test]
    fn test_changes_report() {
        let current = dataset(json!({
            "projects": [
                {"id": 1, "epic": "Checkout", "android": "4"},
                {"id": 3, "epic": "New"}
            ]
        }));
        let baseline = dataset(json!({
            "projects": [
                {"id": 1, "epic": "Checkout", "android": "2"},
                {"id": 2, "epic": "Dropped"}
            ]
        }));
        let report = BaselineDiff::new(Some(&baseline)).changes(&current);

        assert_eq!(report.new_projects, vec![3]);
        assert_eq!(report.removed_projects, vec![2]);
        assert_eq!(
            report.changed_cells,
            vec![CellChange {
                project_id: 1,
                epic: "Checkout".to_string(),
                field: "android".to_string(),
                current: 4.0,
                previous: 2.0,
            }]
        );
        assert!(BaselineDiff::new(None).changes(&current).is_empty());
    }
}
