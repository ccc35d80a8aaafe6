//! Working dataset domain models.
//!
//! Projects carry one allocation cell per sprint, keyed `<team>_<sprintId>`
//! on the wire. In memory those cells live in a typed map so the presence of
//! an allocation is a map lookup, not a probe for a loosely named property.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier of a project, sprint or tech review, unique within its list.
pub type EntityId = u64;

/// Identifier of a sprint within one team's sprint list.
pub type SprintId = EntityId;

/// A delivery team with its own sprint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Backend,
    Android,
    Ios,
}

impl Team {
    pub const ALL: [Team; 3] = [Team::Backend, Team::Android, Team::Ios];

    /// Key used for effort fields and allocation key prefixes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Backend => "Backend",
            Self::Android => "Android",
            Self::Ios => "iOS",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(format!("unknown team '{}' (expected backend, android or ios)", other)),
        }
    }
}

/// Key of one allocation cell: a sprint of a given team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationKey {
    pub team: Team,
    pub sprint_id: SprintId,
}

impl AllocationKey {
    pub fn new(team: Team, sprint_id: SprintId) -> Self {
        Self { team, sprint_id }
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.team, self.sprint_id)
    }
}

impl FromStr for AllocationKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (team, id) = s
            .split_once('_')
            .ok_or_else(|| format!("'{}' is not an allocation key", s))?;
        let team = match team {
            "backend" => Team::Backend,
            "android" => Team::Android,
            "ios" => Team::Ios,
            _ => return Err(format!("'{}' has an unknown team prefix", s)),
        };
        let sprint_id = id
            .parse()
            .map_err(|_| format!("'{}' has a non-numeric sprint id", s))?;
        Ok(Self { team, sprint_id })
    }
}

/// A numeric cell of a project row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericField {
    /// Required effort for a team (`backend`, `android`, `ios`).
    Effort(Team),
    /// Effort placed into one sprint.
    Allocation(AllocationKey),
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Effort(team) => f.write_str(team.as_str()),
            Self::Allocation(key) => key.fmt(f),
        }
    }
}

impl FromStr for NumericField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains('_') {
            s.parse().map(Self::Allocation)
        } else {
            s.parse().map(Self::Effort)
        }
    }
}

/// An epic row in the planning table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawProject", into = "RawProject")]
pub struct Project {
    pub id: EntityId,
    pub epic: String,
    pub owner: String,
    pub tech_owner: String,
    /// Required backend effort as entered; `None` when the cell is absent.
    pub backend: Option<String>,
    pub android: Option<String>,
    pub ios: Option<String>,
    pub allocations: BTreeMap<AllocationKey, String>,
}

impl Project {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    fn effort_cell(&self, team: Team) -> Option<&str> {
        match team {
            Team::Backend => self.backend.as_deref(),
            Team::Android => self.android.as_deref(),
            Team::Ios => self.ios.as_deref(),
        }
    }

    /// Required effort text for a team; empty when the cell is absent.
    pub fn effort(&self, team: Team) -> &str {
        self.effort_cell(team).unwrap_or("")
    }

    pub fn set_effort(&mut self, team: Team, value: String) {
        let cell = match team {
            Team::Backend => &mut self.backend,
            Team::Android => &mut self.android,
            Team::Ios => &mut self.ios,
        };
        *cell = Some(value);
    }

    /// Allocation text for a sprint; empty when the cell is absent.
    pub fn allocation(&self, team: Team, sprint_id: SprintId) -> &str {
        self.allocations
            .get(&AllocationKey::new(team, sprint_id))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Raw value of a numeric cell, `None` when the cell is absent or null.
    pub fn value(&self, field: NumericField) -> Option<&str> {
        match field {
            NumericField::Effort(team) => self.effort_cell(team),
            NumericField::Allocation(key) => self.allocations.get(&key).map(String::as_str),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProject {
    #[serde(deserialize_with = "de_id")]
    id: EntityId,
    #[serde(default, deserialize_with = "de_text")]
    epic: String,
    #[serde(default, deserialize_with = "de_text")]
    owner: String,
    #[serde(default, deserialize_with = "de_text")]
    tech_owner: String,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    backend: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    android: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    ios: Option<String>,
    #[serde(flatten)]
    cells: BTreeMap<String, Value>,
}

impl From<RawProject> for Project {
    fn from(raw: RawProject) -> Self {
        let allocations = raw
            .cells
            .into_iter()
            .filter_map(|(key, value)| {
                let key = key.parse::<AllocationKey>().ok()?;
                Some((key, value_text(&value)?))
            })
            .collect();
        Self {
            id: raw.id,
            epic: raw.epic,
            owner: raw.owner,
            tech_owner: raw.tech_owner,
            backend: raw.backend,
            android: raw.android,
            ios: raw.ios,
            allocations,
        }
    }
}

impl From<Project> for RawProject {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            epic: project.epic,
            owner: project.owner,
            tech_owner: project.tech_owner,
            backend: project.backend,
            android: project.android,
            ios: project.ios,
            cells: project
                .allocations
                .into_iter()
                .map(|(key, value)| (key.to_string(), Value::String(value)))
                .collect(),
        }
    }
}

/// A capacity bucket of one team.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sprint {
    #[serde(deserialize_with = "de_id")]
    pub id: SprintId,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub capacity: String,
}

impl Sprint {
    pub fn new(id: SprintId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// A tech review row, scheduled against backend sprints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawTechReview", into = "RawTechReview")]
pub struct TechReview {
    pub id: EntityId,
    pub epic: String,
    /// Empty while no tech lead is assigned.
    pub tech_lead: String,
    /// Review toggles keyed by backend sprint id.
    pub sprints: BTreeMap<SprintId, bool>,
}

impl TechReview {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn has_tech_lead(&self) -> bool {
        !self.tech_lead.trim().is_empty()
    }

    /// Whether the review happens in a backend sprint. Toggles do not count
    /// while no tech lead is assigned.
    pub fn is_scheduled(&self, sprint_id: SprintId) -> bool {
        self.has_tech_lead() && self.sprints.get(&sprint_id).copied().unwrap_or(false)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTechReview {
    #[serde(deserialize_with = "de_id")]
    id: EntityId,
    #[serde(default, deserialize_with = "de_text")]
    epic: String,
    #[serde(default, deserialize_with = "de_text")]
    tech_lead: String,
    #[serde(flatten)]
    toggles: BTreeMap<String, Value>,
}

impl From<RawTechReview> for TechReview {
    fn from(raw: RawTechReview) -> Self {
        let sprints = raw
            .toggles
            .into_iter()
            .filter_map(|(key, value)| Some((key.parse().ok()?, value.as_bool()?)))
            .collect();
        Self {
            id: raw.id,
            epic: raw.epic,
            tech_lead: raw.tech_lead,
            sprints,
        }
    }
}

impl From<TechReview> for RawTechReview {
    fn from(review: TechReview) -> Self {
        Self {
            id: review.id,
            epic: review.epic,
            tech_lead: review.tech_lead,
            toggles: review
                .sprints
                .into_iter()
                .map(|(id, on)| (id.to_string(), Value::Bool(on)))
                .collect(),
        }
    }
}

/// The editable planning data of a quarter. Both the live data and the
/// frozen baseline have this shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDataset {
    #[serde(default, deserialize_with = "de_list")]
    pub projects: Vec<Project>,
    #[serde(default, deserialize_with = "de_list")]
    pub backend_sprints: Vec<Sprint>,
    #[serde(default, deserialize_with = "de_list")]
    pub android_sprints: Vec<Sprint>,
    #[serde(default, deserialize_with = "de_list")]
    pub ios_sprints: Vec<Sprint>,
    #[serde(default, deserialize_with = "de_list")]
    pub tech_reviews: Vec<TechReview>,
}

impl WorkingDataset {
    /// Sprint list of a team.
    pub fn sprints(&self, team: Team) -> &[Sprint] {
        match team {
            Team::Backend => &self.backend_sprints,
            Team::Android => &self.android_sprints,
            Team::Ios => &self.ios_sprints,
        }
    }

    pub fn sprints_mut(&mut self, team: Team) -> &mut Vec<Sprint> {
        match team {
            Team::Backend => &mut self.backend_sprints,
            Team::Android => &mut self.android_sprints,
            Team::Ios => &mut self.ios_sprints,
        }
    }

    pub fn project(&self, id: EntityId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn sprint(&self, team: Team, id: SprintId) -> Option<&Sprint> {
        self.sprints(team).iter().find(|s| s.id == id)
    }

    pub fn tech_review(&self, id: EntityId) -> Option<&TechReview> {
        self.tech_reviews.iter().find(|r| r.id == id)
    }

    /// Parse a dataset from its serialized text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Text form of a cell value. Numbers keep their JSON rendering so `5` and
/// `"5"` read back identically. Nulls and non-scalar values have none.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

fn de_optional_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => value_text(&value).map(Some).ok_or_else(|| {
            de::Error::custom(format!("expected text or number, found {}", value))
        }),
    }
}

/// Text cell where null reads as empty.
fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(de_optional_text(deserializer)?.unwrap_or_default())
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EntityId, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("id {} is not a non-negative integer", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("id '{}' is not numeric", s))),
        other => Err(de::Error::custom(format!("invalid id {}", other))),
    }
}

fn de_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
