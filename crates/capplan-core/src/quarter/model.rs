//! Quarter domain models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::model::WorkingDataset;
use crate::error::CapResult;

/// A planning quarter with its live data and optional baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct Quarter {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub data: WorkingDataset,
    pub baseline_data: Option<WorkingDataset>,
    pub created_at: String,
    pub updated_at: String,
}

impl Quarter {
    pub fn summary(&self) -> QuarterSummary {
        QuarterSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            is_active: self.is_active,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    /// Convert to the wire record.
    pub fn to_record(&self) -> CapResult<QuarterRecord> {
        Ok(QuarterRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            is_active: self.is_active,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            data: serde_json::to_value(&self.data)?,
            baseline_data: self
                .baseline_data
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        })
    }

    /// Build from a wire record. The baseline may arrive as an object or as
    /// serialized text; either way an unreadable baseline reads as none.
    pub fn from_record(record: QuarterRecord) -> CapResult<Self> {
        Ok(Self {
            data: parse_dataset(record.data)?,
            baseline_data: parse_baseline(&record.id, record.baseline_data),
            id: record.id,
            name: record.name,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// List entry for a quarter; datasets are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterSummary {
    pub id: String,
    pub name: String,
    #[serde(alias = "isActive")]
    pub is_active: bool,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(alias = "updatedAt")]
    pub updated_at: String,
}

/// Partial update of a quarter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuarterUpdate {
    pub name: Option<String>,
    pub data: Option<WorkingDataset>,
}

/// A full quarter as exchanged over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterRecord {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "isActive")]
    pub is_active: bool,
    #[serde(default, alias = "createdAt")]
    pub created_at: String,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, alias = "baselineData")]
    pub baseline_data: Option<Value>,
}

/// Parse a live dataset that may be an object or serialized text.
pub fn parse_dataset(value: Value) -> CapResult<WorkingDataset> {
    match value {
        Value::Null => Ok(WorkingDataset::default()),
        Value::String(text) => Ok(WorkingDataset::from_json(&text)?),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// Parse a baseline payload that may be an object, serialized text or absent.
///
/// A payload that does not parse is logged and treated as no baseline.
pub fn parse_baseline(quarter_id: &str, value: Option<Value>) -> Option<WorkingDataset> {
    let parsed = match value? {
        Value::Null => return None,
        Value::String(text) => WorkingDataset::from_json(&text),
        other => serde_json::from_value(other),
    };
    match parsed {
        Ok(baseline) => Some(baseline),
        Err(e) => {
            tracing::warn!(quarter_id, error = %e, "Ignoring unreadable baseline payload");
            None
        }
    }
}

/// [`parse_baseline`] for stored text.
pub fn parse_baseline_text(quarter_id: &str, text: Option<&str>) -> Option<WorkingDataset> {
    parse_baseline(quarter_id, text.map(|t| Value::String(t.to_string())))
}
