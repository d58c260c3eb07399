//! Bulk import validation
//!
//! Import rows are checked for required fields *before* anything is
//! submitted. Rows with problems are reported back so the caller can ask
//! the user whether to proceed with only the valid rows or abort; rows are
//! never dropped silently. The interactive prompt itself belongs to the
//! view layer; this module just produces the report and honors the
//! resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{normalize_route, normalize_stop, normalize_vehicle, Route, Stop, Vehicle};

/// How imported rows combine with existing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Drop existing rows first
    Replace,
    /// Upsert by identifier, imported rows winning
    Append,
}

/// Counts reported after an import is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows submitted
    #[serde(default)]
    pub imported: usize,
    /// Rows present after the merge
    #[serde(default)]
    pub saved: usize,
}

/// One problem found during validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based row number in the submitted data
    pub row: usize,
    /// What was wrong, e.g. `missing latitude`
    pub reason: String,
}

/// The caller's answer to "some rows are invalid"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportResolution {
    /// Import only the valid rows
    ProceedWithValid,
    /// Import nothing, leave the store untouched
    Abort,
}

/// Validation outcome: normalized valid rows plus per-row issues
#[derive(Debug, Clone)]
pub struct ImportReport<T> {
    /// Rows that passed validation, normalized
    pub valid: Vec<T>,
    /// Problems, one per rejected row
    pub issues: Vec<RowIssue>,
}

impl<T> ImportReport<T> {
    /// Whether every submitted row was valid (no confirmation needed)
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Apply the user's resolution. `Abort` yields `None` and nothing
    /// must be imported; `ProceedWithValid` yields the valid rows.
    pub fn resolve(self, resolution: ImportResolution) -> Option<Vec<T>> {
        match resolution {
            ImportResolution::ProceedWithValid => Some(self.valid),
            ImportResolution::Abort => None,
        }
    }
}

/// Validate stop rows: id, name, latitude, and longitude are required
pub fn validate_stop_rows(rows: &[Value]) -> ImportReport<Stop> {
    validate(rows, |row| {
        require(row, &["stop_id", "id"], "stop_id")?;
        require(row, &["name", "stop_name"], "name")?;
        require_number(row, &["latitude", "lat", "stop_lat"], "latitude")?;
        require_number(row, &["longitude", "lon", "lng", "stop_lon"], "longitude")?;
        normalize_stop(row).ok_or_else(|| "unusable stop record".to_string())
    })
}

/// Validate route rows: id and name are required
pub fn validate_route_rows(rows: &[Value]) -> ImportReport<Route> {
    validate(rows, |row| {
        require(row, &["route_id", "id"], "route_id")?;
        require(row, &["route_name", "name"], "route_name")?;
        normalize_route(row).ok_or_else(|| "unusable route record".to_string())
    })
}

/// Validate vehicle rows: id, latitude, and longitude are required
pub fn validate_vehicle_rows(rows: &[Value]) -> ImportReport<Vehicle> {
    validate(rows, |row| {
        require(row, &["vehicle_id", "device_id", "id"], "vehicle_id")?;
        require_number(row, &["latitude", "lat"], "latitude")?;
        require_number(row, &["longitude", "lon", "lng"], "longitude")?;
        normalize_vehicle(row).ok_or_else(|| "unusable vehicle record".to_string())
    })
}

fn validate<T>(
    rows: &[Value],
    one: impl Fn(&Value) -> Result<T, String>,
) -> ImportReport<T> {
    let mut valid = Vec::new();
    let mut issues = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if !row.is_object() {
            issues.push(RowIssue {
                row: index + 1,
                reason: "not an object".to_string(),
            });
            continue;
        }
        match one(row) {
            Ok(entity) => valid.push(entity),
            Err(reason) => issues.push(RowIssue {
                row: index + 1,
                reason,
            }),
        }
    }
    if !issues.is_empty() {
        tracing::debug!(
            valid = valid.len(),
            rejected = issues.len(),
            "import validation found problems"
        );
    }
    ImportReport { valid, issues }
}

/// Require a non-empty string (or number) under any of the aliases
fn require(row: &Value, keys: &[&str], label: &str) -> Result<(), String> {
    let present = keys.iter().any(|key| match row.get(key) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    });
    if present {
        Ok(())
    } else {
        Err(format!("missing {label}"))
    }
}

/// Require a finite number (or numeric string) under any of the aliases
fn require_number(row: &Value, keys: &[&str], label: &str) -> Result<(), String> {
    let present = keys.iter().any(|key| match row.get(key) {
        Some(Value::Number(n)) => n.as_f64().is_some_and(f64::is_finite),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_or(false, |v| v.is_finite()),
        _ => false,
    });
    if present {
        Ok(())
    } else {
        Err(format!("missing {label}"))
    }
}
