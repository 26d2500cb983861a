use std::path::Path;

use chrono_tz::Tz;
use clap::ValueEnum;
use serde::Deserialize;

use crate::errors::GradebookError;
use crate::normalize::{ColumnMapping, OverrideTable, StudentIdOverride};

pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Which space derived late/on-time values are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScoringPolicy {
    /// 0-100 values: late penalty for homework, on-time points for labs
    #[default]
    Points,
    /// 0-1 values: on-time credit for homework and labs
    Fraction,
}

/// Textual layout of a timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TimestampShape {
    /// Trailing abbreviation is a real zone; parse as aware and convert
    #[default]
    Qualified,
    /// Trailing abbreviation is dropped; wall clock is local to the target zone
    Implied,
}

#[derive(Debug, Clone)]
pub struct TimestampConfig {
    pub zone: Tz,
    pub due_shape: TimestampShape,
    pub submission_shape: TimestampShape,
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            zone: chrono_tz::America::Los_Angeles,
            due_shape: TimestampShape::Qualified,
            submission_shape: TimestampShape::Qualified,
        }
    }
}

/// Everything one run needs to turn raw tables into gradebook columns.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub timestamps: TimestampConfig,
    pub policy: ScoringPolicy,
    pub mapping: ColumnMapping,
    pub overrides: OverrideTable,
}

pub fn parse_timezone(name: &str) -> Result<Tz, GradebookError> {
    name.parse::<Tz>()
        .map_err(|err| GradebookError::Config(format!("unknown timezone {name:?}: {err}")))
}

#[derive(Debug, Default, Deserialize)]
struct OverridesFile {
    #[serde(rename = "override", default)]
    overrides: Vec<StudentIdOverride>,
}

pub fn parse_overrides(text: &str) -> Result<OverrideTable, GradebookError> {
    let file: OverridesFile = toml::from_str(text)
        .map_err(|err| GradebookError::Config(format!("invalid overrides file: {err}")))?;
    let mut table = OverrideTable::default();
    for entry in file.overrides {
        table.push(entry);
    }
    Ok(table)
}

pub fn load_overrides(path: &Path) -> Result<OverrideTable, GradebookError> {
    let text = std::fs::read_to_string(path)?;
    parse_overrides(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_timezone() {
        let zone = parse_timezone(DEFAULT_TIMEZONE).unwrap();
        assert_eq!(zone, chrono_tz::America::Los_Angeles);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let err = parse_timezone("Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, GradebookError::Config(_)));
    }

    #[test]
    fn reads_override_entries_in_order() {
        let table = parse_overrides(
            r#"
            [[override]]
            first_name = "Jordan"
            last_name = "Reyes"
            from_id = 1001
            to_id = 2001

            [[override]]
            first_name = "Sam"
            last_name = "Okafor"
            from_id = 1002
            to_id = 2002
            email = "sam.okafor@example.edu"
            "#,
        )
        .unwrap();

        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].to_id, 2001);
        assert_eq!(entries[0].email, None);
        assert_eq!(entries[1].last_name, "Okafor");
        assert_eq!(entries[1].email.as_deref(), Some("sam.okafor@example.edu"));
    }

    #[test]
    fn empty_overrides_file_is_an_empty_table() {
        let table = parse_overrides("").unwrap();
        assert!(table.entries().is_empty());
    }
}
