use std::collections::HashMap;

use csv::StringRecord;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, TimestampConfig};
use crate::errors::GradebookError;
use crate::ingest::RawTable;
use crate::models::{Instant, NormalizedAssessmentRecord, RawAssessmentRow};
use crate::timestamp::{self, DUE_DATE_FIELD, SUBMISSION_DATE_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    StudentId,
    FirstName,
    LastName,
    Email,
    Score,
    SubmissionDate,
    DueDate,
}

#[derive(Debug, Clone)]
pub struct ColumnBinding {
    pub label: String,
    pub field: Field,
    pub required: bool,
}

/// External column label to canonical field. Columns not listed are dropped.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    bindings: Vec<ColumnBinding>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        let required = [
            ("Student ID", Field::StudentId),
            (DUE_DATE_FIELD, Field::DueDate),
            (SUBMISSION_DATE_FIELD, Field::SubmissionDate),
            ("Percent score", Field::Score),
        ];
        let optional = [
            ("First name", Field::FirstName),
            ("Last name", Field::LastName),
            ("Primary email", Field::Email),
        ];

        let bindings = required
            .into_iter()
            .map(|(label, field)| (label, field, true))
            .chain(optional.into_iter().map(|(label, field)| (label, field, false)))
            .map(|(label, field, required)| ColumnBinding {
                label: label.to_string(),
                field,
                required,
            })
            .collect();

        Self { bindings }
    }
}

impl ColumnMapping {
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnLayout, GradebookError> {
        let mut positions = HashMap::new();

        for binding in &self.bindings {
            let position = headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}').trim() == binding.label);

            match position {
                Some(index) => {
                    positions.insert(binding.field, index);
                }
                None if binding.required => {
                    return Err(GradebookError::MissingColumn {
                        label: binding.label.clone(),
                    });
                }
                None => debug!(label = %binding.label, "optional column not present"),
            }
        }

        Ok(ColumnLayout { positions })
    }
}

/// Header positions of the mapped fields within one input table.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    positions: HashMap<Field, usize>,
}

impl ColumnLayout {
    fn cell<'a>(&self, record: &'a StringRecord, field: Field) -> Option<&'a str> {
        self.positions
            .get(&field)
            .and_then(|index| record.get(*index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn extract(&self, record: &StringRecord, row: usize) -> Result<RawAssessmentRow, GradebookError> {
        let student_id = self.parse_cell(record, row, Field::StudentId, "Student ID")?;
        let raw_score = self.parse_cell(record, row, Field::Score, "Percent score")?;
        let text = |field| self.cell(record, field).map(str::to_string);

        Ok(RawAssessmentRow {
            student_id,
            first_name: text(Field::FirstName),
            last_name: text(Field::LastName),
            email: text(Field::Email),
            raw_score,
            submission_date_text: text(Field::SubmissionDate),
            due_date_text: text(Field::DueDate),
        })
    }

    fn parse_cell<T: std::str::FromStr>(
        &self,
        record: &StringRecord,
        row: usize,
        field: Field,
        label: &'static str,
    ) -> Result<T, GradebookError> {
        let raw = self.cell(record, field).unwrap_or_default();
        raw.parse().map_err(|_| GradebookError::InvalidValue {
            row,
            field: label,
            raw: raw.to_string(),
        })
    }
}

/// A known source-side id error for one named student.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StudentIdOverride {
    pub first_name: String,
    pub last_name: String,
    pub from_id: i64,
    pub to_id: i64,
    /// Narrows the match when two students share a name.
    #[serde(default)]
    pub email: Option<String>,
}

impl StudentIdOverride {
    fn matches(&self, row: &RawAssessmentRow) -> bool {
        let same = |expected: &str, actual: &Option<String>| {
            actual
                .as_deref()
                .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected.trim()))
        };
        row.student_id == self.from_id
            && same(&self.first_name, &row.first_name)
            && same(&self.last_name, &row.last_name)
            && self
                .email
                .as_deref()
                .map_or(true, |email| same(email, &row.email))
    }
}

/// Append-only list of id corrections, applied before uniqueness checks.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    entries: Vec<StudentIdOverride>,
}

impl OverrideTable {
    pub fn push(&mut self, entry: StudentIdOverride) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[StudentIdOverride] {
        &self.entries
    }

    pub fn remap(&self, row: &RawAssessmentRow) -> Option<i64> {
        self.entries
            .iter()
            .find(|entry| entry.matches(row))
            .map(|entry| entry.to_id)
    }
}

pub fn normalize_row(
    raw: &RawAssessmentRow,
    row: usize,
    timestamps: &TimestampConfig,
) -> Result<NormalizedAssessmentRecord, GradebookError> {
    if !raw.raw_score.is_finite() || !(0.0..=100.0).contains(&raw.raw_score) {
        return Err(GradebookError::ScoreOutOfRange {
            row,
            student_id: raw.student_id,
            score: raw.raw_score,
        });
    }

    let due = match timestamp::parse_due_date(raw.due_date_text.as_deref(), timestamps)? {
        Instant::At(value) => value,
        Instant::Absent => {
            return Err(GradebookError::MissingDueDate {
                row,
                student_id: raw.student_id,
            })
        }
    };
    let submission = timestamp::parse_submission_date(raw.submission_date_text.as_deref(), timestamps)?;

    Ok(NormalizedAssessmentRecord {
        student_id: raw.student_id,
        score: raw.raw_score,
        submission,
        due,
    })
}

/// Normalizes every row of one table. The result holds one record per student
/// id, in first-seen order, with the last-seen row's values.
pub fn normalize_table(
    table: &RawTable,
    config: &PipelineConfig,
) -> Result<Vec<NormalizedAssessmentRecord>, GradebookError> {
    let layout = config.mapping.resolve(&table.headers)?;
    let mut records: Vec<NormalizedAssessmentRecord> = Vec::with_capacity(table.records.len());
    let mut slots: HashMap<i64, (usize, bool)> = HashMap::new();

    for (offset, record) in table.records.iter().enumerate() {
        let row = offset + 1;
        let mut raw = layout.extract(record, row)?;

        let overridden = match config.overrides.remap(&raw) {
            Some(to_id) => {
                info!(
                    row,
                    from_id = raw.student_id,
                    to_id,
                    "applying student id override"
                );
                raw.student_id = to_id;
                true
            }
            None => false,
        };

        let normalized = normalize_row(&raw, row, &config.timestamps)?;

        match slots.get(&normalized.student_id).copied() {
            Some((_, previous_overridden)) if overridden != previous_overridden => {
                return Err(GradebookError::OverrideCollision {
                    row,
                    student_id: normalized.student_id,
                });
            }
            Some((slot, _)) => {
                warn!(row, student_id = normalized.student_id, "duplicate student id, keeping last row");
                records[slot] = normalized;
            }
            None => {
                slots.insert(normalized.student_id, (records.len(), overridden));
                records.push(normalized);
            }
        }
    }

    Ok(records)
}
