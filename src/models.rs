use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

/// One input row after column selection, before any validation of dates.
#[derive(Debug, Clone)]
pub struct RawAssessmentRow {
    pub student_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub raw_score: f64,
    pub submission_date_text: Option<String>,
    pub due_date_text: Option<String>,
}

/// A point in time in the reference zone, or a submission that never happened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instant {
    At(DateTime<Tz>),
    Absent,
}

impl Instant {
    pub fn as_datetime(&self) -> Option<&DateTime<Tz>> {
        match self {
            Instant::At(value) => Some(value),
            Instant::Absent => None,
        }
    }

    #[cfg(test)]
    pub fn is_absent(&self) -> bool {
        matches!(self, Instant::Absent)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedAssessmentRecord {
    pub student_id: i64,
    pub score: f64,
    pub submission: Instant,
    pub due: DateTime<Tz>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentKind {
    Homework,
    Lab,
}

impl AssessmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            AssessmentKind::Homework => "Homework",
            AssessmentKind::Lab => "Lab",
        }
    }
}

impl fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An input file whose kind and index have already been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentFile {
    pub name: String,
    pub kind: AssessmentKind,
    pub index: u32,
}

impl AssessmentFile {
    pub fn column_name(&self, metric: &str) -> String {
        format!("{} #{} - {}", self.kind, self.index, metric)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedScore {
    pub metric: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    Processed {
        file: AssessmentFile,
        students: usize,
    },
    Skipped {
        file: String,
        reason: String,
    },
    Failed {
        file: String,
        error: String,
    },
}
