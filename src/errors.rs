use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("could not parse {field} value {raw:?}: {reason}")]
    Parse {
        field: &'static str,
        raw: String,
        reason: String,
    },

    #[error("required column {label:?} is missing from the input header")]
    MissingColumn { label: String },

    #[error("row {row}: invalid {field} value {raw:?}")]
    InvalidValue {
        row: usize,
        field: &'static str,
        raw: String,
    },

    #[error("row {row}: score {score} for student {student_id} is outside [0, 100]")]
    ScoreOutOfRange {
        row: usize,
        student_id: i64,
        score: f64,
    },

    #[error("row {row}: student {student_id} has no due date")]
    MissingDueDate { row: usize, student_id: i64 },

    #[error("row {row}: student id {student_id} collides with an overridden id")]
    OverrideCollision { row: usize, student_id: i64 },

    #[error("unknown assessment kind for {file}")]
    UnknownAssessmentKind { file: String },

    #[error("cannot derive an assessment index from {file}")]
    InvalidFileName { file: String },

    #[error("no assessments processed")]
    EmptyResult,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GradebookError {
    /// Whether the error aborts the file (or run) that raised it. Skipped files
    /// and empty results are reported but leave the run intact.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GradebookError::UnknownAssessmentKind { .. } | GradebookError::EmptyResult
        )
    }
}
