use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::errors::GradebookError;
use crate::gradebook::{AssessmentSheet, Gradebook};
use crate::ingest::{self, RawTable};
use crate::models::{AssessmentFile, AssessmentKind, FileOutcome};
use crate::normalize;
use crate::scoring;

/// Resolves kind and index from names like `CS101_Fall_3_Homework.csv`.
/// "Homework" is checked before "Lab".
pub fn classify_file(name: &str) -> Result<AssessmentFile, GradebookError> {
    let kind = if name.contains("Homework") {
        AssessmentKind::Homework
    } else if name.contains("Lab") {
        AssessmentKind::Lab
    } else {
        return Err(GradebookError::UnknownAssessmentKind {
            file: name.to_string(),
        });
    };

    let stem = Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name);
    let index = stem
        .split('_')
        .nth(2)
        .and_then(|token| token.trim().parse::<u32>().ok())
        .ok_or_else(|| GradebookError::InvalidFileName {
            file: name.to_string(),
        })?;

    Ok(AssessmentFile {
        name: name.to_string(),
        kind,
        index,
    })
}

/// Normalizes and scores one table into a sheet. Any error leaves no trace.
pub fn score_table(
    table: &RawTable,
    file: &AssessmentFile,
    config: &PipelineConfig,
) -> Result<AssessmentSheet, GradebookError> {
    let records = normalize::normalize_table(table, config)?;
    let metrics = scoring::metrics_for(file.kind, config.policy);
    let mut sheet =
        AssessmentSheet::with_columns(metrics.iter().map(|metric| file.column_name(metric)));

    for record in &records {
        for score in scoring::derive_scores(record, file.kind, config.policy) {
            sheet.record(record.student_id, file.column_name(score.metric), score.value);
        }
    }

    Ok(sheet)
}

/// Processes one file end to end and merges it only if every row succeeded.
pub fn process_file(
    path: &Path,
    config: &PipelineConfig,
    gradebook: &mut Gradebook,
) -> Result<FileOutcome, GradebookError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();

    let file = match classify_file(&name) {
        Ok(file) => file,
        Err(err @ GradebookError::UnknownAssessmentKind { .. }) => {
            warn!(file = %name, "unknown assessment type, skipping");
            return Ok(FileOutcome::Skipped {
                file: name,
                reason: err.to_string(),
            });
        }
        Err(err) => return Err(err),
    };

    let table = ingest::read_table_from_path(path)?;
    debug!(file = %name, rows = table.len(), "read assessment table");
    let sheet = score_table(&table, &file, config)?;
    let students = sheet.student_count();
    let columns = sheet.columns().len();
    gradebook.merge(sheet);

    info!(file = %name, kind = %file.kind, index = file.index, students, columns, "processed assessment");
    Ok(FileOutcome::Processed { file, students })
}

/// CSV files directly inside `data_dir`, sorted by name.
pub fn list_input_files(data_dir: &Path) -> Result<Vec<PathBuf>, GradebookError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Runs every input file in order. A failing file is reported and rolled
/// back; with `fail_fast` the first failure aborts the run instead.
pub fn run(
    data_dir: &Path,
    config: &PipelineConfig,
    gradebook: &mut Gradebook,
    fail_fast: bool,
) -> Result<Vec<FileOutcome>, GradebookError> {
    let files = list_input_files(data_dir)?;
    info!(data_dir = %data_dir.display(), files = files.len(), "starting run");

    let mut outcomes = Vec::with_capacity(files.len());
    for path in files {
        match process_file(&path, config, gradebook) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) if fail_fast => return Err(err),
            Err(err) => {
                error!(file = %path.display(), error = %err, "failed to process file");
                outcomes.push(FileOutcome::Failed {
                    file: path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(outcomes)
}
