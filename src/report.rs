use std::fmt::Write;
use std::path::Path;

use crate::models::FileOutcome;

pub fn build_report(outcomes: &[FileOutcome], export_path: Option<&Path>) -> String {
    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();

    for outcome in outcomes {
        match outcome {
            FileOutcome::Processed { file, students } => processed.push((file, *students)),
            FileOutcome::Skipped { file, reason } => skipped.push((file, reason)),
            FileOutcome::Failed { file, error } => failed.push((file, error)),
        }
    }

    let mut output = String::new();

    let _ = writeln!(output, "# Gradebook Run Report");
    let _ = writeln!(
        output,
        "{} files: {} processed, {} skipped, {} failed",
        outcomes.len(),
        processed.len(),
        skipped.len(),
        failed.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Processed Assessments");

    if processed.is_empty() {
        let _ = writeln!(output, "No assessments processed.");
    } else {
        for (file, students) in &processed {
            let _ = writeln!(
                output,
                "- {} #{} from {} ({} students)",
                file.kind, file.index, file.name, students
            );
        }
    }

    if !skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Files");
        for (file, reason) in &skipped {
            let _ = writeln!(output, "- {}: {}", file, reason);
        }
    }

    if !failed.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Failed Files");
        for (file, error) in &failed {
            let _ = writeln!(output, "- {}: {}", file, error);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Export");
    match export_path {
        Some(path) => {
            let _ = writeln!(output, "Grades written to {}.", path.display());
        }
        None => {
            let _ = writeln!(output, "Nothing exported.");
        }
    }

    output
}
