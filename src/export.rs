use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use csv::WriterBuilder;
use tracing::debug;

use crate::errors::GradebookError;
use crate::gradebook::ExportTable;

pub fn export_file_name(generated_at: NaiveDateTime) -> String {
    format!("brightspace_export_{}.csv", generated_at.format("%Y%m%d_%H%M%S"))
}

pub fn write_table<W: Write>(table: &ExportTable, writer: W, path: &Path) -> Result<(), GradebookError> {
    let csv_error = |source: csv::Error| GradebookError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(&table.header).map_err(csv_error)?;
    for row in &table.rows {
        writer.write_record(row).map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the table into `output_dir`, creating the directory if needed.
pub fn write_export(
    table: &ExportTable,
    output_dir: &Path,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, GradebookError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_file_name(generated_at));
    debug!(path = %path.display(), rows = table.rows.len(), "writing export");

    let file = std::fs::File::create(&path)?;
    write_table(table, file, &path)?;
    Ok(path)
}
