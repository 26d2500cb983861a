use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};

use crate::errors::GradebookError;

/// Header labels plus untyped string cells of one input file.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn read_table<R: Read>(reader: R, source: impl AsRef<Path>) -> Result<RawTable, GradebookError> {
    let csv_error = |source_err: csv::Error| GradebookError::Csv {
        path: PathBuf::from(source.as_ref()),
        source: source_err,
    };

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        records.push(result.map_err(csv_error)?);
    }

    Ok(RawTable { headers, records })
}

pub fn read_table_from_path(path: &Path) -> Result<RawTable, GradebookError> {
    let file = std::fs::File::open(path)?;
    read_table(file, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_headers_and_rows() {
        let table = read_table("Student ID,Percent score\n1,50\n2,75\n".as_bytes(), "a.csv").unwrap();
        assert_eq!(table.headers, vec!["Student ID", "Percent score"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].get(1), Some("75"));
    }

    #[test]
    fn header_only_file_is_empty() {
        let table = read_table("Student ID,Percent score\n".as_bytes(), "a.csv").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn ragged_rows_are_csv_errors() {
        let err = read_table("a,b\n1,2,3\n".as_bytes(), "ragged.csv").unwrap_err();
        match err {
            GradebookError::Csv { path, .. } => assert_eq!(path, PathBuf::from("ragged.csv")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
