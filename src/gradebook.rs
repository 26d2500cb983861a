//! Wide per-student gradebook: one row per student, one column per derived
//! metric, in the order columns were first introduced.

use std::collections::HashMap;

use crate::errors::GradebookError;

pub const USERNAME_COLUMN: &str = "Username";
pub const END_OF_LINE_COLUMN: &str = "End-of-Line Indicator";
pub const END_OF_LINE_VALUE: &str = "#";

/// Columns and cells produced by a single assessment file. Nothing reaches the
/// gradebook until the whole file has been scored.
#[derive(Debug, Clone, Default)]
pub struct AssessmentSheet {
    columns: Vec<String>,
    cells: Vec<(i64, String, f64)>,
}

impl AssessmentSheet {
    pub fn with_columns(columns: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            cells: Vec::new(),
        }
    }

    pub fn record(&mut self, student_id: i64, column: impl Into<String>, value: f64) {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column.clone());
        }
        self.cells.push((student_id, column, value));
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn student_count(&self) -> usize {
        let mut seen: Vec<i64> = self.cells.iter().map(|(id, _, _)| *id).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

#[derive(Debug, Clone)]
struct StudentRow {
    student_id: i64,
    cells: HashMap<usize, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct Gradebook {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<StudentRow>,
    row_index: HashMap<i64, usize>,
}

impl Gradebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn student_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, student_id: i64, column: &str) -> Option<f64> {
        let row = &self.rows[*self.row_index.get(&student_id)?];
        let column = self.column_index.get(column)?;
        row.cells.get(column).copied()
    }

    /// Inserts or overwrites one cell. A new column is appended after every
    /// existing one; existing columns never move.
    pub fn record(&mut self, student_id: i64, column: &str, value: f64) {
        let column = self.ensure_column(column);
        let row = match self.row_index.get(&student_id) {
            Some(index) => *index,
            None => {
                self.rows.push(StudentRow {
                    student_id,
                    cells: HashMap::new(),
                });
                self.row_index.insert(student_id, self.rows.len() - 1);
                self.rows.len() - 1
            }
        };
        self.rows[row].cells.insert(column, value);
    }

    pub fn merge(&mut self, sheet: AssessmentSheet) {
        for column in &sheet.columns {
            self.ensure_column(column);
        }
        for (student_id, column, value) in sheet.cells {
            self.record(student_id, &column, value);
        }
    }

    fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(index) = self.column_index.get(column) {
            return *index;
        }
        self.columns.push(column.to_string());
        self.column_index.insert(column.to_string(), self.columns.len() - 1);
        self.columns.len() - 1
    }

    /// Builds the import table. Missing cells are left blank and the
    /// end-of-line column is always last.
    pub fn finalize(&self) -> Result<ExportTable, GradebookError> {
        if self.is_empty() {
            return Err(GradebookError::EmptyResult);
        }

        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|index| self.columns[*index] != END_OF_LINE_COLUMN)
            .collect();

        let mut header = Vec::with_capacity(kept.len() + 2);
        header.push(USERNAME_COLUMN.to_string());
        header.extend(kept.iter().map(|index| self.columns[*index].clone()));
        header.push(END_OF_LINE_COLUMN.to_string());

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut values = Vec::with_capacity(header.len());
                values.push(row.student_id.to_string());
                values.extend(
                    kept.iter()
                        .map(|index| row.cells.get(index).map(|v| format_score(*v)).unwrap_or_default()),
                );
                values.push(END_OF_LINE_VALUE.to_string());
                values
            })
            .collect();

        Ok(ExportTable { header, rows })
    }
}

/// Finalized gradebook as string cells, ready for a CSV writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn format_score(value: f64) -> String {
    value.to_string()
}
