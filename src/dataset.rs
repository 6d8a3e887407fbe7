//! In-memory table plus the spreadsheet and delimited-file readers/writers.

use crate::errors::{AppError, ResultExt};
use crate::models::FieldValue;
use calamine::{open_workbook_auto, Data, Reader};
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Builds a cell from delimited-file text; only a zero-length field is empty.
    pub fn from_text(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            // Integral values (zip codes read as numbers) print without ".0"
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
        }
    }
}

impl From<FieldValue> for Cell {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Bool(b) => Cell::Bool(b),
            FieldValue::Text(s) => Cell::Text(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Number(n as f64)
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::Text(other.to_string()),
    }
}

/// Column name -> value, in column order.
pub type Row = IndexMap<String, Cell>;

/// Ordered columns plus rows. Rows may lack columns; lookups treat that as empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a dataset whose header starts with `base_columns` and continues
    /// with every other column in order of first appearance across `rows`.
    pub fn from_rows(base_columns: Vec<String>, rows: Vec<Row>) -> Self {
        let mut columns: IndexMap<String, ()> =
            base_columns.into_iter().map(|c| (c, ())).collect();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains_key(key) {
                    columns.insert(key.clone(), ());
                }
            }
        }
        Self {
            columns: columns.into_keys().collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Removes the named columns from the header and every row; unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        self.columns.retain(|c| !names.contains(&c.as_str()));
        for row in &mut self.rows {
            for name in names {
                row.shift_remove(*name);
            }
        }
    }

    /// Value of `column` in `row`, `Empty` when the row lacks it.
    pub fn cell<'a>(row: &'a Row, column: &str) -> &'a Cell {
        const EMPTY: &Cell = &Cell::Empty;
        row.get(column).unwrap_or(EMPTY)
    }
}

// ============ Readers ============

/// Reads the input table, picking the decoder from the file extension.
/// `.csv` goes through the delimited reader; everything else is treated as
/// a workbook and its first sheet is used.
pub fn read_spreadsheet(path: &Path, max_rows: Option<usize>) -> Result<Dataset, AppError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let dataset = if is_csv {
        read_csv(path, max_rows)?
    } else {
        read_workbook(path, max_rows)?
    };

    tracing::info!(
        "Read {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns().len(),
        path.display()
    );
    Ok(dataset)
}

pub fn read_workbook(path: &Path, max_rows: Option<usize>) -> Result<Dataset, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(AppError::from)
        .with_context(|| format!("opening {}", path.display()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::SpreadsheetError(format!("{} has no sheets", path.display())))?
        .map_err(AppError::from)?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .enumerate()
            .map(|(i, c)| match cell_from_data(c) {
                Cell::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(Dataset::default()),
    };

    let mut dataset = Dataset::new(header.clone());
    for cells in rows.take(max_rows.unwrap_or(usize::MAX)) {
        let row: Row = header
            .iter()
            .cloned()
            .zip(cells.iter().map(cell_from_data))
            .collect();
        dataset.push_row(row);
    }
    Ok(dataset)
}

pub fn read_csv(path: &Path, max_rows: Option<usize>) -> Result<Dataset, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(AppError::from)
        .with_context(|| format!("opening {}", path.display()))?;

    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut dataset = Dataset::new(header.clone());
    for record in reader.records().take(max_rows.unwrap_or(usize::MAX)) {
        let record = record?;
        let row: Row = header
            .iter()
            .cloned()
            .zip(record.iter().map(Cell::from_text))
            .collect();
        dataset.push_row(row);
    }
    Ok(dataset)
}

// ============ Writer ============

/// Writes the dataset as comma-delimited text: header, then one line per row.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(AppError::from)
        .with_context(|| format!("creating {}", path.display()))?;

    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(
            dataset
                .columns()
                .iter()
                .map(|c| Dataset::cell(row, c).to_string()),
        )?;
    }
    writer.flush()?;

    tracing::info!("Saved {} rows to {}", dataset.len(), path.display());
    Ok(())
}
