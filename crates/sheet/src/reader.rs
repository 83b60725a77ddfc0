//! Workbook reader.

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use decksync_core::{extract_values, CellValue, ColumnNaming, Error, Result, Sheet, ValueMap, Workbook};
use std::path::Path;

use crate::delimited;

/// Reads a workbook from disk into the core [`Workbook`] model.
#[derive(Debug, Clone, Default)]
pub struct SheetReader {
    naming: ColumnNaming,
}

impl SheetReader {
    /// Create a reader that treats the first row of each sheet as headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the first row holds column names. When disabled, columns
    /// are named by their letters and every row is data.
    pub fn with_header_row(mut self, header_row: bool) -> Self {
        self.naming = if header_row {
            ColumnNaming::HeaderRow
        } else {
            ColumnNaming::Letters
        };
        self
    }

    /// Read every sheet of the file at `path`.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Workbook> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        if is_csv {
            log::debug!("Reading {} as CSV", path.display());
            return delimited::read_csv(path);
        }

        log::debug!("Reading {} as workbook", path.display());
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            Error::Spreadsheet(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let mut result = Workbook::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(|e| {
                Error::Spreadsheet(format!("Failed to read sheet '{}': {}", name, e))
            })?;
            result.add_sheet(sheet_from_range(&name, &range));
        }

        Ok(result)
    }

    /// Read the file at `path` and flatten it into a value mapping.
    pub fn extract(&self, path: impl AsRef<Path>) -> Result<ValueMap> {
        let workbook = self.read(path)?;
        Ok(extract_values(&workbook, self.naming))
    }
}

/// Convert a calamine cell range into a [`Sheet`] covering its used area.
pub fn sheet_from_range(name: &str, range: &Range<Data>) -> Sheet {
    let first_column = range.start().map(|(_, col)| col).unwrap_or(0);
    let mut sheet = Sheet::new(name).with_first_column(first_column);

    for row in range.rows() {
        sheet.push_row(row.iter().map(convert_cell).collect());
    }

    log::debug!(
        "Sheet '{}': {} rows x {} columns",
        name,
        sheet.rows.len(),
        sheet.width()
    );
    sheet
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::from_text(s.as_str()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match cell.as_datetime() {
            Some(naive) => CellValue::DateTime(naive.to_string()),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::DateTime(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}
