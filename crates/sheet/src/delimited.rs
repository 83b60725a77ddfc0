//! CSV input, read as a single-sheet workbook.

use decksync_core::{CellValue, Error, Result, Sheet, Workbook, NA_MARKERS};
use std::path::Path;

/// Sheet name given to CSV data.
pub(crate) const CSV_SHEET_NAME: &str = "Sheet1";

pub(crate) fn read_csv(path: &Path) -> Result<Workbook> {
    let mut reader = csv::ReaderBuilder::new()
        // Headers are handled by the value extractor like any other sheet.
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| map_csv_error(path, e))?;

    let mut sheet = Sheet::new(CSV_SHEET_NAME);
    for record in reader.records() {
        let record = record.map_err(|e| map_csv_error(path, e))?;
        sheet.push_row(record.iter().map(parse_field).collect());
    }

    // Trailing all-empty rows are not part of the used range.
    while sheet
        .rows
        .last()
        .is_some_and(|row| row.iter().all(CellValue::is_empty))
    {
        sheet.rows.pop();
    }

    let mut workbook = Workbook::new();
    workbook.add_sheet(sheet);
    Ok(workbook)
}

fn map_csv_error(path: &Path, err: csv::Error) -> Error {
    let message = format!("Failed to read {}: {}", path.display(), err);
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::Io(e),
        _ => Error::Spreadsheet(message),
    }
}

/// Infer a typed cell from a raw field. Missing-value markers such as
/// `nan` or `N/A` give an empty cell.
fn parse_field(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() || NA_MARKERS.contains(&field) {
        return CellValue::Empty;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return CellValue::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => CellValue::Float(f),
        _ => CellValue::Text(field.to_string()),
    }
}
