//! Spreadsheet backend producing value mappings.
//!
//! Workbooks (.xlsx, .xlsm, .xlsb, .xls, .ods) are read with `calamine`;
//! .csv files are read as a single sheet named `Sheet1`.

mod delimited;
pub mod reader;

pub use reader::{sheet_from_range, SheetReader};

use decksync_core::{Result, ValueMap};
use std::path::Path;

/// Extract the value mapping of a workbook, using its first row as headers.
pub fn extract_values(path: impl AsRef<Path>) -> Result<ValueMap> {
    SheetReader::new().extract(path)
}
