//! Value extraction: flattens a workbook into an ordered key → text mapping.
//!
//! Keys are synthesized from coordinates as `{sheet}{column}{row}`. Because
//! the parts are concatenated without a separator, two distinct cells can
//! render to the same key; the later one then overwrites the earlier value.

use crate::types::{Sheet, Workbook};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Mapping from synthesized cell key to the cell's text, in traversal order.
pub type ValueMap = IndexMap<String, String>;

/// How column identifiers are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnNaming {
    /// The first row of each sheet holds the column names; data rows are
    /// numbered from 0 below it.
    #[default]
    HeaderRow,
    /// Columns are named by spreadsheet letters and rows are numbered from 0
    /// at the top of the used range.
    Letters,
}

/// Coordinates of a cell as used in a value-map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub sheet: String,
    pub column: String,
    pub row: usize,
}

impl CellKey {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>, row: usize) -> Self {
        Self {
            sheet: sheet.into(),
            column: column.into(),
            row,
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.sheet, self.column, self.row)
    }
}

/// Flatten every non-empty cell of every sheet into a [`ValueMap`].
///
/// Sheets are visited in workbook order, then columns left to right, then
/// rows top to bottom.
pub fn extract_values(workbook: &Workbook, naming: ColumnNaming) -> ValueMap {
    let mut values = ValueMap::new();

    for sheet in &workbook.sheets {
        let (columns, first_data_row) = match naming {
            ColumnNaming::HeaderRow => (header_names(sheet), 1),
            ColumnNaming::Letters => (
                (0..sheet.width())
                    .map(|c| column_letters(sheet.first_column + c as u32))
                    .collect(),
                0,
            ),
        };

        let before = values.len();
        for (col, column) in columns.iter().enumerate() {
            for (row, cells) in sheet.rows.iter().skip(first_data_row).enumerate() {
                let Some(text) = cells.get(col).and_then(|cell| cell.render()) else {
                    continue;
                };
                let key = CellKey::new(sheet.name.as_str(), column.as_str(), row);
                if let Some(previous) = values.insert(key.to_string(), text) {
                    log::debug!("Key '{}' collided, replacing value '{}'", key, previous);
                }
            }
        }

        log::debug!(
            "Sheet '{}': {} columns, {} values",
            sheet.name,
            columns.len(),
            values.len() - before
        );
    }

    log::info!(
        "Extracted {} values from {} sheet(s)",
        values.len(),
        workbook.sheets.len()
    );
    values
}

/// Column names from the header row.
///
/// Blank headers become `Unnamed: {index}`, counting columns from `A`, and
/// repeated names get a `.1`, `.2`, … suffix.
fn header_names(sheet: &Sheet) -> Vec<String> {
    let mut used = HashSet::new();

    (0..sheet.width())
        .map(|col| {
            let base = sheet
                .cell(0, col)
                .and_then(|cell| cell.render())
                .unwrap_or_else(|| format!("Unnamed: {}", sheet.first_column as usize + col));

            let mut name = base.clone();
            let mut suffix = 1;
            while used.contains(&name) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            used.insert(name.clone());
            name
        })
        .collect()
}

/// Spreadsheet letters for a 0-based column index (`0` → `A`, `26` → `AA`).
pub fn column_letters(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_single_column_sheet() {
        let mut sheet = Sheet::new("Sheet");
        sheet.push_row(vec![text("A")]);
        sheet.push_row(vec![CellValue::Float(10.0)]);
        sheet.push_row(vec![CellValue::Float(20.0)]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        let values = extract_values(&workbook, ColumnNaming::HeaderRow);

        let entries: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("SheetA0", "10"), ("SheetA1", "20")]);
    }

    #[test]
    fn test_empty_cells_skipped() {
        let mut sheet = Sheet::new("S");
        sheet.push_row(vec![text("Q1"), text("Q2")]);
        sheet.push_row(vec![CellValue::Int(5), CellValue::Empty]);
        sheet.push_row(vec![CellValue::Empty, CellValue::Error("#N/A".into())]);
        sheet.push_row(vec![CellValue::Int(7)]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        let values = extract_values(&workbook, ColumnNaming::HeaderRow);

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("SQ10").map(String::as_str), Some("5"));
        assert_eq!(values.get("SQ12").map(String::as_str), Some("7"));
        assert!(!values.contains_key("SQ11"));
        assert!(!values.contains_key("SQ21"));
    }

    #[test]
    fn test_column_major_order_across_sheets() {
        let mut first = Sheet::new("A");
        first.push_row(vec![text("x"), text("y")]);
        first.push_row(vec![CellValue::Int(1), CellValue::Int(2)]);
        first.push_row(vec![CellValue::Int(3), CellValue::Int(4)]);
        let mut second = Sheet::new("B");
        second.push_row(vec![text("z")]);
        second.push_row(vec![text("hello")]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(first);
        workbook.add_sheet(second);

        let values = extract_values(&workbook, ColumnNaming::HeaderRow);

        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Ax0", "Ax1", "Ay0", "Ay1", "Bz0"]);
    }

    #[test]
    fn test_header_naming_blank_and_duplicate() {
        let mut sheet = Sheet::new("S");
        sheet.push_row(vec![text("v"), CellValue::Empty, text("v"), text("v")]);
        sheet.push_row(vec![
            CellValue::Int(1),
            CellValue::Int(2),
            CellValue::Int(3),
            CellValue::Int(4),
        ]);

        assert_eq!(header_names(&sheet), vec!["v", "Unnamed: 1", "v.1", "v.2"]);
    }

    #[test]
    fn test_unnamed_header_counts_from_column_a() {
        // Used range starts at column C.
        let mut sheet = Sheet::new("S").with_first_column(2);
        sheet.push_row(vec![text("Label"), CellValue::Empty]);
        sheet.push_row(vec![text("North"), CellValue::Int(12)]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        let values = extract_values(&workbook, ColumnNaming::HeaderRow);

        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["SLabel0", "SUnnamed: 30"]);
    }

    #[test]
    fn test_letters_naming() {
        let mut sheet = Sheet::new("Data").with_first_column(1);
        sheet.push_row(vec![text("Label"), CellValue::Float(1.5)]);
        sheet.push_row(vec![CellValue::Empty, CellValue::Bool(false)]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        let values = extract_values(&workbook, ColumnNaming::Letters);

        let entries: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            entries,
            vec![("DataB0", "Label"), ("DataC0", "1.5"), ("DataC1", "False")]
        );
    }

    #[test]
    fn test_colliding_keys_last_write_wins() {
        // "S" + "1A" + 0 and "S1" + "A" + 0 both render as "S1A0".
        let mut first = Sheet::new("S");
        first.push_row(vec![text("1A"), text("x")]);
        first.push_row(vec![text("first"), text("other")]);
        let mut second = Sheet::new("S1");
        second.push_row(vec![text("A")]);
        second.push_row(vec![text("second")]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(first);
        workbook.add_sheet(second);

        let values = extract_values(&workbook, ColumnNaming::HeaderRow);

        // The overwritten entry keeps its first position.
        let entries: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(entries, vec![("S1A0", "second"), ("Sx0", "other")]);
    }

    #[test]
    fn test_value_map_serializes_in_traversal_order() {
        let mut sheet = Sheet::new("S");
        sheet.push_row(vec![text("z"), text("a")]);
        sheet.push_row(vec![CellValue::Int(1), CellValue::Int(2)]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);

        let json = serde_json::to_string(&extract_values(&workbook, ColumnNaming::HeaderRow)).unwrap();
        assert_eq!(json, r#"{"Sz0":"1","Sa0":"2"}"#);
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_cell_key_display() {
        assert_eq!(CellKey::new("Sheet", "A", 0).to_string(), "SheetA0");
    }
}
