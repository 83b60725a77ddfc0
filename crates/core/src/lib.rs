//! Core model and matching logic for keeping presentation numbers in sync
//! with spreadsheet values.
//!
//! The three stages are pure functions over in-memory data:
//! [`extract_values`] flattens a [`Workbook`] into a [`ValueMap`],
//! [`extract_runs`] snapshots the editable runs of a [`Deck`], and
//! [`update_deck`] rewrites numeric runs from the value map.

pub mod error;
pub mod matcher;
pub mod runs;
pub mod types;
pub mod values;

pub use error::{Error, Result};
pub use matcher::{decide, update_deck, Decision, NumericText, RunChange, UpdateReport};
pub use runs::{extract_runs, run_locations, RunKey, RunLocation, RunMap, RunRecord};
pub use types::{
    CellValue, Deck, NA_MARKERS, Paragraph, Run, RunPath, Shape, Sheet, Slide, TextFrame, Workbook,
};
pub use values::{column_letters, extract_values, CellKey, ColumnNaming, ValueMap};
