//! PPTX (Office Open XML) backend.
//!
//! Reads the shape/paragraph/run tree of every slide into a
//! [`decksync_core::Deck`] and writes changed run text back into the
//! original package, leaving every other part untouched.

pub mod document;
pub mod parser;
mod writer;

#[cfg(test)]
mod fixture;

pub use document::PptxDocument;
pub use parser::PptxParser;

use decksync_core::{Result, RunMap, ValueMap};
use std::path::Path;

/// Snapshot the editable runs of the presentation at `path`.
pub fn extract_runs(path: impl AsRef<Path>) -> Result<RunMap> {
    let document = PptxParser::new().open(path)?;
    Ok(decksync_core::extract_runs(document.deck()))
}

/// Update numeric runs of `pptx` from `values` and save the result to
/// `output`, which may be the input path itself.
///
/// Returns a confirmation message naming the output path.
pub fn update_presentation(
    pptx: impl AsRef<Path>,
    values: &ValueMap,
    output: impl AsRef<Path>,
) -> Result<String> {
    let output = output.as_ref();
    let mut document = PptxParser::new().open(pptx)?;
    document.apply(values);
    document.save(output)?;
    Ok(format!("Updated PPT saved at {}", output.display()))
}
