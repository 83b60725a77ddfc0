//! Error types for spreadsheet/presentation synchronization.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading sources or writing the updated deck.
///
/// Numeric conversion failures during matching are not errors; they surface
/// as [`crate::Decision::Unparseable`] and never abort a pass.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// The spreadsheet backend could not read the workbook.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    Zip(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    Xml(String),

    /// A part referenced by the package is missing from the archive.
    #[error("Missing part: {0}")]
    MissingPart(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),
}
