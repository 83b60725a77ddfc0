//! Writes changed run text back into the package.

use crate::document::{SlidePart, TextSpan};
use decksync_core::{Error, Result, Slide};
use quick_xml::escape::partial_escape;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Rebuild a slide's XML with the text of every changed run replaced.
///
/// Returns `None` when no run changed.
pub(crate) fn splice_slide(part: &SlidePart, slide: &Slide) -> Result<Option<String>> {
    let runs: Vec<&str> = slide.runs().map(|(_, run)| run.text.as_str()).collect();
    if runs.len() != part.runs.len() {
        return Err(Error::CorruptedFile(format!(
            "{}: run count changed from {} to {}",
            part.path,
            part.runs.len(),
            runs.len()
        )));
    }

    let mut xml = String::with_capacity(part.xml.len());
    let mut cursor = 0;
    let mut edits = 0;

    for (text, slot) in runs.into_iter().zip(&part.runs) {
        if text == slot.original {
            continue;
        }
        let span = slot.span.as_ref().ok_or_else(|| {
            Error::CorruptedFile(format!("{}: run '{}' has no text element", part.path, slot.original))
        })?;

        let escaped = partial_escape(text);
        match span {
            TextSpan::Content(range) => {
                xml.push_str(&part.xml[cursor..range.start]);
                xml.push_str(&escaped);
                cursor = range.end;
            }
            TextSpan::Empty { range, qname } => {
                xml.push_str(&part.xml[cursor..range.start]);
                xml.push_str(&format!("<{0}>{1}</{0}>", qname, escaped));
                cursor = range.end;
            }
        }
        edits += 1;
    }

    if edits == 0 {
        return Ok(None);
    }
    xml.push_str(&part.xml[cursor..]);
    log::debug!("{}: {} run(s) rewritten", part.path, edits);
    Ok(Some(xml))
}

/// Copy the package, replacing the parts named in `edited`.
///
/// Entry order is kept; unchanged entries are copied without recompression.
pub(crate) fn write_package(package: &[u8], edited: &HashMap<String, String>) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(package)).map_err(zip_error)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(package.len())));

    for index in 0..archive.len() {
        let file = archive.by_index_raw(index).map_err(zip_error)?;
        match edited.get(file.name()) {
            Some(xml) => {
                let name = file.name().to_string();
                let options = FileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .last_modified_time(file.last_modified());
                drop(file);
                writer.start_file(name, options).map_err(zip_error)?;
                writer.write_all(xml.as_bytes())?;
            }
            None => writer.raw_copy_file(file).map_err(zip_error)?,
        }
    }

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Zip(e.to_string())
}
