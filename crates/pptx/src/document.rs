//! An opened PPTX package together with its deck.

use crate::writer;
use decksync_core::{update_deck, Deck, Error, Result, UpdateReport, ValueMap};
use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

/// Where a run's text lives in its slide XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TextSpan {
    /// Byte range of the content between `<a:t>` and `</a:t>`.
    Content(Range<usize>),
    /// Byte range of a self-closing text element, with its qualified name.
    Empty { range: Range<usize>, qname: String },
}

/// Source text and location of one run, in deck run order.
#[derive(Debug, Clone)]
pub(crate) struct RunSlot {
    pub original: String,
    /// `None` when the run has no text element.
    pub span: Option<TextSpan>,
}

/// One slide part as read from the package.
#[derive(Debug, Clone)]
pub(crate) struct SlidePart {
    pub path: String,
    pub xml: String,
    pub runs: Vec<RunSlot>,
}

/// A parsed PPTX package.
///
/// The deck may be edited through [`PptxDocument::deck_mut`] or
/// [`PptxDocument::apply`]; only run text is written back on save, and the
/// shape tree must keep the structure it was read with.
#[derive(Debug, Clone)]
pub struct PptxDocument {
    package: Vec<u8>,
    parts: Vec<SlidePart>,
    deck: Deck,
}

impl PptxDocument {
    pub(crate) fn new(package: Vec<u8>, parts: Vec<SlidePart>, deck: Deck) -> Self {
        Self {
            package,
            parts,
            deck,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn deck_mut(&mut self) -> &mut Deck {
        &mut self.deck
    }

    /// Slide part names in presentation order.
    pub fn slide_paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().map(|p| p.path.as_str())
    }

    /// Run the numeric update over this document's deck.
    pub fn apply(&mut self, values: &ValueMap) -> UpdateReport {
        update_deck(&mut self.deck, values)
    }

    /// Serialize the package with the current run text.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.deck.slides.len() != self.parts.len() {
            return Err(Error::CorruptedFile(format!(
                "deck has {} slides but the package has {}",
                self.deck.slides.len(),
                self.parts.len()
            )));
        }

        let mut edited = HashMap::new();
        for (slide, part) in self.deck.slides.iter().zip(&self.parts) {
            if let Some(xml) = writer::splice_slide(part, slide)? {
                log::debug!("Rewriting {}", part.path);
                edited.insert(part.path.clone(), xml);
            }
        }

        writer::write_package(&self.package, &edited)
    }

    /// Write the package to `path`. The file is replaced in one write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        log::info!("Saved {}", path.display());
        Ok(())
    }
}
