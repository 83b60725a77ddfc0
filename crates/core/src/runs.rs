//! Run extraction: a read-only snapshot of the editable text runs of a deck.
//!
//! [`RunMap`] is keyed by slide and run text, so two runs with the same text
//! on one slide share an entry. It is meant for display. Use
//! [`run_locations`] when every run needs its own structural address.

use crate::types::{Deck, RunPath};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Run snapshot keyed by `slide_{slide}run{text}`.
pub type RunMap = IndexMap<String, RunRecord>;

/// Key of a run in a [`RunMap`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub slide: usize,
    pub text: String,
}

impl RunKey {
    pub fn new(slide: usize, text: impl Into<String>) -> Self {
        Self {
            slide,
            text: text.into(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide_{}run{}", self.slide, self.text)
    }
}

/// A run as recorded in a [`RunMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// 0-based slide index.
    pub slide: usize,
    /// Trimmed run text.
    pub text: String,
}

/// A non-empty run with its structural address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLocation {
    pub path: RunPath,
    /// Trimmed run text.
    pub text: String,
}

/// Snapshot every run whose trimmed text is non-empty.
pub fn extract_runs(deck: &Deck) -> RunMap {
    let mut runs = RunMap::new();
    for location in run_locations(deck) {
        let key = RunKey::new(location.path.slide, location.text.as_str());
        runs.insert(
            key.to_string(),
            RunRecord {
                slide: location.path.slide,
                text: location.text,
            },
        );
    }

    log::info!(
        "Extracted {} distinct runs from {} slide(s)",
        runs.len(),
        deck.slides.len()
    );
    runs
}

/// Every run with non-empty trimmed text, in document order, duplicates kept.
pub fn run_locations(deck: &Deck) -> Vec<RunLocation> {
    deck.runs()
        .filter_map(|(path, run)| {
            let text = run.text.trim();
            (!text.is_empty()).then(|| RunLocation {
                path,
                text: text.to_string(),
            })
        })
        .collect()
}
