//! Domain types for the two sources: a workbook of cell grids and a slide
//! deck of text runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A workbook with its sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet to the workbook.
    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }
}

/// A single sheet: the used range as a grid of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// Sheet name as shown on its tab.
    pub name: String,

    /// 0-based absolute column of the first grid column.
    pub first_column: u32,

    /// Rows of the used range, top to bottom. Rows may be ragged.
    pub rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    /// Create an empty sheet starting at column A.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            first_column: 0,
            rows: Vec::new(),
        }
    }

    /// Set the absolute column of the first grid column.
    pub fn with_first_column(mut self, column: u32) -> Self {
        self.first_column = column;
        self
    }

    /// Append a row of cells.
    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    /// Number of columns in the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Get a cell by grid position.
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}

/// Strings that stand for a missing value, matching the default null
/// markers of pandas' readers.
pub const NA_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A scalar cell value as read from the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    /// Date/time already rendered by the backend.
    DateTime(String),
    /// Error value such as `#N/A`.
    Error(String),
}

impl CellValue {
    /// A text cell, or [`CellValue::Empty`] when `text` is one of the
    /// [`NA_MARKERS`].
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if NA_MARKERS.contains(&text.as_str()) {
            CellValue::Empty
        } else {
            CellValue::Text(text)
        }
    }

    /// Render the value as text, or `None` for empty and error cells.
    ///
    /// Numbers use the shortest representation that round-trips, so `10.0`
    /// renders as `"10"` and `3.5` as `"3.5"`. Booleans render as `True` and
    /// `False`.
    pub fn render(&self) -> Option<String> {
        match self {
            CellValue::Empty | CellValue::Error(_) => None,
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) if f.is_finite() => Some(f.to_string()),
            CellValue::Float(_) => None,
            CellValue::Text(s) if s.is_empty() => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bool(true) => Some("True".to_string()),
            CellValue::Bool(false) => Some("False".to_string()),
            CellValue::DateTime(s) => Some(s.clone()),
        }
    }

    /// Whether the cell holds no usable value.
    pub fn is_empty(&self) -> bool {
        self.render().is_none()
    }
}

/// A slide deck: document → slides → shapes → paragraphs → runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Create an empty deck.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slide to the deck.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Iterate over every run of every text-bearing shape, in document order.
    pub fn runs(&self) -> impl Iterator<Item = (RunPath, &Run)> + '_ {
        self.slides
            .iter()
            .enumerate()
            .flat_map(|(s, slide)| slide.runs().map(move |(path, run)| (path.on_slide(s), run)))
    }

    /// Mutable variant of [`Deck::runs`]. Only run text should be changed
    /// through it; the tree shape is fixed once read.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = (RunPath, &mut Run)> + '_ {
        self.slides.iter_mut().enumerate().flat_map(|(s, slide)| {
            slide
                .runs_mut()
                .map(move |(path, run)| (path.on_slide(s), run))
        })
    }

    /// Total number of runs in text-bearing shapes.
    pub fn run_count(&self) -> usize {
        self.runs().count()
    }
}

/// A single slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Shapes in z-order (document order).
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create an empty slide.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Runs of this slide. The returned paths have slide index 0.
    pub fn runs(&self) -> impl Iterator<Item = (RunPath, &Run)> + '_ {
        self.shapes.iter().enumerate().flat_map(|(sh, shape)| {
            shape.text_frame.iter().flat_map(move |frame| {
                frame.paragraphs.iter().enumerate().flat_map(move |(p, para)| {
                    para.runs
                        .iter()
                        .enumerate()
                        .map(move |(r, run)| (RunPath::new(0, sh, p, r), run))
                })
            })
        })
    }

    /// Mutable runs of this slide. The returned paths have slide index 0.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = (RunPath, &mut Run)> + '_ {
        self.shapes.iter_mut().enumerate().flat_map(|(sh, shape)| {
            shape.text_frame.iter_mut().flat_map(move |frame| {
                frame
                    .paragraphs
                    .iter_mut()
                    .enumerate()
                    .flat_map(move |(p, para)| {
                        para.runs
                            .iter_mut()
                            .enumerate()
                            .map(move |(r, run)| (RunPath::new(0, sh, p, r), run))
                    })
            })
        })
    }
}

/// A shape on a slide. Only shapes with a text frame carry runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Name from the shape's non-visual properties, if any.
    pub name: Option<String>,

    /// Text frame for text-bearing shapes.
    pub text_frame: Option<TextFrame>,
}

impl Shape {
    /// Create a shape without a text frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a text-bearing shape from its paragraphs.
    pub fn with_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        Self {
            name: None,
            text_frame: Some(TextFrame { paragraphs }),
        }
    }

    /// Whether the shape carries a text frame.
    pub fn has_text_frame(&self) -> bool {
        self.text_frame.is_some()
    }
}

/// The text body of a shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFrame {
    pub paragraphs: Vec<Paragraph>,
}

/// A paragraph: an ordered list of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Create a paragraph from run texts.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            runs: texts.into_iter().map(Run::new).collect(),
        }
    }
}

/// The smallest styled text fragment; the unit of update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
}

impl Run {
    /// Create a run with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Structural address of a run: slide, shape, paragraph and run indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunPath {
    pub slide: usize,
    pub shape: usize,
    pub paragraph: usize,
    pub run: usize,
}

impl RunPath {
    pub fn new(slide: usize, shape: usize, paragraph: usize, run: usize) -> Self {
        Self {
            slide,
            shape,
            paragraph,
            run,
        }
    }

    fn on_slide(self, slide: usize) -> Self {
        Self { slide, ..self }
    }
}

impl fmt::Display for RunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slide {} / shape {} / paragraph {} / run {}",
            self.slide, self.shape, self.paragraph, self.run
        )
    }
}
