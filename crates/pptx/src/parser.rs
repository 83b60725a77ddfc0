//! PPTX package parser implementation.

use crate::document::{PptxDocument, RunSlot, SlidePart, TextSpan};
use decksync_core::{Deck, Error, Paragraph, Result, Run, Shape, Slide, TextFrame};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Elements that are shapes when they appear directly in a shape tree.
const SHAPE_TAGS: &[&[u8]] = &[
    b"sp",
    b"pic",
    b"graphicFrame",
    b"grpSp",
    b"cxnSp",
    b"contentPart",
];

/// Parser for PPTX (Office Open XML) files.
#[derive(Debug, Clone, Default)]
pub struct PptxParser {
    /// Whether shapes nested in group shapes are visited.
    grouped_shapes: bool,
}

impl PptxParser {
    /// Create a parser that visits top-level shapes only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether shapes inside group shapes are read as shapes of their own.
    pub fn with_grouped_shapes(mut self, include: bool) -> Self {
        self.grouped_shapes = include;
        self
    }

    /// Read and parse the PPTX file at `path`.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<PptxDocument> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        log::debug!("Parsing {} ({} bytes)", path.display(), bytes.len());
        self.parse(bytes)
    }

    /// Parse a PPTX package held in memory.
    pub fn parse(&self, package: Vec<u8>) -> Result<PptxDocument> {
        check_magic(&package)?;

        let mut deck = Deck::new();
        let mut parts = Vec::new();
        {
            let mut archive = ZipArchive::new(Cursor::new(package.as_slice()))
                .map_err(|e| Error::Zip(format!("Failed to open ZIP: {}", e)))?;

            for path in self.get_slide_order(&mut archive)? {
                let xml = read_file_from_archive(&mut archive, &path)?;
                let (slide, runs) = self.parse_slide(&xml).map_err(|e| match e {
                    Error::Xml(msg) => Error::Xml(format!("{}: {}", path, msg)),
                    other => other,
                })?;
                log::debug!(
                    "{}: {} shapes, {} runs",
                    path,
                    slide.shapes.len(),
                    runs.len()
                );
                deck.add_slide(slide);
                parts.push(SlidePart { path, xml, runs });
            }
        }

        log::info!("Parsed {} slide(s)", deck.slides.len());
        Ok(PptxDocument::new(package, parts, deck))
    }

    /// Get the ordered list of slide part paths.
    ///
    /// The order comes from `p:sldIdLst` in the presentation part, resolved
    /// through its relationships. Packages without an id list fall back to
    /// the slide numbers in the part names.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels = read_file_from_archive(archive, PRESENTATION_RELS)?;
        let targets = parse_slide_relationships(&rels)?;

        let presentation = read_file_from_archive(archive, PRESENTATION_PART)?;
        let ids = parse_slide_id_list(&presentation)?;

        if ids.is_empty() {
            log::debug!("No slide id list, ordering slides by part name");
            let mut slides: Vec<(String, Option<usize>)> = targets
                .into_iter()
                .map(|(id, path)| {
                    let order = extract_slide_number(&path).or_else(|| extract_slide_number(&id));
                    (path, order)
                })
                .collect();
            slides.sort_by(|a, b| match (a.1, b.1) {
                (Some(na), Some(nb)) => na.cmp(&nb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.0.cmp(&b.0),
            });
            return Ok(slides.into_iter().map(|(path, _)| path).collect());
        }

        let mut order = Vec::with_capacity(ids.len());
        for id in ids {
            match targets.get(&id) {
                Some(path) => order.push(path.clone()),
                None => log::warn!("Slide id '{}' has no slide relationship, skipping", id),
            }
        }
        Ok(order)
    }

    /// Parse a slide part into its shape tree and the source location of
    /// every run's text.
    fn parse_slide(&self, xml: &str) -> Result<(Slide, Vec<RunSlot>)> {
        let mut reader = Reader::from_str(xml);
        let mut builder = SlideBuilder::new(xml, self.grouped_shapes);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => builder.start(e, reader.buffer_position(), false)?,
                Ok(Event::Empty(ref e)) => builder.start(e, reader.buffer_position(), true)?,
                Ok(Event::Text(ref e)) => {
                    if builder.in_text() {
                        let text = e.unescape().map_err(|err| Error::Xml(err.to_string()))?;
                        builder.push_text(&text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if builder.in_text() {
                        builder.push_text(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::End(ref e)) => builder.end(local_name(e.name().as_ref()), reader.buffer_position()),
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(builder.finish())
    }
}

/// A run whose `a:r` element is still open.
struct OpenRun {
    depth: usize,
    text: String,
    /// Start of the text content while inside `a:t`.
    text_start: Option<usize>,
    span: Option<TextSpan>,
}

/// Incremental state while walking one slide's XML events.
struct SlideBuilder<'x> {
    xml: &'x str,
    grouped_shapes: bool,
    slide: Slide,
    runs: Vec<RunSlot>,
    /// Local names of the open elements.
    stack: Vec<Vec<u8>>,
    /// Depth and index of the innermost open shape.
    shape: Option<(usize, usize)>,
    /// Depth of the open `p:txBody` of the current shape.
    text_body: Option<usize>,
    run: Option<OpenRun>,
}

impl<'x> SlideBuilder<'x> {
    fn new(xml: &'x str, grouped_shapes: bool) -> Self {
        Self {
            xml,
            grouped_shapes,
            slide: Slide::new(),
            runs: Vec::new(),
            stack: Vec::new(),
            shape: None,
            text_body: None,
            run: None,
        }
    }

    fn parent_is(&self, name: &[u8]) -> bool {
        self.stack.last().is_some_and(|p| p.as_slice() == name)
    }

    fn in_text(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.text_start.is_some())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    /// Handle a start tag, or a self-closing tag when `empty` is set.
    /// `end` is the byte offset just past the tag.
    fn start(&mut self, e: &BytesStart, end: usize, empty: bool) -> Result<()> {
        let qname = e.name();
        let name = local_name(qname.as_ref());
        let depth = self.stack.len();

        if SHAPE_TAGS.contains(&name)
            && (self.parent_is(b"spTree") || (self.grouped_shapes && self.parent_is(b"grpSp")))
        {
            self.slide.add_shape(Shape::new());
            if !empty {
                self.shape = Some((depth, self.slide.shapes.len() - 1));
            }
        } else if let Some((shape_depth, index)) = self.shape {
            match name {
                // p:sp > p:nvSpPr > p:cNvPr
                b"cNvPr" if depth == shape_depth + 2 => {
                    if let Some(shape_name) = attribute(e, b"name")? {
                        self.slide.shapes[index].name = Some(shape_name);
                    }
                }
                b"txBody" if depth == shape_depth + 1 && self.parent_is(b"sp") => {
                    self.slide.shapes[index].text_frame = Some(TextFrame::default());
                    if !empty {
                        self.text_body = Some(depth);
                    }
                }
                b"p" if depth > 0 && self.text_body == Some(depth - 1) => {
                    if let Some(frame) = self.slide.shapes[index].text_frame.as_mut() {
                        frame.paragraphs.push(Paragraph::default());
                    }
                }
                b"r" if depth > 1 && self.text_body == Some(depth - 2) && self.parent_is(b"p") => {
                    self.run = Some(OpenRun {
                        depth,
                        text: String::new(),
                        text_start: None,
                        span: None,
                    });
                    if empty {
                        self.close_run();
                    }
                }
                b"t" => {
                    let xml = self.xml;
                    if let Some(run) = self.run.as_mut().filter(|r| r.depth + 1 == depth) {
                        if empty {
                            let start = xml.get(..end).and_then(|s| s.rfind('<')).unwrap_or(end);
                            run.span = Some(TextSpan::Empty {
                                range: start..end,
                                qname: String::from_utf8_lossy(qname.as_ref()).into_owned(),
                            });
                        } else {
                            let start = xml.get(..end).and_then(|s| s.rfind('>')).map_or(end, |i| i + 1);
                            run.text_start = Some(start);
                        }
                    }
                }
                _ => {}
            }
        }

        if !empty {
            self.stack.push(name.to_vec());
        }
        Ok(())
    }

    /// Handle an end tag. `end` is the byte offset just past the tag.
    fn end(&mut self, name: &[u8], end: usize) {
        self.stack.pop();
        let depth = self.stack.len();

        match name {
            b"t" => {
                let xml = self.xml;
                if let Some(run) = self.run.as_mut().filter(|r| r.depth + 1 == depth) {
                    if let Some(start) = run.text_start.take() {
                        let close = xml.get(..end).and_then(|s| s.rfind("</")).unwrap_or(end);
                        run.span = Some(TextSpan::Content(start..close));
                    }
                }
            }
            b"r" if self.run.as_ref().is_some_and(|r| r.depth == depth) => self.close_run(),
            b"txBody" if self.text_body == Some(depth) => self.text_body = None,
            _ => {}
        }

        if self.shape.is_some_and(|(shape_depth, _)| shape_depth == depth) {
            self.shape = None;
            self.text_body = None;
        }
    }

    fn close_run(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let paragraph = self
            .shape
            .and_then(|(_, index)| self.slide.shapes[index].text_frame.as_mut())
            .and_then(|frame| frame.paragraphs.last_mut());

        if let Some(paragraph) = paragraph {
            paragraph.runs.push(Run::new(run.text.as_str()));
            self.runs.push(RunSlot {
                original: run.text,
                span: run.span,
            });
        }
    }

    fn finish(self) -> (Slide, Vec<RunSlot>) {
        (self.slide, self.runs)
    }
}

/// Reject packages that are not ZIP archives, naming legacy binary files.
fn check_magic(bytes: &[u8]) -> Result<()> {
    const ZIP_MAGIC: &[u8] = &[0x50, 0x4B, 0x03, 0x04];
    const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

    if bytes.starts_with(OLE_MAGIC) {
        return Err(Error::UnsupportedFormat(
            "legacy binary .ppt; save it as .pptx first".to_string(),
        ));
    }
    if !bytes.starts_with(ZIP_MAGIC) {
        return Err(Error::UnsupportedFormat(
            "not a PPTX package (missing ZIP signature)".to_string(),
        ));
    }
    Ok(())
}

/// Map relationship ids of slide relationships to their part paths.
fn parse_slide_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut slides = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let rel_type = attribute(e, b"Type")?.unwrap_or_default();
                let target = attribute(e, b"Target")?.unwrap_or_default();
                let id = attribute(e, b"Id")?.unwrap_or_default();

                if rel_type.ends_with("/slide") && !target.is_empty() {
                    slides.insert(id, resolve_target(&target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Relationship ids listed in `p:sldIdLst`, in presentation order.
fn parse_slide_id_list(xml: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    // r:id, not the numeric id attribute
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        let value = attr
                            .decode_and_unescape_value(&reader)
                            .map_err(|err| Error::Xml(err.to_string()))?;
                        ids.push(value.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Xml(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Resolve a relationship target relative to the `ppt/` folder.
fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Get the unescaped value of an attribute by its qualified name.
fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)
                .map_err(|err| Error::Xml(err.to_string()))?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|err| Error::Xml(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Read a file from the ZIP archive.
fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive.by_name(path).map_err(|e| match e {
        ZipError::FileNotFound => Error::MissingPart(path.to_string()),
        other => Error::Zip(format!("Failed to open '{}': {}", path, other)),
    })?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::Zip(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Extract a slide number from a string like "rId2" or "ppt/slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{build_pptx, build_pptx_ordered, picture, slide_xml, text_shape};

    fn texts(document: &PptxDocument) -> Vec<String> {
        document.deck().runs().map(|(_, r)| r.text.clone()).collect()
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("ppt/slides/slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("../ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
    }

    #[test]
    fn test_parse_tree() {
        let shapes = [
            text_shape(2, "Title 1", &[&["Quarterly ", "Results"]]),
            picture(3),
            text_shape(4, "Body", &[&["1,234"], &[]]),
        ]
        .concat();
        let document = PptxParser::new()
            .parse(build_pptx(&[slide_xml(&shapes)]))
            .unwrap();

        let slide = &document.deck().slides[0];
        assert_eq!(slide.shapes.len(), 3);
        assert_eq!(slide.shapes[0].name.as_deref(), Some("Title 1"));
        assert!(!slide.shapes[1].has_text_frame());
        assert_eq!(slide.shapes[1].name.as_deref(), Some("Picture 3"));
        let body = slide.shapes[2].text_frame.as_ref().unwrap();
        assert_eq!(body.paragraphs.len(), 2);
        assert!(body.paragraphs[1].runs.is_empty());
        assert_eq!(texts(&document), vec!["Quarterly ", "Results", "1,234"]);
    }

    #[test]
    fn test_unescapes_run_text() {
        let shapes = text_shape(2, "Body", &[&["R&D <net>"]]);
        let document = PptxParser::new()
            .parse(build_pptx(&[slide_xml(&shapes)]))
            .unwrap();

        assert_eq!(texts(&document), vec!["R&D <net>"]);
    }

    #[test]
    fn test_slide_order_follows_id_list() {
        let slides = [
            slide_xml(&text_shape(2, "A", &[&["first part"]])),
            slide_xml(&text_shape(2, "B", &[&["second part"]])),
        ];
        let document = PptxParser::new()
            .parse(build_pptx_ordered(&slides, &[2, 1]))
            .unwrap();

        assert_eq!(texts(&document), vec!["second part", "first part"]);
    }

    #[test]
    fn test_fields_and_breaks_are_not_runs() {
        let shapes = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Footer"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Page </a:t></a:r><a:br/><a:fld id="{1}" type="slidenum"><a:t>3</a:t></a:fld></a:p></p:txBody></p:sp>"#;
        let document = PptxParser::new()
            .parse(build_pptx(&[slide_xml(shapes)]))
            .unwrap();

        assert_eq!(texts(&document), vec!["Page "]);
    }

    #[test]
    fn test_table_cells_are_skipped() {
        let table = r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="5" name="Table 4"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tr h="0"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>99</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#;
        let document = PptxParser::new()
            .parse(build_pptx(&[slide_xml(table)]))
            .unwrap();

        let slide = &document.deck().slides[0];
        assert_eq!(slide.shapes.len(), 1);
        assert!(!slide.shapes[0].has_text_frame());
        assert_eq!(document.deck().run_count(), 0);
    }

    #[test]
    fn test_group_members_optional() {
        let group = format!(
            r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="10" name="Group 9"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:grpSp>{}"#,
            text_shape(11, "Inner", &[&["42"]]),
            text_shape(12, "Outer", &[&["7"]]),
        );
        let package = build_pptx(&[slide_xml(&group)]);

        let top_level = PptxParser::new().parse(package.clone()).unwrap();
        assert_eq!(top_level.deck().slides[0].shapes.len(), 2);
        assert_eq!(top_level.deck().slides[0].shapes[0].name.as_deref(), Some("Group 9"));
        assert_eq!(texts(&top_level), vec!["7"]);

        let grouped = PptxParser::new().with_grouped_shapes(true).parse(package).unwrap();
        let names: Vec<Option<&str>> = grouped.deck().slides[0]
            .shapes
            .iter()
            .map(|s| s.name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("Group 9"), Some("Inner"), Some("Outer")]);
        assert_eq!(texts(&grouped), vec!["42", "7"]);
    }

    #[test]
    fn test_rejects_non_zip() {
        let err = PptxParser::new().parse(b"plain text".to_vec()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let mut ole = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        ole.resize(512, 0);
        let err = PptxParser::new().parse(ole).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_slide_is_an_error() {
        let package = build_pptx(&["<p:sld><p:cSld></p:sld>".to_string()]);
        let err = PptxParser::new().parse(package).unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }
}
