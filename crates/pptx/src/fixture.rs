//! In-memory PPTX packages for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const SLIDE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";

/// Wrap shape XML in a slide part.
pub fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
    )
}

/// A text box whose paragraphs hold the given run texts.
pub fn text_shape(id: u32, name: &str, paragraphs: &[&[&str]]) -> String {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<a:p>");
        for text in runs.iter() {
            body.push_str(&format!(
                r#"<a:r><a:rPr lang="en-US" b="1"/><a:t>{}</a:t></a:r>"#,
                quick_xml::escape::escape(text)
            ));
        }
        body.push_str(r#"<a:endParaRPr lang="en-US"/></a:p>"#);
    }
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#
    )
}

/// A picture shape, which carries no text frame.
pub fn picture(id: u32) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#
    )
}

/// Build a package with slides listed in the given order.
pub fn build_pptx(slides: &[String]) -> Vec<u8> {
    let order: Vec<usize> = (1..=slides.len()).collect();
    build_pptx_ordered(slides, &order)
}

/// Build a package whose `sldIdLst` lists `slideN.xml` files in `order`
/// (1-based part numbers). `slides[i]` is stored as `slide{i+1}.xml`.
pub fn build_pptx_ordered(slides: &[String], order: &[usize]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/>"#,
    );
    for n in 1..=slides.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        ));
    }
    content_types.push_str("</Types>");
    add(&mut zip, "[Content_Types].xml", &content_types, options);

    let mut ids = String::new();
    for (i, n) in order.iter().enumerate() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, n + 1));
    }
    add(
        &mut zip,
        "ppt/presentation.xml",
        &format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
        options,
    );

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>"#,
    );
    for n in 1..=slides.len() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{SLIDE_REL}" Target="slides/slide{n}.xml"/>"#,
            n + 1
        ));
    }
    rels.push_str("</Relationships>");
    add(&mut zip, "ppt/_rels/presentation.xml.rels", &rels, options);

    for (i, slide) in slides.iter().enumerate() {
        add(&mut zip, &format!("ppt/slides/slide{}.xml", i + 1), slide, options);
    }
    add(&mut zip, "docProps/app.xml", "<Properties/>", options);

    zip.finish().unwrap().into_inner()
}

fn add(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, content: &str, options: FileOptions) {
    zip.start_file(name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}
