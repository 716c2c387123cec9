//! End-to-end DOCX parsing over generated packages.

mod common;

use common::{png_bytes, DocxBuilder};
use docunify::{
    parse_bytes, parse_docx, DocxParser, Error, ParseOptions, SourceType, IMAGE_MARKER,
    TABLE_MARKER,
};

fn thesis() -> DocxBuilder {
    DocxBuilder::new()
        .core("Field Survey", "Jane Roe", "2024-03-01T10:00:00Z")
        .heading(1, "Introduction")
        .paragraph("This study surveys three river basins.")
        .image("rId5")
        .paragraph("Figure 1: Basin overview")
        .heading(2, "Data")
        .paragraph("Table 1: Sample sizes")
        .table(&[&["Basin", "Samples"], &["North", "12"], &["South", "9"]])
        .heading(1, "Conclusion")
        .paragraph("The basins differ in sediment load.")
        .media("rId5", "image1.png", png_bytes(4, 3))
}

#[test]
fn test_stream_keeps_reading_order() {
    let doc = parse_docx(&thesis().build()).unwrap();

    assert_eq!(doc.source_type, SourceType::Docx);
    assert_eq!(
        doc.paragraphs(),
        &[
            "Introduction",
            "This study surveys three river basins.",
            IMAGE_MARKER,
            "Figure 1: Basin overview",
            "Data",
            "Table 1: Sample sizes",
            TABLE_MARKER,
            "Conclusion",
            "The basins differ in sediment load.",
        ]
    );
    assert_eq!(doc.text.full_text, doc.paragraphs().join("\n"));
    assert!(doc.text.pages.is_none());
}

#[test]
fn test_outline_from_heading_styles() {
    let doc = parse_docx(&thesis().build()).unwrap();

    assert_eq!(doc.sections.len(), 2);
    let intro = &doc.sections[0];
    assert_eq!(intro.title, "Introduction");
    assert_eq!(intro.level, 1);
    assert_eq!(
        intro.paragraphs,
        vec!["This study surveys three river basins.", "Figure 1: Basin overview"]
    );
    assert_eq!(intro.children.len(), 1);
    assert_eq!(intro.children[0].title, "Data");
    assert_eq!(intro.children[0].level, 2);
    assert_eq!(intro.children[0].paragraphs, vec!["Table 1: Sample sizes"]);

    assert_eq!(doc.sections[1].title, "Conclusion");
    assert!(doc.sections.iter().all(|s| s.is_well_nested()));
}

#[test]
fn test_tables_and_extras() {
    let doc = parse_docx(&thesis().build()).unwrap();

    assert_eq!(doc.tables.len(), 1);
    let table = &doc.tables[0];
    assert_eq!(table.id, "table-1");
    assert_eq!(table.row_count, 3);
    assert_eq!(table.column_count, 2);
    assert_eq!(table.cell(1, 0), Some("North"));
    assert_eq!(table.page_number, None);

    assert_eq!(doc.extras.paragraph_count, Some(8));
    assert_eq!(doc.extras.section_count, Some(2));
    assert_eq!(doc.extras.table_count, 1);
    assert_eq!(doc.extras.image_count, 1);
    assert_eq!(doc.extras.page_count, None);
}

#[test]
fn test_images_by_relationship() {
    let doc = parse_docx(&thesis().build()).unwrap();

    let image = doc.image("docx-image-rId5").unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!((image.width, image.height), (4, 3));
    assert_eq!(image.payload_bytes().unwrap(), png_bytes(4, 3));
    assert_eq!(image.metadata["relationship_id"], "rId5");
    assert_eq!(image.metadata["target"], "word/media/image1.png");
    assert_eq!(image.metadata["stream_index"], 2);
}

#[test]
fn test_images_without_payload() {
    let options = ParseOptions::new().without_image_data();
    let doc = DocxParser::with_options(options).parse(&thesis().build()).unwrap();

    let image = &doc.images[0];
    assert!(image.data.is_none());
    assert_eq!(image.width, 4);

    let doc = DocxParser::with_options(ParseOptions::new().with_images(false))
        .parse(&thesis().build())
        .unwrap();
    assert!(doc.images.is_empty());
    // The marker is positional and does not depend on extraction.
    assert!(doc.paragraphs().iter().any(|p| p == IMAGE_MARKER));
}

#[test]
fn test_undecodable_image_is_placeholder() {
    let bytes = DocxBuilder::new()
        .image("rId7")
        .paragraph("Figure 1: Broken")
        .media("rId7", "broken.png", b"not really a png".to_vec())
        .build();
    let doc = parse_docx(&bytes).unwrap();

    let image = &doc.images[0];
    assert_eq!(image.identifier, "docx-image-rId7");
    assert!(!image.is_decoded());
    assert_eq!((image.width, image.height), (0, 0));
    assert_eq!(image.metadata["size_bytes"], 16);
}

#[test]
fn test_core_properties() {
    let doc = parse_docx(&thesis().build()).unwrap();

    assert_eq!(doc.metadata.get_str("title"), Some("Field Survey"));
    assert_eq!(doc.metadata.get_str("author"), Some("Jane Roe"));
    assert_eq!(doc.metadata.get_str("created"), Some("2024-03-01T10:00:00Z"));
    assert!(!doc.metadata.contains_key("modified"));
}

#[test]
fn test_document_without_headings() {
    let bytes = DocxBuilder::new()
        .paragraph("Just a note.")
        .paragraph("   ")
        .paragraph("Another note.")
        .build();
    let doc = parse_docx(&bytes).unwrap();

    assert!(doc.sections.is_empty());
    assert_eq!(doc.paragraphs(), &["Just a note.", "Another note."]);
    assert!(doc.metadata.is_empty());
}

#[test]
fn test_detected_by_magic_bytes() {
    let doc = parse_bytes(&thesis().build()).unwrap();
    assert_eq!(doc.source_type, SourceType::Docx);
}

#[test]
fn test_zip_without_main_part() {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"hello").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    assert!(matches!(parse_docx(&bytes), Err(Error::InvalidDocx(_))));
}

fn utf16le(xml: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
    bytes
}

#[test]
fn test_utf16_styles_part() {
    let styles = concat!(
        r#"<?xml version="1.0" encoding="UTF-16" standalone="yes"?>"#,
        r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:style w:type="paragraph" w:styleId="Titre1"><w:name w:val="heading 1"/></w:style>"#,
        r#"</w:styles>"#
    );
    let bytes = DocxBuilder::new()
        .styled("Titre1", "Chapitre un")
        .paragraph("Texte du chapitre.")
        .override_part("word/styles.xml", utf16le(styles))
        .build();

    let doc = DocxParser::with_options(ParseOptions::new().strict())
        .parse(&bytes)
        .unwrap();
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].title, "Chapitre un");
    assert_eq!(doc.sections[0].level, 1);
    assert_eq!(doc.sections[0].paragraphs, vec!["Texte du chapitre."]);
}

#[test]
fn test_unreadable_styles_part() {
    let bytes = DocxBuilder::new()
        .heading(1, "Scope")
        .styled("Titre2", "Not a heading without styles")
        .paragraph("Body text.")
        .override_part("word/styles.xml", vec![0x3C, 0xC3, 0x28, 0x3E])
        .build();

    // Lenient: style ids are used as names, the rest of the document survives.
    let doc = parse_docx(&bytes).unwrap();
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].title, "Scope");
    assert_eq!(
        doc.paragraphs(),
        &["Scope", "Not a heading without styles", "Body text."]
    );

    let strict = DocxParser::with_options(ParseOptions::new().strict()).parse(&bytes);
    assert!(matches!(strict, Err(Error::InvalidDocx(_))));
}

#[test]
fn test_malformed_relationships_part() {
    let bytes = DocxBuilder::new()
        .core("Audit", "Sam Lee", "2024-02-02T00:00:00Z")
        .heading(1, "Findings")
        .image("rId5")
        .paragraph("Figure 1: Plant layout")
        .media("rId5", "layout.png", png_bytes(2, 2))
        .override_part(
            "word/_rels/document.xml.rels",
            b"<Relationships><Relationship Id=\"rId5\"/></Other>".to_vec(),
        )
        .build();

    let doc = parse_docx(&bytes).unwrap();
    assert!(doc.images.is_empty());
    assert_eq!(doc.paragraphs(), &["Findings", IMAGE_MARKER, "Figure 1: Plant layout"]);
    assert_eq!(doc.metadata.get_str("author"), Some("Sam Lee"));

    let strict = DocxParser::with_options(ParseOptions::new().strict()).parse(&bytes);
    assert!(matches!(strict, Err(Error::Xml(_))));
}
