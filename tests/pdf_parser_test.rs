//! End-to-end PDF parsing over generated documents.

mod common;

use common::{prose, PdfBuilder, PdfPage};
use docunify::{parse_bytes, parse_pdf, Error, ParseOptions, PdfParser, SourceType};

fn survey() -> Vec<u8> {
    let first = PdfPage::new()
        .text(72.0, 720.0, 24.0, "Annual Survey Report")
        .text(72.0, 680.0, 16.0, "Introduction");
    let first = prose(
        first,
        650.0,
        &[
            "Rivers carry sediment from upland areas.",
            "Sampling took place during spring and autumn.",
            "Each site was visited twice.",
        ],
    );

    let second = PdfPage::new()
        .text(72.0, 720.0, 18.0, "Results")
        .text(72.0, 690.0, 12.0, "Table 1: Site counts")
        .text(72.0, 670.0, 12.0, "Site")
        .text(300.0, 670.0, 12.0, "Visits")
        .text(72.0, 654.0, 12.0, "Upper")
        .text(300.0, 654.0, 12.0, "4")
        .text(72.0, 638.0, 12.0, "Lower")
        .text(300.0, 638.0, 12.0, "6")
        .text(72.0, 610.0, 12.0, "Counts were stable across seasons.")
        .image(72.0, 450.0, 200.0, 120.0)
        .text(72.0, 430.0, 12.0, "Figure 1: Sampling map");

    PdfBuilder::new()
        .title("Annual Survey")
        .author("Field Team")
        .created("D:20240115093000+02'00'")
        .page(first)
        .page(second)
        .build()
}

#[test]
fn test_pages_and_lines() {
    let doc = parse_pdf(&survey(), false).unwrap();

    assert_eq!(doc.source_type, SourceType::Pdf);
    let pages = doc.pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 1);
    assert_eq!(pages[1].page_number, 2);

    let first: Vec<&str> = pages[0].text.lines().collect();
    assert_eq!(
        first,
        vec![
            "Annual Survey Report",
            "Introduction",
            "Rivers carry sediment from upland areas.",
            "Sampling took place during spring and autumn.",
            "Each site was visited twice.",
        ]
    );
    assert!(pages[1].text.contains("Site Visits"));
    assert!(pages[1].text.ends_with("Figure 1: Sampling map"));

    assert!(doc.text.paragraphs.is_none());
    assert_eq!(
        doc.text.full_text,
        format!("{}\n\n{}", pages[0].text, pages[1].text)
    );
}

#[test]
fn test_layout_records_fonts() {
    let doc = parse_pdf(&survey(), false).unwrap();
    let layout = &doc.pages()[0].layout;

    assert_eq!(layout.font.as_deref(), Some("Helvetica"));
    assert!(layout.fonts.is_none());
    assert_eq!(layout.order, vec!["Helvetica"]);
    let words = &layout.words["Helvetica"];
    assert!(words.text.iter().any(|w| w == "Introduction"));

    let mut sizes = layout.all_sizes();
    sizes.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(sizes, vec![12.0, 16.0, 24.0]);
}

#[test]
fn test_outline_from_font_sizes() {
    let doc = parse_pdf(&survey(), false).unwrap();

    assert_eq!(doc.sections.len(), 2);
    let report = &doc.sections[0];
    assert_eq!(report.title, "Annual Survey Report");
    assert_eq!(report.level, 1);
    assert_eq!(report.children.len(), 1);

    let intro = &report.children[0];
    assert_eq!(intro.title, "Introduction");
    assert_eq!(intro.level, 2);
    assert_eq!(intro.paragraphs.len(), 3);

    let results = &doc.sections[1];
    assert_eq!(results.title, "Results");
    assert!(results
        .paragraphs
        .iter()
        .any(|p| p == "Counts were stable across seasons."));
}

#[test]
fn test_aligned_rows_become_a_table() {
    let doc = parse_pdf(&survey(), false).unwrap();

    assert_eq!(doc.tables.len(), 1);
    let table = &doc.tables[0];
    assert_eq!(table.id, "pdf-table-2-1");
    assert_eq!(table.page_number, Some(2));
    assert_eq!(
        table.data,
        vec![
            vec!["Site".to_string(), "Visits".to_string()],
            vec!["Upper".to_string(), "4".to_string()],
            vec!["Lower".to_string(), "6".to_string()],
        ]
    );

    let options = ParseOptions::new().with_tables(false);
    let doc = PdfParser::from_bytes_with_options(&survey(), options)
        .unwrap()
        .parse()
        .unwrap();
    assert!(doc.tables.is_empty());
}

#[test]
fn test_image_xobject_to_png() {
    let doc = parse_pdf(&survey(), false).unwrap();

    assert_eq!(doc.images.len(), 1);
    let image = &doc.images[0];
    assert_eq!(image.identifier, "pdf-image-2-1");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(image.metadata["page"], 2);

    let png = image.payload_bytes().unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn test_metadata_and_extras() {
    let doc = parse_pdf(&survey(), true).unwrap();

    assert_eq!(doc.metadata.get_str("title"), Some("Annual Survey"));
    assert_eq!(doc.metadata.get_str("author"), Some("Field Team"));
    assert_eq!(doc.metadata.get_str("created"), Some("2024-01-15T07:30:00Z"));
    assert_eq!(doc.metadata.get("page_count").unwrap(), 2);
    assert_eq!(doc.metadata.get("has_text_content").unwrap(), true);
    assert_eq!(
        doc.metadata.get("page_dimensions").unwrap()[0]["width"],
        612.0
    );

    assert_eq!(doc.extras.page_count, Some(2));
    assert_eq!(doc.extras.ocr_applied, Some(false));
    assert_eq!(doc.extras.table_count, 1);
    assert_eq!(doc.extras.image_count, 1);
    assert_eq!(doc.extras.paragraph_count, None);
}

#[test]
fn test_blank_page_has_no_text() {
    let bytes = PdfBuilder::new().page(PdfPage::new()).build();
    let doc = parse_bytes(&bytes).unwrap();

    assert_eq!(doc.pages().len(), 1);
    assert!(doc.pages()[0].text.is_empty());
    assert!(doc.sections.is_empty());
    assert_eq!(doc.metadata.get("has_text_content").unwrap(), false);
    assert!(!doc.metadata.contains_key("title"));
}

#[test]
fn test_single_page_access() {
    let parser = PdfParser::from_bytes(&survey()).unwrap();
    assert_eq!(parser.page_count(), 2);

    let page = parser.page_text(1).unwrap();
    assert!(page.text.starts_with("Annual Survey Report"));

    assert!(matches!(
        parser.page_text(5),
        Err(Error::PageOutOfRange(5, 2))
    ));
}

#[test]
fn test_stream_lines_follow_pages() {
    let doc = parse_pdf(&survey(), false).unwrap();
    let lines = doc.stream_lines();

    assert_eq!(lines.first().map(String::as_str), Some("Annual Survey Report"));
    assert_eq!(lines.last().map(String::as_str), Some("Figure 1: Sampling map"));
    assert!(lines.iter().all(|l| !l.trim().is_empty()));
}

fn with_broken_first_page() -> Vec<u8> {
    let broken = PdfPage::new()
        .text(72.0, 720.0, 12.0, "Never read")
        .contents(lopdf::Object::Integer(7));
    let intact = PdfPage::new().text(72.0, 720.0, 22.0, "Findings");
    let intact = prose(
        intact,
        690.0,
        &[
            "Two pumps failed during the trial.",
            "Both were replaced within a week.",
            "No further faults were logged.",
            "The line ran at full capacity.",
        ],
    );
    PdfBuilder::new().page(broken).page(intact).build()
}

#[test]
fn test_broken_page_is_skipped() {
    let doc = parse_pdf(&with_broken_first_page(), false).unwrap();

    assert_eq!(doc.pages().len(), 2);
    assert!(doc.pages()[0].text.is_empty());
    assert!(doc.pages()[1].text.starts_with("Findings\nTwo pumps failed"));
    assert_eq!(doc.text.full_text, doc.pages()[1].text);
    assert_eq!(doc.metadata.get("page_count").unwrap(), 2);

    let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Findings"]);
}

#[test]
fn test_broken_page_fails_strict_parse() {
    let parser = PdfParser::from_bytes_with_options(
        &with_broken_first_page(),
        ParseOptions::new().strict(),
    )
    .unwrap();
    assert!(matches!(parser.parse(), Err(Error::TextExtract(_))));
}
