//! PDF document parser.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::json;

use crate::error::{Error, Result};
use crate::model::{
    size_summary, FontWords, Metadata, PageDimensions, PageLayout, PageText, SourceType,
    TextPayload, UnifiedDocument,
};

use super::backend::{LopdfBackend, PageId, PdfBackend};
use super::layout::{GeometryExtractor, PageGeometry, WordToken};
use super::options::{ErrorMode, ParseOptions};
use super::pdf_images;
use super::sections::HeadingInference;
use super::table_detector::TableDetector;
use super::word_grouping::WordGrouper;

/// Font name used for tokens whose font could not be resolved.
const UNKNOWN_FONT: &str = "unknown";

/// PDF document parser.
pub struct PdfParser<B: PdfBackend = LopdfBackend> {
    backend: B,
    options: ParseOptions,
}

impl PdfParser<LopdfBackend> {
    /// Parse a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(data, ParseOptions::default())
    }

    /// Parse a PDF from bytes with custom options.
    pub fn from_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<Self> {
        let backend = LopdfBackend::load_bytes(data)?;
        if backend.is_encrypted() {
            log::warn!("PDF is encrypted; text extraction may be incomplete");
        }
        log::debug!("Loaded PDF {}", backend.version());
        Ok(Self::with_backend(backend, options))
    }
}

impl<B: PdfBackend> PdfParser<B> {
    /// Create a parser over any backend.
    pub fn with_backend(backend: B, options: ParseOptions) -> Self {
        Self { backend, options }
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.backend.pages().len() as u32
    }

    /// Parse the document into a unified document.
    pub fn parse(&self) -> Result<UnifiedDocument> {
        if self.options.enable_ocr {
            log::info!("OCR requested but not available; using the text layer only");
        }

        let grouper = WordGrouper::new(self.options.word_grouping);
        let detector = TableDetector::with_config(self.options.table_detector);
        let mut headings = HeadingInference::new(self.options.heading_policy);

        let page_ids = self.backend.pages();
        let mut pages = Vec::with_capacity(page_ids.len());
        let mut dimensions = Vec::with_capacity(page_ids.len());
        let mut tables = Vec::new();
        let mut images = Vec::new();

        for (&page_number, &page_id) in &page_ids {
            let dims = self.backend.page_dimensions(page_id);
            dimensions.push(json!({ "width": dims.width, "height": dims.height }));

            let geometry = self.page_geometry(page_number, page_id, dims)?;
            let lines = grouper.group_lines(&geometry.words);

            headings.feed_page(page_number, &geometry.words, &lines);

            if self.options.detect_tables {
                let words: Vec<WordToken> =
                    lines.iter().flat_map(|l| l.words.iter().cloned()).collect();
                tables.extend(detector.extract(page_number, &words));
            }

            if self.options.extract_images && !geometry.placements.is_empty() {
                match self.backend.page_images(page_id) {
                    Ok(available) => images.extend(pdf_images::page_images(
                        page_number,
                        &geometry.placements,
                        &available,
                        self.options.include_image_data,
                    )),
                    Err(e) => self.degrade(page_number, "images", e)?,
                }
            }

            let text = lines
                .iter()
                .map(|l| l.text())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");

            pages.push(PageText {
                page_number,
                text,
                layout: build_layout(&geometry.words, &grouper),
            });
        }

        let mut metadata = self.metadata();
        metadata.set("page_count", page_ids.len());
        metadata.set(
            "has_text_content",
            pages.iter().any(|p| !p.text.trim().is_empty()),
        );
        metadata.set("page_dimensions", dimensions);

        log::debug!(
            "Parsed PDF: {} pages, {} tables, {} images",
            pages.len(),
            tables.len(),
            images.len()
        );

        Ok(UnifiedDocument::new(
            SourceType::Pdf,
            metadata,
            headings.finish(),
            TextPayload::from_pages(pages),
            tables,
            images,
        ))
    }

    /// Extract a single page's text and layout.
    pub fn page_text(&self, page_number: u32) -> Result<PageText> {
        let pages = self.backend.pages();
        let page_id = *pages
            .get(&page_number)
            .ok_or(Error::PageOutOfRange(page_number, pages.len() as u32))?;

        let dims = self.backend.page_dimensions(page_id);
        let geometry = GeometryExtractor::new(&self.backend).extract_page(page_id, dims)?;
        let grouper = WordGrouper::new(self.options.word_grouping);
        let text = grouper
            .group_lines(&geometry.words)
            .iter()
            .map(|l| l.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(PageText {
            page_number,
            text,
            layout: build_layout(&geometry.words, &grouper),
        })
    }

    fn page_geometry(
        &self,
        page_number: u32,
        page_id: PageId,
        dims: PageDimensions,
    ) -> Result<PageGeometry> {
        match GeometryExtractor::new(&self.backend).extract_page(page_id, dims) {
            Ok(geometry) => Ok(geometry),
            Err(e) => {
                let e = Error::TextExtract(format!("Page {}: {}", page_number, e));
                self.degrade(page_number, "text", e)?;
                Ok(PageGeometry::default())
            }
        }
    }

    /// Propagate in strict mode, log and continue in lenient mode.
    fn degrade(&self, page_number: u32, what: &str, e: Error) -> Result<()> {
        if self.options.error_mode == ErrorMode::Strict {
            return Err(e);
        }
        log::warn!("Page {}: skipping {}: {}", page_number, what, e);
        Ok(())
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        for (key, pdf_key) in [
            ("author", &b"Author"[..]),
            ("creator", &b"Creator"[..]),
            ("producer", &b"Producer"[..]),
            ("subject", &b"Subject"[..]),
            ("title", &b"Title"[..]),
        ] {
            metadata.set_text(key, self.backend.info_string(pdf_key));
        }
        for (key, pdf_key) in [("created", &b"CreationDate"[..]), ("modified", &b"ModDate"[..])] {
            metadata.set_text(
                key,
                self.backend
                    .info_string(pdf_key)
                    .map(|raw| parse_pdf_date(&raw).unwrap_or(raw)),
            );
        }
        metadata
    }
}

/// Per-font word buckets and page-level font summary.
fn build_layout(words: &[WordToken], grouper: &WordGrouper) -> PageLayout {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, (Vec<&WordToken>, Vec<f32>)> = HashMap::new();

    for word in words {
        let font = if word.font.is_empty() {
            UNKNOWN_FONT.to_string()
        } else {
            word.font.clone()
        };
        let bucket = buckets.entry(font.clone()).or_insert_with(|| {
            order.push(font);
            (Vec::new(), Vec::new())
        });
        bucket.0.push(word);
        if word.font_size > 0.0 {
            bucket.1.push(word.font_size);
        }
    }

    let mut layout = PageLayout::default();
    for font in &order {
        let (segments, sizes) = &buckets[font];
        let (font_size, font_sizes) = size_summary(sizes);
        layout.words.insert(
            font.clone(),
            FontWords {
                text: grouper.segments_to_words(segments),
                font_size,
                font_sizes,
            },
        );
    }

    let fonts: BTreeSet<&str> = words
        .iter()
        .filter(|w| !w.font.is_empty())
        .map(|w| w.font.as_str())
        .collect();
    match fonts.len() {
        0 => {}
        1 => layout.font = fonts.into_iter().next().map(String::from),
        _ => layout.fonts = Some(fonts.into_iter().map(String::from).collect()),
    }

    let all_sizes: Vec<f32> = words.iter().map(|w| w.font_size).filter(|s| *s > 0.0).collect();
    let (font_size, font_sizes) = size_summary(&all_sizes);
    layout.font_size = font_size;
    layout.font_sizes = font_sizes;
    layout.order = order;
    layout
}

/// Convert a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`) to RFC 3339.
fn parse_pdf_date(s: &str) -> Option<String> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 || !s.is_char_boundary(4) {
        return None;
    }

    let field = |range: std::ops::Range<usize>, default: u32| -> u32 {
        s.get(range).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, field(4..6, 1), field(6..8, 1))?
        .and_hms_opt(field(8..10, 0), field(10..12, 0), field(12..14, 0))?;

    let offset_seconds = match s.get(14..15) {
        Some("+") | Some("-") => {
            let sign = if &s[14..15] == "-" { -1 } else { 1 };
            let tail: String = s[15..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tail.get(0..2).and_then(|v| v.parse().ok()).unwrap_or(0);
            let minutes: i32 = tail.get(2..4).and_then(|v| v.parse().ok()).unwrap_or(0);
            sign * (hours * 3600 + minutes * 60)
        }
        _ => 0,
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    let local: DateTime<FixedOffset> = offset.from_local_datetime(&naive).single()?;
    Some(
        local
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20240115103045").as_deref(),
            Some("2024-01-15T10:30:45Z")
        );
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        assert_eq!(
            parse_pdf_date("D:2024").as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_parse_pdf_date_with_offset() {
        assert_eq!(
            parse_pdf_date("D:20230601120000+02'00'").as_deref(),
            Some("2023-06-01T10:00:00Z")
        );
    }

    #[test]
    fn test_parse_pdf_date_rejects_garbage() {
        assert_eq!(parse_pdf_date("yesterday"), None);
    }

    #[test]
    fn test_build_layout_single_font() {
        let words = vec![
            WordToken::new("Hello", 0.0, 30.0, 10.0, 12.0).with_font("Helvetica"),
            WordToken::new("world", 35.0, 65.0, 10.0, 12.0).with_font("Helvetica"),
        ];
        let layout = build_layout(&words, &WordGrouper::default());
        assert_eq!(layout.font.as_deref(), Some("Helvetica"));
        assert_eq!(layout.font_size, Some(12.0));
        assert_eq!(layout.order, vec!["Helvetica"]);
        assert_eq!(layout.words["Helvetica"].text, vec!["Hello", "world"]);
    }

    #[test]
    fn test_build_layout_mixed_fonts() {
        let words = vec![
            WordToken::new("Title", 0.0, 50.0, 10.0, 20.0).with_font("Times-Bold"),
            WordToken::new("body", 0.0, 20.0, 40.0, 10.0).with_font("Helvetica"),
            WordToken::new("more", 25.0, 45.0, 40.0, 11.0).with_font("Helvetica"),
        ];
        let layout = build_layout(&words, &WordGrouper::default());
        assert_eq!(layout.order, vec!["Times-Bold", "Helvetica"]);
        assert_eq!(
            layout.fonts,
            Some(vec!["Helvetica".to_string(), "Times-Bold".to_string()])
        );
        assert_eq!(layout.font_sizes, Some(vec![10.0, 11.0, 20.0]));
        assert_eq!(layout.words["Helvetica"].font_sizes, Some(vec![10.0, 11.0]));
        assert_eq!(layout.words["Times-Bold"].font_size, Some(20.0));
    }
}
