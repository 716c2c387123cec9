//! # docunify
//!
//! Unified document model for DOCX and PDF files, with caption placement
//! and section completeness checks.
//!
//! Both formats are parsed into one [`UnifiedDocument`]: metadata, a heading
//! outline, tables, images, and a flat paragraph stream in which
//! `<<IMAGE>>` and `<<TABLE>>` markers stand in for assets at their
//! reading-order position. The verifiers work on that stream and outline
//! only, so they behave the same for either source format.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docunify::{parse_file, verify_figure_placement, validate_sections};
//!
//! fn main() -> docunify::Result<()> {
//!     let doc = parse_file("thesis.docx")?;
//!
//!     let figures = verify_figure_placement(&doc.stream_lines());
//!     println!("figures valid: {}", figures.all_valid);
//!
//!     let sections = validate_sections(&doc.sections, &["Introduction", "Conclusion"]);
//!     println!("completeness: {:.1}%", sections.completeness_score);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **DOCX**: heading styles, tables (merged and nested cells), images by
//!   relationship id, core properties
//! - **PDF**: word reconstruction from glyph geometry, font-size heading
//!   inference, alignment-based table detection, image XObjects as PNG
//! - **Auditing**: figure and table caption placement, required sections
//! - **Persistence**: lossless JSON round-trip of the unified document

pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod verify;

// Re-export commonly used types
pub use convert::{
    ConvertOptions, ConvertResult, ConverterRegistry, DocumentConverter, DocxConverter,
    OutputFormat, PdfConverter,
};
pub use detect::detect_source_type;
pub use error::{Error, Result};
pub use model::{
    DocumentImage, Extras, Metadata, PageText, SectionNode, SourceType, StreamEntry, TableRecord,
    TextPayload, UnifiedDocument, IMAGE_MARKER, TABLE_MARKER,
};
pub use parser::{DocxParser, ErrorMode, HeadingPolicy, ParseOptions, PdfParser};
pub use verify::{
    Placement, PlacementReport, PlacementVerifier, SectionReport, SectionValidator,
    SectionValidatorConfig,
};

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Parse a DOCX package from bytes.
///
/// # Example
///
/// ```no_run
/// let data = std::fs::read("report.docx").unwrap();
/// let doc = docunify::parse_docx(&data).unwrap();
/// println!("{} paragraphs", doc.paragraphs().len());
/// ```
pub fn parse_docx(data: &[u8]) -> Result<UnifiedDocument> {
    DocxParser::new().parse(data)
}

/// Parse a PDF from bytes.
///
/// `enable_ocr` is accepted for compatibility; only the text layer is read
/// and `extras.ocr_applied` is always `false`.
pub fn parse_pdf(data: &[u8], enable_ocr: bool) -> Result<UnifiedDocument> {
    let options = ParseOptions::new().with_ocr(enable_ocr);
    PdfParser::from_bytes_with_options(data, options)?.parse()
}

/// Parse bytes of either format, detected from the leading bytes.
pub fn parse_bytes(data: &[u8]) -> Result<UnifiedDocument> {
    parse_bytes_with_options(data, ParseOptions::default())
}

/// Parse bytes of either format with custom options.
pub fn parse_bytes_with_options(data: &[u8], options: ParseOptions) -> Result<UnifiedDocument> {
    ConverterRegistry::with_defaults().parse_detected(data, &options)
}

/// Parse a file, choosing the parser from its extension.
///
/// Only `.docx` and `.pdf` are accepted; other extensions are rejected with
/// [`Error::UnsupportedFormat`] before the file is read.
///
/// # Example
///
/// ```no_run
/// use docunify::parse_file;
///
/// let doc = parse_file("paper.pdf").unwrap();
/// println!("Pages: {:?}", doc.extras.page_count);
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<UnifiedDocument> {
    parse_file_with_options(path, ParseOptions::default())
}

/// Parse a file with custom options.
pub fn parse_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ParseOptions,
) -> Result<UnifiedDocument> {
    ConverterRegistry::with_defaults().parse(path.as_ref(), &options)
}

/// Parse from a seekable reader.
///
/// The reader is rewound before reading and rewound again afterwards, so
/// the same handle can be handed to another consumer.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
///
/// let mut file = File::open("report.docx").unwrap();
/// let doc = docunify::parse_reader(&mut file).unwrap();
/// ```
pub fn parse_reader<R: Read + Seek>(reader: &mut R) -> Result<UnifiedDocument> {
    reader.seek(SeekFrom::Start(0))?;
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    reader.seek(SeekFrom::Start(0))?;
    parse_bytes(&data)
}

/// Check that every table caption sits above its table.
pub fn verify_table_placement<S: AsRef<str>>(paragraphs: &[S]) -> PlacementReport {
    PlacementVerifier::tables().verify(paragraphs)
}

/// Check that every figure caption sits below its image.
pub fn verify_figure_placement<S: AsRef<str>>(paragraphs: &[S]) -> PlacementReport {
    PlacementVerifier::figures().verify(paragraphs)
}

/// Check a section outline against required section names.
///
/// An empty `required` list checks the default checklist.
pub fn validate_sections<S: AsRef<str>>(sections: &[SectionNode], required: &[S]) -> SectionReport {
    validator_for(required).validate(sections)
}

/// Like [`validate_sections`], but falls back to header-like paragraph
/// lines when the outline has no titles.
pub fn validate_sections_with_fallback<P, S>(
    sections: &[SectionNode],
    paragraphs: &[P],
    required: &[S],
) -> SectionReport
where
    P: AsRef<str>,
    S: AsRef<str>,
{
    validator_for(required).validate_with_fallback(sections, paragraphs)
}

fn validator_for<S: AsRef<str>>(required: &[S]) -> SectionValidator {
    SectionValidator::with_required(required.iter().map(|s| s.as_ref().to_string()))
}

/// Builder for parsing documents of either format.
///
/// # Example
///
/// ```no_run
/// use docunify::Docunify;
///
/// let doc = Docunify::new()
///     .strict()
///     .without_image_data()
///     .parse("report.docx")?;
/// # Ok::<(), docunify::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Docunify {
    parse_options: ParseOptions,
}

impl Docunify {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Degrade failed pages and assets (default).
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Propagate per-page and per-part failures.
    pub fn strict(mut self) -> Self {
        self.parse_options = self.parse_options.strict();
        self
    }

    /// Enable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.parse_options = self.parse_options.with_images(extract);
        self
    }

    /// Keep image records without base64 payloads.
    pub fn without_image_data(mut self) -> Self {
        self.parse_options = self.parse_options.without_image_data();
        self
    }

    /// Enable PDF table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.parse_options = self.parse_options.with_tables(detect);
        self
    }

    /// Current parse options.
    pub fn options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// Parse a file.
    pub fn parse<P: AsRef<Path>>(self, path: P) -> Result<UnifiedDocument> {
        parse_file_with_options(path, self.parse_options)
    }

    /// Parse bytes of either format.
    pub fn parse_bytes(self, data: &[u8]) -> Result<UnifiedDocument> {
        parse_bytes_with_options(data, self.parse_options)
    }
}
