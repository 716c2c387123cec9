//! Format-specific parsers that populate the unified document model.
//!
//! [`DocxParser`] walks the OOXML body in document order. [`PdfParser`]
//! rebuilds words, lines and a heading outline from glyph geometry read
//! through a [`PdfBackend`].

mod backend;
mod docx_parser;
mod layout;
mod options;
mod pdf_images;
mod pdf_parser;
mod sections;
mod table_detector;
mod word_grouping;

pub use backend::{
    BackendFontInfo, BackendImage, ContentOp, LopdfBackend, LopdfTextDecoder, PageId, PdfBackend,
    PdfValue, TextDecoder,
};
pub use docx_parser::DocxParser;
pub use layout::{GeometryExtractor, PageGeometry, WordToken, XObjectPlacement};
pub use options::{ErrorMode, HeadingPolicy, ParseOptions, WordGroupingConfig};
pub use pdf_images::NormalizedImage;
pub use pdf_parser::PdfParser;
pub use sections::{HeadingInference, LineRole};
pub use table_detector::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
pub use word_grouping::{TextLine, WordGrouper};
