//! PDF document converter implementation.

use crate::error::Result;
use crate::model::UnifiedDocument;
use crate::parser::{ParseOptions, PdfParser};

use super::DocumentConverter;

/// PDF document converter.
#[derive(Debug, Clone, Default)]
pub struct PdfConverter {
    _private: (),
}

impl PdfConverter {
    /// Create a new PDF converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for PdfConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    fn name(&self) -> &str {
        "pdf"
    }

    fn parse_bytes(&self, bytes: &[u8], options: &ParseOptions) -> Result<UnifiedDocument> {
        PdfParser::from_bytes_with_options(bytes, options.clone())?.parse()
    }
}
