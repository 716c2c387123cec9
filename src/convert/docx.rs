//! DOCX document converter implementation.

use crate::error::Result;
use crate::model::UnifiedDocument;
use crate::parser::{DocxParser, ParseOptions};

use super::DocumentConverter;

/// DOCX document converter.
#[derive(Debug, Clone, Default)]
pub struct DocxConverter {
    _private: (),
}

impl DocxConverter {
    /// Create a new DOCX converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for DocxConverter {
    fn supported_extensions(&self) -> &[&str] {
        &["docx"]
    }

    fn name(&self) -> &str {
        "docx"
    }

    fn parse_bytes(&self, bytes: &[u8], options: &ParseOptions) -> Result<UnifiedDocument> {
        DocxParser::with_options(options.clone()).parse(bytes)
    }
}
