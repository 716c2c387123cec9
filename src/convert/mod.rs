//! Extension-dispatched document conversion.
//!
//! Each converter turns one source format into a [`UnifiedDocument`] and
//! renders it as JSON or plain text. The registry picks a converter from the
//! file extension, or from the detected format for raw bytes, and rejects
//! anything it has no converter for. The crate's `parse_*` entry points
//! dispatch through [`ConverterRegistry::with_defaults`].
//!
//! # Example
//!
//! ```no_run
//! use docunify::convert::{ConvertOptions, ConverterRegistry};
//! use std::path::Path;
//!
//! fn main() -> docunify::Result<()> {
//!     let registry = ConverterRegistry::with_defaults();
//!     let result = registry.convert(Path::new("report.docx"), &ConvertOptions::default())?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

mod docx;
mod pdf;

pub use docx::DocxConverter;
pub use pdf::PdfConverter;

use crate::detect::detect_source_type;
use crate::error::{Error, Result};
use crate::model::UnifiedDocument;
use crate::parser::ParseOptions;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Parser options
    pub parse: ParseOptions,

    /// Output format
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            output_format: OutputFormat::default(),
            pretty: true,
        }
    }
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parser options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Emit compact JSON.
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

/// Output format for conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The unified document as JSON
    #[default]
    Json,

    /// The document's full text
    Text,
}

/// Result of document conversion.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Rendered content
    pub content: String,

    /// The parsed document
    pub document: UnifiedDocument,

    /// MIME type of the content
    pub mime_type: &'static str,
}

impl ConvertResult {
    /// Render a parsed document.
    pub fn render(document: UnifiedDocument, options: &ConvertOptions) -> Result<Self> {
        let (content, mime_type) = match options.output_format {
            OutputFormat::Json => (document.to_json(options.pretty)?, "application/json"),
            OutputFormat::Text => (document.text.full_text.clone(), "text/plain"),
        };
        Ok(Self {
            content,
            document,
            mime_type,
        })
    }

    /// Get content length in bytes.
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

/// Trait for document converters.
///
/// Implement this trait to add support for a new document format.
pub trait DocumentConverter: Send + Sync {
    /// Get the supported file extensions for this converter.
    ///
    /// Extensions should be lowercase without the leading dot (e.g., `["pdf"]`).
    fn supported_extensions(&self) -> &[&str];

    /// Get the name of this converter.
    fn name(&self) -> &str;

    /// Parse bytes into a unified document.
    fn parse_bytes(&self, bytes: &[u8], options: &ParseOptions) -> Result<UnifiedDocument>;

    /// Convert from bytes.
    fn convert_bytes(&self, bytes: &[u8], options: &ConvertOptions) -> Result<ConvertResult> {
        let document = self.parse_bytes(bytes, &options.parse)?;
        ConvertResult::render(document, options)
    }

    /// Convert a file at the given path.
    fn convert(&self, path: &Path, options: &ConvertOptions) -> Result<ConvertResult> {
        let bytes = std::fs::read(path)?;
        self.convert_bytes(&bytes, options)
    }

    /// Check if this converter supports the given extension.
    fn supports_extension(&self, ext: &str) -> bool {
        let ext_lower = ext.to_lowercase();
        self.supported_extensions().iter().any(|e| *e == ext_lower)
    }
}

/// Registry for document converters.
///
/// The registry maps file extensions to converters and provides
/// convenient methods for converting documents.
pub struct ConverterRegistry {
    converters: HashMap<String, Arc<dyn DocumentConverter>>,
    by_name: HashMap<String, Arc<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with the DOCX and PDF converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocxConverter::new()));
        registry.register(Arc::new(PdfConverter::new()));
        registry
    }

    /// Register a converter.
    ///
    /// The converter will be registered for all its supported extensions.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>) {
        for ext in converter.supported_extensions() {
            self.converters
                .insert(ext.to_lowercase(), converter.clone());
        }
        self.by_name
            .insert(converter.name().to_lowercase(), converter);
    }

    /// Get a converter by file extension.
    pub fn get_by_extension(&self, ext: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.converters.get(&ext.to_lowercase()).cloned()
    }

    /// Get a converter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if an extension is supported.
    pub fn supports(&self, ext: &str) -> bool {
        self.converters.contains_key(&ext.to_lowercase())
    }

    /// Get all supported extensions, sorted.
    pub fn supported_extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.converters.keys().map(|s| s.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    fn require(&self, ext: &str) -> Result<Arc<dyn DocumentConverter>> {
        self.get_by_extension(ext)
            .ok_or_else(|| Error::UnsupportedFormat(ext.to_string()))
    }

    /// The converter for a path's extension, checked before any I/O.
    fn for_path(&self, path: &Path) -> Result<Arc<dyn DocumentConverter>> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))?;
        self.require(ext)
    }

    /// Parse a file with the converter registered for its extension.
    pub fn parse(&self, path: &Path, options: &ParseOptions) -> Result<UnifiedDocument> {
        let converter = self.for_path(path)?;
        log::debug!("Parsing {} with {}", path.display(), converter.name());
        let bytes = std::fs::read(path)?;
        converter.parse_bytes(&bytes, options)
    }

    /// Parse bytes with the converter named after their detected format.
    pub fn parse_detected(&self, bytes: &[u8], options: &ParseOptions) -> Result<UnifiedDocument> {
        let source_type = detect_source_type(bytes)?;
        self.get_by_name(source_type.as_str())
            .ok_or_else(|| Error::UnsupportedFormat(source_type.to_string()))?
            .parse_bytes(bytes, options)
    }

    /// Convert a file using the appropriate converter.
    pub fn convert(&self, path: &Path, options: &ConvertOptions) -> Result<ConvertResult> {
        self.for_path(path)?.convert(path, options)
    }

    /// Convert bytes using the specified extension to determine the converter.
    pub fn convert_bytes(
        &self,
        bytes: &[u8],
        ext: &str,
        options: &ConvertOptions,
    ) -> Result<ConvertResult> {
        self.require(ext)?.convert_bytes(bytes, options)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
