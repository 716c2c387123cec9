//! Error types for docunify library.

use std::io;
use thiserror::Error;

/// Result type alias for docunify operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while unifying or auditing documents.
///
/// Variants fall into three groups. Package-level failures (`InvalidDocx`,
/// `PdfParse`, `Corrupted`, `Encrypted`, `UnknownFormat`) abort a parse with
/// no partial output. Asset-level failures (`ImageDecode`, `TextExtract`,
/// `TableExtract`) are produced by per-asset decode steps and are absorbed by
/// the parsers as placeholders or omissions. Input rejections
/// (`UnsupportedFormat`, `InvalidInput`) are raised before parsing starts.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The bytes are neither a DOCX package nor a PDF.
    #[error("Unknown file format: not a DOCX or PDF document")]
    UnknownFormat,

    /// The file extension or declared type is not supported.
    #[error("Unsupported file type: {0}. Only DOCX and PDF files are supported.")]
    UnsupportedFormat(String),

    /// The DOCX package could not be opened or its main part is unreadable.
    #[error("Invalid DOCX: {0}")]
    InvalidDocx(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF structure is corrupted or malformed.
    #[error("Corrupted PDF structure: {0}")]
    Corrupted(String),

    /// A single image could not be decoded.
    #[error("Image decoding error: {0}")]
    ImageDecode(String),

    /// Text could not be extracted from a page.
    #[error("Text extraction error: {0}")]
    TextExtract(String),

    /// Table extraction failed for a page.
    #[error("Table extraction error: {0}")]
    TableExtract(String),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// Malformed XML inside a DOCX part.
    #[error("XML error: {0}")]
    Xml(String),

    /// Error reading the DOCX zip container.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Error (de)serializing the unified document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller supplied an argument the operation cannot use.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error only affects a single asset (image, table, page).
    pub fn is_degraded_asset(&self) -> bool {
        matches!(
            self,
            Error::ImageDecode(_) | Error::TextExtract(_) | Error::TableExtract(_)
        )
    }

    /// Whether the error is a rejection of the caller's input.
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_) | Error::UnknownFormat | Error::InvalidInput(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageDecode(err.to_string())
    }
}
