//! Source format detection for DOCX and PDF inputs.

use crate::error::{Error, Result};
use crate::model::SourceType;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Local file header of a zip container (every DOCX package starts with it).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Detect the source format from the leading bytes of a file.
///
/// Only the container is checked here: a zip archive is assumed to be a
/// DOCX package and is fully validated by the DOCX parser.
///
/// # Example
/// ```
/// use docunify::detect::detect_source_type;
/// use docunify::SourceType;
///
/// assert_eq!(detect_source_type(b"%PDF-1.7\n").unwrap(), SourceType::Pdf);
/// ```
pub fn detect_source_type(data: &[u8]) -> Result<SourceType> {
    if is_pdf_bytes(data) {
        return Ok(SourceType::Pdf);
    }
    if is_docx_bytes(data) {
        return Ok(SourceType::Docx);
    }
    Err(Error::UnknownFormat)
}

/// Extract the PDF version from a header (e.g., "1.7" from "%PDF-1.7").
pub fn pdf_version(data: &[u8]) -> Result<String> {
    if data.len() < PDF_MAGIC_LEN + VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    if !data.starts_with(PDF_MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[PDF_MAGIC_LEN..PDF_MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::Corrupted(format!("bad header version {}", version)));
    }

    Ok(version)
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// Check if bytes start with a valid PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version(data).is_ok()
}

/// Check if bytes start with a zip local file header.
pub fn is_docx_bytes(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}
