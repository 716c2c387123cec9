//! Extracted raster assets.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// MIME type used when an image payload cannot be decoded.
pub const UNKNOWN_IMAGE_MIME: &str = "image/unknown";

/// One extracted image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentImage {
    /// Unique within a document (e.g., "docx-image-rId5", "pdf-image-2-1")
    #[serde(rename = "id", default)]
    pub identifier: String,

    /// MIME type (e.g., "image/png")
    #[serde(default = "unknown_mime")]
    pub mime_type: String,

    /// Width in pixels, 0 when undeterminable
    #[serde(default)]
    pub width: u32,

    /// Height in pixels, 0 when undeterminable
    #[serde(default)]
    pub height: u32,

    /// Base64-encoded payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Source details (relationship id, page, bbox, byte size, ...)
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

fn unknown_mime() -> String {
    UNKNOWN_IMAGE_MIME.to_string()
}

impl DocumentImage {
    /// Create an image record without payload.
    pub fn new(identifier: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            mime_type: mime_type.into(),
            width: 0,
            height: 0,
            data: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Create a record for an image whose bytes could not be decoded.
    pub fn placeholder(identifier: impl Into<String>) -> Self {
        Self::new(identifier, UNKNOWN_IMAGE_MIME)
    }

    /// Set pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Attach the raw payload, base64-encoded.
    pub fn with_payload(mut self, bytes: &[u8]) -> Self {
        self.data = Some(STANDARD.encode(bytes));
        self
    }

    /// Add a metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Decode the base64 payload back into bytes.
    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        self.data.as_ref().and_then(|d| STANDARD.decode(d).ok())
    }

    /// Whether the image format was recognized.
    pub fn is_decoded(&self) -> bool {
        self.mime_type != UNKNOWN_IMAGE_MIME
    }

    /// Get the file extension based on MIME type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/tiff" => "tiff",
            "image/bmp" => "bmp",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}
