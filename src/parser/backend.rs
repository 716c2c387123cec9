//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from the geometry reconstruction logic.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::model::PageDimensions;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Font information returned by the backend.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// Font resource name (key in the page's font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
    /// First character code covered by `widths`.
    pub first_char: u32,
    /// Glyph advance widths in 1/1000 text space units.
    pub widths: Vec<f32>,
}

impl BackendFontInfo {
    /// Advance width of a character code, in 1/1000 units.
    pub fn glyph_width(&self, code: u32) -> Option<f32> {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
    }
}

/// An image XObject available to a page.
#[derive(Debug, Clone)]
pub struct BackendImage {
    /// XObject resource name.
    pub name: String,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Bits per colour component.
    pub bits_per_component: u8,
    /// Colour components per pixel (1 = gray, 3 = RGB, 4 = CMYK), when known.
    pub components: Option<u8>,
    /// Image codec the data is still encoded with (e.g. `DCTDecode`);
    /// `None` when every filter has been undone.
    pub filter: Option<String>,
    /// Stream bytes with all general-purpose filters undone.
    pub data: Vec<u8>,
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// Decodes shown strings with the fonts of one page.
pub trait TextDecoder {
    /// Decode `bytes` shown with the font resource `font_name`.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode(&self, font_name: &[u8], bytes: &[u8]) -> String;
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, fonts, content stream
/// decoding, text decoding, page boxes, the info dictionary and image
/// XObjects without exposing any concrete PDF library types.
pub trait PdfBackend {
    /// Per-page text decoder.
    type Decoder<'a>: TextDecoder
    where
        Self: 'a;

    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return font info for a given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Resolve the encodings of a page's fonts once, for its content walk.
    fn text_decoder(&self, page: PageId) -> Self::Decoder<'_>;

    /// Page size from the (possibly inherited) MediaBox.
    fn page_dimensions(&self, page: PageId) -> PageDimensions;

    /// A text entry of the document information dictionary.
    fn info_string(&self, key: &[u8]) -> Option<String>;

    /// Image XObjects in the page's resources.
    fn page_images(&self, page: PageId) -> Result<Vec<BackendImage>>;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

// ---------------------------------------------------------------------------
// lopdf implementation
// ---------------------------------------------------------------------------

/// Filters that are image codecs; data encoded with them is kept as is.
const IMAGE_CODECS: &[&str] = &["DCTDecode", "JPXDecode", "CCITTFaxDecode", "JBIG2Decode"];

/// Font encodings of one page, borrowed from the document.
pub struct LopdfTextDecoder<'a> {
    encodings: HashMap<Vec<u8>, Encoding<'a>>,
}

impl TextDecoder for LopdfTextDecoder<'_> {
    fn decode(&self, font_name: &[u8], bytes: &[u8]) -> String {
        self.encodings
            .get(font_name)
            .and_then(|enc| LopdfDocument::decode_text(enc, bytes).ok())
            .unwrap_or_else(|| decode_text_simple(bytes))
    }
}

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Check if the document is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj) {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, following the Parent chain for inherited keys.
    fn inherited<'a>(&'a self, page: ObjectId, key: &[u8]) -> Option<&'a Object> {
        let mut current = self.doc.get_dictionary(page).ok()?;
        for _ in 0..32 {
            if let Ok(value) = current.get(key) {
                return Some(self.resolve(value));
            }
            let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn font_widths(&self, font: &Dictionary) -> (u32, Vec<f32>) {
        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.resolve(o).as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| get_number(self.resolve(w)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        (first_char, widths)
    }
}

impl PdfBackend for LopdfBackend {
    type Decoder<'a> = LopdfTextDecoder<'a>;

    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>> {
        let lopdf_fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut result = Vec::with_capacity(lopdf_fonts.len());
        for (name, font_dict) in &lopdf_fonts {
            let base_font = font_dict
                .get(b"BaseFont")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let (first_char, widths) = self.font_widths(font_dict);
            result.push(BackendFontInfo {
                name: name.clone(),
                base_font,
                first_char,
                widths,
            });
        }
        Ok(result)
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| Error::PdfParse(e.to_string()))?;

        let contents = match page_dict.get(b"Contents") {
            Ok(contents) => contents,
            // A page without a content stream is blank.
            Err(_) => return Ok(Vec::new()),
        };

        match self.resolve(contents) {
            // Unfiltered streams have nothing to decompress.
            Object::Stream(s) => Ok(s
                .decompressed_content()
                .unwrap_or_else(|_| s.content.clone())),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Stream(s) = self.resolve(obj) {
                        let data = s
                            .decompressed_content()
                            .unwrap_or_else(|_| s.content.clone());
                        content.extend_from_slice(&data);
                        content.push(b' ');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::PdfParse("Invalid content stream".to_string())),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn text_decoder(&self, page: PageId) -> LopdfTextDecoder<'_> {
        let encodings = self
            .doc
            .get_page_fonts(page)
            .map(|fonts| {
                fonts
                    .into_iter()
                    .filter_map(|(name, font)| {
                        font.get_font_encoding(&self.doc).ok().map(|enc| (name, enc))
                    })
                    .collect()
            })
            .unwrap_or_default();
        LopdfTextDecoder { encodings }
    }

    fn page_dimensions(&self, page: PageId) -> PageDimensions {
        let media_box = self
            .inherited(page, b"MediaBox")
            .and_then(|o| o.as_array().ok())
            .filter(|arr| arr.len() >= 4)
            .and_then(|arr| {
                let nums: Vec<f32> = arr
                    .iter()
                    .filter_map(|o| get_number(self.resolve(o)))
                    .collect();
                (nums.len() >= 4).then(|| PageDimensions {
                    width: (nums[2] - nums[0]).abs(),
                    height: (nums[3] - nums[1]).abs(),
                })
            });

        media_box.unwrap_or_else(PageDimensions::letter)
    }

    fn info_string(&self, key: &[u8]) -> Option<String> {
        let info = self.doc.trailer.get(b"Info").ok()?;
        let info = self.resolve_dict(info)?;
        get_string_from_dict(info, key)
    }

    fn page_images(&self, page: PageId) -> Result<Vec<BackendImage>> {
        let Some(resources) = self.inherited(page, b"Resources") else {
            return Ok(Vec::new());
        };
        let resources = match resources {
            Object::Dictionary(d) => d,
            _ => return Ok(Vec::new()),
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (name, obj) in xobjects.iter() {
            let Object::Stream(stream) = self.resolve(obj) else {
                continue;
            };
            let dict = &stream.dict;
            match dict.get(b"Subtype").and_then(|s| s.as_name()) {
                Ok(b"Image") => {}
                _ => continue,
            }

            let int = |key: &[u8]| {
                dict.get(key)
                    .ok()
                    .and_then(|o| self.resolve(o).as_i64().ok())
                    .unwrap_or(0)
            };

            let filters: Vec<String> = match dict.get(b"Filter").map(|f| self.resolve(f)) {
                Ok(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
                Ok(Object::Array(arr)) => arr
                    .iter()
                    .filter_map(|o| self.resolve(o).as_name().ok())
                    .map(|n| String::from_utf8_lossy(n).to_string())
                    .collect(),
                _ => Vec::new(),
            };

            let components = match dict.get(b"ColorSpace").map(|c| self.resolve(c)) {
                Ok(Object::Name(n)) => color_space_components(n),
                Ok(Object::Array(arr)) => arr
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(color_space_components),
                _ => None,
            };

            let name = String::from_utf8_lossy(name).to_string();
            let (data, filter) = match undo_filters(stream, &filters) {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::warn!("Image {}: cannot undo filters {:?}: {}", name, filters, e);
                    continue;
                }
            };

            images.push(BackendImage {
                name,
                width: int(b"Width").max(0) as u32,
                height: int(b"Height").max(0) as u32,
                bits_per_component: int(b"BitsPerComponent").clamp(0, 16) as u8,
                components,
                filter,
                data,
            });
        }
        Ok(images)
    }
}

/// Undo the general-purpose filters of an image stream.
///
/// Decoding stops at the first image codec, which is returned alongside
/// the data that is still encoded with it.
fn undo_filters(stream: &Stream, filters: &[String]) -> Result<(Vec<u8>, Option<String>)> {
    let split = filters
        .iter()
        .position(|f| IMAGE_CODECS.contains(&f.as_str()))
        .unwrap_or(filters.len());
    let codec = filters.get(split).cloned();
    if split == 0 {
        return Ok((stream.content.clone(), codec));
    }

    // lopdf refuses to decompress streams marked as images.
    let mut dict = stream.dict.clone();
    dict.remove(b"Subtype");
    let chain: Vec<Object> = filters[..split]
        .iter()
        .map(|f| Object::Name(f.as_bytes().to_vec()))
        .collect();
    dict.set("Filter", chain);

    let data = Stream::new(dict, stream.content.clone()).decompressed_content()?;
    Ok((data, codec))
}

fn color_space_components(name: &[u8]) -> Option<u8> {
    match name {
        b"DeviceGray" | b"CalGray" => Some(1),
        b"DeviceRGB" | b"CalRGB" => Some(3),
        b"DeviceCMYK" => Some(4),
        _ => None,
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text_simple(bytes)),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
    .map(|s| s.trim_end_matches('\0').trim().to_string())
    .filter(|s| !s.is_empty())
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}
