//! Glyph geometry reconstruction for PDF pages.
//!
//! Walks a page's content stream tracking the graphics and text state and
//! emits positioned word tokens (text, horizontal extent, top/bottom in a
//! top-left origin, font name and effective size) plus the placement of
//! every `Do`-painted XObject. Tokens break on whitespace, on large `TJ`
//! adjustments, and at the end of each show operation; backends that paint
//! one glyph per operation therefore yield single-character tokens, which
//! the word grouping pass reassembles.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::PageDimensions;

use super::backend::{
    get_number_from_value, BackendFontInfo, ContentOp, PageId, PdfBackend, PdfValue, TextDecoder,
};

/// Fraction of the font size above the baseline treated as the glyph top.
const ASCENT: f32 = 0.8;

/// Fraction of the font size below the baseline treated as the glyph bottom.
const DESCENT: f32 = 0.2;

/// Glyph width, in 1/1000 em, used when the font carries no widths.
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// A `TJ` adjustment (1/1000 em) beyond which a word break is assumed.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A positioned text token.
#[derive(Debug, Clone, PartialEq)]
pub struct WordToken {
    /// The token text (no whitespace)
    pub text: String,
    /// Left edge
    pub x0: f32,
    /// Right edge
    pub x1: f32,
    /// Top edge, measured down from the top of the page
    pub top: f32,
    /// Bottom edge, measured down from the top of the page
    pub bottom: f32,
    /// Base font name
    pub font: String,
    /// Effective font size in points
    pub font_size: f32,
}

impl WordToken {
    /// Create a token from its horizontal extent and top edge.
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom: top + font_size,
            font: String::new(),
            font_size,
        }
    }

    /// Set the font name.
    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = font.into();
        self
    }

    /// Token width.
    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }
}

/// Where an XObject was painted on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct XObjectPlacement {
    /// XObject resource name
    pub name: String,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl XObjectPlacement {
    /// Painted area in square points.
    pub fn area(&self) -> f32 {
        (self.x1 - self.x0).abs() * (self.bottom - self.top).abs()
    }
}

/// Reconstructed geometry of one page.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    pub words: Vec<WordToken>,
    pub placements: Vec<XObjectPlacement>,
}

/// Affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_operands(ops: &[PdfValue]) -> Option<Self> {
        if ops.len() < 6 {
            return None;
        }
        let n: Vec<f32> = ops[..6]
            .iter()
            .map(|v| get_number_from_value(v).unwrap_or(0.0))
            .collect();
        Some(Matrix {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    fn vertical_scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    font_resource: Vec<u8>,
    font_size: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            font_resource: Vec::new(),
            font_size: 12.0,
        }
    }
}

/// A word being accumulated glyph by glyph.
#[derive(Debug)]
struct PendingWord {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

/// Reconstructs page geometry from a [`PdfBackend`].
pub struct GeometryExtractor<'a, B: PdfBackend> {
    backend: &'a B,
}

impl<'a, B: PdfBackend> GeometryExtractor<'a, B> {
    /// Create an extractor over a backend.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Extract positioned words and XObject placements from a page.
    pub fn extract_page(&self, page: PageId, dims: PageDimensions) -> Result<PageGeometry> {
        let fonts: HashMap<Vec<u8>, BackendFontInfo> = self
            .backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();

        let content = self.backend.page_content(page)?;
        if content.is_empty() {
            return Ok(PageGeometry::default());
        }
        let ops = self.backend.decode_content(&content)?;
        let decoder = self.backend.text_decoder(page);

        let mut walker = Walker {
            decoder: &decoder,
            fonts: &fonts,
            page_height: dims.height,
            state: GraphicsState::default(),
            stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            pending: None,
            geometry: PageGeometry::default(),
        };
        for op in &ops {
            walker.apply(op);
        }
        walker.flush();

        log::debug!(
            "Page {:?}: {} tokens, {} placements",
            page,
            walker.geometry.words.len(),
            walker.geometry.placements.len()
        );
        Ok(walker.geometry)
    }
}

struct Walker<'a, D: TextDecoder> {
    decoder: &'a D,
    fonts: &'a HashMap<Vec<u8>, BackendFontInfo>,
    page_height: f32,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    pending: Option<PendingWord>,
    geometry: PageGeometry,
}

impl<D: TextDecoder> Walker<'_, D> {
    fn apply(&mut self, op: &ContentOp) {
        let num = |i: usize| op.operands.get(i).and_then(get_number_from_value);

        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }
            "BT" => {
                self.tm = Matrix::IDENTITY;
                self.tlm = Matrix::IDENTITY;
            }
            "ET" => self.flush(),
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.state.font_resource = name.clone();
                }
                self.state.font_size = num(1).unwrap_or(12.0);
            }
            "Tc" => self.state.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.leading = num(0).unwrap_or(0.0),
            "Td" => self.move_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.state.leading = -ty;
                self.move_line(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                self.flush();
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(bytes);
                }
                self.flush();
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(bytes);
                }
                self.flush();
            }
            "\"" => {
                self.state.word_spacing = num(0).unwrap_or(0.0);
                self.state.char_spacing = num(1).unwrap_or(0.0);
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(bytes);
                }
                self.flush();
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            PdfValue::Str(bytes) => self.show(bytes),
                            other => {
                                if let Some(adjust) = get_number_from_value(other) {
                                    self.adjust(adjust);
                                }
                            }
                        }
                    }
                }
                self.flush();
            }
            "Do" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.place_xobject(name);
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.flush();
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    /// Apply a `TJ` positioning number (thousandths of text space, subtracted).
    fn adjust(&mut self, amount: f32) {
        let tx = -amount / 1000.0 * self.state.font_size * self.state.horizontal_scale;
        self.tm = Matrix::translation(tx, 0.0).then(&self.tm);
        if -amount > TJ_SPACE_THRESHOLD {
            self.flush();
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        let fonts = self.fonts;
        let font = fonts.get(&self.state.font_resource);
        let text = self.decoder.decode(&self.state.font_resource, bytes);

        // Single-byte encodings map one code to one character; otherwise
        // per-glyph widths are unavailable.
        let codes: Option<&[u8]> = (text.chars().count() == bytes.len()).then_some(bytes);

        for (i, ch) in text.chars().enumerate() {
            let code = codes.map(|c| c[i] as u32);
            let width = code
                .and_then(|c| font.and_then(|f| f.glyph_width(c)))
                .unwrap_or(DEFAULT_GLYPH_WIDTH);

            let trm = self.tm.then(&self.state.ctm);
            let size = self.state.font_size * trm.vertical_scale();
            let (x, y) = trm.apply(0.0, 0.0);

            let mut advance = width / 1000.0 * self.state.font_size + self.state.char_spacing;
            if ch == ' ' {
                advance += self.state.word_spacing;
            }
            advance *= self.state.horizontal_scale;

            let glyph_end = trm
                .apply(width / 1000.0 * self.state.font_size * self.state.horizontal_scale, 0.0)
                .0;

            if ch.is_whitespace() {
                self.flush();
            } else {
                match self.pending.as_mut() {
                    Some(word) => {
                        word.text.push(ch);
                        word.x1 = word.x1.max(glyph_end);
                        word.size = word.size.max(size);
                    }
                    None => {
                        self.pending = Some(PendingWord {
                            text: ch.to_string(),
                            x0: x.min(glyph_end),
                            x1: x.max(glyph_end),
                            baseline: y,
                            size,
                        });
                    }
                }
            }

            self.tm = Matrix::translation(advance, 0.0).then(&self.tm);
        }
    }

    fn flush(&mut self) {
        let Some(word) = self.pending.take() else {
            return;
        };
        let font = self
            .fonts
            .get(&self.state.font_resource)
            .map(|f| f.base_font.clone())
            .unwrap_or_else(|| String::from_utf8_lossy(&self.state.font_resource).to_string());

        let top = self.page_height - (word.baseline + ASCENT * word.size);
        let bottom = self.page_height - (word.baseline - DESCENT * word.size);
        self.geometry.words.push(WordToken {
            text: word.text,
            x0: word.x0,
            x1: word.x1,
            top,
            bottom,
            font,
            font_size: round_size(word.size),
        });
    }

    fn place_xobject(&mut self, name: &[u8]) {
        let ctm = self.state.ctm;
        let corners = [
            ctm.apply(0.0, 0.0),
            ctm.apply(1.0, 0.0),
            ctm.apply(0.0, 1.0),
            ctm.apply(1.0, 1.0),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

        self.geometry.placements.push(XObjectPlacement {
            name: String::from_utf8_lossy(name).to_string(),
            x0: min_x,
            top: self.page_height - max_y,
            x1: max_x,
            bottom: self.page_height - min_y,
        });
    }
}

/// Round to 1/100 pt so sizes computed through matrices compare equal.
fn round_size(size: f32) -> f32 {
    (size * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_concat_translation() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let m = Matrix::translation(10.0, 5.0).then(&scale);
        assert_eq!(m.apply(0.0, 0.0), (20.0, 10.0));
        assert_eq!(m.vertical_scale(), 2.0);
    }

    #[test]
    fn test_placement_area() {
        let p = XObjectPlacement {
            name: "Im1".into(),
            x0: 10.0,
            top: 20.0,
            x1: 110.0,
            bottom: 70.0,
        };
        assert_eq!(p.area(), 5000.0);
    }

    #[test]
    fn test_round_size() {
        assert_eq!(round_size(11.999_999), 12.0);
        assert_eq!(round_size(9.5), 9.5);
    }
}
