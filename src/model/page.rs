//! Page-level text payload for PDF sources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Page size in points (1 point = 1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

impl PageDimensions {
    /// Standard Letter size (8.5 x 11 inches).
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Reconstructed text and font layout of one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageText {
    /// Page number (1-indexed)
    #[serde(default)]
    pub page_number: u32,

    /// Plain text, one line per reconstructed text line
    #[serde(default)]
    pub text: String,

    /// Words grouped by font
    #[serde(default)]
    pub layout: PageLayout,
}

/// Words of one font on a page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FontWords {
    /// Grouped words in reading order
    #[serde(default)]
    pub text: Vec<String>,

    /// The font size, when only one was observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Sorted distinct sizes, when several were observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_sizes: Option<Vec<f32>>,
}

/// Font-keyed layout of a page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageLayout {
    /// Per-font grouped words
    #[serde(default)]
    pub words: BTreeMap<String, FontWords>,

    /// Fonts in order of first appearance
    #[serde(default)]
    pub order: Vec<String>,

    /// The font, when the page uses only one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,

    /// Sorted font names, when the page uses several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonts: Option<Vec<String>>,

    /// The font size, when the page uses only one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Sorted distinct sizes, when the page uses several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_sizes: Option<Vec<f32>>,
}

impl PageLayout {
    /// Distinct sizes across all fonts.
    pub fn all_sizes(&self) -> Vec<f32> {
        match (&self.font_size, &self.font_sizes) {
            (Some(size), _) => vec![*size],
            (None, Some(sizes)) => sizes.clone(),
            _ => Vec::new(),
        }
    }
}

/// Split a set of observed sizes into the single/multiple representation.
pub(crate) fn size_summary(sizes: &[f32]) -> (Option<f32>, Option<Vec<f32>>) {
    let mut distinct: Vec<f32> = sizes.iter().copied().filter(|s| s.is_finite()).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup_by(|a, b| (*a - *b).abs() < f32::EPSILON);

    match distinct.len() {
        0 => (None, None),
        1 => (Some(distinct[0]), None),
        _ => (None, Some(distinct)),
    }
}
