//! Caption placement checks over the paragraph/marker stream.
//!
//! House style: a figure's image comes first and its caption sits BELOW it;
//! a table's caption sits ABOVE the table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::marker::{contains_image, is_bare_table};
use crate::model::{IMAGE_MARKER, TABLE_MARKER};

static FIGURE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(figure|fig)\.?\s*\d+").expect("valid regex"));
static TABLE_CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(table|tab)\.?\s*\d+").expect("valid regex"));

/// Longest caption text kept in a report detail.
const CAPTION_PREVIEW_CHARS: usize = 100;

/// An uncaptioned first table this early is taken as a cover/metadata table.
const METADATA_TABLE_WINDOW: usize = 15;

/// Where a caption sits relative to its asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Placement {
    /// Caption precedes the asset
    Above,
    /// Caption follows the asset
    Below,
    /// No adjacent or embedded asset found
    Unknown,
}

/// What the caption was found next to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Table,
    Image,
}

/// One caption and its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDetail {
    /// Position of the caption in the stream
    pub index: usize,
    /// Caption entry text (truncated)
    pub caption: String,
    pub placement: Placement,
    pub is_valid: bool,
    /// Asset the caption was matched with
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetKind>,
}

/// Result of a placement check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementReport {
    /// True when no caption is misplaced (vacuously true with no captions)
    pub all_valid: bool,
    /// Number of captions found
    pub total: usize,
    pub placements_above: usize,
    pub placements_below: usize,
    /// Share of valid captions, rounded to two decimals; 0 with no captions
    pub accuracy_percentage: f64,
    pub details: Vec<PlacementDetail>,
    /// Table markers with no adjacent caption (table reports only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlabeled_tables: Option<Vec<String>>,
    /// Leading uncaptioned tables treated as cover/metadata (table reports only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_tables: Option<Vec<String>>,
}

impl PlacementReport {
    /// Captions that failed the check.
    pub fn invalid(&self) -> impl Iterator<Item = &PlacementDetail> {
        self.details.iter().filter(|d| !d.is_valid)
    }
}

/// Which captions to look for and which placement is correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionKind {
    Figure,
    Table,
}

impl CaptionKind {
    fn pattern(self) -> &'static Regex {
        match self {
            CaptionKind::Figure => &FIGURE_CAPTION,
            CaptionKind::Table => &TABLE_CAPTION,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            CaptionKind::Figure => IMAGE_MARKER,
            CaptionKind::Table => TABLE_MARKER,
        }
    }

    fn valid_placement(self) -> Placement {
        match self {
            CaptionKind::Figure => Placement::Below,
            CaptionKind::Table => Placement::Above,
        }
    }

    /// Asset a neighbouring entry stands for, if any.
    fn neighbour_asset(self, entry: &str) -> Option<AssetKind> {
        match self {
            CaptionKind::Figure => contains_image(entry).then_some(AssetKind::Image),
            CaptionKind::Table => match entry.trim() {
                TABLE_MARKER => Some(AssetKind::Table),
                IMAGE_MARKER => Some(AssetKind::Image),
                _ => None,
            },
        }
    }

    /// Byte offset of the first caption line inside an entry.
    fn caption_offset(self, entry: &str) -> Option<usize> {
        let mut offset = 0;
        for line in entry.split('\n') {
            if self.pattern().is_match(line) {
                return Some(offset + (line.len() - line.trim_start().len()));
            }
            offset += line.len() + 1;
        }
        None
    }

    fn asset(self) -> AssetKind {
        match self {
            CaptionKind::Figure => AssetKind::Image,
            CaptionKind::Table => AssetKind::Table,
        }
    }
}

/// Checks caption placement for one caption kind.
#[derive(Debug, Clone, Copy)]
pub struct PlacementVerifier {
    kind: CaptionKind,
}

impl PlacementVerifier {
    /// Figure captions must follow their image.
    pub fn figures() -> Self {
        Self {
            kind: CaptionKind::Figure,
        }
    }

    /// Table captions must precede their table.
    pub fn tables() -> Self {
        Self {
            kind: CaptionKind::Table,
        }
    }

    pub fn kind(&self) -> CaptionKind {
        self.kind
    }

    /// Verify every caption in a paragraph/marker stream.
    pub fn verify<S: AsRef<str>>(&self, entries: &[S]) -> PlacementReport {
        let entries: Vec<&str> = entries.iter().map(|e| e.as_ref()).collect();
        let valid = self.kind.valid_placement();

        let details: Vec<PlacementDetail> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !is_marker_only(entry))
            .filter_map(|(i, entry)| {
                let caption_at = self.kind.caption_offset(entry)?;
                let (placement, asset) = self.locate(&entries, i, caption_at);
                Some(PlacementDetail {
                    index: i,
                    caption: entry.chars().take(CAPTION_PREVIEW_CHARS).collect(),
                    placement,
                    is_valid: placement == valid,
                    asset,
                })
            })
            .collect();

        let total = details.len();
        let valid_count = details.iter().filter(|d| d.is_valid).count();
        let count = |p: Placement| details.iter().filter(|d| d.placement == p).count();
        let accuracy_percentage = if total > 0 {
            round2(valid_count as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        let (unlabeled_tables, metadata_tables) = match self.kind {
            CaptionKind::Table => {
                let (unlabeled, metadata) = self.uncaptioned_tables(&entries);
                (Some(unlabeled), Some(metadata))
            }
            CaptionKind::Figure => (None, None),
        };

        PlacementReport {
            all_valid: valid_count == total,
            total,
            placements_above: count(Placement::Above),
            placements_below: count(Placement::Below),
            accuracy_percentage,
            details,
            unlabeled_tables,
            metadata_tables,
        }
    }

    fn locate(
        &self,
        entries: &[&str],
        index: usize,
        caption_at: usize,
    ) -> (Placement, Option<AssetKind>) {
        let entry = entries[index];
        if let Some(marker_at) = entry.find(self.kind.marker()) {
            let placement = if marker_at < caption_at {
                Placement::Below
            } else {
                Placement::Above
            };
            return (placement, Some(self.kind.asset()));
        }

        let previous = index
            .checked_sub(1)
            .and_then(|i| entries.get(i))
            .and_then(|e| self.kind.neighbour_asset(e))
            .map(|asset| (Placement::Below, Some(asset)));
        let next = entries
            .get(index + 1)
            .and_then(|e| self.kind.neighbour_asset(e))
            .map(|asset| (Placement::Above, Some(asset)));

        // The side where a correctly placed asset would sit is checked first.
        let found = match self.kind.valid_placement() {
            Placement::Below => previous.or(next),
            _ => next.or(previous),
        };
        found.unwrap_or((Placement::Unknown, None))
    }

    fn uncaptioned_tables(&self, entries: &[&str]) -> (Vec<String>, Vec<String>) {
        let mut unlabeled = Vec::new();
        let mut metadata = Vec::new();
        let first_table = entries.iter().position(|e| is_bare_table(e));
        let is_caption = |i: Option<usize>| {
            i.and_then(|i| entries.get(i))
                .is_some_and(|e| self.kind.caption_offset(e.trim()) == Some(0))
        };

        for (i, _) in entries.iter().enumerate().filter(|(_, e)| is_bare_table(e)) {
            if is_caption(i.checked_sub(1)) || is_caption(Some(i + 1)) {
                continue;
            }
            if Some(i) == first_table && i < METADATA_TABLE_WINDOW {
                metadata.push(format!(
                    "Table at paragraph {} identified as cover page/metadata (no caption required)",
                    i + 1
                ));
            } else {
                unlabeled.push(format!("Table at paragraph {} missing caption", i + 1));
            }
        }

        (unlabeled, metadata)
    }
}

fn is_marker_only(entry: &str) -> bool {
    matches!(entry.trim(), IMAGE_MARKER | TABLE_MARKER)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
