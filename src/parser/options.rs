//! Parsing options and configuration.

use super::table_detector::TableDetectorConfig;

/// Options for parsing DOCX and PDF documents.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,

    /// Whether to extract embedded images
    pub extract_images: bool,

    /// Whether extracted images carry their base64 payload
    pub include_image_data: bool,

    /// Whether to run stream-mode table detection on PDF pages
    pub detect_tables: bool,

    /// Accepted for interface compatibility; OCR is never applied
    pub enable_ocr: bool,

    /// Font-size thresholds for PDF heading inference
    pub heading_policy: HeadingPolicy,

    /// Glyph-to-word grouping tolerances
    pub word_grouping: WordGroupingConfig,

    /// PDF table detection tuning
    pub table_detector: TableDetectorConfig,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode (degrade failed pages and assets).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Enable strict mode (propagate per-page failures).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable image extraction.
    pub fn with_images(mut self, extract: bool) -> Self {
        self.extract_images = extract;
        self
    }

    /// Keep image records but drop their payloads.
    pub fn without_image_data(mut self) -> Self {
        self.include_image_data = false;
        self
    }

    /// Enable or disable PDF table detection.
    pub fn with_tables(mut self, detect: bool) -> Self {
        self.detect_tables = detect;
        self
    }

    /// Set the OCR flag.
    pub fn with_ocr(mut self, enable: bool) -> Self {
        self.enable_ocr = enable;
        self
    }

    /// Set the heading policy.
    pub fn with_heading_policy(mut self, policy: HeadingPolicy) -> Self {
        self.heading_policy = policy;
        self
    }

    /// Set the word grouping configuration.
    pub fn with_word_grouping(mut self, config: WordGroupingConfig) -> Self {
        self.word_grouping = config;
        self
    }

    /// Set the table detector configuration.
    pub fn with_table_detector(mut self, config: TableDetectorConfig) -> Self {
        self.table_detector = config;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Lenient,
            extract_images: true,
            include_image_data: true,
            detect_tables: true,
            enable_ocr: false,
            heading_policy: HeadingPolicy::default(),
            word_grouping: WordGroupingConfig::default(),
            table_detector: TableDetectorConfig::default(),
        }
    }
}

/// Error handling mode during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail on any page-level error
    Strict,
    /// Skip failed pages and assets, log and continue
    #[default]
    Lenient,
}

/// Font-size thresholds for classifying PDF lines as headings.
///
/// With page mean `m` and population standard deviation `s`, a line whose
/// largest glyph is at least `m + heading_stdev_factor * s` opens a level-1
/// section, and one at least `m + subsection_stdev_factor * s` opens a
/// level-2 section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingPolicy {
    pub heading_stdev_factor: f32,
    pub subsection_stdev_factor: f32,
}

impl HeadingPolicy {
    /// Level-1 and level-2 thresholds for a page's size statistics.
    pub fn thresholds(&self, mean: f32, stdev: f32) -> (f32, f32) {
        (
            mean + self.heading_stdev_factor * stdev,
            mean + self.subsection_stdev_factor * stdev,
        )
    }
}

impl Default for HeadingPolicy {
    fn default() -> Self {
        Self {
            heading_stdev_factor: 1.0,
            subsection_stdev_factor: 0.0,
        }
    }
}

/// Tolerances for merging glyph tokens into words and lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordGroupingConfig {
    /// Percentile of same-line gaps used as the merge threshold
    pub gap_percentile: f32,
    /// Threshold floor, as a multiple of the mean glyph width
    pub min_gap_factor: f32,
    /// Threshold ceiling, as a multiple of the mean glyph width
    pub max_gap_factor: f32,
    /// Maximum vertical distance (points) between tokens on one line
    pub line_tolerance: f32,
    /// Glyph width assumed when no widths were observed
    pub default_char_width: f32,
    /// Gap multiple used when bucketing words per font
    pub segment_gap_factor: f32,
}

impl Default for WordGroupingConfig {
    fn default() -> Self {
        Self {
            gap_percentile: 0.75,
            min_gap_factor: 0.5,
            max_gap_factor: 1.0,
            line_tolerance: 3.0,
            default_char_width: 5.0,
            segment_gap_factor: 2.0,
        }
    }
}
