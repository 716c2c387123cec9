//! Reassembly of glyph tokens into words and lines.
//!
//! Some producers paint one glyph per show operation, so the layout pass can
//! yield single-character tokens. Tokens are clustered into lines by their
//! top edge, then consecutive single characters on a line are merged when
//! the gap between them does not exceed a threshold derived from the line's
//! own gap distribution.

use std::cmp::Ordering;

use super::layout::WordToken;
use super::options::WordGroupingConfig;

/// Tokens sharing a baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Running-average top edge of the line
    pub top: f32,
    /// Grouped words
    pub words: Vec<WordToken>,
}

impl TextLine {
    /// Words joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }

    /// Largest font size on the line.
    pub fn max_font_size(&self) -> f32 {
        self.words.iter().map(|w| w.font_size).fold(0.0, f32::max)
    }
}

/// Groups tokens into lines and words.
#[derive(Debug, Clone, Default)]
pub struct WordGrouper {
    config: WordGroupingConfig,
}

impl WordGrouper {
    /// Create a grouper with the given tolerances.
    pub fn new(config: WordGroupingConfig) -> Self {
        Self { config }
    }

    /// Cluster tokens into lines and merge split words on each line.
    pub fn group_lines(&self, tokens: &[WordToken]) -> Vec<TextLine> {
        let mut sorted: Vec<&WordToken> = tokens.iter().collect();
        sorted.sort_by(|a, b| {
            round_tenth(a.top)
                .partial_cmp(&round_tenth(b.top))
                .unwrap_or(Ordering::Equal)
                .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
        });

        let mut lines = Vec::new();
        let mut current: Vec<WordToken> = Vec::new();
        let mut current_top: Option<f32> = None;

        for token in sorted {
            match current_top {
                Some(top) if (token.top - top).abs() <= self.config.line_tolerance => {
                    current.push(token.clone());
                    current_top = Some((top + token.top) / 2.0);
                }
                Some(top) => {
                    lines.push(self.finish_line(top, std::mem::take(&mut current)));
                    current.push(token.clone());
                    current_top = Some(token.top);
                }
                None => {
                    current.push(token.clone());
                    current_top = Some(token.top);
                }
            }
        }
        if let Some(top) = current_top {
            if !current.is_empty() {
                lines.push(self.finish_line(top, current));
            }
        }

        lines
    }

    fn finish_line(&self, top: f32, mut tokens: Vec<WordToken>) -> TextLine {
        tokens.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
        TextLine {
            top,
            words: self.group_line_words(&tokens),
        }
    }

    /// The gap at or below which two single characters belong to one word.
    pub fn gap_threshold(&self, tokens: &[WordToken]) -> f32 {
        let widths: Vec<f32> = tokens
            .iter()
            .map(WordToken::width)
            .filter(|w| *w > 0.0)
            .collect();
        let avg_width = mean(&widths).unwrap_or(self.config.default_char_width);

        let mut gaps: Vec<f32> = tokens
            .windows(2)
            .map(|pair| pair[1].x0 - pair[0].x1)
            .filter(|g| *g >= 0.0)
            .collect();

        if gaps.is_empty() {
            return avg_width * 1.5;
        }

        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let idx = ((gaps.len() as f32 * self.config.gap_percentile) as usize).min(gaps.len() - 1);
        let floor = avg_width * self.config.min_gap_factor;
        let ceiling = (avg_width * self.config.max_gap_factor).max(floor);
        gaps[idx].max(floor).min(ceiling)
    }

    /// Merge runs of single-character tokens on one line into words.
    ///
    /// Multi-character tokens are passed through unchanged.
    pub fn group_line_words(&self, tokens: &[WordToken]) -> Vec<WordToken> {
        if tokens.is_empty() {
            return Vec::new();
        }
        let threshold = self.gap_threshold(tokens);

        let mut words = Vec::new();
        let mut group: Vec<&WordToken> = Vec::new();
        let mut prev: Option<&WordToken> = None;

        for token in tokens {
            let text = token.text.trim();
            if text.is_empty() {
                continue;
            }

            if text.chars().count() > 1 {
                if !group.is_empty() {
                    words.push(merge_group(&group));
                    group.clear();
                }
                words.push(token.clone());
                prev = Some(token);
                continue;
            }

            match prev {
                Some(p) if token.x0 - p.x1 <= threshold && !group.is_empty() => group.push(token),
                _ => {
                    if !group.is_empty() {
                        words.push(merge_group(&group));
                    }
                    group = vec![token];
                }
            }
            prev = Some(token);
        }

        if !group.is_empty() {
            words.push(merge_group(&group));
        }
        words
    }

    /// Collapse one font's tokens into word strings in reading order.
    pub fn segments_to_words(&self, segments: &[&WordToken]) -> Vec<String> {
        let mut sorted: Vec<&WordToken> = segments.to_vec();
        sorted.sort_by(|a, b| {
            round_tenth(a.top)
                .partial_cmp(&round_tenth(b.top))
                .unwrap_or(Ordering::Equal)
                .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
        });

        let widths: Vec<f32> = sorted
            .iter()
            .map(|s| s.width())
            .filter(|w| *w > 0.0)
            .collect();
        let avg_width = mean(&widths).unwrap_or(self.config.default_char_width);
        let gap_threshold = avg_width * self.config.segment_gap_factor;

        let mut words = Vec::new();
        let mut current = String::new();
        let mut prev: Option<&WordToken> = None;

        for seg in sorted {
            let text = seg.text.trim();
            if text.is_empty() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                prev = None;
                continue;
            }

            if text.chars().count() > 1 {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                words.push(text.to_string());
                prev = Some(seg);
                continue;
            }

            let continues = prev.is_some_and(|p| {
                (seg.top - p.top).abs() <= self.config.line_tolerance
                    && seg.x0 - p.x1 <= gap_threshold
            });
            if continues && !current.is_empty() {
                current.push_str(text);
            } else {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                current.push_str(text);
            }
            prev = Some(seg);
        }

        if !current.is_empty() {
            words.push(current);
        }
        words
    }
}

fn merge_group(group: &[&WordToken]) -> WordToken {
    let first = group[0];
    let last = group[group.len() - 1];
    WordToken {
        text: group.iter().map(|t| t.text.trim()).collect(),
        x0: first.x0,
        x1: last.x1,
        top: first.top,
        bottom: group.iter().map(|t| t.bottom).fold(first.bottom, f32::max),
        font: first.font.clone(),
        font_size: group.iter().map(|t| t.font_size).fold(0.0, f32::max),
    }
}

fn round_tenth(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

/// Arithmetic mean, `None` for an empty slice.
pub(crate) fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f32>() / values.len() as f32)
    }
}

/// Population standard deviation; 0 for fewer than two values.
pub(crate) fn pstdev(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = values.iter().sum::<f32>() / values.len() as f32;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32;
    var.sqrt()
}
