//! Table detection using text position analysis (stream mode).
//!
//! Detects tables by analysing word alignment without relying on ruling
//! lines: rows are clustered by top edge, column edges are the left
//! positions that recur across rows, and a table is a run of consecutive
//! rows whose words sit on those edges.

use std::collections::{HashMap, HashSet};

use crate::model::TableRecord;

use super::layout::WordToken;

/// Width of the buckets used to vote for column edges.
const EDGE_BUCKET: f32 = 5.0;

/// Distance within which a word counts as aligned to an edge.
const ALIGN_TOLERANCE: f32 = 5.0;

/// A row of words in a candidate table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Mean top edge of the row
    pub top: f32,
    /// Words in this row, sorted by x
    pub words: Vec<WordToken>,
}

impl TableRowData {
    /// Whether some pair of neighbouring words is separated by at least `gap`.
    fn has_gap(&self, gap: f32) -> bool {
        self.words.windows(2).any(|w| w[1].x0 - w[0].x1 >= gap)
    }
}

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Top edge of the first row
    pub top: f32,
    /// Top edge of the last row
    pub bottom: f32,
    /// Left boundary
    pub left_x: f32,
    /// Right boundary
    pub right_x: f32,
    /// Column left edges
    pub columns: Vec<f32>,
    /// Rows of words
    pub rows: Vec<TableRowData>,
}

/// Table detector configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Row clustering tolerance, as a fraction of the font size
    pub y_tolerance_factor: f32,
    /// Minimum fraction of a row's words that sit on a column edge
    pub min_alignment_ratio: f32,
    /// Minimum horizontal gap between column edges and between cells (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 8,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.5,
            min_column_gap: 15.0,
        }
    }
}

/// Detects tables in a page's words.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables on one page and convert them to records.
    ///
    /// Identifiers are `pdf-table-{page}-{n}` with `n` counting from 1.
    pub fn extract(&self, page_number: u32, words: &[WordToken]) -> Vec<TableRecord> {
        self.detect(words)
            .iter()
            .enumerate()
            .map(|(i, t)| {
                TableRecord::from_grid(format!("pdf-table-{}-{}", page_number, i + 1), self.to_grid(t))
                    .on_page(page_number)
            })
            .collect()
    }

    /// Detect table regions in the given words.
    pub fn detect(&self, words: &[WordToken]) -> Vec<DetectedTable> {
        if words.len() < self.config.min_rows * self.config.min_columns {
            log::debug!("TableDetector: not enough words ({})", words.len());
            return vec![];
        }

        let rows = self.group_into_rows(words);
        // Prose rows have word-sized gaps only.
        let candidate: Vec<bool> = rows
            .iter()
            .map(|r| r.words.len() >= self.config.min_columns && r.has_gap(self.config.min_column_gap))
            .collect();

        let mut tables = Vec::new();
        let mut start: Option<usize> = None;
        for i in 0..=rows.len() {
            let is_candidate = candidate.get(i).copied().unwrap_or(false);
            match (start, is_candidate) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    tables.extend(self.detect_in_region(&rows[s..i]));
                    start = None;
                }
                _ => {}
            }
        }

        log::debug!("TableDetector: {} rows, {} tables", rows.len(), tables.len());
        tables
    }

    fn detect_in_region(&self, rows: &[TableRowData]) -> Vec<DetectedTable> {
        if rows.len() < self.config.min_rows {
            return vec![];
        }
        let columns = self.detect_columns(rows);
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        self.find_table_regions(rows, &columns)
            .into_iter()
            .filter_map(|(s, e)| {
                let table_rows = rows[s..=e].to_vec();
                let table_columns = self.detect_columns(&table_rows);
                if table_columns.len() < self.config.min_columns {
                    return None;
                }
                if table_columns.len() > self.config.max_columns {
                    log::debug!(
                        "TableDetector: skipping region, too many columns ({} > {})",
                        table_columns.len(),
                        self.config.max_columns
                    );
                    return None;
                }
                if self.is_list_pattern(&table_rows, &table_columns) {
                    log::debug!("TableDetector: skipping region detected as list");
                    return None;
                }

                let all_words = || table_rows.iter().flat_map(|r| r.words.iter());
                let left_x = all_words().map(|w| w.x0).fold(f32::INFINITY, f32::min);
                let right_x = all_words().map(|w| w.x1).fold(f32::NEG_INFINITY, f32::max);
                Some(DetectedTable {
                    top: table_rows[0].top,
                    bottom: table_rows[table_rows.len() - 1].top,
                    left_x,
                    right_x,
                    columns: table_columns,
                    rows: table_rows,
                })
            })
            .collect()
    }

    /// Group words into rows by top edge.
    fn group_into_rows(&self, words: &[WordToken]) -> Vec<TableRowData> {
        let mut sorted = words.to_vec();
        sorted.sort_by(|a, b| {
            a.top
                .partial_cmp(&b.top)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<WordToken> = Vec::new();
        let mut current_top: Option<f32> = None;

        for word in sorted {
            let tolerance = word.font_size * self.config.y_tolerance_factor;
            match current_top {
                Some(top) if (word.top - top).abs() <= tolerance => current.push(word),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current)));
                    }
                    current_top = Some(word.top);
                    current.push(word);
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(current));
        }
        rows
    }

    /// Column left edges that recur across rows.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in rows {
            let mut row_buckets: HashSet<i32> = HashSet::new();
            for (i, word) in row.words.iter().enumerate() {
                // Only words that start a cell vote.
                let starts_cell = i == 0
                    || word.x0 - row.words[i - 1].x1 >= self.config.min_column_gap;
                if starts_cell {
                    row_buckets.insert((word.x0 / EDGE_BUCKET).round() as i32);
                }
            }
            for bucket in row_buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous row ranges whose cells align with the columns.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if self.alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    fn alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        let cells = self.split_cells(row);
        if cells.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let aligned = cells
            .iter()
            .filter(|cell| {
                columns
                    .iter()
                    .any(|col| (cell[0].x0 - col).abs() <= ALIGN_TOLERANCE)
            })
            .count();
        aligned as f32 / cells.len() as f32
    }

    /// Split a row into cells at gaps of at least `min_column_gap`.
    fn split_cells<'r>(&self, row: &'r TableRowData) -> Vec<&'r [WordToken]> {
        let mut cells = Vec::new();
        let mut start = 0;
        for i in 1..=row.words.len() {
            let boundary = i == row.words.len()
                || row.words[i].x0 - row.words[i - 1].x1 >= self.config.min_column_gap;
            if boundary {
                cells.push(&row.words[start..i]);
                start = i;
            }
        }
        cells
    }

    /// Lay a detected table out as a text grid.
    pub fn to_grid(&self, detected: &DetectedTable) -> Vec<Vec<String>> {
        let columns = &detected.columns;
        detected
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                for word in &row.words {
                    let col = find_column(word.x0, columns, detected.right_x);
                    if let Some(cell) = cells.get_mut(col) {
                        cell.push(word.text.trim());
                    }
                }
                cells.into_iter().map(|c| c.join(" ")).collect()
            })
            .collect()
    }

    /// Whether the rows are really a bulleted or numbered list.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(first) = row.words.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let total_ratio = (bullets + numbers) as f32 / rows.len() as f32;
        bullet_ratio >= 0.5 || (columns.len() == 2 && total_ratio >= 0.5)
    }
}

fn make_row(mut words: Vec<WordToken>) -> TableRowData {
    words.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));
    let top = words.iter().map(|w| w.top).sum::<f32>() / words.len() as f32;
    TableRowData { top, words }
}

/// Column index for a word's left edge.
fn find_column(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|a, b| {
            (x - a.1)
                .abs()
                .partial_cmp(&(x - b.1).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// Number-style list marker ("1.", "2)", "a.", bare "3").
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x: f32, top: f32) -> WordToken {
        WordToken::new(text, x, x + text.len() as f32 * 5.0, top, 10.0)
    }

    fn prose_line(text: &str, top: f32) -> Vec<WordToken> {
        let mut x = 72.0;
        text.split_whitespace()
            .map(|w| {
                let t = word(w, x, top);
                x = t.x1 + 2.5;
                t
            })
            .collect()
    }

    #[test]
    fn test_detect_simple_table() {
        let words = vec![
            word("Item", 72.0, 100.0),
            word("Cost", 200.0, 100.0),
            word("Paper", 72.0, 115.0),
            word("12", 200.0, 115.0),
            word("Ink", 72.0, 130.0),
            word("30", 200.0, 130.0),
        ];
        let tables = TableDetector::new().extract(2, &words);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].id, "pdf-table-2-1");
        assert_eq!(tables[0].page_number, Some(2));
        assert_eq!(tables[0].row_count, 3);
        assert_eq!(tables[0].column_count, 2);
        assert_eq!(tables[0].cell(1, 0), Some("Paper"));
        assert_eq!(tables[0].cell(2, 1), Some("30"));
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let mut words = prose_line("the quick brown fox jumps", 100.0);
        words.extend(prose_line("the quick brown dog sleeps", 115.0));
        words.extend(prose_line("the quick brown cat naps", 130.0));
        assert!(TableDetector::new().detect(&words).is_empty());
    }

    #[test]
    fn test_multi_word_cells() {
        let words = vec![
            word("Unit", 72.0, 100.0),
            word("price", 97.5, 100.0),
            word("Total", 250.0, 100.0),
            word("Blue", 72.0, 115.0),
            word("pens", 97.5, 115.0),
            word("4.50", 250.0, 115.0),
        ];
        let tables = TableDetector::new().extract(1, &words);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].data[0], vec!["Unit price", "Total"]);
        assert_eq!(tables[0].data[1], vec!["Blue pens", "4.50"]);
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let words = vec![
            word("1.", 72.0, 100.0),
            word("First", 100.0, 100.0),
            word("2.", 72.0, 115.0),
            word("Second", 100.0, 115.0),
            word("3.", 72.0, 130.0),
            word("Third", 100.0, 130.0),
        ];
        assert!(TableDetector::new().detect(&words).is_empty());
    }

    #[test]
    fn test_list_markers() {
        assert!(is_bullet_marker("•"));
        assert!(is_number_marker("12."));
        assert!(is_number_marker("b)"));
        assert!(is_number_marker("7"));
        assert!(!is_number_marker("Cost"));
    }
}
