//! Table records.

use serde::{Deserialize, Serialize};

/// A table extracted as a grid of cell text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRecord {
    /// Identifier ("table-3" for DOCX, "pdf-table-2-1" for PDF)
    #[serde(default)]
    pub id: String,

    /// Page the table was found on (PDF only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    /// Number of rows
    #[serde(default)]
    pub row_count: usize,

    /// Number of columns (based on first row)
    #[serde(default)]
    pub column_count: usize,

    /// Cell text, row-major
    #[serde(default)]
    pub data: Vec<Vec<String>>,
}

impl TableRecord {
    /// Create a record from a grid, deriving its counts.
    pub fn from_grid(id: impl Into<String>, data: Vec<Vec<String>>) -> Self {
        Self {
            id: id.into(),
            page_number: None,
            row_count: data.len(),
            column_count: data.first().map(|r| r.len()).unwrap_or(0),
            data,
        }
    }

    /// Set the source page.
    pub fn on_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a cell's text.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.data.get(row)?.get(col).map(|s| s.as_str())
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.data
            .iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
