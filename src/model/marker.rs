//! Positional markers in the flat paragraph stream.
//!
//! The parsers emit `<<IMAGE>>` and `<<TABLE>>` at the exact reading-order
//! position of an image or table. A marker may stand alone as a stream entry
//! or sit inside a paragraph's text when a drawing is anchored mid-paragraph.
//! The placement verifiers rely on this ordering.

/// Stands in for an image at its reading-order position.
pub const IMAGE_MARKER: &str = "<<IMAGE>>";

/// Stands in for a table at its reading-order position.
pub const TABLE_MARKER: &str = "<<TABLE>>";

/// Typed view of one paragraph-stream entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEntry {
    /// Text, possibly with embedded image markers
    Text(String),
    /// An entry that is exactly an image marker
    Image,
    /// An entry that is exactly a table marker
    Table,
}

impl StreamEntry {
    /// Classify a raw stream entry.
    pub fn classify(entry: &str) -> Self {
        match entry.trim() {
            IMAGE_MARKER => StreamEntry::Image,
            TABLE_MARKER => StreamEntry::Table,
            _ => StreamEntry::Text(entry.to_string()),
        }
    }

    /// Render back to the string protocol.
    pub fn render(&self) -> String {
        match self {
            StreamEntry::Text(text) => text.clone(),
            StreamEntry::Image => IMAGE_MARKER.to_string(),
            StreamEntry::Table => TABLE_MARKER.to_string(),
        }
    }

    /// Whether this entry is a bare marker.
    pub fn is_marker(&self) -> bool {
        !matches!(self, StreamEntry::Text(_))
    }
}

/// Whether the entry mentions an image marker anywhere.
pub fn contains_image(entry: &str) -> bool {
    entry.contains(IMAGE_MARKER)
}

/// Whether the entry mentions a table marker anywhere.
pub fn contains_table(entry: &str) -> bool {
    entry.contains(TABLE_MARKER)
}

/// Whether the entry is exactly a table marker.
pub fn is_bare_table(entry: &str) -> bool {
    entry.trim() == TABLE_MARKER
}

/// Count entries that are exactly a table marker.
pub fn count_table_markers<S: AsRef<str>>(entries: &[S]) -> usize {
    entries.iter().filter(|e| is_bare_table(e.as_ref())).count()
}
