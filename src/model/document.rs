//! Document-level types.

use super::marker::is_bare_table;
use super::{DocumentImage, PageText, SectionNode, TableRecord};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Format the document was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Docx,
    Pdf,
}

impl SourceType {
    /// Lowercase name used in the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Docx => "docx",
            SourceType::Pdf => "pdf",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document metadata as a key-value map.
///
/// Keys are only present when their value is non-empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text value, skipping absent or blank values.
    pub fn set_text(&mut self, key: &str, value: Option<impl Into<String>>) {
        if let Some(value) = value {
            let value = value.into();
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.0.insert(key.to_string(), Value::String(trimmed.to_string()));
            }
        }
    }

    /// Set any value, skipping null, empty strings and empty arrays.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let empty = match &value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if !empty {
            self.0.insert(key.to_string(), value);
        }
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Text payload: the full text plus either the DOCX paragraph stream or the
/// PDF page list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextPayload {
    /// All text of the document
    #[serde(default)]
    pub full_text: String,

    /// Flat paragraph/marker stream (DOCX)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<String>>,

    /// Per-page text and layout (PDF)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageText>>,
}

impl TextPayload {
    /// Payload for a paragraph stream; full text is the entries joined by newlines.
    pub fn from_paragraphs(paragraphs: Vec<String>) -> Self {
        Self {
            full_text: paragraphs.join("\n"),
            paragraphs: Some(paragraphs),
            pages: None,
        }
    }

    /// Payload for a page list; full text is the non-empty pages joined by blank lines.
    pub fn from_pages(pages: Vec<PageText>) -> Self {
        let full_text = pages
            .iter()
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        Self {
            full_text,
            paragraphs: None,
            pages: Some(pages),
        }
    }
}

/// Denormalized counts and flags, mirrored from the document's sequences.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Extras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,

    #[serde(default)]
    pub table_count: usize,

    #[serde(default)]
    pub image_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_applied: Option<bool>,
}

/// The normalized representation of one DOCX or PDF file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedDocument {
    /// Source format
    pub source_type: SourceType,

    /// Author, title, dates, page counts, ...
    #[serde(default)]
    pub metadata: Metadata,

    /// Heading outline
    #[serde(default)]
    pub sections: Vec<SectionNode>,

    /// Full text and paragraph stream or pages
    #[serde(default)]
    pub text: TextPayload,

    /// Extracted tables
    #[serde(default)]
    pub tables: Vec<TableRecord>,

    /// Extracted images
    #[serde(default)]
    pub images: Vec<DocumentImage>,

    /// Derived counts and flags
    #[serde(default)]
    pub extras: Extras,
}

impl UnifiedDocument {
    /// Assemble a document and derive its extras.
    pub fn new(
        source_type: SourceType,
        metadata: Metadata,
        sections: Vec<SectionNode>,
        text: TextPayload,
        tables: Vec<TableRecord>,
        images: Vec<DocumentImage>,
    ) -> Self {
        let mut doc = Self {
            source_type,
            metadata,
            sections,
            text,
            tables,
            images,
            extras: Extras::default(),
        };
        doc.refresh_extras();
        doc
    }

    /// Recompute `extras` counts from the actual sequences.
    ///
    /// The OCR flag is preserved; it is not derivable from content.
    pub fn refresh_extras(&mut self) {
        let ocr_applied = self.extras.ocr_applied;
        self.extras = match self.source_type {
            SourceType::Docx => Extras {
                paragraph_count: Some(
                    self.paragraphs()
                        .iter()
                        .filter(|p| !is_bare_table(p))
                        .count(),
                ),
                section_count: Some(self.sections.len()),
                ..Extras::default()
            },
            SourceType::Pdf => Extras {
                page_count: Some(self.pages().len()),
                ocr_applied: Some(ocr_applied.unwrap_or(false)),
                ..Extras::default()
            },
        };
        self.extras.table_count = self.tables.len();
        self.extras.image_count = self.images.len();
    }

    /// The flat paragraph/marker stream (empty for PDF sources).
    pub fn paragraphs(&self) -> &[String] {
        self.text.paragraphs.as_deref().unwrap_or(&[])
    }

    /// The page list (empty for DOCX sources).
    pub fn pages(&self) -> &[PageText] {
        self.text.pages.as_deref().unwrap_or(&[])
    }

    /// Paragraph-equivalent lines for the verifiers.
    ///
    /// DOCX documents yield their marker stream; PDF documents yield the
    /// non-empty lines of each page in order.
    pub fn stream_lines(&self) -> Vec<String> {
        match self.source_type {
            SourceType::Docx => self.paragraphs().to_vec(),
            SourceType::Pdf => self
                .pages()
                .iter()
                .flat_map(|p| p.text.lines())
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Get an image by identifier.
    pub fn image(&self, identifier: &str) -> Option<&DocumentImage> {
        self.images.iter().find(|i| i.identifier == identifier)
    }

    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Convert to a JSON value tree.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild from JSON, restoring consistent extras.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut doc: Self = serde_json::from_str(json)?;
        doc.refresh_extras();
        Ok(doc)
    }

    /// Rebuild from a JSON value tree, restoring consistent extras.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut doc: Self = serde_json::from_value(value)?;
        doc.refresh_extras();
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docx_doc() -> UnifiedDocument {
        UnifiedDocument::new(
            SourceType::Docx,
            Metadata::new(),
            vec![SectionNode::new("Intro", 1)],
            TextPayload::from_paragraphs(vec![
                "Intro".into(),
                "<<TABLE>>".into(),
                "Body".into(),
            ]),
            vec![TableRecord::from_grid("table-1", vec![vec!["a".into()]])],
            vec![],
        )
    }

    #[test]
    fn test_docx_extras() {
        let doc = docx_doc();
        assert_eq!(doc.extras.paragraph_count, Some(2));
        assert_eq!(doc.extras.section_count, Some(1));
        assert_eq!(doc.extras.table_count, 1);
        assert_eq!(doc.extras.image_count, 0);
        assert_eq!(doc.extras.page_count, None);
        assert_eq!(doc.text.full_text, "Intro\n<<TABLE>>\nBody");
    }

    #[test]
    fn test_pdf_extras_and_full_text() {
        let pages = vec![
            PageText {
                page_number: 1,
                text: " First page \n".into(),
                ..Default::default()
            },
            PageText {
                page_number: 2,
                text: "   ".into(),
                ..Default::default()
            },
            PageText {
                page_number: 3,
                text: "Third".into(),
                ..Default::default()
            },
        ];
        let doc = UnifiedDocument::new(
            SourceType::Pdf,
            Metadata::new(),
            vec![],
            TextPayload::from_pages(pages),
            vec![],
            vec![],
        );
        assert_eq!(doc.text.full_text, "First page\n\nThird");
        assert_eq!(doc.extras.page_count, Some(3));
        assert_eq!(doc.extras.ocr_applied, Some(false));
        assert_eq!(doc.stream_lines(), vec!["First page", "Third"]);
    }

    #[test]
    fn test_from_json_repairs_extras() {
        let json = r#"{
            "source_type": "docx",
            "text": {"full_text": "a", "paragraphs": ["a", "<<TABLE>>"]},
            "tables": [{"id": "table-1", "data": [["x"]]}],
            "extras": {"table_count": 7, "image_count": 3}
        }"#;
        let doc = UnifiedDocument::from_json(json).unwrap();
        assert_eq!(doc.extras.table_count, 1);
        assert_eq!(doc.extras.image_count, 0);
        assert_eq!(doc.extras.paragraph_count, Some(1));
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn test_metadata_skips_empty() {
        let mut meta = Metadata::new();
        meta.set_text("author", Some("  Ada "));
        meta.set_text("title", Some(""));
        meta.set_text("subject", None::<String>);
        meta.set("page_dimensions", Value::Array(vec![]));
        meta.set("page_count", 0);
        meta.set("has_text_content", false);

        assert_eq!(meta.get_str("author"), Some("Ada"));
        assert!(!meta.contains_key("title"));
        assert!(!meta.contains_key("subject"));
        assert!(!meta.contains_key("page_dimensions"));
        assert!(meta.contains_key("page_count"));
        assert!(meta.contains_key("has_text_content"));
    }

    #[test]
    fn test_source_type_serde() {
        assert_eq!(serde_json::to_string(&SourceType::Pdf).unwrap(), "\"pdf\"");
        assert_eq!(SourceType::Docx.to_string(), "docx");
    }
}
