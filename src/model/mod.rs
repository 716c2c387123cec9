//! Unified document model shared by the DOCX and PDF parsers.
//!
//! This module defines the single normalized representation that every
//! downstream auditing feature consumes. It carries no parsing behavior,
//! only construction helpers and (de)serialization to a plain JSON form.

mod document;
mod image;
pub mod marker;
mod page;
mod section;
mod table;

pub use document::{Extras, Metadata, SourceType, TextPayload, UnifiedDocument};
pub use image::DocumentImage;
pub use marker::{StreamEntry, IMAGE_MARKER, TABLE_MARKER};
pub(crate) use page::size_summary;
pub use page::{FontWords, PageDimensions, PageLayout, PageText};
pub use section::{flatten_titles, SectionNode, SectionTreeBuilder};
pub use table::TableRecord;
