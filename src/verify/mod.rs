//! Auditing checks over an already-parsed document.
//!
//! The verifiers are pure functions of the paragraph/marker stream or the
//! section tree. They never fail: a malformed input yields a pessimistic
//! report instead of an error.

mod placement;
mod sections;

pub use placement::{
    AssetKind, CaptionKind, Placement, PlacementDetail, PlacementReport, PlacementVerifier,
};
pub use sections::{
    SectionDetails, SectionReport, SectionValidator, SectionValidatorConfig, TitleSource,
    DEFAULT_REQUIRED_SECTIONS,
};
