//! Heading inference for PDF pages from font-size statistics.

use crate::model::{SectionNode, SectionTreeBuilder};

use super::layout::WordToken;
use super::options::HeadingPolicy;
use super::word_grouping::{mean, pstdev, TextLine};

/// How a line was classified on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Heading,
    Subheading,
    Body,
}

/// Builds a two-level outline page by page.
///
/// Size statistics are recomputed for every page, while the open
/// heading and subheading carry over page breaks.
#[derive(Debug, Default)]
pub struct HeadingInference {
    policy: HeadingPolicy,
    tree: SectionTreeBuilder,
}

impl HeadingInference {
    pub fn new(policy: HeadingPolicy) -> Self {
        Self {
            policy,
            tree: SectionTreeBuilder::new(),
        }
    }

    /// Classify one page's lines and fold them into the outline.
    pub fn feed_page(&mut self, page_number: u32, tokens: &[WordToken], lines: &[TextLine]) {
        let sizes: Vec<f32> = tokens
            .iter()
            .map(|t| t.font_size)
            .filter(|s| *s > 0.0)
            .collect();
        let Some(mean_size) = mean(&sizes) else {
            return;
        };
        let (heading, subheading) = self.policy.thresholds(mean_size, pstdev(&sizes));
        log::debug!(
            "Page {}: mean size {:.2}, heading >= {:.2}, subheading >= {:.2}",
            page_number,
            mean_size,
            heading,
            subheading
        );

        for line in lines {
            let text = line.text();
            if text.is_empty() {
                continue;
            }
            match classify(line.max_font_size(), heading, subheading) {
                LineRole::Heading => self.tree.open(text, 1),
                LineRole::Subheading => {
                    // A subheading needs an open heading to hang from.
                    if self.tree.has_open() {
                        self.tree.open(text, 2);
                    }
                }
                LineRole::Body => {
                    self.tree.push_paragraph(text);
                }
            }
        }
    }

    /// Finish and return the root sections.
    pub fn finish(self) -> Vec<SectionNode> {
        self.tree.finish()
    }
}

fn classify(size: f32, heading: f32, subheading: f32) -> LineRole {
    if size >= heading {
        LineRole::Heading
    } else if size >= subheading {
        LineRole::Subheading
    } else {
        LineRole::Body
    }
}
