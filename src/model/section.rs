//! Heading-derived section outline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_level() -> u8 {
    1
}

/// One node of the logical outline inferred from headings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    /// Heading text
    #[serde(default)]
    pub title: String,

    /// Heading depth (1 = top)
    #[serde(default = "default_level")]
    pub level: u8,

    /// Body text directly under this heading, before any child heading
    #[serde(default)]
    pub paragraphs: Vec<String>,

    /// Nested sections
    #[serde(default)]
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// Create a section with no content.
    pub fn new(title: impl Into<String>, level: u8) -> Self {
        Self {
            title: title.into(),
            level: level.max(1),
            paragraphs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add a child section.
    pub fn add_child(&mut self, child: SectionNode) {
        self.children.push(child);
    }

    /// Total number of nodes in this subtree, including itself.
    pub fn total_nodes(&self) -> usize {
        1 + self.children.iter().map(|c| c.total_nodes()).sum::<usize>()
    }

    /// Check that every descendant is deeper than its parent.
    pub fn is_well_nested(&self) -> bool {
        self.children
            .iter()
            .all(|c| c.level > self.level && c.is_well_nested())
    }
}

/// Collect every title in a section forest, at any depth.
///
/// Titles are trimmed; empty titles are skipped.
pub fn flatten_titles(sections: &[SectionNode]) -> BTreeSet<String> {
    fn walk(sections: &[SectionNode], out: &mut BTreeSet<String>) {
        for section in sections {
            let title = section.title.trim();
            if !title.is_empty() {
                out.insert(title.to_string());
            }
            walk(&section.children, out);
        }
    }

    let mut titles = BTreeSet::new();
    walk(sections, &mut titles);
    titles
}

#[derive(Debug)]
struct ArenaNode {
    title: String,
    level: u8,
    paragraphs: Vec<String>,
    children: Vec<usize>,
}

/// Builds a section forest from a stream of headings and body lines.
///
/// Nodes live in an index arena while the outline is open; a stack of
/// indices tracks the currently open path. Opening a heading pops every open
/// node whose level is greater than or equal to the new level, so a node is
/// only ever attached below a strictly shallower one.
#[derive(Debug, Default)]
pub struct SectionTreeBuilder {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
    open: Vec<usize>,
}

impl SectionTreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a heading at the given level and make it the deepest open node.
    pub fn open(&mut self, title: impl Into<String>, level: u8) {
        let level = level.max(1);
        while let Some(&top) = self.open.last() {
            if self.nodes[top].level >= level {
                self.open.pop();
            } else {
                break;
            }
        }

        let idx = self.nodes.len();
        self.nodes.push(ArenaNode {
            title: title.into(),
            level,
            paragraphs: Vec::new(),
            children: Vec::new(),
        });

        match self.open.last() {
            Some(&parent) => self.nodes[parent].children.push(idx),
            None => self.roots.push(idx),
        }
        self.open.push(idx);
    }

    /// Append body text to the deepest open node.
    ///
    /// Returns `false` (and drops the text) when no heading is open yet.
    pub fn push_paragraph(&mut self, text: impl Into<String>) -> bool {
        match self.open.last() {
            Some(&top) => {
                self.nodes[top].paragraphs.push(text.into());
                true
            }
            None => false,
        }
    }

    /// Whether any heading is currently open.
    pub fn has_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Level of the deepest open node.
    pub fn current_level(&self) -> Option<u8> {
        self.open.last().map(|&i| self.nodes[i].level)
    }

    /// Number of headings opened so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if no heading has been opened.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Materialize the owned tree.
    pub fn finish(self) -> Vec<SectionNode> {
        let mut slots: Vec<Option<ArenaNode>> = self.nodes.into_iter().map(Some).collect();
        self.roots
            .iter()
            .filter_map(|&root| build_owned(root, &mut slots))
            .collect()
    }
}

fn build_owned(idx: usize, slots: &mut [Option<ArenaNode>]) -> Option<SectionNode> {
    let node = slots.get_mut(idx)?.take()?;
    let children = node
        .children
        .iter()
        .filter_map(|&child| build_owned(child, slots))
        .collect();
    Some(SectionNode {
        title: node.title,
        level: node.level,
        paragraphs: node.paragraphs,
        children,
    })
}
