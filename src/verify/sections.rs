//! Required-section completeness check.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::marker::StreamEntry;
use crate::model::{flatten_titles, SectionNode};

/// Sections an academic or project report is expected to contain.
pub const DEFAULT_REQUIRED_SECTIONS: &[&str] = &[
    "Abstract/Executive Summary",
    "Introduction",
    "Literature Review/Background",
    "Methodology",
    "Implementation/Development",
    "Results",
    "Analysis/Discussion",
    "Conclusion",
    "References",
];

/// Leading word or outline number removed before exact title comparison.
static LEADING_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.]+\s+").expect("valid regex"));

/// Tuning for the section validator.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionValidatorConfig {
    /// Required sections; `/` separates acceptable alternatives
    pub required_sections: Vec<String>,
    /// Lines longer than this (in characters) are never header candidates
    pub max_header_len: usize,
    /// Outline marker stripped from header-like paragraph lines
    pub outline_prefix_pattern: String,
}

impl Default for SectionValidatorConfig {
    fn default() -> Self {
        Self {
            required_sections: DEFAULT_REQUIRED_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_header_len: 100,
            outline_prefix_pattern: r"^\d+(\.\d+)*\.?\s+".to_string(),
        }
    }
}

impl SectionValidatorConfig {
    /// Use a custom required-section list; an empty list keeps the defaults.
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let required: Vec<String> = required.into_iter().map(Into::into).collect();
        if !required.is_empty() {
            self.required_sections = required;
        }
        self
    }

    pub fn with_max_header_len(mut self, chars: usize) -> Self {
        self.max_header_len = chars;
        self
    }

    pub fn with_outline_prefix_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.outline_prefix_pattern = pattern.into();
        self
    }
}

/// Where candidate titles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    Sections,
    Paragraphs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDetails {
    pub total_required: usize,
    pub found_count: usize,
    pub source: TitleSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a completeness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionReport {
    /// Present share of required sections, 0 to 100
    pub completeness_score: f64,
    pub present_sections: Vec<String>,
    pub missing_sections: Vec<String>,
    pub details: SectionDetails,
}

impl SectionReport {
    /// Whether the check failed internally and the score is a fallback.
    pub fn is_degraded(&self) -> bool {
        self.details.error.is_some()
    }
}

/// Checks a document's headings against a list of required sections.
#[derive(Debug, Clone, Default)]
pub struct SectionValidator {
    config: SectionValidatorConfig,
}

impl SectionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SectionValidatorConfig) -> Self {
        Self { config }
    }

    /// Validator with a custom required list (empty keeps the defaults).
    pub fn with_required<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(SectionValidatorConfig::default().with_required(required))
    }

    pub fn config(&self) -> &SectionValidatorConfig {
        &self.config
    }

    /// Check the titles of a section tree.
    pub fn validate(&self, sections: &[SectionNode]) -> SectionReport {
        self.report(TitleSource::Sections, || Ok(flatten_titles(sections)))
    }

    /// Check the section tree, or header-like paragraph lines when the tree
    /// has no titles.
    pub fn validate_with_fallback<S: AsRef<str>>(
        &self,
        sections: &[SectionNode],
        paragraphs: &[S],
    ) -> SectionReport {
        let titles = flatten_titles(sections);
        if !titles.is_empty() || paragraphs.is_empty() {
            return self.report(TitleSource::Sections, || Ok(titles));
        }
        log::debug!("No section titles; falling back to paragraph lines");
        self.report(TitleSource::Paragraphs, || self.paragraph_titles(paragraphs))
    }

    fn report<F>(&self, source: TitleSource, titles: F) -> SectionReport
    where
        F: FnOnce() -> Result<BTreeSet<String>>,
    {
        let required = &self.config.required_sections;
        match titles() {
            Ok(titles) => {
                let titles: Vec<String> = titles.iter().map(|t| normalize(t)).collect();
                let (present, missing): (Vec<String>, Vec<String>) = required
                    .iter()
                    .cloned()
                    .partition(|r| is_present(r, &titles));

                let total_required = required.len();
                let completeness_score = if total_required > 0 {
                    present.len() as f64 / total_required as f64 * 100.0
                } else {
                    100.0
                };

                SectionReport {
                    completeness_score,
                    details: SectionDetails {
                        total_required,
                        found_count: present.len(),
                        source,
                        error: None,
                    },
                    present_sections: present,
                    missing_sections: missing,
                }
            }
            Err(e) => {
                log::warn!("Section validation degraded: {}", e);
                SectionReport {
                    completeness_score: 0.0,
                    present_sections: Vec::new(),
                    missing_sections: required.clone(),
                    details: SectionDetails {
                        total_required: required.len(),
                        found_count: 0,
                        source,
                        error: Some(e.to_string()),
                    },
                }
            }
        }
    }

    /// Short lines, registered raw and with their outline marker removed.
    fn paragraph_titles<S: AsRef<str>>(&self, paragraphs: &[S]) -> Result<BTreeSet<String>> {
        let prefix = Regex::new(&self.config.outline_prefix_pattern).map_err(|e| {
            Error::InvalidInput(format!(
                "outline prefix pattern {:?}: {}",
                self.config.outline_prefix_pattern, e
            ))
        })?;

        let mut titles = BTreeSet::new();
        for line in paragraphs.iter().flat_map(|p| p.as_ref().lines()) {
            let line = line.trim();
            if line.is_empty()
                || StreamEntry::classify(line).is_marker()
                || line.chars().count() > self.config.max_header_len
            {
                continue;
            }
            titles.insert(line.to_string());
            let stripped = prefix.replace(line, "");
            if stripped.len() != line.len() && !stripped.trim().is_empty() {
                titles.insert(stripped.trim().to_string());
            }
        }
        Ok(titles)
    }
}

fn normalize(text: &str) -> String {
    text.trim().nfkc().collect::<String>().to_lowercase()
}

/// A required entry is present when any alternative equals a title with its
/// leading token removed, or occurs anywhere in a title.
fn is_present(required: &str, titles: &[String]) -> bool {
    let alternatives: Vec<String> = required
        .split('/')
        .map(normalize)
        .filter(|alt| !alt.is_empty())
        .collect();

    titles.iter().any(|title| {
        let clean = LEADING_TOKEN.replace(title, "");
        alternatives
            .iter()
            .any(|alt| *alt == clean || title.contains(alt.as_str()))
    })
}
