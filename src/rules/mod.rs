//! Extraction rules
//!
//! A rule pairs a URL pattern with CSS selectors for record fields and for the
//! elements that carry links to follow. Rules are kept in configuration order
//! and every rule whose pattern matches a page is applied to it.

mod extract;
mod rule;

pub use extract::{child_links, extract, extract_page, PageExtraction};
pub use rule::{ExtractionRule, FieldSelector};

use crate::config::RuleEntry;
use crate::ConfigError;
use std::collections::BTreeMap;

/// Columns a rule may fill, besides the page URL itself
pub const RECORD_FIELDS: &[&str] = &["page_title", "site_name", "site_url", "site_desc"];

/// Fields extracted from one page by one rule
///
/// A field whose selector found nothing is present with a `None` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub page_url: String,
    pub fields: BTreeMap<String, Option<String>>,
}

impl Record {
    /// Value of a field, if it was extracted and non-null
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|value| value.as_deref())
    }

    /// Returns true if at least one field has a value
    pub fn has_any_value(&self) -> bool {
        self.fields.values().any(Option::is_some)
    }
}

/// The ordered, immutable rule collection for a crawl
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
}

impl RuleSet {
    /// Compiles rule entries, preserving their order
    pub fn compile(entries: &[RuleEntry]) -> Result<Self, ConfigError> {
        let rules = entries
            .iter()
            .map(ExtractionRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// All rules whose pattern matches `url`, in order
    pub fn matching(&self, url: &str) -> Vec<&ExtractionRule> {
        self.rules.iter().filter(|rule| rule.matches(url)).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
