use crate::config::{FieldEntry, RuleEntry};
use crate::rules::{Record, RECORD_FIELDS};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// A compiled extraction rule
///
/// Immutable once built; shared read-only by every processing unit.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pattern: Regex,
    pub(crate) fields: Vec<FieldSelector>,
    required: Vec<String>,
    pub(crate) child: Option<ChildSelector>,
}

/// Selector for one record column
#[derive(Debug, Clone)]
pub struct FieldSelector {
    pub name: String,
    pub(crate) selector: Selector,
    /// Take this attribute instead of the element text
    pub(crate) attr: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ChildSelector {
    pub(crate) elements: Selector,
    pub(crate) anchor: Selector,
}

impl ExtractionRule {
    /// Compiles a rule from its config entry
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionRule)` - Pattern and selectors compiled
    /// * `Err(ConfigError)` - Bad regex, bad selector, or an unknown field name
    pub fn compile(entry: &RuleEntry) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&entry.pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: entry.pattern.clone(),
            message: e.to_string(),
        })?;

        let mut fields = Vec::with_capacity(entry.fields.len());
        for (name, field) in &entry.fields {
            if !RECORD_FIELDS.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Rule '{}' names unknown field '{}' (expected one of {})",
                    entry.pattern,
                    name,
                    RECORD_FIELDS.join(", ")
                )));
            }

            let attr = match field {
                FieldEntry::Text(_) => None,
                FieldEntry::Attr { attr, .. } => Some(attr.clone()),
            };

            fields.push(FieldSelector {
                name: name.clone(),
                selector: parse_selector(field.selector())?,
                attr,
            });
        }

        for name in &entry.required {
            if !entry.fields.contains_key(name) {
                return Err(ConfigError::Validation(format!(
                    "Rule '{}' requires field '{}' but does not select it",
                    entry.pattern, name
                )));
            }
        }

        let child = match &entry.child_selector {
            Some(selector) => Some(ChildSelector {
                elements: parse_selector(selector)?,
                anchor: parse_selector("a[href]")?,
            }),
            None => None,
        };

        Ok(Self {
            pattern,
            fields,
            required: entry.required.clone(),
            child,
        })
    }

    /// Returns true if the pattern matches at the very start of `url`
    ///
    /// The match need not cover the whole URL.
    pub fn matches(&self, url: &str) -> bool {
        self.pattern.find(url).map_or(false, |m| m.start() == 0)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn follows_links(&self) -> bool {
        self.child.is_some()
    }

    /// Decides whether an extracted record is worth persisting
    ///
    /// With required fields, all of them must be non-null. Without, any
    /// non-null field will do.
    pub fn should_persist(&self, record: &Record) -> bool {
        if self.required.is_empty() {
            record.has_any_value()
        } else {
            self.required
                .iter()
                .all(|name| record.get(name).is_some())
        }
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
