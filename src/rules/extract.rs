//! Evaluating rules against parsed HTML
//!
//! Selector misses are never errors: a field that selects nothing becomes
//! null, and a child element without a link is skipped.

use crate::rules::{ExtractionRule, Record, RuleSet};
use scraper::{ElementRef, Html};

/// Everything pulled out of one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// Records that passed their rule's persistence check
    pub records: Vec<Record>,

    /// Records dropped because a required field was missing
    pub incomplete: usize,

    /// Raw link references, in document order, from every matching rule
    pub links: Vec<String>,

    /// Number of rules whose pattern matched the page URL
    pub matched_rules: usize,
}

/// Parses `html` and applies every rule whose pattern matches `page_url`
///
/// # Example
///
/// ```
/// use sumi_harvest::config::{FieldEntry, RuleEntry};
/// use sumi_harvest::rules::{extract_page, RuleSet};
/// use std::collections::BTreeMap;
///
/// let rules = RuleSet::compile(&[RuleEntry {
///     pattern: "^https://example.com/".to_string(),
///     child_selector: Some("nav li".to_string()),
///     required: vec![],
///     fields: BTreeMap::from([("page_title".to_string(), FieldEntry::Text("title".to_string()))]),
/// }])
/// .unwrap();
///
/// let html = r#"<html><head><title>Home</title></head>
///     <body><nav><ul><li><a href="/a">A</a></li></ul></nav></body></html>"#;
/// let page = extract_page(&rules, "https://example.com/", html);
///
/// assert_eq!(page.records[0].get("page_title"), Some("Home"));
/// assert_eq!(page.links, vec!["/a".to_string()]);
/// ```
pub fn extract_page(rules: &RuleSet, page_url: &str, html: &str) -> PageExtraction {
    let mut extraction = PageExtraction::default();

    let matching = rules.matching(page_url);
    if matching.is_empty() {
        return extraction;
    }

    let document = Html::parse_document(html);

    for rule in matching {
        extraction.matched_rules += 1;
        tracing::debug!("Rule {} matched {}", rule.pattern(), page_url);

        if !rule.fields.is_empty() {
            let record = extract(rule, &document, page_url);
            if rule.should_persist(&record) {
                extraction.records.push(record);
            } else {
                tracing::debug!(
                    "Record from {} lacks required fields {:?}, not saving",
                    page_url,
                    rule.required()
                );
                extraction.incomplete += 1;
            }
        }

        extraction.links.extend(child_links(rule, &document));
    }

    extraction
}

/// Evaluates every field selector of `rule` against `document`
pub fn extract(rule: &ExtractionRule, document: &Html, page_url: &str) -> Record {
    let fields = rule
        .fields
        .iter()
        .map(|field| {
            let value = document
                .select(&field.selector)
                .next()
                .and_then(|element| match &field.attr {
                    Some(attr) => element
                        .value()
                        .attr(attr)
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                    None => element_text(element),
                });
            (field.name.clone(), value)
        })
        .collect();

    Record {
        page_url: page_url.to_string(),
        fields,
    }
}

/// Raw link references from the elements matched by the rule's child selector
///
/// An anchor element contributes its own `href`; any other element contributes
/// the `href` of its first descendant anchor.
pub fn child_links(rule: &ExtractionRule, document: &Html) -> Vec<String> {
    let Some(child) = &rule.child else {
        return Vec::new();
    };

    document
        .select(&child.elements)
        .filter_map(|element| {
            let href = if element.value().name() == "a" {
                element.value().attr("href")
            } else {
                element
                    .select(&child.anchor)
                    .next()
                    .and_then(|anchor| anchor.value().attr("href"))
            };
            href.map(str::trim)
                .filter(|href| !href.is_empty())
                .map(str::to_string)
        })
        .collect()
}

/// Text content with whitespace runs collapsed; empty text is treated as missing
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
