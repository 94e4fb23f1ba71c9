use crate::config::types::{Config, FieldEntry, RuleEntry};
use crate::config::validation::validate;
use crate::ConfigError;
use std::collections::BTreeMap;
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_harvest::config::load_config;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// println!("Max depth: {}", config.crawler.max_depth);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text, filling in the built-in rules when none are given
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    if config.rules.is_empty() {
        config.rules = builtin_rules();
    }

    validate(&config)?;

    Ok(config)
}

/// Configuration used when no file is given
pub fn default_config() -> Config {
    Config {
        rules: builtin_rules(),
        ..Config::default()
    }
}

/// Rules for a three-level web directory: the front page lists categories,
/// category pages list subcategories, and leaf pages list sites.
pub fn builtin_rules() -> Vec<RuleEntry> {
    let title = || ("page_title".to_string(), FieldEntry::Text("title".to_string()));

    vec![
        RuleEntry {
            pattern: r"^https?://[^/]+/$".to_string(),
            child_selector: Some("div.one-third > span".to_string()),
            required: vec![],
            fields: BTreeMap::from([title()]),
        },
        RuleEntry {
            pattern: r"^https?://[^/]+/[^/]+/$".to_string(),
            child_selector: Some("div.dir-1.borN > ul > li".to_string()),
            required: vec![],
            fields: BTreeMap::from([title()]),
        },
        RuleEntry {
            pattern: r"^https?://[^/]+/[^/]+/[^/]+/$".to_string(),
            child_selector: None,
            required: vec!["site_name".to_string()],
            fields: BTreeMap::from([
                title(),
                (
                    "site_name".to_string(),
                    FieldEntry::Text("ul.directory-url > li > a".to_string()),
                ),
                (
                    "site_url".to_string(),
                    FieldEntry::Attr {
                        selector: "ul.directory-url > li > a".to_string(),
                        attr: "href".to_string(),
                    },
                ),
                (
                    "site_desc".to_string(),
                    FieldEntry::Text("ul.directory-url > li".to_string()),
                ),
            ]),
        },
    ]
}
