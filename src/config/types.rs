use serde::Deserialize;
use std::collections::BTreeMap;

/// Root URL used when neither the CLI nor the config file names one
pub const DEFAULT_ROOT_URL: &str = "http://www.dmoz.org/";

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Extraction rules, evaluated in file order
    #[serde(rename = "rule", default)]
    pub rules: Vec<RuleEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// URL the crawl starts from; also the scope prefix every admitted URL must share
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Maximum link depth to follow from the root (root is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of fetch-and-process units running at once
    #[serde(rename = "max-in-flight")]
    pub max_in_flight: u32,

    /// How often the orchestrator checks for quiescence (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Log a progress line every this many completed pages
    #[serde(rename = "progress-every")]
    pub progress_every: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            max_depth: 1,
            max_in_flight: 100,
            poll_interval_ms: 1000,
            request_timeout_secs: 30,
            progress_every: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiHarvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/sumi-harvest".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Number of saved records after which the sink commits
    #[serde(rename = "commit-every")]
    pub commit_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "harvest.db".to_string(),
            commit_every: 50,
        }
    }
}

/// One extraction rule as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    /// Regex matched against the start of a page URL
    pub pattern: String,

    /// CSS selector for elements carrying the links to follow
    #[serde(rename = "child-selector", default)]
    pub child_selector: Option<String>,

    /// Fields that must be non-null for a record to be persisted
    #[serde(default)]
    pub required: Vec<String>,

    /// Record column -> selector
    #[serde(default)]
    pub fields: BTreeMap<String, FieldEntry>,
}

/// A field selector: bare selector string for element text, or a table naming an attribute
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Text(String),
    Attr { selector: String, attr: String },
}

impl FieldEntry {
    pub fn selector(&self) -> &str {
        match self {
            Self::Text(selector) => selector,
            Self::Attr { selector, .. } => selector,
        }
    }
}
