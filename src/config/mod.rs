//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an absent file yields the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FieldEntry, OutputConfig, RuleEntry, UserAgentConfig, DEFAULT_ROOT_URL,
};

// Re-export parser functions
pub use parser::{builtin_rules, default_config, load_config, parse_config};
pub use validation::validate;
