//! URL handling module for Sumi-Harvest
//!
//! Links are resolved against the page they were found on and stripped of
//! fragments; the resulting string is the identity key of a URL throughout
//! the crawl. Scope is a plain prefix test against the canonical root URL.

mod normalize;

pub use normalize::{is_in_scope, normalize_link, normalize_root};
