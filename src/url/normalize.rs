use url::Url;

/// Resolves a link found on a page against that page's URL and strips the fragment
///
/// Relative paths, scheme-relative (`//host/path`) and absolute links are all
/// resolved per the WHATWG URL standard. The result is the crawl's dedup key.
///
/// A link that cannot be resolved yields an empty string. An empty string never
/// carries the crawl root as its prefix, so the frontier refuses it like any
/// other out-of-scope URL.
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::normalize_link;
///
/// assert_eq!(
///     normalize_link("../b#top", "http://example.org/a/c"),
///     "http://example.org/b"
/// );
/// assert_eq!(
///     normalize_link("//cdn.example.org/x", "https://example.org/"),
///     "https://cdn.example.org/x"
/// );
/// ```
pub fn normalize_link(raw_link: &str, parent_url: &str) -> String {
    let resolved = match Url::parse(parent_url) {
        Ok(base) => base.join(raw_link.trim()),
        // No usable parent: the link has to stand on its own
        Err(_) => Url::parse(raw_link.trim()),
    };

    match resolved {
        Ok(mut url) => {
            url.set_fragment(None);
            url.into()
        }
        Err(e) => {
            tracing::trace!("Unresolvable link {:?} on {}: {}", raw_link, parent_url, e);
            String::new()
        }
    }
}

/// Canonicalises the configured root URL so that it is comparable with normalized links
///
/// The canonical form doubles as the crawl's scope prefix.
pub fn normalize_root(root_url: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(root_url.trim())?;
    url.set_fragment(None);
    Ok(url.into())
}

/// Returns true if `url` lies under the crawl root
pub fn is_in_scope(url: &str, root_prefix: &str) -> bool {
    !root_prefix.is_empty() && url.starts_with(root_prefix)
}
