//! Path normalization
//!
//! Every URL that enters a redirect rule goes through [`normalize`] so rules can be compared
//! regardless of scheme, host, casing, repeated slashes or a trailing slash.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use url::Url;

/// Base used to resolve anything that is not a full `http(s)` URL
static PLACEHOLDER_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://placeholder.invalid/").expect("Valid placeholder base"));

/// Runs of slashes (and backslashes, which browsers treat as slashes)
static SLASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\]+").expect("Valid slashes pattern"));

/// Normalize a raw URL or path into its canonical comparable form
///
/// - Only `http`/`https` input is treated as a full URL, scheme and host are dropped
/// - Anything else is a path, the leading slash is implied
/// - Query string and fragment are dropped
/// - Runs of slashes are collapsed, a trailing slash is removed
/// - The result is lowercase and never empty, the worst case is `/`
///
/// ```rust
/// assert_eq!(normalize("https://example.com/A//b/"), "/a/b");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(raw: &str) -> String {
    // tabs and newlines are stripped by URL parsers anywhere in the input
    let prepared = raw
        .to_lowercase()
        .nfc()
        .filter(|ch| !matches!(ch, '\t' | '\n' | '\r'))
        .collect::<String>();
    let prepared = prepared.trim();

    match extract_path(prepared) {
        Some(path) => finish(&path),
        None => {
            tracing::debug!("Could not parse {raw:?} as URL, falling back to plain collapse");

            finish(prepared)
        }
    }
}

/// Get the path component of the input
fn extract_path(input: &str) -> Option<String> {
    if let Ok(url) = Url::parse(input) {
        if matches!(url.scheme(), "http" | "https") {
            return Some(url.path().to_string());
        }
    }

    let as_path = format!("/{}", input.trim_start_matches(['/', '\\']));

    PLACEHOLDER_BASE
        .join(&as_path)
        .ok()
        .map(|url| url.path().to_string())
}

/// Collapse slashes, strip the trailing slash, lowercase
fn finish(path: &str) -> String {
    let collapsed = SLASHES.replace_all(path, "/");
    let trimmed = collapsed.trim_start_matches('/').trim_end_matches('/');

    format!("/{trimmed}").to_lowercase()
}

/// Are both inputs the same path after normalization?
pub fn same_path(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}
