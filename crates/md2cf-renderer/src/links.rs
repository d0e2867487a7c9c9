//! Relative link tracking.
//!
//! Links to other local documents cannot be resolved while a single page is
//! rendered, because the target page IDs are not known yet. The renderer
//! instead writes a unique placeholder as the link target and records a
//! [`RelativeLink`] so that a later pass can replace the placeholder with the
//! real page URL by plain string substitution.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use quick_xml::escape::escape;

/// Prefix of every relative link placeholder.
pub const PLACEHOLDER_PREFIX: &str = "md2cf-internal-link-";

/// Characters left as-is when a link target is escaped for output.
const LINK_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b'#')
    .remove(b':')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'?')
    .remove(b'=')
    .remove(b'%')
    .remove(b'@')
    .remove(b'+')
    .remove(b',')
    .remove(b'&');

/// A local link replaced by a placeholder during rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeLink {
    /// Link target as written, including any fragment.
    pub original: String,
    /// `original` escaped for embedding in markup.
    pub escaped_original: String,
    /// Part before the first `#`.
    pub path: String,
    /// Part after the first `#`, empty if there is none.
    pub fragment: String,
    /// Placeholder written to the output instead of the link target.
    pub replacement: String,
}

impl RelativeLink {
    /// Build a record for `url` with the given placeholder.
    #[must_use]
    pub fn new(url: &str, replacement: String) -> Self {
        let (path, fragment) = url.split_once('#').unwrap_or((url, ""));
        Self {
            original: url.to_owned(),
            escaped_original: escape_link(url),
            path: path.to_owned(),
            fragment: fragment.to_owned(),
            replacement,
        }
    }
}

/// Source of unique placeholder suffixes.
///
/// Suffixes must consist of lowercase letters, digits and hyphens, and must
/// not repeat for the lifetime of the source.
pub trait TokenSource {
    /// Produce the next suffix.
    fn next_token(&mut self) -> String;
}

/// Random UUID v4 suffixes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&mut self) -> String {
        uuid::Uuid::new_v4().hyphenated().to_string()
    }
}

/// Fixed-width hexadecimal counter suffixes, for reproducible output.
///
/// The fixed width keeps one placeholder from being a prefix of another.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialTokens {
    next: u64,
}

impl TokenSource for SequentialTokens {
    fn next_token(&mut self) -> String {
        let token = format!("{:016x}", self.next);
        self.next += 1;
        token
    }
}

/// Issues placeholders for relative links and records them in order.
pub struct LinkTracker {
    tokens: Box<dyn TokenSource>,
    links: Vec<RelativeLink>,
}

impl LinkTracker {
    /// Create a tracker with random tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tokens(RandomTokens)
    }

    /// Create a tracker with a custom token source.
    #[must_use]
    pub fn with_tokens<T: TokenSource + 'static>(tokens: T) -> Self {
        Self {
            tokens: Box::new(tokens),
            links: Vec::new(),
        }
    }

    /// Record `url` and return its placeholder.
    pub fn track(&mut self, url: &str) -> &str {
        let replacement = format!("{PLACEHOLDER_PREFIX}{}", self.tokens.next_token());
        tracing::debug!(url, placeholder = %replacement, "Recorded relative link");
        let index = self.links.len();
        self.links.push(RelativeLink::new(url, replacement));
        &self.links[index].replacement
    }

    /// Links recorded so far, in encounter order.
    #[must_use]
    pub fn links(&self) -> &[RelativeLink] {
        &self.links
    }

    /// Take the recorded links, leaving the tracker empty.
    pub fn take_links(&mut self) -> Vec<RelativeLink> {
        std::mem::take(&mut self.links)
    }

    /// Forget recorded links. The token source keeps its position.
    pub fn clear(&mut self) {
        self.links.clear();
    }
}

impl Default for LinkTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a link target for use in an `href`.
///
/// Percent-encodes characters outside the URL-safe set, then escapes the
/// result for an XML attribute.
#[must_use]
pub fn escape_link(url: &str) -> String {
    let encoded = utf8_percent_encode(url, LINK_SAFE).to_string();
    escape(encoded.as_str()).into_owned()
}

/// URL scheme (`http`, `mailto`, ...), if `url` starts with one.
fn scheme(url: &str) -> Option<&str> {
    let (scheme, _) = url.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    let valid = first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Whether `url` names a network location (`scheme://host...` or `//host...`).
#[must_use]
pub fn has_network_location(url: &str) -> bool {
    let rest = match scheme(url) {
        Some(scheme) => &url[scheme.len() + 1..],
        None => url,
    };
    rest.strip_prefix("//")
        .is_some_and(|authority| !authority.is_empty() && !authority.starts_with('/'))
}

/// Whether `url` points to another local document.
///
/// Same-page anchors (`#section`), URLs with a scheme and URLs with a
/// network location are not relative. Neither is a URL whose path part is
/// empty (`?query`).
#[must_use]
pub fn is_relative_link(url: &str) -> bool {
    if url.starts_with('#') || scheme(url).is_some() || has_network_location(url) {
        return false;
    }
    let path = url.split(['#', '?']).next().unwrap_or_default();
    !path.is_empty()
}
