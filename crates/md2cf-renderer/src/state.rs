//! Renderer configuration and per-document state.

/// Renderer configuration, fixed for the lifetime of a renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
#[allow(clippy::struct_excessive_bools)]
pub struct RendererOptions {
    /// Omit the heading that became the page title from the body.
    pub strip_header: bool,
    /// Replace newlines inside paragraph text with spaces.
    pub remove_text_newlines: bool,
    /// Replace links to local documents with placeholders.
    pub enable_relative_links: bool,
    /// Enable GitHub Flavored Markdown extensions when parsing.
    pub gfm: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            strip_header: false,
            remove_text_newlines: false,
            enable_relative_links: false,
            gfm: true,
        }
    }
}

/// State accumulated while rendering one document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentState {
    /// Text of the first level-1 heading.
    title: Option<String>,
    /// Local image paths, in encounter order.
    attachments: Vec<String>,
}

impl DocumentState {
    /// Offer a heading as the page title.
    ///
    /// Returns `true` if this heading became the title. Only the first level-1
    /// heading of a document is accepted.
    pub fn offer_title(&mut self, text: &str, level: u8) -> bool {
        if level != 1 || self.title.is_some() {
            return false;
        }
        tracing::debug!(title = text, "Extracted page title");
        self.title = Some(text.to_owned());
        true
    }

    /// Extracted title, if a level-1 heading was seen.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Record a local image path.
    pub fn add_attachment(&mut self, path: &str) {
        tracing::debug!(path, "Recorded attachment");
        self.attachments.push(path.to_owned());
    }

    /// Recorded image paths.
    #[must_use]
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Vec<String>) {
        (self.title, self.attachments)
    }
}
