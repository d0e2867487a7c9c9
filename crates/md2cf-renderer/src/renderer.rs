//! Confluence storage format generators.
//!
//! [`ConfluenceRenderer`] has one generator per markdown construct. Each
//! generator returns the markup for its node and records side-channel data
//! (title, attachments, relative links) on the renderer.

use quick_xml::escape::{escape, partial_escape};

use crate::links::{
    LinkTracker, RelativeLink, TokenSource, escape_link, has_network_location, is_relative_link,
};
use crate::node::{Alignment, Node};
use crate::state::{DocumentState, RendererOptions};
use crate::tag::{ConfluenceTag, Namespace};

/// Markdown to Confluence storage format renderer.
///
/// One instance renders one document at a time. Call [`reinit`](Self::reinit)
/// (or use [`render`](Self::render), which hands the state over in its result)
/// before reusing it for another document.
///
/// # Example
///
/// ```
/// use md2cf_renderer::{ConfluenceRenderer, RendererOptions};
///
/// let mut renderer = ConfluenceRenderer::with_options(RendererOptions {
///     strip_header: true,
///     ..RendererOptions::default()
/// });
///
/// assert_eq!(renderer.heading("Page title", 1), "");
/// assert_eq!(renderer.title(), Some("Page title"));
/// assert_eq!(renderer.heading("Section", 2), "<h2>Section</h2>\n");
/// ```
pub struct ConfluenceRenderer {
    pub(crate) options: RendererOptions,
    pub(crate) state: DocumentState,
    pub(crate) links: LinkTracker,
}

impl ConfluenceRenderer {
    /// Create a renderer with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RendererOptions::default())
    }

    /// Create a renderer with the given options.
    #[must_use]
    pub fn with_options(options: RendererOptions) -> Self {
        Self {
            options,
            state: DocumentState::default(),
            links: LinkTracker::new(),
        }
    }

    /// Use a custom source for relative link placeholder tokens.
    ///
    /// Discards any relative links recorded so far.
    #[must_use]
    pub fn with_token_source<T: TokenSource + 'static>(mut self, tokens: T) -> Self {
        self.links = LinkTracker::with_tokens(tokens);
        self
    }

    /// Renderer options.
    #[must_use]
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// Title taken from the first level-1 heading.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.state.title()
    }

    /// Local image paths to upload as attachments.
    #[must_use]
    pub fn attachments(&self) -> &[String] {
        self.state.attachments()
    }

    /// Relative links replaced by placeholders.
    #[must_use]
    pub fn relative_links(&self) -> &[RelativeLink] {
        self.links.links()
    }

    /// Reset per-document state, keeping options.
    pub fn reinit(&mut self) {
        self.state = DocumentState::default();
        self.links.clear();
    }

    /// Render a single node with its matching generator.
    pub fn render_node(&mut self, node: Node<'_>) -> String {
        match node {
            Node::Heading {
                text,
                content,
                level,
            } => self.heading_with_content(text, content, level),
            Node::CodeBlock { code, lang } => self.block_code(code, lang),
            Node::Image { src, title, alt } => self.image(src, title, alt),
            Node::Link { url, text, title } => self.link(url, text, title),
            Node::Text(text) => self.text(text),
            Node::Paragraph(content) => Self::paragraph(content),
            Node::BlockQuote(content) => Self::block_quote(content),
            Node::List { start, items } => Self::list(items, start),
            Node::ListItem(content) => Self::list_item(content),
            Node::Table { head, body } => Self::table(head, body),
            Node::TableRow(cells) => Self::table_row(cells),
            Node::TableCell {
                content,
                header,
                alignment,
            } => Self::table_cell(content, header, alignment),
            Node::Emphasis(content) => wrap_inline("em", content),
            Node::Strong(content) => wrap_inline("strong", content),
            Node::Strikethrough(content) => wrap_inline("s", content),
            Node::Superscript(content) => wrap_inline("sup", content),
            Node::Subscript(content) => wrap_inline("sub", content),
            Node::InlineCode(code) => Self::codespan(code),
            Node::Html(html) => html.to_owned(),
            Node::HardBreak => Self::linebreak(),
            Node::Rule => Self::thematic_break(),
            Node::TaskListMarker(checked) => Self::task_list_marker(checked),
            Node::DefinitionList(content) => format!("<dl>\n{content}</dl>\n"),
            Node::DefinitionTitle(content) => format!("<dt>{content}</dt>\n"),
            Node::DefinitionDetails(content) => format!("<dd>{content}</dd>\n"),
        }
    }

    /// Render a heading from plain text.
    ///
    /// The first level-1 heading becomes the page title; with
    /// `strip_header` it is left out of the output.
    pub fn heading(&mut self, text: &str, level: u8) -> String {
        let content = partial_escape(text);
        self.heading_with_content(text, &content, level)
    }

    /// Render a heading whose inline markup is already rendered.
    ///
    /// `text` is the plain heading text used for the title.
    pub fn heading_with_content(&mut self, text: &str, content: &str, level: u8) -> String {
        let is_title = self.state.offer_title(text, level);
        if is_title && self.options.strip_header {
            return String::new();
        }
        format!("<h{level}>{content}</h{level}>\n")
    }

    /// `ac:structured-macro` with the given macro name.
    #[must_use]
    pub fn structured_macro(name: &str) -> ConfluenceTag {
        ConfluenceTag::new("structured-macro").with_attribute("name", name)
    }

    /// `ac:parameter` with the given name and text value.
    #[must_use]
    pub fn parameter(name: &str, value: &str) -> ConfluenceTag {
        ConfluenceTag::new("parameter")
            .with_attribute("name", name)
            .with_text(value)
    }

    /// `ac:plain-text-body` holding `text` as CDATA.
    #[must_use]
    pub fn plain_text_body(text: &str) -> ConfluenceTag {
        ConfluenceTag::new("plain-text-body").with_cdata(text)
    }

    /// Render a code block as a `code` macro with line numbers.
    #[allow(clippy::unused_self)]
    pub fn block_code(&self, code: &str, lang: Option<&str>) -> String {
        let mut root = Self::structured_macro("code");
        if let Some(lang) = lang {
            root.append(Self::parameter("language", lang));
        }
        root.append(Self::parameter("linenumbers", "true"));
        root.append(Self::plain_text_body(code));
        root.render()
    }

    /// Render an image.
    ///
    /// Sources with a network location are referenced by URL. Anything else
    /// is a local file: its path is recorded as an attachment and the image
    /// references the attachment by file name.
    pub fn image(&mut self, src: &str, title: Option<&str>, alt: Option<&str>) -> String {
        let mut root = ConfluenceTag::new("image").with_attribute("alt", alt.unwrap_or_default());
        if let Some(title) = title.filter(|title| !title.is_empty()) {
            root = root.with_attribute("title", title);
        }

        let resource = if has_network_location(src) {
            ConfluenceTag::new("url")
                .in_namespace(Namespace::Ri)
                .with_attribute("value", src)
        } else {
            self.state.add_attachment(src);
            ConfluenceTag::new("attachment")
                .in_namespace(Namespace::Ri)
                .with_attribute("filename", basename(src))
        };
        root.append(resource);
        root.render()
    }

    /// Render a link. `text` is already rendered inline markup.
    ///
    /// With `enable_relative_links`, links to local documents get a
    /// placeholder target and are recorded in
    /// [`relative_links`](Self::relative_links).
    pub fn link(&mut self, url: &str, text: &str, title: Option<&str>) -> String {
        let href = if self.options.enable_relative_links && is_relative_link(url) {
            self.links.track(url).to_owned()
        } else {
            escape_link(url)
        };

        let mut out = format!(r#"<a href="{href}""#);
        if let Some(title) = title.filter(|title| !title.is_empty()) {
            out.push_str(r#" title=""#);
            out.push_str(&escape(title));
            out.push('"');
        }
        out.push('>');
        out.push_str(text);
        out.push_str("</a>");
        out
    }

    /// Render inline text, collapsing newline runs when configured.
    #[must_use]
    pub fn text(&self, text: &str) -> String {
        if self.options.remove_text_newlines {
            partial_escape(collapse_newlines(text).as_str()).into_owned()
        } else {
            partial_escape(text).into_owned()
        }
    }

    #[must_use]
    pub fn paragraph(content: &str) -> String {
        format!("<p>{content}</p>\n")
    }

    #[must_use]
    pub fn block_quote(content: &str) -> String {
        format!("<blockquote>\n{content}</blockquote>\n")
    }

    /// Render a list. `start` is `None` for bullet lists.
    #[must_use]
    pub fn list(items: &str, start: Option<u64>) -> String {
        match start {
            None => format!("<ul>\n{items}</ul>\n"),
            Some(1) => format!("<ol>\n{items}</ol>\n"),
            Some(n) => format!("<ol start=\"{n}\">\n{items}</ol>\n"),
        }
    }

    #[must_use]
    pub fn list_item(content: &str) -> String {
        format!("<li>{content}</li>\n")
    }

    #[must_use]
    pub fn table(head: &str, body: &str) -> String {
        format!("<table>\n<thead>\n{head}</thead>\n<tbody>\n{body}</tbody>\n</table>\n")
    }

    #[must_use]
    pub fn table_row(cells: &str) -> String {
        format!("<tr>\n{cells}</tr>\n")
    }

    #[must_use]
    pub fn table_cell(content: &str, header: bool, alignment: Alignment) -> String {
        let tag = if header { "th" } else { "td" };
        let style = match alignment {
            Alignment::None => "",
            Alignment::Left => r#" style="text-align:left""#,
            Alignment::Center => r#" style="text-align:center""#,
            Alignment::Right => r#" style="text-align:right""#,
        };
        format!("<{tag}{style}>{content}</{tag}>\n")
    }

    #[must_use]
    pub fn codespan(code: &str) -> String {
        format!("<code>{}</code>", partial_escape(code))
    }

    #[must_use]
    pub fn linebreak() -> String {
        "<br />\n".to_owned()
    }

    #[must_use]
    pub fn thematic_break() -> String {
        "<hr />\n".to_owned()
    }

    /// Confluence drops form inputs, so task markers render as text.
    #[must_use]
    pub fn task_list_marker(checked: bool) -> String {
        let marker = if checked { "[x] " } else { "[ ] " };
        marker.to_owned()
    }
}

impl Default for ConfluenceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_inline(tag: &str, content: &str) -> String {
    format!("<{tag}>{content}</{tag}>")
}

/// File name component of a path.
fn basename(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Replace each run of newline characters with a single space.
fn collapse_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if matches!(c, '\n' | '\r') {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
