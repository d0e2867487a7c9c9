//! Markdown constructs accepted by the renderer.
//!
//! Each variant carries the fields a markdown engine extracts for that
//! construct. Container variants carry their children already rendered to
//! markup, so an engine renders bottom-up and hands each finished node to
//! [`ConfluenceRenderer::render_node`](crate::ConfluenceRenderer::render_node).

/// Horizontal alignment of a table column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    /// No explicit alignment.
    #[default]
    None,
    Left,
    Center,
    Right,
}

/// A parsed markdown construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node<'a> {
    /// ATX or setext heading.
    Heading {
        /// Plain heading text, used for title extraction.
        text: &'a str,
        /// Rendered inline markup of the heading.
        content: &'a str,
        /// Heading level, 1 for top-level.
        level: u8,
    },
    /// Fenced or indented code block.
    CodeBlock {
        code: &'a str,
        lang: Option<&'a str>,
    },
    Image {
        src: &'a str,
        title: Option<&'a str>,
        alt: Option<&'a str>,
    },
    Link {
        url: &'a str,
        /// Rendered inline markup of the link text.
        text: &'a str,
        title: Option<&'a str>,
    },
    /// Raw inline text.
    Text(&'a str),
    Paragraph(&'a str),
    BlockQuote(&'a str),
    /// Ordered (with start number) or bullet list.
    List {
        start: Option<u64>,
        items: &'a str,
    },
    ListItem(&'a str),
    Table {
        head: &'a str,
        body: &'a str,
    },
    TableRow(&'a str),
    TableCell {
        content: &'a str,
        header: bool,
        alignment: Alignment,
    },
    Emphasis(&'a str),
    Strong(&'a str),
    Strikethrough(&'a str),
    Superscript(&'a str),
    Subscript(&'a str),
    InlineCode(&'a str),
    /// Raw HTML, block or inline.
    Html(&'a str),
    HardBreak,
    Rule,
    TaskListMarker(bool),
    DefinitionList(&'a str),
    DefinitionTitle(&'a str),
    DefinitionDetails(&'a str),
}
