//! Whole-document rendering from pulldown-cmark events.
//!
//! Events are assembled bottom-up: every start tag opens a frame that collects
//! its children's markup, and the matching end tag turns the frame into a
//! [`Node`] for [`ConfluenceRenderer::render_node`].

use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::links::RelativeLink;
use crate::node::{Alignment, Node};
use crate::renderer::ConfluenceRenderer;

/// Result of rendering a markdown document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderResult {
    /// Storage format page body.
    pub body: String,
    /// Title taken from the first level-1 heading.
    pub title: Option<String>,
    /// Local image paths, in encounter order.
    pub attachments: Vec<String>,
    /// Relative links replaced by placeholders in `body`.
    pub relative_links: Vec<RelativeLink>,
}

impl RenderResult {
    /// Attachment paths resolved against the document's directory.
    ///
    /// Absolute paths are returned unchanged.
    #[must_use]
    pub fn attachment_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.attachments
            .iter()
            .map(|attachment| base_dir.join(attachment))
            .collect()
    }
}

impl ConfluenceRenderer {
    /// Markdown extensions enabled for [`render_markdown`](Self::render_markdown).
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.options.gfm {
            Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
        } else {
            Options::empty()
        }
    }

    /// Parse and render a markdown document.
    pub fn render_markdown(&mut self, markdown: &str) -> RenderResult {
        let parser = Parser::new_ext(markdown, self.parser_options());
        self.render(parser)
    }

    /// Render markdown events to a page body.
    ///
    /// The document state collected while rendering moves into the result,
    /// leaving the renderer ready for the next document.
    pub fn render<'a, I>(&mut self, events: I) -> RenderResult
    where
        I: Iterator<Item = Event<'a>>,
    {
        let mut walker = EventWalker::new(self);
        for event in events {
            walker.process_event(event);
        }
        let body = walker.finish();

        let (title, attachments) = std::mem::take(&mut self.state).into_parts();
        let relative_links = self.links.take_links();
        tracing::debug!(
            title = title.as_deref(),
            attachments = attachments.len(),
            relative_links = relative_links.len(),
            "Rendered document"
        );

        RenderResult {
            body,
            title,
            attachments,
            relative_links,
        }
    }
}

/// Children collected for an open tag.
struct Frame<'a> {
    tag: Tag<'a>,
    /// Rendered child markup.
    markup: String,
    /// Plain child text, for titles and alt text.
    plain: String,
    /// Rendered header row of a table, kept apart from body rows.
    table_head: Option<String>,
}

impl<'a> Frame<'a> {
    fn new(tag: Tag<'a>) -> Self {
        Self {
            tag,
            markup: String::new(),
            plain: String::new(),
            table_head: None,
        }
    }
}

/// Column tracking for the table being rendered.
#[derive(Default)]
struct TableState {
    /// Whether we're inside the table header row.
    in_head: bool,
    /// Column alignments for current table.
    alignments: Vec<Alignment>,
    /// Current column index in table row.
    cell_index: usize,
}

impl TableState {
    fn start(&mut self, alignments: &[pulldown_cmark::Alignment]) {
        self.alignments = alignments.iter().copied().map(convert_alignment).collect();
        self.in_head = false;
        self.cell_index = 0;
    }

    fn start_head(&mut self) {
        self.in_head = true;
        self.cell_index = 0;
    }

    fn end_head(&mut self) {
        self.in_head = false;
    }

    fn start_row(&mut self) {
        self.cell_index = 0;
    }

    fn next_cell(&mut self) {
        self.cell_index += 1;
    }

    fn current_alignment(&self) -> Alignment {
        self.alignments
            .get(self.cell_index)
            .copied()
            .unwrap_or_default()
    }
}

struct EventWalker<'a, 'r> {
    renderer: &'r mut ConfluenceRenderer,
    body: String,
    frames: Vec<Frame<'a>>,
    /// Text and soft breaks not yet passed to the text generator.
    pending_text: String,
    table: TableState,
}

impl<'a, 'r> EventWalker<'a, 'r> {
    fn new(renderer: &'r mut ConfluenceRenderer) -> Self {
        Self {
            renderer,
            body: String::with_capacity(4096),
            frames: Vec::new(),
            pending_text: String::new(),
            table: TableState::default(),
        }
    }

    fn process_event(&mut self, event: Event<'a>) {
        match event {
            Event::Text(text) => self.text(&text),
            Event::SoftBreak => self.text("\n"),
            event => {
                self.flush_text();
                match event {
                    Event::Start(tag) => self.start_tag(tag),
                    Event::End(_) => self.end_tag(),
                    Event::Code(code) => {
                        let markup = self.renderer.render_node(Node::InlineCode(&code));
                        self.push_output(&markup, &code);
                    }
                    Event::Html(html) | Event::InlineHtml(html) => {
                        self.push_output(&html, "");
                    }
                    Event::HardBreak => {
                        let markup = self.renderer.render_node(Node::HardBreak);
                        self.push_output(&markup, " ");
                    }
                    Event::Rule => {
                        let markup = self.renderer.render_node(Node::Rule);
                        self.push_output(&markup, "");
                    }
                    Event::TaskListMarker(checked) => {
                        let markup = self.renderer.render_node(Node::TaskListMarker(checked));
                        self.push_output(&markup, "");
                    }
                    Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                        // Not supported
                    }
                    Event::Text(_) | Event::SoftBreak => {}
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        match self.frames.last_mut() {
            Some(frame) if matches!(frame.tag, Tag::CodeBlock(_)) => frame.markup.push_str(text),
            Some(frame) if matches!(frame.tag, Tag::Image { .. }) => frame.plain.push_str(text),
            Some(frame) if matches!(frame.tag, Tag::MetadataBlock(_)) => {}
            _ => self.pending_text.push_str(text),
        }
    }

    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending_text);
        let markup = self.renderer.render_node(Node::Text(&text));
        self.push_output(&markup, &text);
    }

    fn push_output(&mut self, markup: &str, plain: &str) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.markup.push_str(markup);
                frame.plain.push_str(plain);
            }
            None => self.body.push_str(markup),
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>) {
        match &tag {
            Tag::Table(alignments) => self.table.start(alignments),
            Tag::TableHead => self.table.start_head(),
            Tag::TableRow => self.table.start_row(),
            _ => {}
        }
        self.frames.push(Frame::new(tag));
    }

    #[allow(clippy::too_many_lines)]
    fn end_tag(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let Frame {
            tag,
            markup,
            plain,
            table_head,
        } = frame;

        let output = match tag {
            Tag::Paragraph => self.renderer.render_node(Node::Paragraph(&markup)),
            Tag::Heading { level, .. } => self.renderer.render_node(Node::Heading {
                text: plain.trim(),
                content: markup.trim(),
                level: heading_level_to_num(level),
            }),
            Tag::BlockQuote(_) => self.renderer.render_node(Node::BlockQuote(&markup)),
            Tag::CodeBlock(kind) => {
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next(),
                    CodeBlockKind::Indented => None,
                };
                self.renderer.render_node(Node::CodeBlock {
                    code: &markup,
                    lang,
                })
            }
            Tag::HtmlBlock => markup,
            Tag::List(start) => self.renderer.render_node(Node::List {
                start,
                items: &markup,
            }),
            Tag::Item => self.renderer.render_node(Node::ListItem(&markup)),
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => String::new(),
            Tag::DefinitionList => self.renderer.render_node(Node::DefinitionList(&markup)),
            Tag::DefinitionListTitle => self.renderer.render_node(Node::DefinitionTitle(&markup)),
            Tag::DefinitionListDefinition => {
                self.renderer.render_node(Node::DefinitionDetails(&markup))
            }
            Tag::Table(_) => self.renderer.render_node(Node::Table {
                head: table_head.as_deref().unwrap_or_default(),
                body: &markup,
            }),
            Tag::TableHead => {
                let row = self.renderer.render_node(Node::TableRow(&markup));
                self.table.end_head();
                if let Some(table) = self.frames.last_mut() {
                    table.table_head = Some(row);
                    table.plain.push_str(&plain);
                }
                return;
            }
            Tag::TableRow => self.renderer.render_node(Node::TableRow(&markup)),
            Tag::TableCell => {
                let cell = self.renderer.render_node(Node::TableCell {
                    content: &markup,
                    header: self.table.in_head,
                    alignment: self.table.current_alignment(),
                });
                self.table.next_cell();
                cell
            }
            Tag::Emphasis => self.renderer.render_node(Node::Emphasis(&markup)),
            Tag::Strong => self.renderer.render_node(Node::Strong(&markup)),
            Tag::Strikethrough => self.renderer.render_node(Node::Strikethrough(&markup)),
            Tag::Superscript => self.renderer.render_node(Node::Superscript(&markup)),
            Tag::Subscript => self.renderer.render_node(Node::Subscript(&markup)),
            Tag::Link {
                dest_url, title, ..
            } => self.renderer.render_node(Node::Link {
                url: &dest_url,
                text: &markup,
                title: non_empty(&title),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.renderer.render_node(Node::Image {
                src: &dest_url,
                title: non_empty(&title),
                alt: Some(&plain),
            }),
        };

        self.push_output(&output, &plain);
    }

    /// Flush trailing text and close any frames left open.
    fn finish(mut self) -> String {
        self.flush_text();
        while let Some(frame) = self.frames.pop() {
            self.push_output(&frame.markup, &frame.plain);
        }
        self.body
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn convert_alignment(alignment: pulldown_cmark::Alignment) -> Alignment {
    match alignment {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::links::SequentialTokens;
    use crate::state::RendererOptions;

    fn render(markdown: &str) -> RenderResult {
        ConfluenceRenderer::new().render_markdown(markdown)
    }

    fn render_with(options: RendererOptions, markdown: &str) -> RenderResult {
        ConfluenceRenderer::with_options(options)
            .with_token_source(SequentialTokens::default())
            .render_markdown(markdown)
    }

    #[test]
    fn test_paragraph() {
        assert_eq!(render("Hello, world!").body, "<p>Hello, world!</p>\n");
    }

    #[test]
    fn test_paragraph_escapes_text() {
        assert_eq!(render("a < b & c").body, "<p>a &lt; b &amp; c</p>\n");
    }

    #[test]
    fn test_title_extraction() {
        let result = render("## Intro\n\n# My Title\n\n# Another");
        assert_eq!(result.title.as_deref(), Some("My Title"));
        assert_eq!(
            result.body,
            "<h2>Intro</h2>\n<h1>My Title</h1>\n<h1>Another</h1>\n"
        );
    }

    #[test]
    fn test_strip_header() {
        let options = RendererOptions {
            strip_header: true,
            ..RendererOptions::default()
        };
        let result = render_with(options, "# My Title\n\nBody\n\n# Second");
        assert_eq!(result.title.as_deref(), Some("My Title"));
        assert_eq!(result.body, "<p>Body</p>\n<h1>Second</h1>\n");
    }

    #[test]
    fn test_heading_with_inline_markup() {
        let result = render("# Install `npm` *now*");
        assert_eq!(result.title.as_deref(), Some("Install npm now"));
        assert_eq!(
            result.body,
            "<h1>Install <code>npm</code> <em>now</em></h1>\n"
        );
    }

    #[test]
    fn test_code_block_with_language() {
        let result = render("```rust\nfn main() {}\n```");
        assert_eq!(
            result.body,
            concat!(
                r#"<ac:structured-macro ac:name="code">"#,
                r#"<ac:parameter ac:name="language">rust</ac:parameter>"#,
                "\n",
                r#"<ac:parameter ac:name="linenumbers">true</ac:parameter>"#,
                "\n",
                "<ac:plain-text-body><![CDATA[fn main() {}\n]]></ac:plain-text-body>\n",
                "</ac:structured-macro>\n",
            )
        );
    }

    #[test]
    fn test_code_block_keeps_raw_text() {
        let options = RendererOptions {
            remove_text_newlines: true,
            ..RendererOptions::default()
        };
        let result = render_with(options, "```\na < b\nc && d\n```");
        assert!(result.body.contains("<![CDATA[a < b\nc && d\n]]>"));
        assert!(!result.body.contains(r#"ac:name="language""#));
    }

    #[test]
    fn test_code_block_language_ignores_fence_attributes() {
        let result = render("```python title=example\nprint(1)\n```");
        assert!(
            result
                .body
                .contains(r#"<ac:parameter ac:name="language">python</ac:parameter>"#)
        );
    }

    #[test]
    fn test_images() {
        let result = render("![Alt *text*](images/diagram.png \"Diagram\")\n\n![](https://example.com/a.png)");
        assert_eq!(
            result.body,
            concat!(
                "<p><ac:image ac:alt=\"Alt text\" ac:title=\"Diagram\">",
                "<ri:attachment ri:filename=\"diagram.png\"></ri:attachment>\n",
                "</ac:image>\n</p>\n",
                "<p><ac:image ac:alt=\"\">",
                "<ri:url ri:value=\"https://example.com/a.png\"></ri:url>\n",
                "</ac:image>\n</p>\n",
            )
        );
        assert_eq!(result.attachments, vec!["images/diagram.png".to_owned()]);
    }

    #[test]
    fn test_links_without_relative_handling() {
        let result = render("[Guide](guide.md#setup) and [site](https://example.com \"Site\")");
        assert_eq!(
            result.body,
            concat!(
                r##"<p><a href="guide.md#setup">Guide</a> and "##,
                r#"<a href="https://example.com" title="Site">site</a></p>"#,
                "\n",
            )
        );
        assert!(result.relative_links.is_empty());
    }

    #[test]
    fn test_relative_links() {
        let options = RendererOptions {
            enable_relative_links: true,
            ..RendererOptions::default()
        };
        let result = render_with(
            options,
            "See [the **guide**](../guide.md#setup), [top](#top) and [faq](faq.md).",
        );
        assert_eq!(
            result.body,
            concat!(
                r#"<p>See <a href="md2cf-internal-link-0000000000000000">the <strong>guide</strong></a>, "#,
                r##"<a href="#top">top</a> and "##,
                r#"<a href="md2cf-internal-link-0000000000000001">faq</a>.</p>"#,
                "\n",
            )
        );
        assert_eq!(result.relative_links.len(), 2);
        assert_eq!(result.relative_links[0].path, "../guide.md");
        assert_eq!(result.relative_links[0].fragment, "setup");
        assert_eq!(result.relative_links[1].original, "faq.md");
    }

    #[test]
    fn test_remove_text_newlines() {
        let options = RendererOptions {
            remove_text_newlines: true,
            ..RendererOptions::default()
        };
        let result = render_with(options, "This is a paragraph\nwith some newlines\nin it.");
        assert_eq!(
            result.body,
            "<p>This is a paragraph with some newlines in it.</p>\n"
        );
    }

    #[test]
    fn test_soft_breaks_kept_by_default() {
        assert_eq!(render("one\ntwo").body, "<p>one\ntwo</p>\n");
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            render("- a\n- b").body,
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
        assert_eq!(
            render("3. a\n4. b").body,
            "<ol start=\"3\">\n<li>a</li>\n<li>b</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_task_list() {
        let result = render("- [ ] todo\n- [x] done");
        assert_eq!(
            result.body,
            "<ul>\n<li>[ ] todo</li>\n<li>[x] done</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_table() {
        let result = render("| A | B |\n|:--|--:|\n| 1 | 2 |");
        assert_eq!(
            result.body,
            concat!(
                "<table>\n<thead>\n<tr>\n",
                "<th style=\"text-align:left\">A</th>\n",
                "<th style=\"text-align:right\">B</th>\n",
                "</tr>\n</thead>\n<tbody>\n<tr>\n",
                "<td style=\"text-align:left\">1</td>\n",
                "<td style=\"text-align:right\">2</td>\n",
                "</tr>\n</tbody>\n</table>\n",
            )
        );
    }

    #[test]
    fn test_tables_disabled_without_gfm() {
        let options = RendererOptions {
            gfm: false,
            ..RendererOptions::default()
        };
        let result = render_with(options, "| A | B |\n|---|---|\n| 1 | 2 |");
        assert!(!result.body.contains("<table>"));
    }

    #[test]
    fn test_blockquote_and_rule() {
        assert_eq!(
            render("> Note\n\n---").body,
            "<blockquote>\n<p>Note</p>\n</blockquote>\n<hr />\n"
        );
    }

    #[test]
    fn test_inline_formatting() {
        assert_eq!(
            render("*em* **strong** ~~gone~~ `a<b`").body,
            "<p><em>em</em> <strong>strong</strong> <s>gone</s> <code>a&lt;b</code></p>\n"
        );
    }

    #[test]
    fn test_hard_break() {
        assert_eq!(render("one  \ntwo").body, "<p>one<br />\ntwo</p>\n");
    }

    #[test]
    fn test_raw_html_passthrough() {
        assert_eq!(
            render("<div>raw</div>\n").body,
            "<div>raw</div>\n"
        );
    }

    #[test]
    fn test_render_hands_over_state() {
        let options = RendererOptions {
            enable_relative_links: true,
            ..RendererOptions::default()
        };
        let mut renderer =
            ConfluenceRenderer::with_options(options).with_token_source(SequentialTokens::default());

        let first = renderer.render_markdown("# One\n\n![](a.png) [x](x.md)");
        assert_eq!(renderer.title(), None);
        assert!(renderer.attachments().is_empty());
        assert!(renderer.relative_links().is_empty());

        let second = renderer.render_markdown("# Two\n\n[y](y.md)");
        assert_eq!(first.title.as_deref(), Some("One"));
        assert_eq!(first.attachments, vec!["a.png".to_owned()]);
        assert_eq!(second.title.as_deref(), Some("Two"));
        assert!(second.attachments.is_empty());
        assert_eq!(second.relative_links.len(), 1);
        assert_ne!(
            first.relative_links[0].replacement,
            second.relative_links[0].replacement
        );
    }

    #[test]
    fn test_attachment_paths() {
        let result = RenderResult {
            attachments: vec!["img/a.png".to_owned(), "/abs/b.png".to_owned()],
            ..RenderResult::default()
        };
        assert_eq!(
            result.attachment_paths(Path::new("/docs")),
            vec![PathBuf::from("/docs/img/a.png"), PathBuf::from("/abs/b.png")]
        );
    }

    #[test]
    fn test_parser_options() {
        let renderer = ConfluenceRenderer::new();
        assert!(renderer.parser_options().contains(Options::ENABLE_TABLES));

        let renderer = ConfluenceRenderer::with_options(RendererOptions {
            gfm: false,
            ..RendererOptions::default()
        });
        assert!(renderer.parser_options().is_empty());
    }
}
