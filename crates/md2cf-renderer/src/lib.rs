//! Markdown to Confluence storage format renderer.
//!
//! [`ConfluenceRenderer`] turns a markdown document into the XHTML-based
//! storage format used by Confluence page bodies. Alongside the body it
//! collects the page title (first level-1 heading), local images to upload as
//! attachments, and links to other local documents.
//!
//! Links to other documents are written with placeholder targets
//! (see [`PLACEHOLDER_PREFIX`]); once the pages exist, replace each
//! [`RelativeLink::replacement`] in the body with the real page URL.
//!
//! # Example
//!
//! ```
//! use md2cf_renderer::ConfluenceRenderer;
//!
//! let mut renderer = ConfluenceRenderer::new();
//! let result = renderer.render_markdown("# Hello\n\n**Bold** text");
//!
//! assert_eq!(result.title.as_deref(), Some("Hello"));
//! assert_eq!(result.body, "<h1>Hello</h1>\n<p><strong>Bold</strong> text</p>\n");
//! ```

mod document;
mod links;
mod node;
mod renderer;
mod state;
mod tag;

pub use document::RenderResult;
pub use links::{
    LinkTracker, PLACEHOLDER_PREFIX, RandomTokens, RelativeLink, SequentialTokens, TokenSource,
    escape_link, has_network_location, is_relative_link,
};
pub use node::{Alignment, Node};
pub use renderer::ConfluenceRenderer;
pub use state::{DocumentState, RendererOptions};
pub use tag::{ConfluenceTag, Namespace};
