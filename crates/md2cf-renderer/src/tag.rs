//! Namespaced XML element builder for Confluence storage format.
//!
//! [`ConfluenceTag`] renders a single `ac:`/`ri:` element with its attributes,
//! children and text payload. Output is deterministic: attributes are emitted
//! in sorted order and every element ends with a line break.

use std::collections::BTreeMap;
use std::fmt;

use quick_xml::escape::{escape, partial_escape};

/// Namespace prefix of a storage format element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Namespace {
    /// `ac:` (Atlassian Confluence) elements such as macros and images.
    #[default]
    Ac,
    /// `ri:` (resource identifier) elements such as URLs and attachments.
    Ri,
}

impl Namespace {
    /// Prefix without the trailing colon.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Ac => "ac",
            Self::Ri => "ri",
        }
    }
}

/// A storage format element under construction.
///
/// # Example
///
/// ```
/// use md2cf_renderer::ConfluenceTag;
///
/// let tag = ConfluenceTag::new("parameter")
///     .with_attribute("name", "linenumbers")
///     .with_text("true");
/// assert_eq!(
///     tag.render(),
///     "<ac:parameter ac:name=\"linenumbers\">true</ac:parameter>\n"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfluenceTag {
    name: String,
    namespace: Namespace,
    text: Option<String>,
    cdata: bool,
    attributes: BTreeMap<String, String>,
    children: Vec<ConfluenceTag>,
}

impl ConfluenceTag {
    /// Create an empty `ac:` element.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Namespace::Ac,
            text: None,
            cdata: false,
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Place the element (and its attributes) in another namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = namespace;
        self
    }

    /// Set an attribute. Setting the same name twice keeps the last value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text payload, escaped on render.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.cdata = false;
        self
    }

    /// Set the text payload, wrapped in a CDATA section on render.
    ///
    /// The payload must not contain `]]>`.
    #[must_use]
    pub fn with_cdata(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self.cdata = true;
        self
    }

    /// Append a child element.
    pub fn append(&mut self, child: ConfluenceTag) {
        self.children.push(child);
    }

    /// Append a child element, builder style.
    #[must_use]
    pub fn with_child(mut self, child: ConfluenceTag) -> Self {
        self.append(child);
        self
    }

    /// Element name without namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element namespace.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Text payload, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Whether the text payload is rendered as CDATA.
    #[must_use]
    pub fn is_cdata(&self) -> bool {
        self.cdata
    }

    /// Attribute value by bare name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements in insertion order.
    #[must_use]
    pub fn children(&self) -> &[ConfluenceTag] {
        &self.children
    }

    /// Join a bare name and a namespace prefix: `prefix:name`.
    ///
    /// Not idempotent; callers must not apply it to an already prefixed name.
    #[must_use]
    pub fn add_namespace(name: &str, prefix: &str) -> String {
        format!("{prefix}:{name}")
    }

    /// Render the element and its children to markup.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    /// Render into an existing buffer.
    pub fn render_into(&self, out: &mut String) {
        let prefix = self.namespace.prefix();
        let name = Self::add_namespace(&self.name, prefix);

        out.push('<');
        out.push_str(&name);
        for (key, value) in &self.attributes {
            out.push(' ');
            if key.contains(':') {
                out.push_str(key);
            } else {
                out.push_str(&Self::add_namespace(key, prefix));
            }
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        out.push('>');

        for child in &self.children {
            child.render_into(out);
        }

        if let Some(text) = &self.text {
            if self.cdata {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            } else {
                out.push_str(&partial_escape(text.as_str()));
            }
        }

        out.push_str("</");
        out.push_str(&name);
        out.push_str(">\n");
    }
}

impl fmt::Display for ConfluenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
