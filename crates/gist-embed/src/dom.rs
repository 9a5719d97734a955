//! Host DOM contract.
//!
//! The host owns the real document tree. The core only builds detached
//! [`Element`] values and asks the host to insert them through an
//! [`OutputLocation`], or to resize an existing surface through a
//! [`SurfaceHost`].

use std::fmt::Write as _;

/// A host element built by the core.
///
/// Attributes keep insertion order; setting an existing attribute replaces
/// its value in place.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    text: Option<String>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Set the element's text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set or replace an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Element tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Text content.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Serialize to HTML. Attribute values and text are escaped.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(64);
        html.push('<');
        html.push_str(&self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(html, r#" {name}="{}""#, escape_html(value));
        }
        html.push('>');
        if let Some(text) = &self.text {
            html.push_str(&escape_html(text));
        }
        let _ = write!(html, "</{}>", self.tag);
        html
    }
}

/// The output location was destroyed before the content arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("output location is detached")]
pub struct Detached;

/// Host-provided insertion point for one code block's results.
pub trait OutputLocation: Send + Sync {
    /// Whether the location is still part of the host document.
    fn is_attached(&self) -> bool;

    /// Append an element.
    ///
    /// Returns [`Detached`] instead of inserting when the location has been
    /// destroyed.
    fn append(&self, element: Element) -> Result<(), Detached>;
}

/// Host-side lookup of live render surfaces.
pub trait SurfaceHost: Send + Sync {
    /// Set the visible height of the surface with `surface_id`.
    ///
    /// Returns `false` when no live surface has that ID.
    fn set_surface_height(&self, surface_id: &str, height: u32) -> bool;
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
