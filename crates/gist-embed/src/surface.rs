//! Isolated rendering surfaces.
//!
//! Each resolved gist is wrapped in a sandboxed `<iframe srcdoc>`: the remote
//! markup and stylesheet get their own script and style scope, links target
//! the host's top-level frame, and an inline script reports the content
//! height back to the host (see [`crate::channel`]).
//!
//! Failures render as a `<pre>` block naming the original reference line.

use std::fmt;

use uuid::Uuid;

use crate::consts::{DEFAULT_HOST_ORIGIN, PLUGIN_TAG, SANDBOX_POLICY, SURFACE_CLASS};
use crate::dom::{Detached, Element, OutputLocation, escape_html};
use crate::reference::Reference;
use crate::resolver::RemoteDocument;

/// Reset applied inside every surface so its natural height is measurable.
const RESET_STYLE: &str = "html, body { margin: 0; padding: 0; height: 100%; }";

/// Unique ID of one render surface, used to correlate size reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(String);

impl SurfaceId {
    /// Allocate a fresh ID for a surface showing `reference`.
    ///
    /// Format: `<tag>-<identifier>-<uuid>`.
    pub fn generate(tag: &str, reference: &Reference) -> Self {
        Self(format!(
            "{tag}-{}-{}",
            reference.identifier(),
            Uuid::new_v4().simple()
        ))
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings every surface is built with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Sender tag embedded in size reports.
    pub tag: String,
    /// Origin size reports are posted to.
    pub host_origin: String,
    /// Operator stylesheet, applied after the remote one.
    pub custom_stylesheet: Option<String>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            tag: PLUGIN_TAG.to_owned(),
            host_origin: DEFAULT_HOST_ORIGIN.to_owned(),
            custom_stylesheet: None,
        }
    }
}

/// Build the surface element for `document` without inserting it.
pub fn build_surface(
    reference: &Reference,
    document: &RemoteDocument,
    options: &SurfaceOptions,
) -> (SurfaceId, Element) {
    let id = SurfaceId::generate(&options.tag, reference);
    let srcdoc = surface_document(&id, document, options);

    let element = Element::new("iframe")
        .with_attr("id", id.as_str())
        .with_attr("class", SURFACE_CLASS)
        .with_attr("sandbox", SANDBOX_POLICY)
        .with_attr("loading", "lazy")
        .with_attr("srcdoc", srcdoc);

    (id, element)
}

/// Build a surface for `document` and append it to `output`.
pub fn render_surface(
    output: &dyn OutputLocation,
    reference: &Reference,
    document: &RemoteDocument,
    options: &SurfaceOptions,
) -> Result<SurfaceId, Detached> {
    let (id, element) = build_surface(reference, document, options);
    output.append(element)?;
    tracing::debug!(surface = %id, "Inserted gist surface");
    Ok(id)
}

/// Build the `<pre>` block shown in place of a gist that failed to load.
pub fn error_block(line: &str, message: &str) -> Element {
    let text = format!("Failed to load the Gist ({line}).\n\nError:\n\n  {message}");
    Element::new("pre")
        .with_attr("class", "gist-embed-error")
        .with_text(text)
}

/// Append an error block to `output`.
pub fn render_error(output: &dyn OutputLocation, line: &str, message: &str) -> Result<(), Detached> {
    output.append(error_block(line, message))
}

/// Standalone HTML document loaded into the surface frame.
fn surface_document(id: &SurfaceId, document: &RemoteDocument, options: &SurfaceOptions) -> String {
    let custom_style = options
        .custom_stylesheet
        .as_deref()
        .map(|css| format!("<style>{}</style>", neutralize_end_tags(css)))
        .unwrap_or_default();

    format!(
        concat!(
            "<html>\n",
            "<head>\n",
            "<style>{reset}</style>\n",
            "<base target=\"_top\">\n",
            "<script>{script}</script>\n",
            "<link rel=\"stylesheet\" href=\"{stylesheet}\">\n",
            "{custom_style}\n",
            "</head>\n",
            "<body>\n",
            "{markup}\n",
            "</body>\n",
            "</html>\n",
        ),
        reset = RESET_STYLE,
        script = height_report_script(id, options),
        stylesheet = escape_html(&document.stylesheet),
        custom_style = custom_style,
        markup = document.markup,
    )
}

/// Script posting `{sender, surfaceID, contentHeight}` to the host on load
/// and on every later resize of the body.
fn height_report_script(id: &SurfaceId, options: &SurfaceOptions) -> String {
    let script = format!(
        concat!(
            "(function () {{\n",
            "  function report() {{\n",
            "    top.postMessage({{\n",
            "      sender: {tag},\n",
            "      surfaceID: {id},\n",
            "      contentHeight: document.body.scrollHeight\n",
            "    }}, {origin});\n",
            "  }}\n",
            "  window.addEventListener('load', function () {{\n",
            "    report();\n",
            "    if (window.ResizeObserver) {{\n",
            "      new ResizeObserver(report).observe(document.body);\n",
            "    }}\n",
            "  }});\n",
            "}})();",
        ),
        tag = js_string(&options.tag),
        id = js_string(id.as_str()),
        origin = js_string(&options.host_origin),
    );
    neutralize_end_tags(&script)
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Keep embedded text from closing its `<script>`/`<style>` element early.
fn neutralize_end_tags(text: &str) -> String {
    text.replace("</", "<\\/")
}
