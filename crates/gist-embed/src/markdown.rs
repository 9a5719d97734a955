//! Markdown driver.
//!
//! Plays the host's part for plain Markdown files: every fenced code block
//! whose info string starts with `gist` is handed to the plugin, and the
//! resulting surfaces replace the block in the HTML output.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::document::HtmlDocument;
use crate::plugin::GistPlugin;
use crate::processor::BlockOutcome;

/// Result of rendering a Markdown document.
#[derive(Debug, Default)]
pub struct MarkdownRender {
    /// Rendered HTML.
    pub html: String,
    /// One outcome per `gist` block, in document order.
    pub blocks: Vec<BlockOutcome>,
}

impl MarkdownRender {
    /// Number of surfaces inserted across all blocks.
    pub fn surface_count(&self) -> usize {
        self.blocks.iter().map(|b| b.surfaces.len()).sum()
    }

    /// Number of error blocks inserted across all blocks.
    pub fn failure_count(&self) -> usize {
        self.blocks.iter().map(|b| b.failures.len()).sum()
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

fn is_block_of(kind: &CodeBlockKind<'_>, language: &str) -> bool {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next() == Some(language),
        CodeBlockKind::Indented => false,
    }
}

/// Render `markdown` to HTML, expanding `gist` blocks through `plugin`.
///
/// Each block gets its own output location in `document`, so the same
/// document can later receive size reports for the inserted surfaces.
pub fn render_markdown(markdown: &str, plugin: &GistPlugin, document: &HtmlDocument) -> MarkdownRender {
    let language = plugin.block_language();
    let mut blocks = Vec::new();
    let mut events: Vec<Event<'_>> = Vec::new();
    // Source of the gist block being collected.
    let mut pending: Option<String> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::CodeBlock(ref kind)) if is_block_of(kind, language) => {
                pending = Some(String::new());
            }
            Event::Text(ref text) if pending.is_some() => {
                if let Some(source) = pending.as_mut() {
                    source.push_str(text);
                }
            }
            Event::End(TagEnd::CodeBlock) if pending.is_some() => {
                let source = pending.take().unwrap_or_default();
                let output = document.create_output();
                let outcome = plugin.process_block(&source, &output);
                tracing::debug!(
                    surfaces = outcome.surfaces.len(),
                    failures = outcome.failures.len(),
                    "Rendered gist block"
                );
                let block_html = format!(
                    "<div class=\"block-language-{language}\">{}</div>\n",
                    output.to_html()
                );
                events.push(Event::Html(CowStr::from(block_html)));
                blocks.push(outcome);
            }
            event => events.push(event),
        }
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html, events.into_iter());
    MarkdownRender { html, blocks }
}

/// Wrap rendered body HTML in a standalone page.
///
/// `listener_script` is placed in the head so surfaces can report their
/// height to the page.
pub fn standalone_page(title: &str, body: &str, listener_script: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n",
            "<head>\n",
            "<meta charset=\"utf-8\">\n",
            "<title>{title}</title>\n",
            "<style>.gist-embed-container {{ width: 100%; border: 0; }}</style>\n",
            "<script>{script}</script>\n",
            "</head>\n",
            "<body>\n",
            "{body}",
            "</body>\n",
            "</html>\n",
        ),
        title = crate::dom::escape_html(title),
        script = listener_script,
        body = body,
    )
}
