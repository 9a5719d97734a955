//! Inline embedding of gists in Markdown hosts.
//!
//! This crate turns the lines of a `gist` code block into sandboxed,
//! self-sizing render surfaces:
//! - `parse` reads one reference line (`[https://gist.github.com/][owner/]id[#file]`)
//! - `Resolver` fetches the gist's JSON embed description
//! - `render_surface` wraps the remote markup in an isolated `<iframe srcdoc>`
//! - `HeightChannel` applies the size reports surfaces post back to the host
//!
//! # Architecture
//!
//! The host is reached only through traits: [`OutputLocation`] and
//! [`SurfaceHost`] for the document tree, [`MessageBus`] for cross-frame
//! messages and [`HttpClient`] for the network. [`GistPlugin`] wires them
//! together. In-process implementations ([`HtmlDocument`],
//! [`LocalMessageBus`], [`UreqClient`]) plus [`render_markdown`] let the
//! pipeline run without an editor.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gist_embed::{GistPlugin, GistSettings, HtmlDocument, LocalMessageBus, render_markdown};
//!
//! let document = Arc::new(HtmlDocument::new());
//! let bus = Arc::new(LocalMessageBus::new());
//! let plugin = GistPlugin::with_ureq(&GistSettings::default(), Arc::clone(&document) as _, bus);
//! plugin.on_load();
//!
//! let result = render_markdown("```gist\naa5a315d61ae9438b18d\n```", &plugin, &document);
//! println!("{}", result.html);
//! ```

mod channel;
mod consts;
mod document;
mod dom;
mod markdown;
mod plugin;
mod processor;
mod reference;
mod resolver;
mod surface;

pub use channel::{
    BusError, HeightChannel, HeightReport, Listener, LocalMessageBus, MessageBus, MessageEvent,
    ReportOutcome, SubscriptionId, apply_height_report, host_listener_script,
};
pub use consts::{BLOCK_LANGUAGE, DEFAULT_GIST_HOST, DEFAULT_HOST_ORIGIN, DEFAULT_TIMEOUT, PLUGIN_TAG};
pub use document::{HtmlDocument, HtmlOutput};
pub use dom::{Detached, Element, OutputLocation, SurfaceHost, escape_html};
pub use markdown::{MarkdownRender, render_markdown, standalone_page};
pub use plugin::{GistPlugin, GistSettings};
pub use processor::{BlockOutcome, GistProcessor};
pub use reference::{ParseError, Reference, parse};
pub use resolver::{FetchError, HttpClient, HttpResponse, RemoteDocument, Resolver, TransportError, UreqClient};
pub use surface::{SurfaceId, SurfaceOptions, build_surface, error_block, render_error, render_surface};
