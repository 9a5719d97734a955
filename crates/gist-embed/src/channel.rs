//! Height negotiation between surfaces and the host.
//!
//! Every surface posts `{sender, surfaceID, contentHeight}` to the host
//! after it loads. [`HeightChannel`] keeps one listener on the host message
//! bus for the plugin's lifetime and applies each valid report to the
//! matching surface through [`SurfaceHost`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::Deserialize;

use crate::consts::OPAQUE_ORIGIN;
use crate::dom::SurfaceHost;

/// A cross-frame message as delivered by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageEvent {
    /// Origin of the sending frame. Sandboxed `srcdoc` frames report `"null"`.
    pub origin: String,
    /// Message payload.
    pub data: serde_json::Value,
}

/// Size report posted by a surface.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HeightReport {
    /// Tag of the plugin that rendered the surface.
    pub sender: String,
    /// Element id of the reporting surface.
    #[serde(rename = "surfaceID")]
    pub surface_id: String,
    /// Scroll height of the surface body in CSS pixels.
    #[serde(rename = "contentHeight")]
    pub content_height: f64,
}

/// What [`apply_height_report`] did with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Height was set on the surface.
    Applied,
    /// No live surface has the reported ID.
    UnknownSurface,
    /// Message did not come from a sandboxed frame.
    ForeignOrigin,
    /// Message was not sent by a surface of this plugin.
    ForeignSender,
    /// Payload is not a usable size report.
    Malformed,
}

/// Validate one message and apply it to `host`.
///
/// Only messages from an opaque origin carrying `tag` as sender are
/// considered. Reports are idempotent: the same report twice leaves the
/// same height.
pub fn apply_height_report(host: &dyn SurfaceHost, tag: &str, event: &MessageEvent) -> ReportOutcome {
    if event.origin != OPAQUE_ORIGIN {
        tracing::trace!(origin = %event.origin, "Ignoring message from foreign origin");
        return ReportOutcome::ForeignOrigin;
    }

    if event.data.get("sender").and_then(serde_json::Value::as_str) != Some(tag) {
        tracing::trace!("Ignoring message from foreign sender");
        return ReportOutcome::ForeignSender;
    }

    let Ok(report) = HeightReport::deserialize(&event.data) else {
        tracing::debug!(data = %event.data, "Ignoring malformed height report");
        return ReportOutcome::Malformed;
    };
    let Some(height) = pixel_height(report.content_height) else {
        tracing::debug!(
            surface = %report.surface_id,
            height = report.content_height,
            "Ignoring invalid content height"
        );
        return ReportOutcome::Malformed;
    };

    if host.set_surface_height(&report.surface_id, height) {
        tracing::trace!(surface = %report.surface_id, height, "Applied surface height");
        ReportOutcome::Applied
    } else {
        tracing::trace!(surface = %report.surface_id, "Height report for unknown surface");
        ReportOutcome::UnknownSurface
    }
}

/// Round a reported height up to whole pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixel_height(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    // Saturating float-to-int cast.
    Some(value.ceil() as u32)
}

/// Callback invoked for every message on a bus.
pub type Listener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Handle of an installed listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Listener installation failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("failed to install message listener: {0}")]
pub struct BusError(pub String);

/// Host-wide cross-frame message bus.
pub trait MessageBus: Send + Sync {
    /// Install `listener` for all subsequent messages.
    fn subscribe(&self, listener: Listener) -> Result<SubscriptionId, BusError>;

    /// Remove a listener. Unknown IDs are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-process [`MessageBus`].
#[derive(Default)]
pub struct LocalMessageBus {
    next_id: AtomicU64,
    listeners: RwLock<BTreeMap<SubscriptionId, Listener>>,
}

impl LocalMessageBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener, in subscription order.
    pub fn post(&self, event: &MessageEvent) {
        // Snapshot so listeners may (un)subscribe while handling.
        let listeners: Vec<Listener> = self.listeners.read().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of installed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().len()
    }
}

impl MessageBus for LocalMessageBus {
    fn subscribe(&self, listener: Listener) -> Result<SubscriptionId, BusError> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().unwrap().insert(id, listener);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().unwrap().remove(&id);
    }
}

#[derive(Debug)]
enum ChannelState {
    Inactive,
    Listening(SubscriptionId),
}

/// Process-wide receiver of surface size reports.
///
/// Owned by the plugin: started on load, stopped on unload.
pub struct HeightChannel {
    tag: String,
    host: Arc<dyn SurfaceHost>,
    bus: Arc<dyn MessageBus>,
    state: Mutex<ChannelState>,
}

impl HeightChannel {
    /// Create an inactive channel.
    pub fn new(tag: impl Into<String>, host: Arc<dyn SurfaceHost>, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            tag: tag.into(),
            host,
            bus,
            state: Mutex::new(ChannelState::Inactive),
        }
    }

    /// Start listening for size reports.
    ///
    /// No-op when already listening.
    pub fn start(&self) -> Result<(), BusError> {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, ChannelState::Listening(_)) {
            return Ok(());
        }

        let tag = self.tag.clone();
        let host = Arc::clone(&self.host);
        let listener: Listener = Arc::new(move |event: &MessageEvent| {
            apply_height_report(host.as_ref(), &tag, event);
        });

        let id = self.bus.subscribe(listener)?;
        *state = ChannelState::Listening(id);
        tracing::debug!(tag = %self.tag, "Height channel listening");
        Ok(())
    }

    /// Stop listening. No-op when inactive.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        if let ChannelState::Listening(id) = *state {
            self.bus.unsubscribe(id);
            *state = ChannelState::Inactive;
            tracing::debug!(tag = %self.tag, "Height channel stopped");
        }
    }

    /// Whether the channel currently has a listener installed.
    pub fn is_listening(&self) -> bool {
        matches!(*self.state.lock().unwrap(), ChannelState::Listening(_))
    }
}

impl Drop for HeightChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Browser-side equivalent of [`HeightChannel`], for static HTML pages.
pub fn host_listener_script(tag: &str) -> String {
    let tag = serde_json::Value::from(tag).to_string().replace("</", "<\\/");
    format!(
        concat!(
            "window.addEventListener('message', function (event) {{\n",
            "  if (event.origin !== 'null') return;\n",
            "  var data = event.data || {{}};\n",
            "  if (data.sender !== {tag}) return;\n",
            "  var height = Number(data.contentHeight);\n",
            "  if (!isFinite(height) || height < 0) return;\n",
            "  var surface = document.getElementById(data.surfaceID);\n",
            "  if (surface) surface.height = Math.ceil(height);\n",
            "}});",
        ),
        tag = tag,
    )
}
