//! Plugin façade tying the pipeline to a host.

use std::sync::Arc;
use std::time::Duration;

use crate::channel::{HeightChannel, MessageBus};
use crate::consts::{BLOCK_LANGUAGE, DEFAULT_GIST_HOST, DEFAULT_HOST_ORIGIN, DEFAULT_TIMEOUT, PLUGIN_TAG};
use crate::dom::{OutputLocation, SurfaceHost};
use crate::processor::{BlockOutcome, GistProcessor};
use crate::resolver::{HttpClient, Resolver, UreqClient};
use crate::surface::SurfaceOptions;

/// User-facing plugin settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GistSettings {
    /// Base URL of the gist service.
    pub gist_host: String,
    /// Origin surfaces post size reports to.
    pub host_origin: String,
    /// Extra CSS applied inside every surface.
    pub stylesheet: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GistSettings {
    fn default() -> Self {
        Self {
            gist_host: DEFAULT_GIST_HOST.to_owned(),
            host_origin: DEFAULT_HOST_ORIGIN.to_owned(),
            stylesheet: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The gist plugin as seen by a host.
///
/// The host calls [`on_load`](Self::on_load) once, then
/// [`process_block`](Self::process_block) for every `gist` code block it
/// renders, and [`on_unload`](Self::on_unload) when the plugin is disabled.
pub struct GistPlugin {
    processor: GistProcessor,
    channel: HeightChannel,
}

impl GistPlugin {
    /// Create a plugin using `client` for lookups.
    pub fn new(
        settings: &GistSettings,
        client: Arc<dyn HttpClient>,
        host: Arc<dyn SurfaceHost>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let options = SurfaceOptions {
            tag: PLUGIN_TAG.to_owned(),
            host_origin: settings.host_origin.clone(),
            custom_stylesheet: settings.stylesheet.clone(),
        };
        Self {
            processor: GistProcessor::new(Resolver::new(settings.gist_host.as_str(), client), options),
            channel: HeightChannel::new(PLUGIN_TAG, host, bus),
        }
    }

    /// Create a plugin that fetches over HTTP with `ureq`.
    pub fn with_ureq(
        settings: &GistSettings,
        host: Arc<dyn SurfaceHost>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        let client = Arc::new(UreqClient::new(settings.timeout));
        Self::new(settings, client, host, bus)
    }

    /// Code block language handled by the plugin.
    pub fn block_language(&self) -> &'static str {
        BLOCK_LANGUAGE
    }

    /// Start the height channel.
    ///
    /// A failure is logged; surfaces still render but keep their initial
    /// height.
    pub fn on_load(&self) {
        if let Err(e) = self.channel.start() {
            tracing::warn!(error = %e, "Height channel unavailable, surfaces will not resize");
        }
    }

    /// Stop the height channel.
    pub fn on_unload(&self) {
        self.channel.stop();
    }

    /// Whether size reports are currently being applied.
    pub fn is_listening(&self) -> bool {
        self.channel.is_listening()
    }

    /// Render one `gist` code block into `output`.
    pub fn process_block(&self, source: &str, output: &dyn OutputLocation) -> BlockOutcome {
        self.processor.process(source, output)
    }

    /// Surface options in effect.
    pub fn surface_options(&self) -> &SurfaceOptions {
        self.processor.options()
    }
}
