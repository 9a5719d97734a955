//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod render;

pub(crate) use check::CheckArgs;
pub(crate) use render::RenderArgs;

use gist_config::Config;
use gist_embed::GistSettings;

/// Plugin settings for a loaded configuration.
pub(crate) fn plugin_settings(config: &Config) -> GistSettings {
    GistSettings {
        gist_host: config.gist.host.clone(),
        host_origin: config.embed_resolved.host_origin.clone(),
        stylesheet: config.embed_resolved.stylesheet.clone(),
        timeout: config.gist.timeout(),
    }
}
