//! `gist render` command implementation.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use gist_config::{CliSettings, Config};
use gist_embed::{
    GistPlugin, HtmlDocument, LocalMessageBus, PLUGIN_TAG, SurfaceHost, host_listener_script,
    render_markdown, standalone_page,
};

use super::plugin_settings;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    input: PathBuf,

    /// Write HTML to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit a complete HTML page that resizes surfaces by itself.
    #[arg(long)]
    standalone: bool,

    /// Path to configuration file (default: auto-discover gist.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gist service URL (overrides config).
    #[arg(long, env = "GIST_HOST")]
    gist_host: Option<String>,

    /// Origin surfaces report their height to (overrides config).
    /// Defaults to `*` with `--standalone`.
    #[arg(long)]
    host_origin: Option<String>,

    /// CSS file applied inside every surface (overrides config).
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Request timeout in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            gist_host: self.gist_host,
            host_origin: self.host_origin,
            stylesheet_file: self.stylesheet,
            timeout_secs: self.timeout,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            output.detail("Config:", &path.display().to_string());
        }

        let markdown = std::fs::read_to_string(&self.input)?;

        let mut settings = plugin_settings(&config);
        settings.host_origin = surface_origin(&config, self.standalone);
        tracing::debug!(
            input = %self.input.display(),
            gist_host = %settings.gist_host,
            host_origin = %settings.host_origin,
            "Rendering"
        );

        let document = Arc::new(HtmlDocument::new());
        let plugin = GistPlugin::with_ureq(
            &settings,
            Arc::clone(&document) as Arc<dyn SurfaceHost>,
            Arc::new(LocalMessageBus::new()),
        );
        plugin.on_load();
        let result = render_markdown(&markdown, &plugin, &document);
        plugin.on_unload();

        let html = if self.standalone {
            standalone_page(
                &page_title(&self.input),
                &result.html,
                &host_listener_script(PLUGIN_TAG),
            )
        } else {
            result.html.clone()
        };

        if let Some(path) = &self.output {
            std::fs::write(path, &html)?;
            output.success(&format!("Wrote {}", path.display()));
        } else {
            std::io::stdout().lock().write_all(html.as_bytes())?;
        }

        tracing::info!(
            blocks = result.blocks.len(),
            surfaces = result.surface_count(),
            failures = result.failure_count(),
            "Render complete"
        );
        let summary = format!(
            "{} gist(s) embedded, {} failed",
            result.surface_count(),
            result.failure_count()
        );
        if result.failure_count() > 0 {
            output.warning(&summary);
        } else {
            output.info(&summary);
        }

        Ok(())
    }
}

/// Origin the surfaces post their size reports to.
///
/// A standalone page is opened from disk or a local server whose origin is
/// unknown here, so the editor default is replaced by `*`. A configured
/// origin always wins.
fn surface_origin(config: &Config, standalone: bool) -> String {
    if standalone && !config.embed_resolved.origin_configured {
        "*".to_owned()
    } else {
        config.embed_resolved.host_origin.clone()
    }
}

/// Page title for a rendered file: its name without extension.
fn page_title(input: &Path) -> String {
    input
        .file_stem()
        .map_or_else(|| "gists".to_owned(), |stem| stem.to_string_lossy().into_owned())
}
