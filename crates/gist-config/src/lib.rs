//! Configuration management for gist embedding.
//!
//! Parses `gist.toml` with serde and provides auto-discovery of the config
//! file in parent directories. CLI settings can be applied during load via
//! [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String values support `${VAR}` and `${VAR:-default}`.
//!
//! Expanded fields:
//! - `gist.host`
//! - `embed.host_origin`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the file looked up by discovery.
const CONFIG_FILENAME: &str = "gist.toml";

/// Default gist host.
const DEFAULT_GIST_HOST: &str = "https://gist.github.com";

/// Default origin of the embedding document.
const DEFAULT_HOST_ORIGIN: &str = "app://obsidian.md";

/// Lookup timeout used when the file sets none.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Command-line overrides, applied on top of `gist.toml`.
///
/// `None` leaves the file's value in place.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the gist host base URL.
    pub gist_host: Option<String>,
    /// Override the origin size reports are posted to.
    pub host_origin: Option<String>,
    /// Override the operator stylesheet with the contents of this file.
    pub stylesheet_file: Option<PathBuf>,
    /// Override the HTTP timeout.
    pub timeout_secs: Option<u64>,
}

/// Loaded `gist.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote gist service configuration.
    pub gist: GistConfig,
    /// Embedding configuration (raw, stylesheet not yet resolved).
    embed: EmbedConfigRaw,

    /// Resolved embedding configuration (set after loading).
    #[serde(skip)]
    pub embed_resolved: EmbedConfig,
    /// File the configuration came from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Remote gist service configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GistConfig {
    /// Base URL lookups are built from.
    pub host: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl GistConfig {
    /// HTTP timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for GistConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GIST_HOST.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Embedding configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmbedConfigRaw {
    host_origin: Option<String>,
    stylesheet: Option<String>,
    stylesheet_file: Option<String>,
}

/// Resolved embedding configuration.
#[derive(Debug)]
pub struct EmbedConfig {
    /// Origin the isolated surfaces post their size reports to.
    pub host_origin: String,
    /// `host_origin` came from the config file or the command line rather
    /// than the built-in default.
    pub origin_configured: bool,
    /// Operator stylesheet applied after the remote one.
    pub stylesheet: Option<String>,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            host_origin: DEFAULT_HOST_ORIGIN.to_owned(),
            origin_configured: false,
            stylesheet: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Config file {} does not exist", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Stylesheet file could not be read.
    #[error("Cannot read stylesheet {}: {source}", path.display())]
    Stylesheet {
        /// Resolved stylesheet path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// TOML parsing error.
    #[error("Cannot parse gist.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
    /// A referenced environment variable is unset.
    #[error("Cannot expand {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`gist.host`").
        field: String,
        /// Error message (e.g., "${`GIST_HOST`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn read_stylesheet(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Stylesheet {
        path: path.to_path_buf(),
        source,
    })
}

impl Config {
    /// Load the configuration and apply `cli_settings`.
    ///
    /// An explicit `config_path` must exist. Otherwise discovery searches for `gist.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// a stylesheet file cannot be read, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
            config.validate()?;
        }

        Ok(config)
    }

    /// Overlay command-line overrides. A stylesheet file is read immediately.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if let Some(host) = &settings.gist_host {
            self.gist.host.clone_from(host);
        }
        if let Some(origin) = &settings.host_origin {
            self.embed_resolved.host_origin.clone_from(origin);
            self.embed_resolved.origin_configured = true;
        }
        if let Some(path) = &settings.stylesheet_file {
            self.embed_resolved.stylesheet = Some(read_stylesheet(path)?);
        }
        if let Some(timeout_secs) = settings.timeout_secs {
            self.gist.timeout_secs = timeout_secs;
        }
        Ok(())
    }

    /// Walk up from the working directory looking for `gist.toml`.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Read, expand and resolve one `gist.toml`.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_embed(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check that the effective settings are usable.
    ///
    /// Called by [`Config::load`]; exposed for configurations built in code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.gist.host, "gist.host")?;
        require_http_url(&self.gist.host, "gist.host")?;

        if self.gist.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gist.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        require_non_empty(&self.embed_resolved.host_origin, "embed.host_origin")?;
        Ok(())
    }

    /// Expand `${VAR}` references in the expandable fields.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.gist.host = expand::expand_env(&self.gist.host, "gist.host")?;
        if let Some(origin) = &self.embed.host_origin {
            self.embed.host_origin = Some(expand::expand_env(origin, "embed.host_origin")?);
        }
        Ok(())
    }

    /// Resolve the `[embed]` section, reading `stylesheet_file` relative to
    /// the config directory.
    fn resolve_embed(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let stylesheet = match (&self.embed.stylesheet, &self.embed.stylesheet_file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "embed.stylesheet and embed.stylesheet_file are mutually exclusive".to_owned(),
                ));
            }
            (Some(inline), None) => Some(inline.clone()),
            (None, Some(file)) => Some(read_stylesheet(&config_dir.join(file))?),
            (None, None) => None,
        };

        self.embed_resolved = EmbedConfig {
            host_origin: self
                .embed
                .host_origin
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST_ORIGIN.to_owned()),
            origin_configured: self.embed.host_origin.is_some(),
            stylesheet: stylesheet.filter(|css| !css.trim().is_empty()),
        };
        Ok(())
    }
}
