//! `gist check` command implementation.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use gist_config::{CliSettings, Config};
use gist_embed::{Reference, Resolver, UreqClient, parse};

use super::plugin_settings;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    /// Gist references, one per argument.
    #[arg(required = true)]
    references: Vec<String>,

    /// Also fetch every valid reference from the gist service.
    #[arg(long)]
    fetch: bool,

    /// Path to configuration file (default: auto-discover gist.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gist service URL (overrides config).
    #[arg(long, env = "GIST_HOST")]
    gist_host: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// Prints the lookup URL of every valid reference to stdout.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            gist_host: self.gist_host,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let settings = plugin_settings(&config);
        let resolver = Resolver::new(
            settings.gist_host.as_str(),
            Arc::new(UreqClient::new(settings.timeout)),
        );

        let mut stdout = std::io::stdout().lock();
        let mut failed = 0usize;

        for line in &self.references {
            let reference = match parse(line) {
                Ok(reference) => reference,
                Err(e) => {
                    output.error(&format!("{line}: {e}"));
                    failed += 1;
                    continue;
                }
            };

            writeln!(stdout, "{}", resolver.lookup_url(&reference))?;
            output.detail(line, &describe(&reference));

            if self.fetch {
                match resolver.resolve(&reference) {
                    Ok(_) => output.success(&format!("{reference}: ok")),
                    Err(e) => {
                        output.error(&format!("{reference}: {e}"));
                        failed += 1;
                    }
                }
            }
        }

        if failed > 0 {
            return Err(CliError::Validation(format!(
                "{failed} of {} reference(s) failed",
                self.references.len()
            )));
        }
        Ok(())
    }
}

/// One-line summary of a parsed reference.
fn describe(reference: &Reference) -> String {
    let mut parts = vec![format!("id={}", reference.identifier())];
    if let Some(owner) = reference.owner() {
        parts.push(format!("owner={owner}"));
    }
    if let Some(filename) = reference.filename() {
        parts.push(format!("file={filename}"));
    }
    parts.join(" ")
}
