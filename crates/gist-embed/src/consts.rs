//! Internal constants for gist embedding.

use std::time::Duration;

/// Sender tag carried by every size report posted from an isolated surface.
pub const PLUGIN_TAG: &str = "gist-embed";

/// Fence language handled by the processor.
pub const BLOCK_LANGUAGE: &str = "gist";

/// Default gist service base URL.
pub const DEFAULT_GIST_HOST: &str = "https://gist.github.com";

/// Default origin of the embedding document.
pub const DEFAULT_HOST_ORIGIN: &str = "app://obsidian.md";

/// Default HTTP timeout for gist lookups (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Origin reported for messages posted from a `srcdoc` frame.
pub const OPAQUE_ORIGIN: &str = "null";

/// CSS class set on every surface frame.
pub const SURFACE_CLASS: &str = "gist-embed-container";

/// Sandbox policy applied to surface frames.
pub const SANDBOX_POLICY: &str = "allow-scripts allow-top-navigation-by-user-activation";
