//! `${VAR}` expansion for string settings.
//!
//! Only the braced forms are recognised:
//! - `${VAR}` - value of VAR, error if unset
//! - `${VAR:-default}` - value of VAR, or `default` when unset

use std::borrow::Cow;

use crate::ConfigError;

/// Expand environment variable references in `value`.
///
/// `field` is the dotted config path used in error messages
/// (e.g. `gist.host`).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    expand_with(value, field, |name| std::env::var(name).ok())
}

/// Expand `value` against `lookup`.
///
/// Strings without `${` are returned untouched, so a bare `$` in a URL or
/// stylesheet survives. The first unresolved name is reported.
fn expand_with<F>(value: &str, field: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |name: &str| {
        lookup(name).map(Some).ok_or(())
    })
    .map(Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.var_name),
    })
}
