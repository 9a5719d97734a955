//! Parsing of one-line gist references.
//!
//! Accepted forms (one per line):
//!
//! ```text
//! [http(s)://][gist.github.com/][owner/]<identifier>[tail][#<filename>]
//! ```
//!
//! `tail` covers the suffixes of GitHub's share and raw links (`.js`,
//! `.json`, `.git`, `/raw/...`, a trailing `/`, a `?query`). It is ignored.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:gist\.github\.com/)?(?:(?P<owner>[\w-]+)/)?(?P<id>[A-Za-z0-9]+)(?:\.(?:js|json|git)|/raw(?:/[^#?]*)?)?/?(?:\?[^#]*)?(?:#(?P<filename>.*))?$",
    )
    .unwrap()
});

/// A reference to one remote gist, optionally narrowed to a single file.
///
/// The identifier is always non-empty; construct through [`parse`] or
/// [`Reference::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    identifier: String,
    filename: Option<String>,
    owner: Option<String>,
}

/// A line that does not contain a gist identifier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Could not find a valid Gist ID, please make sure your content and format is correct.")]
pub struct ParseError {
    /// The offending line, as written.
    pub line: String,
}

impl Reference {
    /// Create a reference from its parts.
    ///
    /// Returns `None` when `identifier` is empty. An empty filename is
    /// treated as absent.
    pub fn new(identifier: impl Into<String>, filename: Option<String>) -> Option<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return None;
        }
        Some(Self {
            identifier,
            filename: filename.filter(|f| !f.is_empty()),
            owner: None,
        })
    }

    /// Remote document key.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// File selected within a multi-file gist.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Owner segment, if the line carried one.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{owner}/")?;
        }
        f.write_str(&self.identifier)?;
        if let Some(filename) = &self.filename {
            write!(f, "#{filename}")?;
        }
        Ok(())
    }
}

impl FromStr for Reference {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parse one line into a [`Reference`].
///
/// Scheme, host and owner prefixes are optional; the identifier is not.
/// Surrounding whitespace is ignored.
pub fn parse(line: &str) -> Result<Reference, ParseError> {
    let failure = || ParseError {
        line: line.to_owned(),
    };

    let caps = REFERENCE_RE.captures(line.trim()).ok_or_else(failure)?;
    let identifier = caps.name("id").map(|m| m.as_str()).ok_or_else(failure)?;
    let filename = caps
        .name("filename")
        .map(|m| m.as_str().trim().to_owned());

    let mut reference = Reference::new(identifier, filename).ok_or_else(failure)?;
    reference.owner = caps.name("owner").map(|m| m.as_str().to_owned());
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(line: &str) -> (String, Option<String>) {
        let reference = parse(line).unwrap();
        (
            reference.identifier().to_owned(),
            reference.filename().map(str::to_owned),
        )
    }

    #[test]
    fn test_bare_identifier() {
        assert_eq!(parts("abc123"), ("abc123".to_owned(), None));
    }

    #[test]
    fn test_identifier_with_filename() {
        assert_eq!(
            parts("abc123#main.py"),
            ("abc123".to_owned(), Some("main.py".to_owned()))
        );
    }

    #[test]
    fn test_prefix_variants_agree() {
        let expected = ("abc123".to_owned(), Some("file.py".to_owned()));
        for line in [
            "abc123#file.py",
            "owner/abc123#file.py",
            "gist.github.com/abc123#file.py",
            "gist.github.com/owner/abc123#file.py",
            "http://gist.github.com/abc123#file.py",
            "https://gist.github.com/owner/abc123#file.py",
            "https://gist.github.com/some-user/abc123/#file.py",
            "https://gist.github.com/octocat/abc123.js#file.py",
            "https://gist.github.com/octocat/abc123/raw#file.py",
        ] {
            assert_eq!(parts(line), expected, "line: {line}");
        }
    }

    #[test]
    fn test_share_link_suffixes_are_ignored() {
        for line in [
            "https://gist.github.com/octocat/abc123.js",
            "https://gist.github.com/octocat/abc123.json",
            "https://gist.github.com/octocat/abc123.git",
            "https://gist.github.com/octocat/abc123/raw",
            "https://gist.github.com/octocat/abc123/raw/0f1e2d/main.py",
            "https://gist.github.com/octocat/abc123?file=a.py",
            "https://gist.github.com/octocat/abc123.js?file=a.py",
        ] {
            let reference = parse(line).unwrap();
            assert_eq!(reference.identifier(), "abc123", "line: {line}");
            assert_eq!(reference.owner(), Some("octocat"), "line: {line}");
            assert_eq!(reference.filename(), None, "line: {line}");
        }
    }

    #[test]
    fn test_unknown_suffix_fails() {
        for line in ["abc123.html", "abc123 extra", "https://gist.github.com/octocat/abc123/revisions"] {
            assert!(parse(line).is_err(), "line: {line}");
        }
    }

    #[test]
    fn test_owner_is_captured() {
        let reference = parse("https://gist.github.com/octo-cat/abc123").unwrap();
        assert_eq!(reference.owner(), Some("octo-cat"));
        assert_eq!(reference.identifier(), "abc123");
        assert_eq!(reference.filename(), None);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(
            parts("   abc123#notes.md \t"),
            ("abc123".to_owned(), Some("notes.md".to_owned()))
        );
    }

    #[test]
    fn test_filename_may_contain_spaces_and_hashes() {
        assert_eq!(
            parts("abc123#my file#2.txt"),
            ("abc123".to_owned(), Some("my file#2.txt".to_owned()))
        );
    }

    #[test]
    fn test_empty_filename_is_absent() {
        assert_eq!(parts("abc123#"), ("abc123".to_owned(), None));
    }

    #[test]
    fn test_lines_without_identifier_fail() {
        for line in ["", "   ", "!!!", "---", "#main.py", "https://", "https://gist.github.com/"] {
            let err = parse(line).unwrap_err();
            assert_eq!(err.line, line, "line: {line:?}");
        }
    }

    #[test]
    fn test_error_keeps_original_line() {
        let err = parse("  not a gist!  ").unwrap_err();
        assert_eq!(err.line, "  not a gist!  ");
        assert!(err.to_string().contains("valid Gist ID"));
    }

    #[test]
    fn test_from_str() {
        let reference: Reference = "abc123#a.rs".parse().unwrap();
        assert_eq!(reference.identifier(), "abc123");
        assert_eq!(reference.filename(), Some("a.rs"));
    }

    #[test]
    fn test_display_round_trips_user_form() {
        let reference = parse("https://gist.github.com/octocat/abc123#a.rs").unwrap();
        assert_eq!(reference.to_string(), "octocat/abc123#a.rs");
    }

    #[test]
    fn test_new_rejects_empty_identifier() {
        assert!(Reference::new("", None).is_none());
        let reference = Reference::new("abc", Some(String::new())).unwrap();
        assert_eq!(reference.filename(), None);
    }
}
