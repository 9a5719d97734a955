//! Colored status messages on stderr.
//!
//! Rendered HTML and lookup URLs go to stdout; everything meant for a human
//! goes through [`Output`].

use console::{Style, Term};

pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    muted: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red().bold(),
            muted: Style::new().dim(),
        }
    }

    fn line(&self, text: &str) {
        // A closed stderr is not worth failing the command for.
        let _ = self.term.write_line(text);
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.ok.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warn.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.fail.apply_to(msg).to_string());
    }

    /// `label` followed by a dimmed `detail`.
    pub(crate) fn detail(&self, label: &str, detail: &str) {
        self.line(&format!("{label} {}", self.muted.apply_to(detail)));
    }
}
