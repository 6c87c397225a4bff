//! Terminal output

use console::{style, Term};

/// Writes command results to stdout and status lines to stderr
#[derive(Debug)]
pub struct Reporter {
    out: Term,
    err: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        console::set_colors_enabled(use_color);
        console::set_colors_enabled_stderr(use_color);
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a command result; never suppressed
    pub fn result(&self, text: &str) {
        let _ = self.out.write_line(text.trim_end_matches('\n'));
    }

    /// Print a success line
    pub fn success(&self, message: &str) {
        if !self.quiet {
            let _ = self
                .err
                .write_line(&format!("{} {message}", style("✓").green().bold()));
        }
    }

    /// Print an informational line
    pub fn info(&self, message: &str) {
        if !self.quiet {
            let _ = self.err.write_line(&format!("{} {message}", style("·").dim()));
        }
    }

    /// Print a failure line; never suppressed
    pub fn failure(&self, message: &str) {
        let _ = self
            .err
            .write_line(&format!("{} {message}", style("✗").red().bold()));
    }
}
