//! Output formatting for the CLI.
//!
//! Human-readable messages go to stderr so stdout carries only the
//! rendered stream or JSON.

use console::{style, StyledObject, Term};
use region_sdk::region_streaming::OutcomeKind;

/// Output handler for CLI messages.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
    term: Term,
}

impl Output {
    /// Create a new output handler.
    pub fn new(verbose: bool, json: bool) -> Self {
        Self {
            verbose,
            json,
            term: Term::stderr(),
        }
    }

    /// Write a line to stderr unless in JSON mode.
    fn emit(&self, line: impl AsRef<str>) {
        if self.json {
            return;
        }
        // stderr closed; nothing left to report to
        let _ = self.term.write_line(line.as_ref());
    }

    fn tagged(&self, tag: StyledObject<&str>, msg: &str) {
        self.emit(format!("{} {}", tag, msg));
    }

    pub fn success(&self, msg: &str) {
        self.tagged(style("✓").green(), msg);
    }

    pub fn warn(&self, msg: &str) {
        self.tagged(style("⚠").yellow(), msg);
    }

    /// Report a failure. In JSON mode the error is a JSON object on stderr.
    pub fn error(&self, msg: &str) {
        if self.json {
            let _ = self
                .term
                .write_line(&serde_json::json!({ "error": msg }).to_string());
            return;
        }
        self.emit(format!("{} {}", style("✗").red(), style(msg).red()));
    }

    /// Verbose-only detail.
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.emit(style(format!("→ {}", msg)).dim().to_string());
        }
    }

    pub fn header(&self, msg: &str) {
        self.emit(format!("\n{}", style(msg).bold().underlined()));
    }

    pub fn kv(&self, key: &str, value: &str) {
        self.emit(format!("  {}: {}", style(key).dim(), value));
    }

    /// One row of left-aligned columns.
    pub fn row(&self, cols: &[&str], widths: &[usize]) {
        let line = cols
            .iter()
            .zip(widths)
            .map(|(col, width)| format!("{:<width$}", col, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        self.emit(format!("  {}", line.trim_end()));
    }

    /// Pretty JSON to stdout.
    pub fn json<T: serde::Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Colored label for a region outcome.
pub fn outcome_badge(kind: OutcomeKind) -> String {
    let label = style(kind.as_str());
    let styled = match kind {
        OutcomeKind::Resolved => label.green(),
        OutcomeKind::Degraded => label.yellow(),
        OutcomeKind::Error => label.red(),
    };
    styled.to_string()
}

/// Byte count with a binary unit.
pub fn format_bytes(bytes: u64) -> String {
    match bytes {
        b if b >= 1 << 20 => format!("{:.2} MB", b as f64 / (1u64 << 20) as f64),
        b if b >= 1 << 10 => format!("{:.2} KB", b as f64 / (1u64 << 10) as f64),
        b => format!("{} B", b),
    }
}

/// Microseconds as milliseconds with one decimal.
pub fn format_us(us: u64) -> String {
    format!("{:.1}ms", us as f64 / 1000.0)
}
