//! Rendering of command results.
//!
//! `Printer` is built once from the global flags and carries the output
//! format, color decision and quiet mode into every command.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};

pub struct Printer {
    format: OutputFormat,
    color: bool,
    quiet: bool,
}

impl Printer {
    pub fn new(global: &GlobalOpts) -> Self {
        let color = match global.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self {
            format: global.output.clone(),
            color,
            quiet: global.quiet,
        }
    }

    /// Table/plain output is for people; everything else is structured.
    pub fn is_structured(&self) -> bool {
        !matches!(self.format, OutputFormat::Table | OutputFormat::Plain)
    }

    // ── Collections and single items ─────────────────────────────────

    pub fn list<T, R>(&self, items: &[T], row: impl Fn(&T) -> R, id: impl Fn(&T) -> String)
    where
        T: Serialize,
        R: Tabled,
    {
        let text = match self.format {
            OutputFormat::Table => {
                let rows: Vec<R> = items.iter().map(row).collect();
                Table::new(rows).with(Style::rounded()).to_string()
            }
            OutputFormat::Plain => items.iter().map(id).collect::<Vec<_>>().join("\n"),
            _ => self.encode(items),
        };
        self.emit(&text);
    }

    pub fn single<T: Serialize>(
        &self,
        item: &T,
        detail: impl Fn(&T) -> String,
        id: impl Fn(&T) -> String,
    ) {
        let text = match self.format {
            OutputFormat::Table => detail(item),
            OutputFormat::Plain => id(item),
            _ => self.encode(item),
        };
        self.emit(&text);
    }

    /// One event per line, for streaming output.
    pub fn event<T: Serialize>(&self, item: &T) {
        self.emit(&to_json(item, true));
    }

    /// Free-form stdout line.
    pub fn line(&self, text: &str) {
        self.emit(text);
    }

    /// Progress and hints go to stderr so stdout stays parseable.
    pub fn note(&self, text: &str) {
        if !self.quiet {
            eprintln!("{text}");
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, item: &T) -> String {
        match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(item)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>")),
            OutputFormat::JsonCompact => to_json(item, true),
            _ => to_json(item, false),
        }
    }

    fn emit(&self, text: &str) {
        if self.quiet || text.is_empty() {
            return;
        }
        let _ = writeln!(io::stdout().lock(), "{text}");
    }

    // ── Styling ──────────────────────────────────────────────────────

    pub fn availability(&self, available: bool) -> String {
        match (available, self.color) {
            (true, true) => "yes".green().to_string(),
            (false, true) => "no".red().to_string(),
            (true, false) => "yes".into(),
            (false, false) => "no".into(),
        }
    }

    pub fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn warn(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_owned()
        }
    }
}

fn to_json<T: Serialize + ?Sized>(item: &T, compact: bool) -> String {
    let encoded = if compact {
        serde_json::to_string(item)
    } else {
        serde_json::to_string_pretty(item)
    };
    encoded.unwrap_or_else(|e| format!("<serialization failed: {e}>"))
}

/// Table cell text for a property value: strings unquoted, null as `-`.
pub fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cell_unquotes_strings() {
        assert_eq!(cell(&json!("heat")), "heat");
        assert_eq!(cell(&json!(19.5)), "19.5");
        assert_eq!(cell(&json!(null)), "-");
    }

    #[test]
    fn compact_json_is_one_line() {
        let text = to_json(&json!({ "devices": 3, "skipped": 0 }), true);
        assert!(!text.contains('\n'));
        assert!(to_json(&json!({ "devices": 3 }), false).contains('\n'));
    }
}
