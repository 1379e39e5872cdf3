//! Output reporters (ambient, external-caller demonstration)
//!
//! Mirrors `reporters/mod.rs`'s format-dispatch shape, trimmed to the two
//! formats the core's plain `Finding` rows call for: `text` and `json`.
//! No `HealthReport`/score concept here — there is nothing to score.

mod json;
mod text;

use std::str::FromStr;

use anyhow::{anyhow, Result};

use crate::models::Finding;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("unknown format '{s}'. Valid formats: text, json")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render `findings` for `path` using the named format.
pub fn report(path: &str, findings: &[Finding], format: &str) -> Result<String> {
    report_with_format(path, findings, OutputFormat::from_str(format)?)
}

pub fn report_with_format(path: &str, findings: &[Finding], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(path, findings),
        OutputFormat::Json => json::render(path, findings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats_case_insensitively() {
        assert_eq!(OutputFormat::from_str("TEXT").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_str("sarif").is_err());
    }
}
