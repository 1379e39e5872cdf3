//! Core data model for phpguard
//!
//! `Finding` is the unit handed back to callers; everything else in the
//! analyzer (fact collector, classifier, taint state, rewriter) exists to
//! produce a `Vec<Finding>` for one file.

use serde::{Deserialize, Serialize};

/// Category of an emitted finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Unescaped user-controlled value reaching HTML output.
    HtmlOutput,
    /// User-controlled value reaching a SQL sink without a prepared statement.
    SqlInjection,
    /// A value is already escaped where escaping has no effect (reserved).
    UnnecessaryEscape,
    /// The file (or a region of it) failed to parse.
    ParseError,
    /// Catch-all for findings outside the fixed taxonomy.
    Other,
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingKind::HtmlOutput => write!(f, "html_output"),
            FindingKind::SqlInjection => write!(f, "sql_injection"),
            FindingKind::UnnecessaryEscape => write!(f, "unnecessary_escape"),
            FindingKind::ParseError => write!(f, "parse_error"),
            FindingKind::Other => write!(f, "other"),
        }
    }
}

/// Marker fix text emitted for SQL findings instead of a rewritten line.
pub const PREPARED_STATEMENTS_FIX: &str = "using prepared statements";

/// A single flagged site in one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// 1-based source line number.
    pub line: u32,
    /// Distinct variable names (no leading `$`), first-seen order on `line`.
    pub vars: Vec<String>,
    /// The original trimmed source line.
    pub code: String,
    /// Either a rewritten line (HTML-escape category) or
    /// [`PREPARED_STATEMENTS_FIX`] (SQL category).
    pub fix: String,
    pub kind: FindingKind,
}

impl Finding {
    pub fn parse_error(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            vars: Vec::new(),
            code: message.into(),
            fix: String::new(),
            kind: FindingKind::ParseError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_kind_display_matches_wire_tags() {
        assert_eq!(FindingKind::HtmlOutput.to_string(), "html_output");
        assert_eq!(FindingKind::SqlInjection.to_string(), "sql_injection");
        assert_eq!(FindingKind::ParseError.to_string(), "parse_error");
    }

    #[test]
    fn parse_error_finding_has_no_vars() {
        let f = Finding::parse_error(12, "unexpected token");
        assert!(f.vars.is_empty());
        assert_eq!(f.kind, FindingKind::ParseError);
        assert_eq!(f.line, 12);
    }
}
