//! Line Index
//!
//! Splits raw source by literal line-feed and exposes 1-based line access.
//! Kept deliberately dumb: no tokenizing, no comment-aware state machine
//! across lines — just the per-line text and a skippable predicate, per the
//! design's "string-level rewriting alongside AST analysis" split.

/// Prefixes that mark a line as a comment or inline-markup open and
/// therefore never eligible for a finding.
const SKIP_PREFIXES: &[&str] = &["//", "#", "/*", "*/", "*", "<"];

pub struct LineIndex {
    lines: Vec<String>,
}

impl LineIndex {
    /// Build an index from raw bytes, lossily decoding invalid UTF-8.
    pub fn new(source: &[u8]) -> Self {
        let text = String::from_utf8_lossy(source);
        // `lines()` would silently drop a trailing empty line; split
        // manually so line numbers keep matching editor conventions.
        let lines = text.split('\n').map(|s| s.to_string()).collect();
        Self { lines }
    }

    pub fn from_str(source: &str) -> Self {
        Self::new(source.as_bytes())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Raw text of 1-based line `n`, or `""` if out of range.
    pub fn text(&self, n: u32) -> &str {
        self.lines
            .get(n as usize - 1)
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// `text(n)` with surrounding whitespace and carriage returns trimmed.
    /// Used for predicate matching; the stored `Finding::code` field uses
    /// `text` unmodified except for this same trim (callers trim once when
    /// building the finding).
    pub fn trimmed(&self, n: u32) -> &str {
        self.text(n).trim_matches(|c: char| c == '\r' || c.is_whitespace())
    }

    /// True when `trimmed(n)` begins with a comment marker or a markup
    /// open tag. Skippable lines are counted but never flagged.
    pub fn is_skippable(&self, n: u32) -> bool {
        let t = self.trimmed(n);
        SKIP_PREFIXES.iter().any(|p| t.starts_with(p))
    }

    pub fn iter_lines(&self) -> impl Iterator<Item = u32> {
        1..=(self.line_count() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_trailing_empty_line() {
        let idx = LineIndex::from_str("a\nb\n");
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.text(3), "");
    }

    #[test]
    fn trimmed_strips_carriage_return() {
        let idx = LineIndex::from_str("echo $x;\r\n");
        assert_eq!(idx.text(1), "echo $x;\r");
        assert_eq!(idx.trimmed(1), "echo $x;");
    }

    #[test]
    fn is_skippable_recognizes_comment_and_markup_prefixes() {
        let idx = LineIndex::from_str("// comment\n# hash\n/* block\n * star\n */\n<div>\necho $x;\n");
        for n in 1..=6 {
            assert!(idx.is_skippable(n), "line {n} should be skippable");
        }
        assert!(!idx.is_skippable(7));
    }

    #[test]
    fn lossy_decodes_invalid_utf8() {
        let bytes = [b'a', 0xFF, b'\n', b'b'];
        let idx = LineIndex::new(&bytes);
        assert_eq!(idx.line_count(), 2);
        assert!(idx.text(1).contains('a'));
    }
}
