//! Text (terminal) reporter
//!
//! No score or grade concept, just a per-finding row, colored by kind.

use anyhow::Result;

use crate::models::{Finding, FindingKind};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

fn kind_color(kind: FindingKind) -> &'static str {
    match kind {
        FindingKind::SqlInjection => "\x1b[31m",    // red
        FindingKind::HtmlOutput => "\x1b[91m",      // light red
        FindingKind::UnnecessaryEscape => "\x1b[33m", // yellow
        FindingKind::ParseError => "\x1b[90m",       // gray
        FindingKind::Other => "\x1b[34m",            // blue
    }
}

pub fn render(path: &str, findings: &[Finding]) -> Result<String> {
    let mut out = String::new();

    if findings.is_empty() {
        out.push_str(&format!("{DIM}{path}: no findings{RESET}\n"));
        return Ok(out);
    }

    out.push_str(&format!("{BOLD}{path}{RESET} — {} finding(s)\n", findings.len()));
    for finding in findings {
        let color = kind_color(finding.kind);
        out.push_str(&format!(
            "  {color}[{}]{RESET} line {}: {}\n",
            finding.kind, finding.line, finding.code
        ));
        if !finding.vars.is_empty() {
            out.push_str(&format!("    vars: {}\n", finding.vars.join(", ")));
        }
        if !finding.fix.is_empty() {
            out.push_str(&format!("    fix:  {}\n", finding.fix));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PREPARED_STATEMENTS_FIX;

    #[test]
    fn empty_findings_render_a_clean_line() {
        let rendered = render("app.php", &[]).unwrap();
        assert!(rendered.contains("no findings"));
    }

    #[test]
    fn sql_finding_renders_fix_marker() {
        let findings = vec![Finding {
            line: 4,
            vars: vec!["id".into()],
            code: "..".into(),
            fix: PREPARED_STATEMENTS_FIX.into(),
            kind: FindingKind::SqlInjection,
        }];
        let rendered = render("app.php", &findings).unwrap();
        assert!(rendered.contains(PREPARED_STATEMENTS_FIX));
        assert!(rendered.contains("sql_injection"));
    }
}
