//! Top-level orchestration: wires the Line Index, AST Fact Collector,
//! Taint & Shape State, and Finding Aggregator into the single public
//! entry point callers use (§2 data flow).

use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::line_index::LineIndex;
use crate::models::Finding;
use crate::php_parser;
use crate::taint;

/// Analyze one file's already-loaded bytes and return its findings,
/// ordered by ascending line number. Never fails: parse failures surface
/// as a single `parse_error` Finding rather than an `Err` (§7).
pub fn analyze_source(source: &[u8], config: &ProjectConfig) -> Vec<Finding> {
    if source.is_empty() {
        return Vec::new();
    }

    let lines = LineIndex::new(source);

    let outcome = match php_parser::collect(source) {
        Ok(outcome) => outcome,
        Err(finding) => {
            warn!(line = finding.line, "file failed to parse, emitting parse_error finding");
            return vec![finding];
        }
    };

    let state = taint::build(&lines, &outcome.facts);
    let mut findings = crate::aggregator::aggregate(&lines, &outcome.facts, &state, config);

    if let Some(cap) = config.max_findings_per_file() {
        if findings.len() > cap {
            debug!(total = findings.len(), cap, "truncating findings to configured cap");
            findings.truncate(cap);
        }
    }

    findings
}

/// Convenience wrapper for callers with a path rather than bytes. Reading
/// errors are the caller's responsibility (§7): this just loads the file
/// and forwards to [`analyze_source`].
pub fn analyze_file(path: &std::path::Path, config: &ProjectConfig) -> std::io::Result<Vec<Finding>> {
    let source = std::fs::read(path)?;
    Ok(analyze_source(&source, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FindingKind;

    #[test]
    fn empty_source_yields_no_findings() {
        let config = ProjectConfig::default();
        assert!(analyze_source(b"", &config).is_empty());
    }

    #[test]
    fn tainted_echo_is_flagged_and_rewritten() {
        let config = ProjectConfig::default();
        let source = b"<?php\n$name = $_POST['name'];\necho $name;\n";
        let findings = analyze_source(source, &config);
        let html = findings.iter().find(|f| f.kind == FindingKind::HtmlOutput).expect("html finding");
        assert_eq!(html.fix, "echo htmlspecialchars($name);");
    }

    #[test]
    fn sql_concatenation_is_flagged_as_injection() {
        let config = ProjectConfig::default();
        let source = b"<?php\n$id = $_GET['id'];\n$sql = \"SELECT * FROM u WHERE id = \" . $id;\n";
        let findings = analyze_source(source, &config);
        let sql = findings.iter().find(|f| f.kind == FindingKind::SqlInjection).expect("sql finding");
        assert_eq!(sql.fix, crate::models::PREPARED_STATEMENTS_FIX);
    }

    #[test]
    fn sql_named_variable_echoed_is_not_misrouted_to_html_escape() {
        let config = ProjectConfig::default();
        let source = b"<?php\n$sql = $_GET['q'];\necho $sql;\n";
        let findings = analyze_source(source, &config);
        assert!(findings.iter().all(|f| f.kind != FindingKind::HtmlOutput));
        let sql_finding = findings.iter().find(|f| f.kind == FindingKind::SqlInjection).expect("sql finding");
        assert!(sql_finding.vars.contains(&"sql".to_string()));
    }

    #[test]
    fn findings_are_capped_when_configured() {
        let toml_str = "max_findings_per_file = 1";
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        let source = b"<?php\n$a = $_POST['a'];\n$b = $_POST['b'];\necho $a;\necho $b;\n";
        let findings = analyze_source(source, &config);
        assert_eq!(findings.len(), 1);
    }
}
