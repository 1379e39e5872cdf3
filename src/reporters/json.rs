//! JSON (machine-readable) reporter

use anyhow::Result;
use serde::Serialize;

use crate::models::Finding;

#[derive(Serialize)]
struct Report<'a> {
    path: &'a str,
    findings: &'a [Finding],
}

pub fn render(path: &str, findings: &[Finding]) -> Result<String> {
    let report = Report { path, findings };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindingKind, PREPARED_STATEMENTS_FIX};

    #[test]
    fn renders_valid_json_round_trip() {
        let findings = vec![Finding {
            line: 1,
            vars: vec!["id".into()],
            code: "x".into(),
            fix: PREPARED_STATEMENTS_FIX.into(),
            kind: FindingKind::SqlInjection,
        }];
        let rendered = render("app.php", &findings).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["path"], "app.php");
        assert_eq!(parsed["findings"][0]["kind"], "sql_injection");
    }
}
