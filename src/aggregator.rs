//! Finding Aggregator (§4.6)
//!
//! Merges every per-variable candidate fix on a line into at most one
//! `Finding`, resolving the SQL/HTML split and the reference-required and
//! bind_param exclusions before a single rewrite is attempted.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ProjectConfig;
use crate::context::{is_database_binding_site, line_looks_like_sql};
use crate::facts::{FactStreams, Shape, UsageKind};
use crate::line_index::LineIndex;
use crate::models::{Finding, FindingKind, PREPARED_STATEMENTS_FIX};
use crate::rewriter::rewrite;
use crate::taint::TaintState;
use crate::vocab::SUPERGLOBALS;

fn var_on_line_regex(name: &str) -> Regex {
    Regex::new(&format!(r"\${}\b", regex::escape(name))).expect("variable reference pattern is valid")
}

fn var_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap())
}

fn html_output_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*(echo\b|print\b|<\?=)|->\s*(render|display|view)\s*\("#).unwrap()
    })
}

fn superglobal_scalar_assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alt = SUPERGLOBALS.join("|");
        Regex::new(&format!(r"^\$[A-Za-z_][A-Za-z0-9_]*\s*=\s*\${}(?:\[[^\]]*\])\s*;?\s*$", format!("(?:{alt})")))
            .expect("superglobal scalar assignment pattern is valid")
    })
}

fn is_html_output_line(trimmed: &str) -> bool {
    html_output_line_regex().is_match(trimmed)
}

/// True when `var`'s only references on `line` are whole-variable reads
/// (no indexing, no `implode(...)` argument) — the case the design says
/// must suppress an Array-shaped variable from rewriting.
fn array_var_is_rewrite_eligible(line: &str, name: &str) -> bool {
    let indexed = Regex::new(&format!(r"\${}\[", regex::escape(name))).unwrap();
    if indexed.is_match(line) {
        return true;
    }
    if line.contains("implode(") && var_on_line_regex(name).is_match(line) {
        return true;
    }
    false
}

/// Variable names referenced as `$name` tokens on `line`, distinct, in
/// first-seen order on that line — scanning the line text left-to-right
/// rather than the taint state's own (unordered) name set, per the
/// ordering the Finding's `vars` field is specified to carry.
fn known_vars_on_line(line: &str, state: &TaintState) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for caps in var_token_regex().captures_iter(line) {
        let name = caps[1].to_string();
        if !seen.insert(name.clone()) {
            continue;
        }
        if state.contains(&name) {
            out.push(name);
        }
    }
    out
}

fn skip_via_usage_or_bind(facts: &FactStreams, line: u32, name: &str) -> bool {
    if facts.usages_on_line(line).any(|u| u.vars.iter().any(|v| v == name)) {
        return true;
    }
    facts
        .calls_on_line(line)
        .any(|c| c.name == "bind_param" && c.arg_vars.iter().any(|v| v == name))
}

/// Run the aggregator over a whole file, producing at most one `Finding`
/// per non-skippable line, ordered by ascending line number.
pub fn aggregate(lines: &LineIndex, facts: &FactStreams, state: &TaintState, config: &ProjectConfig) -> Vec<Finding> {
    let mut findings = Vec::new();
    let sql_keywords = config.sql_keywords();

    for n in lines.iter_lines() {
        if lines.is_skippable(n) {
            continue;
        }
        let original = lines.trimmed(n);
        if original.is_empty() {
            continue;
        }

        let referenced = known_vars_on_line(original, state);
        if referenced.is_empty() {
            continue;
        }

        let candidates: Vec<String> = referenced
            .into_iter()
            .filter(|name| !skip_via_usage_or_bind(facts, n, name))
            .collect();
        if candidates.is_empty() {
            continue;
        }

        let any_sql_call = facts.calls_on_line(n).any(|c| c.is_sql);
        let db_binding_var = candidates.iter().any(|name| is_database_binding_site(original, name, &sql_keywords));
        if line_looks_like_sql(original) || any_sql_call || db_binding_var {
            findings.push(Finding {
                line: n,
                vars: candidates,
                code: original.to_string(),
                fix: PREPARED_STATEMENTS_FIX.to_string(),
                kind: FindingKind::SqlInjection,
            });
            continue;
        }

        if is_html_output_line(original) {
            if let Some(finding) = build_html_finding(n, original, &candidates, state) {
                findings.push(finding);
                continue;
            }
        }

        if let Some(finding) = build_companion_finding(n, original, &candidates, facts) {
            findings.push(finding);
        }
    }

    findings
}

fn build_html_finding(line: u32, original: &str, candidates: &[String], state: &TaintState) -> Option<Finding> {
    let mut working = original.to_string();
    let mut vars = Vec::new();

    for name in candidates {
        let Some(vstate) = state.get(name) else { continue };
        if vstate.secured {
            continue;
        }
        if vstate.shape == Shape::Array && !array_var_is_rewrite_eligible(&working, name) {
            continue;
        }
        let candidate = rewrite(&working, name);
        if candidate != working {
            working = candidate;
            vars.push(name.clone());
        }
    }

    if working == original || vars.is_empty() {
        return None;
    }

    Some(Finding { line, vars, code: original.to_string(), fix: working, kind: FindingKind::HtmlOutput })
}

/// Design Note (a): emit the "re-assign unchanged, comment recommending
/// escaping at output time" companion fix only when the line is *exactly*
/// a superglobal-to-scalar assignment and nothing else applied.
fn build_companion_finding(line: u32, original: &str, candidates: &[String], facts: &FactStreams) -> Option<Finding> {
    if !superglobal_scalar_assignment_regex().is_match(original) {
        return None;
    }
    let name = candidates.first()?.clone();
    if facts.calls_on_line(line).next().is_some() {
        return None;
    }
    Some(Finding {
        line,
        vars: vec![name],
        code: original.to_string(),
        fix: format!("{original} // consider escaping when this value reaches output"),
        kind: FindingKind::Other,
    })
}
