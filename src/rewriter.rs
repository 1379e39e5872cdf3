//! Autofix Rewriter (§4.5)
//!
//! A pure function over `(line, var)` with no knowledge of the AST or the
//! taint state; callers decide *whether* to rewrite, this module only
//! decides *how*. Keeping it string-level (Design Note: "string-level
//! rewriting alongside AST analysis") means the output is always valid
//! source text splicing, never a pretty-printed AST.

use std::sync::OnceLock;

use regex::Regex;

use crate::vocab::HTML_ESCAPE_FUNCTION;

const PARAMETER_KEYWORDS: &[&str] = &["function", "fn", "public", "protected", "private", "static"];

fn wrap(expr: &str) -> String {
    format!("{HTML_ESCAPE_FUNCTION}({expr})")
}

fn quoted_ranges(line: &str) -> Vec<(usize, usize)> {
    let re = match Regex::new(r#"(["'])(?:[^\\]|\\.)*?\1"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    re.find_iter(line).map(|m| (m.start(), m.end())).collect()
}

/// Standalone `$var` occurrences outside any quoted string: not followed
/// by a word char, `[`, or `->` (those belong to the indexed/implode/
/// member strategies), and not embedded in a string literal (that's
/// strategy F/G's job).
fn standalone_var_positions(line: &str, var: &str) -> Vec<(usize, usize)> {
    let needle = format!("${var}");
    let quotes = quoted_ranges(line);
    let mut out = Vec::new();
    let mut start = 0;
    while let Some(rel) = line[start..].find(&needle) {
        let pos = start + rel;
        let end = pos + needle.len();
        let followed_by_word = line[end..].chars().next().is_some_and(|c| c.is_alphanumeric() || c == '_');
        let followed_by_index_or_arrow = line[end..].starts_with('[') || line[end..].starts_with("->");
        let inside_quotes = quotes.iter().any(|&(qs, qe)| pos >= qs && end <= qe);
        if !followed_by_word && !followed_by_index_or_arrow && !inside_quotes {
            out.push((pos, end));
        }
        start = end;
    }
    out
}

fn indexed_ranges(line: &str, var: &str) -> Vec<(usize, usize)> {
    let re = Regex::new(&format!(r"\${}(?:\[[^\]]*\])+", regex::escape(var))).expect("indexed pattern is valid");
    re.find_iter(line).map(|m| (m.start(), m.end())).collect()
}

/// Byte range of the argument list `(...)` for the first case-insensitive
/// match of `name(`, scanning from `from`. Returns `None` if unbalanced.
fn call_arg_range(line: &str, name: &str, from: usize) -> Option<(usize, usize, usize)> {
    let pattern = Regex::new(&format!(r"(?i)\b{}\s*\(", regex::escape(name))).ok()?;
    let m = pattern.find_at(line, from)?;
    let open = m.end() - 1;
    let mut depth = 0i32;
    for (i, c) in line[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((m.start(), open, open + i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Nearest enclosing `(...)` range containing byte offset `at`, found by
/// scanning backward for an unmatched `(` and forward for its close.
fn enclosing_parens(line: &str, at: usize) -> Option<(usize, usize)> {
    let bytes = line.as_bytes();
    let mut depth = 0i32;
    let mut open = None;
    for i in (0..at).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => {
                if depth == 0 {
                    open = Some(i);
                    break;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    let open = open?;
    let mut depth = 1i32;
    for (i, c) in line[open + 1..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((open, open + 1 + i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn prefix_has_parameter_keyword(line: &str, open_paren: usize) -> bool {
    let start = open_paren.saturating_sub(40);
    let window = &line[start..open_paren];
    PARAMETER_KEYWORDS.iter().any(|kw| window.contains(kw))
}

fn all_occurrences_in_parameter_context(line: &str, var: &str) -> bool {
    let occurrences = standalone_var_positions(line, var);
    if occurrences.is_empty() {
        return false;
    }
    occurrences.iter().all(|&(pos, _)| match enclosing_parens(line, pos) {
        Some((open, _)) => prefix_has_parameter_keyword(line, open),
        None => false,
    })
}

fn inside_call(line: &str, var: &str, call_name: &str) -> bool {
    let needle = format!("${var}");
    let mut from = 0;
    while let Some((_, open, close)) = call_arg_range(line, call_name, from) {
        if let Some(rel) = line[open..close].find(&needle) {
            let _ = rel;
            return true;
        }
        from = close;
    }
    false
}

fn inside_any_call(line: &str, var: &str, names: &[&str]) -> bool {
    names.iter().any(|n| inside_call(line, var, n))
}

fn already_escaped(line: &str, var: &str) -> bool {
    inside_call(line, var, HTML_ESCAPE_FUNCTION)
}

/// Precondition checks (§4.5). `true` means "do not rewrite".
fn blocked(line: &str, var: &str) -> bool {
    all_occurrences_in_parameter_context(line, var)
        || inside_any_call(line, var, &["bind_param", "bindParam"])
        || inside_any_call(line, var, &["isset", "empty", "unset"])
        || already_escaped(line, var)
}

fn wrap_range(line: &str, start: usize, end: usize) -> String {
    format!("{}{}{}", &line[..start], wrap(&line[start..end]), &line[end..])
}

/// Strategy A: `'key' => $var` followed by a terminator.
fn try_associative(line: &str, var: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r#"(['"][^'"]*['"]\s*=>\s*)\${}(?=\s*[,\]\);]|$)"#,
        regex::escape(var)
    ))
    .ok()?;
    let caps = re.captures(line)?;
    let m = caps.get(0)?;
    let prefix_len = caps.get(1)?.as_str().len();
    let var_start = m.start() + prefix_len;
    Some(wrap_range(line, var_start, m.end()))
}

/// Strategy C: `implode(..., $var, ...)` — wrap the whole call.
fn try_implode(line: &str, var: &str) -> Option<String> {
    let (start, _open, end) = call_arg_range(line, "implode", 0)?;
    let needle = format!("${var}");
    if !line[start..end].contains(&needle) {
        return None;
    }
    Some(wrap_range(line, start, end))
}

/// Strategy D: `$var[...]` (possibly chained) — wrap the whole indexed
/// reference.
fn try_indexed(line: &str, var: &str) -> Option<String> {
    let ranges = indexed_ranges(line, var);
    let (start, end) = *ranges.first()?;
    Some(wrap_range(line, start, end))
}

/// Strategy E: `echo`/`print` tail — replace standalone occurrences.
fn try_output_statement(line: &str, var: &str) -> Option<String> {
    let trimmed = line.trim_start();
    if !(trimmed.starts_with("echo") || trimmed.starts_with("print")) {
        return None;
    }
    try_standalone_replace(line, var)
}

/// Strategies F/G share the same splice: a variable referenced inside a
/// quoted string gets spliced out via concatenation.
fn try_string_splice(line: &str, var: &str) -> Option<String> {
    let quote_re = Regex::new(r#"(["'])(?:[^\\]|\\.)*?\1"#).ok()?;
    for m in quote_re.find_iter(line) {
        let body = &line[m.start() + 1..m.end() - 1];
        let needle = format!("${var}");
        if let Some(rel) = body.find(&needle) {
            let var_start_in_body = rel;
            let var_end_in_body = rel + needle.len();
            let quote = &line[m.start()..m.start() + 1];
            let before = &body[..var_start_in_body];
            let after = &body[var_end_in_body..];
            let spliced = format!(
                "{quote}{before}{quote} . {escaped} . {quote}{after}{quote}",
                escaped = wrap(&format!("${var}"))
            );
            return Some(format!("{}{}{}", &line[..m.start()], spliced, &line[m.end()..]));
        }
    }
    None
}

const ATTRIBUTE_NAMES: &[&str] = &["value", "placeholder", "title"];

fn looks_like_html_attribute(line: &str, var: &str) -> bool {
    let needle = format!("${var}");
    ATTRIBUTE_NAMES.iter().any(|attr| {
        let pattern = format!("{attr}=\"");
        line.find(&pattern)
            .map(|pos| line[pos..].find(&needle).is_some())
            .unwrap_or(false)
    })
}

/// Strategy H: replace each standalone `$var` token with `escape($var)`.
fn try_standalone_replace(line: &str, var: &str) -> Option<String> {
    let occurrences = standalone_var_positions(line, var);
    if occurrences.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(line.len() + occurrences.len() * 20);
    let mut last = 0;
    for &(start, end) in &occurrences {
        out.push_str(&line[last..start]);
        out.push_str(&wrap(&format!("${var}")));
        last = end;
    }
    out.push_str(&line[last..]);
    Some(out)
}

/// Apply the RHS transform used by strategy B: implode-wrap, then
/// indexed-wrap, then standalone replace — composed, not first-match.
fn rhs_transform(rhs: &str, var: &str) -> String {
    let after_implode = try_implode(rhs, var).unwrap_or_else(|| rhs.to_string());
    let after_indexed = try_indexed(&after_implode, var).unwrap_or(after_implode);
    try_standalone_replace(&after_indexed, var).unwrap_or(after_indexed)
}

fn assignment_op_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<lhs>[^=]*?)(?P<op>\.=|\+=|-=|\*=|/=|=)(?!=)(?P<rhs>.*)$").unwrap())
}

/// Strategy B: `lhs OP= rhs`, transform applied to `rhs` only.
fn try_assignment(line: &str, var: &str) -> Option<String> {
    let caps = assignment_op_regex().captures(line)?;
    let rhs = caps.name("rhs")?.as_str();
    if !rhs.contains(&format!("${var}")) {
        return None;
    }
    let transformed = rhs_transform(rhs, var);
    if transformed == rhs {
        return None;
    }
    Some(format!("{}{}{}", &caps["lhs"], &caps["op"], transformed))
}

/// Rewrite `line` for `var`, or return `line` unchanged (cloned) when no
/// safe rewrite applies. Idempotent: re-applying to the output is a no-op
/// because every strategy's precondition checks (particularly
/// `already_escaped`) hold on the result.
pub fn rewrite(line: &str, var: &str) -> String {
    if !line.contains(&format!("${var}")) || blocked(line, var) {
        return line.to_string();
    }

    if let Some(r) = try_associative(line, var) {
        return r;
    }
    if let Some(r) = try_assignment(line, var) {
        return r;
    }
    if let Some(r) = try_implode(line, var) {
        return r;
    }
    if let Some(r) = try_indexed(line, var) {
        return r;
    }
    if let Some(r) = try_output_statement(line, var) {
        return r;
    }
    if looks_like_html_attribute(line, var) || is_inside_quotes(line, var) {
        if let Some(r) = try_string_splice(line, var) {
            return r;
        }
    }
    if let Some(r) = try_standalone_replace(line, var) {
        return r;
    }
    line.to_string()
}

fn is_inside_quotes(line: &str, var: &str) -> bool {
    let needle = format!("${var}");
    quoted_ranges(line)
        .iter()
        .any(|&(start, end)| line[start + 1..end - 1].contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_statement_wraps_standalone_variable() {
        let out = rewrite("echo $name;", "name");
        assert_eq!(out, "echo htmlspecialchars($name);");
    }

    #[test]
    fn already_escaped_is_left_unchanged() {
        let line = "echo htmlspecialchars($name);";
        assert_eq!(rewrite(line, "name"), line);
    }

    #[test]
    fn bind_param_argument_is_not_rewritten() {
        let line = "$stmt->bind_param('s', $id);";
        assert_eq!(rewrite(line, "id"), line);
    }

    #[test]
    fn isset_argument_is_not_rewritten() {
        let line = "if (isset($name)) {";
        assert_eq!(rewrite(line, "name"), line);
    }

    #[test]
    fn parameter_declaration_is_not_rewritten() {
        let line = "function greet($name) {";
        assert_eq!(rewrite(line, "name"), line);
    }

    #[test]
    fn interpolated_string_is_spliced() {
        let out = rewrite(r#"echo "<p>value: $val</p>";"#, "val");
        assert_eq!(out, r#"echo "<p>value: " . htmlspecialchars($val) . "</p>";"#);
    }

    #[test]
    fn indexed_reference_is_wrapped_whole() {
        let out = rewrite("echo $items['name'];", "items");
        assert_eq!(out, "echo htmlspecialchars($items['name']);");
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite("echo $name;", "name");
        let twice = rewrite(&once, "name");
        assert_eq!(once, twice);
    }

    #[test]
    fn implode_call_is_wrapped_whole() {
        let out = rewrite("echo implode(', ', $tags);", "tags");
        assert_eq!(out, "echo htmlspecialchars(implode(', ', $tags));");
    }
}
