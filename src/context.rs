//! Context Classifier (§4.3)
//!
//! Answers, for a variable occurrence on a line, which syntactic context it
//! sits in. The AST-level classification (used by the Aggregator through
//! the parent side table) and the textual predicates (used by the
//! Rewriter's preconditions, which only ever see a line of text) share the
//! same vocabulary so the two stay in lock-step without duplicating it.

use regex::Regex;
use std::sync::OnceLock;

use crate::vocab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    HtmlOutput,
    DatabaseBinding,
    ParameterDeclaration,
    ReferenceRequired,
    Neutral,
}

fn sql_keyword_regex(keywords: &[String]) -> Regex {
    let joined = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{joined})\b")).expect("keyword alternation is always valid")
}

/// Whole-line SQL-syntactic predicate used by the Aggregator (§4.3, final
/// paragraph): distinct from and cheaper than the keyword-based
/// database-binding check used for context classification.
pub fn line_looks_like_sql(line: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE)\b").unwrap());
    re.is_match(line) || line.contains("mysqli_query") || line.contains("->query(")
}

/// Does `line`'s text, independent of AST structure, look like it contains
/// SQL given the (possibly configured) keyword list? Used by the
/// database-binding classification rule that inspects "rendered text".
pub fn text_contains_sql_keyword(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return false;
    }
    sql_keyword_regex(keywords).is_match(text)
}

const DB_METHOD_NAMES: &[&str] = &["bind_param", "bindvalue", "bindparam", "execute", "prepare", "query"];

/// Classify based on the lowercased name of the nearest enclosing call
/// (method/static/function), if any, falling back to `Neutral`. This is
/// the AST-side half of §4.3; the regex-only preconditions used by the
/// Rewriter live in [`crate::rewriter`].
pub fn classify_by_enclosing_call(call_name: Option<&str>) -> Context {
    match call_name.map(str::to_ascii_lowercase) {
        Some(name) if DB_METHOD_NAMES.contains(&name.as_str()) => Context::DatabaseBinding,
        Some(name) if vocab::is_template_render_method(&name) => Context::HtmlOutput,
        _ => Context::Neutral,
    }
}

/// Does the indexed-read target's base variable name, or the variable's
/// own name, imply database-binding per the fixed name lists?
pub fn name_implies_database_binding(var_name: &str, indexed_base: Option<&str>) -> bool {
    let lower = var_name.to_ascii_lowercase();
    if vocab::SQL_NAMED_VARS.contains(&lower.as_str()) {
        return true;
    }
    if let Some(base) = indexed_base {
        if vocab::SQL_CONTAINER_VARS.contains(&base.to_ascii_lowercase().as_str()) {
            return true;
        }
    }
    false
}

fn implode_ancestor_regex(var: &str) -> Regex {
    Regex::new(&format!(r"implode\s*\([^)]*\${}\b", regex::escape(var))).expect("implode-ancestor pattern is valid")
}

/// Combine the name-based, keyword-based, and implode-ancestor
/// database-binding rules (§4.3) into a single per-variable predicate for
/// callers that only have a line of text and a candidate variable name —
/// the tie-break the Aggregator needs before it hands a variable to the
/// HTML-escape rewriter.
pub fn is_database_binding_site(line: &str, var: &str, keywords: &[String]) -> bool {
    name_implies_database_binding(var, Some(var))
        || text_contains_sql_keyword(line, keywords)
        || implode_ancestor_regex(var).is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_line_predicate_matches_keywords_and_call_shapes() {
        assert!(line_looks_like_sql("SELECT * FROM users"));
        assert!(line_looks_like_sql("$r = mysqli_query($conn, $q);"));
        assert!(line_looks_like_sql("$db->query($sql);"));
        assert!(!line_looks_like_sql("echo $name;"));
    }

    #[test]
    fn database_method_names_classify_as_database_binding() {
        assert_eq!(classify_by_enclosing_call(Some("bind_param")), Context::DatabaseBinding);
        assert_eq!(classify_by_enclosing_call(Some("Execute")), Context::DatabaseBinding);
        assert_eq!(classify_by_enclosing_call(Some("render")), Context::HtmlOutput);
        assert_eq!(classify_by_enclosing_call(None), Context::Neutral);
    }

    #[test]
    fn name_lists_imply_database_binding() {
        assert!(name_implies_database_binding("sql", None));
        assert!(name_implies_database_binding("id", Some("filters")));
        assert!(!name_implies_database_binding("name", Some("items")));
    }

    #[test]
    fn keyword_regex_is_word_bounded() {
        let keywords = vec!["AND".to_string()];
        assert!(text_contains_sql_keyword("1 AND 2", &keywords));
        assert!(!text_contains_sql_keyword("brandy", &keywords));
    }

    #[test]
    fn database_binding_site_recognizes_named_vars_and_implode_ancestor() {
        let keywords: Vec<String> = vec![];
        assert!(is_database_binding_site("echo $sql;", "sql", &keywords));
        assert!(is_database_binding_site("$where = implode(' AND ', $tags);", "tags", &keywords));
        assert!(!is_database_binding_site("echo $name;", "name", &keywords));
    }

    #[test]
    fn empty_keyword_list_never_matches() {
        let keywords: Vec<String> = vec![];
        assert!(!text_contains_sql_keyword("SELECT * FROM anything", &keywords));
    }
}
