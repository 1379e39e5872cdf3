//! Fixed vocabularies (§6)
//!
//! Exhaustive, mostly-hardcoded lists the classifier and fact collector
//! match against. The SQL keyword list is the one vocabulary the design
//! calls out as configurable (Design Note b); the rest are intentionally
//! not — widening them silently would change what counts as a superglobal
//! or an escape function, which is part of the language's fixed semantics.

pub const SUPERGLOBALS: &[&str] = &["_POST", "_GET", "_REQUEST", "_COOKIE", "_SESSION"];

pub const HTML_ESCAPE_FUNCTION: &str = "htmlspecialchars";

pub const ARRAY_RETURNING_FUNCTIONS: &[&str] = &[
    "array_keys",
    "array_values",
    "array_map",
    "array_filter",
    "explode",
    "preg_split",
    "range",
    "glob",
];

pub const SQL_FUNCTIONS: &[&str] = &[
    "mysqli_query",
    "mysql_query",
    "pdo_query",
    "mysqli_prepare",
    "mysqli_stmt_bind_param",
];

pub const SQL_METHODS: &[&str] = &["query", "prepare", "execute", "bind_param", "bindvalue", "bindparam"];

pub const TEMPLATE_RENDER_METHODS: &[&str] = &["render", "display", "view"];

/// Default SQL-keyword predicate used by both the classifier and the
/// line-level SQL check. Overridable via `phpguard.toml`
/// (`[classifier] sql_keywords = [...]`), per Design Note (b).
pub const DEFAULT_SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "WHERE", "FROM", "JOIN", "LEFT JOIN", "RIGHT JOIN",
    "INNER JOIN", "GROUP BY", "ORDER BY", "LIMIT", "OFFSET", "BETWEEN", "AND", "OR", "IN", "LIKE",
    "SUM", "COUNT", "COALESCE",
];

/// Variable names (lowercased) whose indexed-read target implies a
/// database-binding context, e.g. `$filters['id']`.
pub const SQL_CONTAINER_VARS: &[&str] = &["filters", "conditions", "where", "clauses"];

/// Variable names (lowercased) that are themselves treated as SQL text.
pub const SQL_NAMED_VARS: &[&str] = &["query", "sql", "stmt", "filterquery", "wherequery", "searchquery"];

pub fn is_sql_function(name: &str) -> bool {
    SQL_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_sql_method(name: &str) -> bool {
    SQL_METHODS.iter().any(|m| m.eq_ignore_ascii_case(name))
}

pub fn is_array_returning_function(name: &str) -> bool {
    ARRAY_RETURNING_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub fn is_superglobal(name: &str) -> bool {
    SUPERGLOBALS.iter().any(|s| *s == name)
}

pub fn is_template_render_method(name: &str) -> bool {
    TEMPLATE_RENDER_METHODS.iter().any(|m| m.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_sql_functions_case_insensitively() {
        assert!(is_sql_function("MySQLi_Query"));
        assert!(!is_sql_function("array_map"));
    }

    #[test]
    fn recognizes_array_returning_functions() {
        assert!(is_array_returning_function("explode"));
        assert!(!is_array_returning_function("strlen"));
    }
}
