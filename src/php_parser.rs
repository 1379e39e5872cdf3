//! AST Fact Collector (§4.2)
//!
//! One `tree-sitter-php` parse, one cursor-based depth-first walk. Parent
//! links are recorded out-of-band in a side table keyed by `Node::id()`
//! (Design Note: "store parents out-of-band... to keep the AST a pure
//! tree and avoid cyclic ownership") so the Context Classifier can walk
//! upward without the collector owning back-edges.

use std::collections::HashMap;

use tree_sitter::{Node, Parser, Tree};

use crate::facts::{CallFact, CallKind, FactStreams, Shape, UsageFact, UsageKind, VariableFact};
use crate::models::Finding;
use crate::vocab;

/// Maps every node id visited to its parent's id. The root has no entry.
pub type ParentTable = HashMap<usize, usize>;

pub struct ParseOutcome {
    pub tree: Tree,
    pub parents: ParentTable,
    pub facts: FactStreams,
}

/// Parse `source` and collect facts, or a synthetic `parse_error` finding
/// if the grammar cannot load or the whole file fails to parse.
pub fn collect(source: &[u8]) -> Result<ParseOutcome, Finding> {
    let mut parser = Parser::new();
    let language = tree_sitter_php::LANGUAGE_PHP;
    parser
        .set_language(&language.into())
        .map_err(|e| Finding::parse_error(1, format!("failed to load PHP grammar: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Finding::parse_error(1, "tree-sitter produced no parse tree"))?;

    let root = tree.root_node();
    if root.has_error() && root.child_count() == 0 {
        return Err(Finding::parse_error(1, "source could not be parsed"));
    }

    let mut parents = ParentTable::new();
    let mut facts = FactStreams::default();
    walk(root, source, &mut parents, &mut facts);

    Ok(ParseOutcome { tree, parents, facts })
}

fn walk(root: Node, source: &[u8], parents: &mut ParentTable, facts: &mut FactStreams) {
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if let Some(parent) = node.parent() {
            parents.insert(node.id(), parent.id());
        }
        visit(node, source, facts);

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

fn line_of(node: Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Strip a leading `$` from a variable_name node's text.
fn var_name(node: Node, source: &[u8]) -> Option<String> {
    let t = text(node, source);
    let t = t.strip_prefix('$').unwrap_or(t);
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

fn callee_name<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name("function")
        .or_else(|| node.child_by_field_name("name"))
        .map(|n| text(n, source))
}

fn visit(node: Node, source: &[u8], facts: &mut FactStreams) {
    match node.kind() {
        "assignment_expression" => visit_assignment(node, source, facts),
        "foreach_statement" => visit_foreach(node, source, facts),
        "function_call_expression" => visit_function_call(node, source, facts),
        "member_call_expression" => visit_method_call(node, source, facts),
        "scoped_call_expression" => visit_static_call(node, source, facts),
        "unset_variable" | "isset_variable" => visit_presence_or_destroy(node, source, facts),
        "empty_intrinsic" => visit_emptiness(node, source, facts),
        "update_expression" => visit_incdec(node, source, facts),
        "return_statement" => visit_return(node, source, facts),
        _ => {}
    }
}

fn visit_assignment(node: Node, source: &[u8], facts: &mut FactStreams) {
    let Some(left) = node.child_by_field_name("left") else { return };
    let Some(name) = var_name(left, source) else { return };
    let line = line_of(node);
    let Some(right) = node.child_by_field_name("right") else {
        facts.variables.push(VariableFact { line, name, shape: Shape::Unknown, secured: false, reason: "" });
        return;
    };

    let (shape, reason, secured) = classify_assignment_rhs(right, source);
    facts.variables.push(VariableFact { line, name, shape, secured, reason });
}

/// Determine the shape/security verdict for an assignment's RHS, per the
/// ordered rules in the design (array literal, superglobal, array-returning
/// call, escape call, otherwise unknown).
fn classify_assignment_rhs(rhs: Node, source: &[u8]) -> (Shape, &'static str, bool) {
    let rhs_text = text(rhs, source);

    if rhs.kind() == "array_creation_expression" {
        return (Shape::Array, "array_literal", false);
    }

    if vocab::SUPERGLOBALS.iter().any(|s| rhs_text.trim() == format!("${s}")) {
        return (Shape::Array, "superglobal_assignment", false);
    }

    if rhs.kind() == "subscript_expression" {
        if let Some(base) = rhs.child_by_field_name("object") {
            let base_text = text(base, source);
            if vocab::SUPERGLOBALS.iter().any(|s| base_text == format!("${s}")) {
                return (Shape::Scalar, "superglobal_element_assignment", false);
            }
        }
    }

    if rhs.kind() == "function_call_expression" {
        if let Some(name) = callee_name(rhs, source) {
            if vocab::is_array_returning_function(name) {
                return (Shape::Array, array_returning_reason(name), false);
            }
            if name.eq_ignore_ascii_case(vocab::HTML_ESCAPE_FUNCTION) {
                return (Shape::Unknown, "secured_with_escape", true);
            }
        }
    }

    if rhs.kind() == "binary_expression" && text(rhs, source).contains("??") {
        if let Some(left) = rhs.child_by_field_name("left") {
            if left.kind() == "function_call_expression" {
                if let Some(name) = callee_name(left, source) {
                    if name.eq_ignore_ascii_case(vocab::HTML_ESCAPE_FUNCTION) {
                        return (Shape::Unknown, "secured_with_escape", true);
                    }
                }
            }
        }
    }

    (Shape::Unknown, "", false)
}

/// Array-returning-function reasons are interned as `assigned_from_<name>`;
/// the handful of names we support are small enough to special-case rather
/// than leak an allocation requirement into a `&'static str` return type.
fn array_returning_reason(name: &str) -> &'static str {
    match name.to_ascii_lowercase().as_str() {
        "array_keys" => "assigned_from_array_keys",
        "array_values" => "assigned_from_array_values",
        "array_map" => "assigned_from_array_map",
        "array_filter" => "assigned_from_array_filter",
        "explode" => "assigned_from_explode",
        "preg_split" => "assigned_from_preg_split",
        "range" => "assigned_from_range",
        "glob" => "assigned_from_glob",
        _ => "assigned_from_array_returning_call",
    }
}

fn visit_foreach(node: Node, source: &[u8], facts: &mut FactStreams) {
    let line = line_of(node);
    if let Some(source_expr) = node.child_by_field_name("array") {
        if source_expr.kind() == "variable_name" {
            if let Some(name) = var_name(source_expr, source) {
                facts.variables.push(VariableFact { line, name, shape: Shape::Array, secured: false, reason: "foreach_source" });
            }
        }
    }
    if let Some(value) = node.child_by_field_name("value") {
        if let Some(name) = var_name(value, source) {
            facts.variables.push(VariableFact { line, name, shape: Shape::Scalar, secured: false, reason: "foreach_value" });
        }
    }
    if let Some(key) = node.child_by_field_name("key") {
        if let Some(name) = var_name(key, source) {
            facts.variables.push(VariableFact { line, name, shape: Shape::Scalar, secured: false, reason: "foreach_key" });
        }
    }
}

/// Recursively collect distinct variable names referenced under `node`,
/// descending into indexed reads, property reads, nested calls, binary
/// operators, and ternaries, per the design's "recursive variable
/// collector".
fn collect_vars(node: Node, source: &[u8], out: &mut Vec<String>) {
    if node.kind() == "variable_name" {
        if let Some(name) = var_name(node, source) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_vars(child, source, out);
    }
}

fn arg_vars(call: Node, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(args) = call.child_by_field_name("arguments") {
        collect_vars(args, source, &mut out);
    }
    out
}

fn visit_function_call(node: Node, source: &[u8], facts: &mut FactStreams) {
    let Some(name) = callee_name(node, source) else { return };
    let line = line_of(node);

    if name.eq_ignore_ascii_case("is_array") {
        if let Some(args) = node.child_by_field_name("arguments") {
            let mut cursor = args.walk();
            if let Some(first) = args.children(&mut cursor).find(|c| c.kind() == "variable_name") {
                if let Some(vname) = var_name(first, source) {
                    facts.variables.push(VariableFact { line, name: vname, shape: Shape::Array, secured: false, reason: "checked_with_is_array" });
                }
            }
        }
        return;
    }

    let is_sql = vocab::is_sql_function(name);
    facts.calls.push(CallFact { line, kind: CallKind::Function, name: name.to_ascii_lowercase(), arg_vars: arg_vars(node, source), is_sql });
}

fn visit_method_call(node: Node, source: &[u8], facts: &mut FactStreams) {
    let Some(name_node) = node.child_by_field_name("name") else { return };
    let name = text(name_node, source);
    let line = line_of(node);
    let is_sql = vocab::is_sql_method(name);
    facts.calls.push(CallFact { line, kind: CallKind::Method, name: name.to_ascii_lowercase(), arg_vars: arg_vars(node, source), is_sql });
}

fn visit_static_call(node: Node, source: &[u8], facts: &mut FactStreams) {
    let Some(name_node) = node.child_by_field_name("name") else { return };
    let name = text(name_node, source);
    let line = line_of(node);
    let is_sql = vocab::is_sql_method(name);
    facts.calls.push(CallFact { line, kind: CallKind::Static, name: name.to_ascii_lowercase(), arg_vars: arg_vars(node, source), is_sql });
}

fn visit_presence_or_destroy(node: Node, source: &[u8], facts: &mut FactStreams) {
    let Some(name) = var_name(node, source) else { return };
    let line = line_of(node);
    let kind = if node.kind() == "unset_variable" { UsageKind::Destroy } else { UsageKind::Presence };
    facts.usages.push(UsageFact { line, kind, vars: vec![name] });
}

/// `empty($x)` is its own grammar construct distinct from `isset`/`unset`'s
/// `isset_variable`/`unset_variable` nodes — it wraps an arbitrary
/// expression rather than a dedicated variable node, so its variables are
/// gathered with the same recursive collector used for call arguments.
fn visit_emptiness(node: Node, source: &[u8], facts: &mut FactStreams) {
    let mut vars = Vec::new();
    collect_vars(node, source, &mut vars);
    if vars.is_empty() {
        return;
    }
    facts.usages.push(UsageFact { line: line_of(node), kind: UsageKind::Emptiness, vars });
}

fn visit_incdec(node: Node, source: &[u8], facts: &mut FactStreams) {
    let mut vars = Vec::new();
    collect_vars(node, source, &mut vars);
    if vars.is_empty() {
        return;
    }
    facts.usages.push(UsageFact { line: line_of(node), kind: UsageKind::IncDec, vars });
}

fn visit_return(node: Node, source: &[u8], facts: &mut FactStreams) {
    let mut vars = Vec::new();
    collect_vars(node, source, &mut vars);
    if vars.is_empty() {
        return;
    }
    facts.usages.push(UsageFact { line: line_of(node), kind: UsageKind::Return, vars });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_on_empty_grammar_mismatch_yields_parse_error() {
        // An empty byte slice still parses to an empty `program` node under
        // tree-sitter-php, so this exercises the happy path rather than the
        // error path; kept to document that empty input is not an error.
        let outcome = collect(b"").expect("empty input parses");
        assert!(outcome.facts.variables.is_empty());
    }

    #[test]
    fn assignment_from_superglobal_array_produces_array_shape() {
        let src = b"<?php\n$data = $_POST;\n";
        let outcome = collect(src).expect("parses");
        let fact = outcome.facts.variables.iter().find(|f| f.name == "data").expect("fact recorded");
        assert_eq!(fact.shape, Shape::Array);
        assert_eq!(fact.reason, "superglobal_assignment");
    }

    #[test]
    fn assignment_from_superglobal_index_produces_scalar_shape() {
        let src = b"<?php\n$id = $_GET['id'];\n";
        let outcome = collect(src).expect("parses");
        let fact = outcome.facts.variables.iter().find(|f| f.name == "id").expect("fact recorded");
        assert_eq!(fact.shape, Shape::Scalar);
        assert_eq!(fact.reason, "superglobal_element_assignment");
    }

    #[test]
    fn escape_call_marks_secured() {
        let src = b"<?php\n$safe = htmlspecialchars($name);\n";
        let outcome = collect(src).expect("parses");
        let fact = outcome.facts.variables.iter().find(|f| f.name == "safe").expect("fact recorded");
        assert!(fact.secured);
    }

    #[test]
    fn empty_call_is_tagged_as_emptiness_usage() {
        let src = b"<?php\nif (empty($name)) {\n}\n";
        let outcome = collect(src).expect("parses");
        let usage = outcome
            .facts
            .usages
            .iter()
            .find(|u| u.vars.contains(&"name".to_string()))
            .expect("usage recorded");
        assert_eq!(usage.kind, UsageKind::Emptiness);
    }

    #[test]
    fn bind_param_call_is_tagged_sql() {
        let src = b"<?php\n$stmt->bind_param('s', $id);\n";
        let outcome = collect(src).expect("parses");
        let call = outcome.facts.calls.iter().find(|c| c.name == "bind_param").expect("call recorded");
        assert!(call.is_sql);
        assert!(call.arg_vars.contains(&"id".to_string()));
    }
}
