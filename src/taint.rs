//! Taint & Shape State (§4.4)
//!
//! `VariableState` is built by two sequential passes over one file: a
//! seeding pass that merges textual superglobal/foreach patterns with the
//! AST fact streams, and a mark-secured pass that looks for an
//! escape-assignment on each known variable's own lines. The state lives
//! only for the duration of one file's analysis (Design Note: never lift
//! this to process-wide storage).

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;

use crate::facts::{FactStreams, Shape};
use crate::line_index::LineIndex;
use crate::vocab;

#[derive(Debug, Clone)]
pub struct VariableState {
    pub first_seen_line: u32,
    pub shape: Shape,
    pub secured: bool,
    pub reasons: BTreeSet<String>,
}

impl VariableState {
    fn new(line: u32) -> Self {
        Self { first_seen_line: line, shape: Shape::Unknown, secured: false, reasons: BTreeSet::new() }
    }

    fn observe(&mut self, line: u32, shape: Shape, secured: bool, reason: &str) {
        if line < self.first_seen_line {
            self.first_seen_line = line;
        }
        self.shape = self.shape.merge(shape);
        self.secured = self.secured || secured;
        if !reason.is_empty() {
            self.reasons.insert(reason.to_string());
        }
    }
}

/// Per-file mapping from variable name to its accumulated state. `order`
/// records first-insertion order separately from the `HashMap`, so callers
/// that need a deterministic name ordering aren't at the mercy of hash
/// iteration order.
#[derive(Debug, Clone, Default)]
pub struct TaintState {
    vars: HashMap<String, VariableState>,
    order: Vec<String>,
}

impl TaintState {
    pub fn get(&self, name: &str) -> Option<&VariableState> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Known variable names in first-insertion order.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    fn entry(&mut self, name: &str, line: u32) -> &mut VariableState {
        if !self.vars.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.vars.entry(name.to_string()).or_insert_with(|| VariableState::new(line))
    }
}

fn superglobal_assignment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = vocab::SUPERGLOBALS.join("|");
        Regex::new(&format!(r"^\s*\$(?P<name>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*\${}(?:\[|$)", format!("(?:{alternation})")))
            .expect("superglobal assignment pattern is valid")
    })
}

fn foreach_binding_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"foreach\s*\(.*\bas\s*(?:\$(?P<key>[A-Za-z_][A-Za-z0-9_]*)\s*=>\s*)?\$(?P<value>[A-Za-z_][A-Za-z0-9_]*)\s*\)")
            .expect("foreach binding pattern is valid")
    })
}

fn escape_assignment_regex(name: &str) -> Regex {
    Regex::new(&format!(
        r"^\s*\${}\s*=\s*{}\s*\(",
        regex::escape(name),
        regex::escape(vocab::HTML_ESCAPE_FUNCTION)
    ))
    .expect("escape assignment pattern is valid")
}

/// Run both passes and return the resulting per-file state.
pub fn build(lines: &LineIndex, facts: &FactStreams) -> TaintState {
    let mut state = TaintState::default();
    seed(&mut state, lines, facts);
    mark_secured(&mut state, lines, facts);
    state
}

fn seed(state: &mut TaintState, lines: &LineIndex, facts: &FactStreams) {
    for n in lines.iter_lines() {
        if lines.is_skippable(n) {
            continue;
        }
        let text = lines.text(n);

        if let Some(caps) = superglobal_assignment_regex().captures(text) {
            let name = caps["name"].to_string();
            // `$_POST` (whole read) seeds Array; `$_POST[...]` (indexed
            // read) seeds Scalar — mirrors the AST collector's own split
            // between `superglobal_assignment` and
            // `superglobal_element_assignment` (§4.2).
            let whole_match = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            if whole_match.ends_with('[') {
                state.entry(&name, n).observe(n, Shape::Scalar, false, "superglobal_element_assignment");
            } else {
                state.entry(&name, n).observe(n, Shape::Array, false, "superglobal_assignment");
            }
        }

        if let Some(caps) = foreach_binding_regex().captures(text) {
            if let Some(key) = caps.name("key") {
                state.entry(key.as_str(), n).observe(n, Shape::Scalar, false, "foreach_key");
            }
            if let Some(value) = caps.name("value") {
                state.entry(value.as_str(), n).observe(n, Shape::Scalar, false, "foreach_value");
            }
        }
    }

    for fact in &facts.variables {
        state.entry(&fact.name, fact.line).observe(fact.line, fact.shape, fact.secured, fact.reason);
    }
}

fn mark_secured(state: &mut TaintState, lines: &LineIndex, facts: &FactStreams) {
    let names: Vec<String> = state.names().cloned().collect();
    for name in names {
        for n in lines.iter_lines() {
            if lines.is_skippable(n) {
                continue;
            }
            if escape_assignment_regex(&name).is_match(lines.text(n)) {
                state.entry(&name, n).observe(n, Shape::Unknown, true, "secured_with_escape");
            }
        }
    }

    for fact in &facts.variables {
        if fact.reason == "secured_with_escape" {
            state.entry(&fact.name, fact.line).observe(fact.line, Shape::Unknown, true, "secured_with_escape");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_superglobal_assignment_as_array() {
        let lines = LineIndex::from_str("$data = $_POST;\n");
        let facts = FactStreams::default();
        let state = build(&lines, &facts);
        let v = state.get("data").expect("seeded");
        assert_eq!(v.shape, Shape::Array);
        assert!(v.reasons.contains("superglobal_assignment"));
    }

    #[test]
    fn seeds_foreach_key_and_value_bindings() {
        let lines = LineIndex::from_str("foreach ($items as $k => $v) {\n");
        let facts = FactStreams::default();
        let state = build(&lines, &facts);
        assert_eq!(state.get("k").unwrap().shape, Shape::Scalar);
        assert_eq!(state.get("v").unwrap().shape, Shape::Scalar);
    }

    #[test]
    fn mark_secured_detects_escape_assignment() {
        let lines = LineIndex::from_str("$id = $_GET['id'];\n$safe = htmlspecialchars($id);\n");
        let facts = FactStreams::default();
        let mut state = build(&lines, &facts);
        // `safe` only exists once mark_secured's own regex creates it;
        // seeding never observed it because no AST facts were supplied.
        mark_secured(&mut state, &lines, &facts);
        assert!(state.get("safe").unwrap().secured);
    }

    #[test]
    fn names_are_returned_in_first_insertion_order() {
        let lines = LineIndex::from_str("$b = $_GET['b'];\n$a = $_GET['a'];\n");
        let facts = FactStreams::default();
        let state = build(&lines, &facts);
        let names: Vec<&String> = state.names().collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn shape_stays_monotone_across_seed_and_ast_facts() {
        use crate::facts::VariableFact;
        let lines = LineIndex::from_str("$x = $_POST;\n");
        let mut facts = FactStreams::default();
        facts.variables.push(VariableFact { line: 1, name: "x".into(), shape: Shape::Unknown, secured: false, reason: "" });
        let state = build(&lines, &facts);
        assert_eq!(state.get("x").unwrap().shape, Shape::Array);
    }
}
