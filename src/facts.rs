//! Fact types produced by the AST fact collector.
//!
//! These mirror the three fact streams in the design: variable shape hints,
//! call sites (with SQL-sink tagging), and usage sites that make a variable
//! reference-required rather than value-required.

use std::collections::BTreeSet;

/// Coarse classification of a variable's value shape.
///
/// Ordered so that `max(a, b)` moves toward `Array`: shape is monotone
/// once a variable is known to hold an array, later facts never demote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    Unknown,
    Scalar,
    Array,
}

impl Shape {
    /// Merge two shape observations, keeping the more conclusive one.
    /// `Array` beats everything; `Scalar` beats `Unknown`.
    pub fn merge(self, other: Shape) -> Shape {
        self.max(other)
    }
}

/// Kind of call site recorded by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Function,
    Method,
    Static,
}

/// A function/method/static call observed on a line.
#[derive(Debug, Clone)]
pub struct CallFact {
    pub line: u32,
    pub kind: CallKind,
    /// Lowercased call name (function name, or method/static member name).
    pub name: String,
    /// Variable names (no sigil) passed as arguments, deduplicated,
    /// in encounter order.
    pub arg_vars: Vec<String>,
    pub is_sql: bool,
}

/// A variable shape/security observation tied to a single AST node.
#[derive(Debug, Clone)]
pub struct VariableFact {
    pub line: u32,
    pub name: String,
    pub shape: Shape,
    /// Set when this fact alone proves the variable secured (e.g. the RHS
    /// of its assignment is an `htmlspecialchars(...)` call).
    pub secured: bool,
    pub reason: &'static str,
}

/// Why a variable reference on a line is reference-required rather than
/// value-required (and therefore not rewrite-eligible).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Presence,
    Emptiness,
    Destroy,
    IncDec,
    Return,
}

#[derive(Debug, Clone)]
pub struct UsageFact {
    pub line: u32,
    pub kind: UsageKind,
    pub vars: Vec<String>,
}

/// The three fact streams the collector produces for one file.
#[derive(Debug, Clone, Default)]
pub struct FactStreams {
    pub variables: Vec<VariableFact>,
    pub calls: Vec<CallFact>,
    pub usages: Vec<UsageFact>,
}

impl FactStreams {
    pub fn calls_on_line(&self, line: u32) -> impl Iterator<Item = &CallFact> {
        self.calls.iter().filter(move |c| c.line == line)
    }

    pub fn usages_on_line(&self, line: u32) -> impl Iterator<Item = &UsageFact> {
        self.usages.iter().filter(move |u| u.line == line)
    }

    /// Distinct variable names with at least one fact, in first-seen order.
    pub fn known_variable_names(&self) -> BTreeSet<String> {
        self.variables.iter().map(|f| f.name.clone()).collect()
    }
}
