#![cfg_attr(not(test), deny(clippy::unwrap_used))]

//! phpguard — a static security analyzer for PHP source files.
//!
//! Scans for unescaped user-controlled values reaching HTML output or SQL
//! sinks, classifies each flagged site, and suggests a concrete rewrite.
//! See [`analyzer::analyze_source`] for the single entry point the rest of
//! this crate exists to support.

pub mod aggregator;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod facts;
pub mod line_index;
pub mod models;
pub mod php_parser;
pub mod reporters;
pub mod rewriter;
pub mod taint;
pub mod vocab;

pub use analyzer::{analyze_file, analyze_source};
pub use error::AnalyzeError;
pub use models::{Finding, FindingKind};
