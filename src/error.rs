//! Library error type
//!
//! Reserved for conditions outside the error taxonomy described in the
//! analyzer's design (grammar load failure, etc). Per-file parse failures
//! are not represented here — they surface as a `Finding` with
//! `kind: ParseError` instead, so that callers get one finding stream
//! regardless of whether a file parsed cleanly.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("failed to load the PHP grammar")]
    GrammarLoad(#[source] tree_sitter::LanguageError),

    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project configuration at {path}")]
    Config {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
