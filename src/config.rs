//! Project configuration (ambient, §9 AMBIENT STACK)
//!
//! A `serde`-derived struct loaded from an optional TOML file in the
//! project root, with sensible built-in defaults when the file is
//! absent. Carries only what the classifier and aggregator actually
//! need: the overridable SQL keyword vocabulary (Design Note b) and a
//! findings cap per file.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AnalyzeError;
use crate::vocab::DEFAULT_SQL_KEYWORDS;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    classifier: ClassifierConfig,
    #[serde(default)]
    max_findings_per_file: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ClassifierConfig {
    #[serde(default)]
    sql_keywords: Option<Vec<String>>,
}

impl ProjectConfig {
    /// The keyword list used by the SQL-context predicates, falling back
    /// to [`DEFAULT_SQL_KEYWORDS`] when not overridden.
    pub fn sql_keywords(&self) -> Vec<String> {
        match &self.classifier.sql_keywords {
            Some(keywords) if !keywords.is_empty() => keywords.clone(),
            _ => DEFAULT_SQL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn max_findings_per_file(&self) -> Option<usize> {
        self.max_findings_per_file
    }

    /// Load `phpguard.toml` from `repo_root`, returning built-in defaults
    /// when no file is present. A malformed file is a hard error — it is
    /// much more likely the user meant to configure the analyzer than
    /// that a stray `phpguard.toml` should be silently ignored.
    pub fn load(repo_root: &Path) -> Result<Self, AnalyzeError> {
        let path = repo_root.join("phpguard.toml");
        if !path.exists() {
            debug!(path = %path.display(), "no project config found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| AnalyzeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: ProjectConfig = toml::from_str(&content).map_err(|source| AnalyzeError::Config {
            path: path.display().to_string(),
            source,
        })?;
        if config.classifier.sql_keywords.as_ref().is_some_and(|k| k.is_empty()) {
            warn!(path = %path.display(), "sql_keywords is present but empty, falling back to defaults");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_builtin_sql_keywords() {
        let config = ProjectConfig::default();
        assert_eq!(config.sql_keywords(), DEFAULT_SQL_KEYWORDS.to_vec());
        assert_eq!(config.max_findings_per_file(), None);
    }

    #[test]
    fn parses_overridden_sql_keywords_and_cap() {
        let toml_str = r#"
            max_findings_per_file = 50

            [classifier]
            sql_keywords = ["SELECT", "INSERT"]
        "#;
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sql_keywords(), vec!["SELECT".to_string(), "INSERT".to_string()]);
        assert_eq!(config.max_findings_per_file(), Some(50));
    }

    #[test]
    fn empty_keyword_override_falls_back_to_defaults() {
        let toml_str = "[classifier]\nsql_keywords = []\n";
        let config: ProjectConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sql_keywords(), DEFAULT_SQL_KEYWORDS.to_vec());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.sql_keywords(), DEFAULT_SQL_KEYWORDS.to_vec());
    }
}
