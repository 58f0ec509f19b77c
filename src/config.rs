/// Analyzer configuration.
///
/// Every field has a default, so an empty JSON object is a valid config.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intrinsics::IntrinsicSet;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("'{0}' is listed both as an intrinsic and as a pure external")]
    Conflicting(String),
    #[error("max_witnesses must be at least 1")]
    NoWitnesses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Effect-producing primitives.
    pub intrinsics: IntrinsicSet,
    /// External names known to be pure; calls to them are neither
    /// effects nor unresolved.
    pub pure_externals: BTreeSet<String>,
    pub warn_declared_effectful_but_pure: bool,
    pub report_unreachable: bool,
    /// Reject or-patterns whose alternatives bind different variables.
    pub check_or_bindings: bool,
    pub max_witnesses: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            intrinsics: IntrinsicSet::default(),
            pure_externals: BTreeSet::new(),
            warn_declared_effectful_but_pure: true,
            report_unreachable: true,
            check_or_bindings: true,
            max_witnesses: 3,
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json(src: &str) -> Result<Self, ConfigError> {
        let config: AnalyzerConfig = serde_json::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&src)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_witnesses == 0 {
            return Err(ConfigError::NoWitnesses);
        }
        if let Some(name) = self
            .pure_externals
            .iter()
            .find(|name| self.intrinsics.contains(name))
        {
            return Err(ConfigError::Conflicting(name.clone()));
        }
        Ok(())
    }

    pub fn is_pure_external(&self, name: &str) -> bool {
        self.pure_externals.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsics::EffectCategory;

    #[test]
    fn empty_object_gives_defaults() {
        let config = AnalyzerConfig::from_json("{}").expect("valid config");
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let src = r#"{
            "intrinsics": {"emit": "io"},
            "pure_externals": ["len"],
            "report_unreachable": false,
            "max_witnesses": 1
        }"#;
        let config = AnalyzerConfig::from_json(src).expect("valid config");
        assert_eq!(config.intrinsics.category("emit"), Some(EffectCategory::Io));
        assert!(!config.intrinsics.contains("print"));
        assert!(config.is_pure_external("len"));
        assert!(!config.report_unreachable);
        assert!(config.warn_declared_effectful_but_pure);
        assert_eq!(config.max_witnesses, 1);
    }

    #[test]
    fn conflicting_names_are_rejected() {
        let err = AnalyzerConfig::from_json(r#"{"pure_externals": ["print"]}"#).unwrap_err();
        assert!(
            matches!(err, ConfigError::Conflicting(ref n) if n == "print"),
            "got: {}",
            err
        );
    }

    #[test]
    fn zero_witnesses_is_rejected() {
        let err = AnalyzerConfig::from_json(r#"{"max_witnesses": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NoWitnesses));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AnalyzerConfig::load(Path::new("/nonexistent/avow.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/avow.json"));
    }
}
