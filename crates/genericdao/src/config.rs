//! DAO configuration.

use std::path::Path;

use genericdao_core::{Error, Result};
use genericdao_search::SearchConfig;
use genericdao_session::SessionConfig;
use serde::Deserialize;

/// Session and search settings for a DAO.
///
/// Every key is optional; missing ones take their defaults.
///
/// ```
/// use genericdao::DaoConfig;
///
/// let config = DaoConfig::from_json(
///     r#"{ "session": { "exists_batch_size": 100 }, "search": { "default_max_results": 50 } }"#,
/// )
/// .unwrap();
/// assert!(config.session.auto_flush);
/// assert_eq!(config.session.exists_batch_size, 100);
/// assert_eq!(config.search.default_max_results, Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    pub session: SessionConfig,
    pub search: SearchConfig,
}

impl DaoConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        tracing::debug!(?config, "Loaded DAO configuration");
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.session.exists_batch_size == 0 {
            return Err(Error::Config(
                "session.exists_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_gives_defaults() {
        assert_eq!(DaoConfig::from_json("{}").unwrap(), DaoConfig::default());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = DaoConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let err = DaoConfig::from_json(r#"{"session": {"exists_batch_size": 0}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = DaoConfig::from_path("/nonexistent/genericdao.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
