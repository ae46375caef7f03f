use crate::core::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column and sequence naming used by the providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConvention {
    /// Appended to the derived sequence base name (`ORDER_ID` + `_SEQ`).
    pub sequence_suffix: String,

    /// Technical key column of value-object rows.
    pub primary_key_column: String,

    /// Column pointing from a value-object row to its owning entity row.
    pub container_id_column: String,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            sequence_suffix: "_SEQ".to_string(),
            primary_key_column: "ID".to_string(),
            container_id_column: "CONTAINER_ID".to_string(),
        }
    }
}

/// Persistence stack configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub naming: NamingConvention,

    /// Force a version increment on the aggregate root whenever any other
    /// node of the aggregate is written while the root record is unchanged.
    pub bump_root_version: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            naming: NamingConvention::default(),
            bump_root_version: true,
        }
    }
}

impl PersistenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sequence-name suffix
    pub fn sequence_suffix(mut self, suffix: &str) -> Self {
        self.naming.sequence_suffix = suffix.to_string();
        self
    }

    /// Set the value-object primary key column
    pub fn primary_key_column(mut self, column: &str) -> Self {
        self.naming.primary_key_column = column.to_string();
        self
    }

    /// Set the value-object container id column
    pub fn container_id_column(mut self, column: &str) -> Self {
        self.naming.container_id_column = column.to_string();
        self
    }

    pub fn bump_root_version(mut self, enabled: bool) -> Self {
        self.bump_root_version = enabled;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            PersistenceError::Configuration(format!("Invalid persistence config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PersistenceError::Configuration(format!(
                "Cannot read persistence config '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let naming = &self.naming;
        for (what, value) in [
            ("primary_key_column", &naming.primary_key_column),
            ("container_id_column", &naming.container_id_column),
        ] {
            if value.trim().is_empty() {
                return Err(PersistenceError::Configuration(format!(
                    "'{}' must not be empty",
                    what
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PersistenceConfig::default();
        assert_eq!(config.naming.sequence_suffix, "_SEQ");
        assert_eq!(config.naming.primary_key_column, "ID");
        assert_eq!(config.naming.container_id_column, "CONTAINER_ID");
        assert!(config.bump_root_version);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PersistenceConfig::from_json_str(r#"{"naming": {"sequence_suffix": "_S"}}"#).unwrap();
        assert_eq!(config.naming.sequence_suffix, "_S");
        assert_eq!(config.naming.container_id_column, "CONTAINER_ID");
    }

    #[test]
    fn test_rejects_empty_columns() {
        let err = PersistenceConfig::from_json_str(r#"{"naming": {"primary_key_column": " "}}"#)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bump_root_version": false}}"#).unwrap();
        let config = PersistenceConfig::from_file(file.path()).unwrap();
        assert!(!config.bump_root_version);
    }
}
