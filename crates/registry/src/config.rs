//! Runtime configuration: where workflows live, how handlers are addressed,
//! and the default dispatch deadline.
//!
//! The file is YAML or JSON (by extension). Handler addresses and the
//! workflows directory may embed `${env:NAME}` placeholders.

use std::{
    env,
    path::{Path, PathBuf},
};

use dirs_next::config_dir;
use indexmap::IndexMap;
use lambdachain_util::{InterpolationError, expand_tilde, interpolate_env};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::DocumentFormat;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "LAMBDACHAIN_CONFIG";

/// Dispatch deadline used when neither configuration nor step override one.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Address of a handler as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HandlerAddress {
    /// Bare port on the local host.
    Port(u16),
    /// URL, `host:port`, or a numeric string.
    Address(String),
}

impl HandlerAddress {
    /// Renders the address as written, for display.
    pub fn raw(&self) -> String {
        match self {
            HandlerAddress::Port(port) => port.to_string(),
            HandlerAddress::Address(address) => address.clone(),
        }
    }
}

/// Deserialized runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Directory containing workflow documents.
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,
    /// Default per-step dispatch deadline in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Handler name to address routing table.
    #[serde(default)]
    pub handlers: IndexMap<String, HandlerAddress>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            handlers: IndexMap::new(),
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("failed to interpolate '{field}': {source}")]
    Interpolation {
        field: String,
        #[source]
        source: InterpolationError,
    },

    #[error("invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl RuntimeConfig {
    /// Loads configuration from `explicit`, `LAMBDACHAIN_CONFIG`, or the default path.
    ///
    /// An explicitly named file must exist. A missing default file yields
    /// [`RuntimeConfig::default`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Ok(path) = env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Self::from_file(&expand_tilde(&path));
        }
        let path = default_config_path();
        if path.is_file() {
            return Self::from_file(&path);
        }
        Ok(Self::default())
    }

    /// Reads, parses, interpolates, and validates the file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let format = DocumentFormat::from_extension(path.extension().and_then(|ext| ext.to_str()));
        Self::parse(&content, format)
            .map_err(|message| ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            })?
            .interpolated()?
            .validated()
    }

    /// Parses configuration text without interpolation.
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self, String> {
        match format {
            DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|error| error.to_string()),
            DocumentFormat::Json => serde_json::from_str(content).map_err(|error| error.to_string()),
        }
    }

    /// Resolves `${env:NAME}` placeholders in the workflows directory and handler addresses.
    pub fn interpolated(mut self) -> Result<Self, ConfigError> {
        self.workflows_dir = interpolate_env(&self.workflows_dir).map_err(|source| ConfigError::Interpolation {
            field: "workflows_dir".to_string(),
            source,
        })?;
        for (name, address) in self.handlers.iter_mut() {
            if let HandlerAddress::Address(raw) = address {
                *raw = interpolate_env(raw).map_err(|source| ConfigError::Interpolation {
                    field: format!("handlers.{name}"),
                    source,
                })?;
            }
        }
        Ok(self)
    }

    /// Rejects settings no dispatch could honour.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(self)
    }

    /// Workflows directory with `~` expanded.
    pub fn workflows_path(&self) -> PathBuf {
        expand_tilde(&self.workflows_dir)
    }
}

/// Get the default path for the runtime configuration file.
pub fn default_config_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lambdachain")
        .join("config.yaml")
}

fn default_workflows_dir() -> String {
    "workflows".to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_handler_addresses() {
        let config = RuntimeConfig::parse(
            r#"
workflows_dir: flows
handlers:
  user_create: 8080
  user_read: "localhost:8081"
  user_update: "http://users.internal:9000/update"
"#,
            DocumentFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.workflows_dir, "flows");
        assert_eq!(config.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(config.handlers["user_create"], HandlerAddress::Port(8080));
        assert_eq!(config.handlers["user_read"], HandlerAddress::Address("localhost:8081".into()));
        assert_eq!(config.handlers.len(), 3);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::parse("{}", DocumentFormat::Json).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn interpolates_handler_addresses() {
        temp_env::with_var("LAMBDACHAIN_TEST_READ_URL", Some("http://10.1.1.1:7000"), || {
            let config = RuntimeConfig::parse("handlers:\n  user_read: \"${env:LAMBDACHAIN_TEST_READ_URL}\"\n", DocumentFormat::Yaml)
                .unwrap()
                .interpolated()
                .unwrap();
            assert_eq!(config.handlers["user_read"], HandlerAddress::Address("http://10.1.1.1:7000".into()));
        });
    }

    #[test]
    fn unset_variable_fails_interpolation() {
        temp_env::with_var_unset("LAMBDACHAIN_TEST_UNSET", || {
            let error = RuntimeConfig::parse("handlers:\n  a: \"${env:LAMBDACHAIN_TEST_UNSET}\"\n", DocumentFormat::Yaml)
                .unwrap()
                .interpolated()
                .unwrap_err();
            assert!(matches!(error, ConfigError::Interpolation { field, .. } if field == "handlers.a"));
        });
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "request_timeout_ms: 0\n").unwrap();

        let error = RuntimeConfig::from_file(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { ref field, .. } if field == "request_timeout_ms"));
        assert!(RuntimeConfig::default().validated().is_ok());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let error = RuntimeConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(error, ConfigError::Read { .. }));
    }
}
