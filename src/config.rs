//! Configuration management for the schema resolver
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (resolver.toml)
//! - Environment variables (SCHEMA_RESOLVER__*)
//!
//! ## Example config file (resolver.toml):
//! ```toml
//! [compiler]
//! default_base_uri = "https://schemas.familiar.dev/"
//! assert_format = true
//!
//! [http]
//! timeout_secs = 10
//! user_agent = "schema-resolver"
//!
//! [loaders]
//! http = true
//! file = false
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Main configuration for the resolver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Compiler settings
    #[serde(default)]
    pub compiler: CompilerSettings,

    /// HTTP loader settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Which built-in loaders to register
    #[serde(default)]
    pub loaders: LoaderConfig,
}

/// Compiler settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Base URI for resolving relative references
    #[serde(default)]
    pub default_base_uri: Option<String>,

    /// Whether `format` is asserted during validation
    #[serde(default)]
    pub assert_format: bool,
}

/// HTTP loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with requests
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Built-in loader toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Register the `http` and `https` loaders
    #[serde(default = "default_true")]
    pub http: bool,

    /// Register the `file` loader
    #[serde(default)]
    pub file: bool,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            http: true,
            file: false,
        }
    }
}

impl HttpConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ResolverConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        for location in ["resolver.toml", ".resolver.toml", "config/resolver.toml"] {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "familiar", "schema-resolver") {
            let xdg_config = dirs.config_dir().join("resolver.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("SCHEMA_RESOLVER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert!(config.loaders.http);
        assert!(!config.loaders.file);
        assert!(!config.compiler.assert_format);
        assert!(config.compiler.default_base_uri.is_none());
    }

    #[test]
    fn test_serialize_config() {
        let toml_str = toml::to_string_pretty(&ResolverConfig::default()).unwrap();
        assert!(toml_str.contains("[http]"));
        assert!(toml_str.contains("[loaders]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[compiler]\ndefault_base_uri = \"https://ex/\"\nassert_format = true\n\n[http]\ntimeout_secs = 3\n\n[loaders]\nfile = true\n",
        )
        .unwrap();

        let config = ResolverConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.compiler.default_base_uri.as_deref(), Some("https://ex/"));
        assert!(config.compiler.assert_format);
        assert_eq!(config.http.timeout_secs, 3);
        assert!(config.loaders.file);
        assert!(config.loaders.http);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = ResolverConfig::default();
        config.http.user_agent = Some("tester".to_string());
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = ResolverConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.http.user_agent.as_deref(), Some("tester"));
    }
}
