//! Runtime settings for postboard.
//!
//! Values are layered: built-in defaults, then an optional `postboard.toml`,
//! then environment variables (a `.env` file is loaded into the environment
//! by the binary before this runs).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! environment = "production"
//!
//! [gemini]
//! model = "gemini-2.5-flash"
//! api_base = "https://generativelanguage.googleapis.com"
//! request_timeout_secs = 120
//! ```
//!
//! The API key is read from `GEMINI_API_KEY` and may also be set in the file,
//! though keeping it out of version-controlled files is preferable.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;

pub const CONFIG_FILE: &str = "postboard.toml";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// `[server]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub environment: Option<String>,
}

/// `[gemini]` table of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Contents of `postboard.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub gemini: GeminiSection,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::FileParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// Empty when unset; only `serve` requires it (see [`Settings::require_api_key`]).
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Load settings from the process environment and, if present, a config
    /// file. An explicit `config_path` must exist; the default
    /// `postboard.toml` in the working directory is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => FileConfig::load(path)?,
            None => {
                let default_path = PathBuf::from(CONFIG_FILE);
                if default_path.exists() {
                    FileConfig::load(&default_path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Apply `file` and then the variables returned by `lookup` over the defaults.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let env = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match env("PORT") {
            Some(raw) => parse_port(&raw)?,
            None => file.server.port.unwrap_or(defaults.port),
        };

        let timeout_secs = match env("REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_timeout(&raw)?,
            None => file
                .gemini
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidVar {
                name: "REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                message: "must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            host: env("HOST")
                .or(file.server.host)
                .unwrap_or(defaults.host),
            port,
            environment: env("APP_ENV")
                .or_else(|| env("NODE_ENV"))
                .or(file.server.environment)
                .unwrap_or(defaults.environment),
            api_key: env("GEMINI_API_KEY")
                .or(file.gemini.api_key)
                .unwrap_or_default(),
            model: env("GEMINI_MODEL")
                .or(file.gemini.model)
                .unwrap_or(defaults.model),
            api_base: env("GEMINI_API_BASE")
                .or(file.gemini.api_base)
                .unwrap_or(defaults.api_base),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// The provider key, or an error naming the missing variable.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        if self.api_key.trim().is_empty() {
            Err(ConfigError::MissingVar("GEMINI_API_KEY"))
        } else {
            Ok(&self.api_key)
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|e| ConfigError::InvalidVar {
            name: "PORT",
            value: raw.to_string(),
            message: e.to_string(),
        })
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidVar {
            name: "REQUEST_TIMEOUT_SECS",
            value: raw.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let settings = Settings::resolve(FileConfig::default(), lookup(&[])).unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.environment, "development");
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert!(!settings.is_production());
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 8080
            host = "0.0.0.0"

            [gemini]
            model = "gemini-from-file"
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(
            file,
            lookup(&[("PORT", "9000"), ("GEMINI_API_KEY", "secret")]),
        )
        .unwrap();
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.model, "gemini-from-file");
        assert_eq!(settings.api_key, "secret");
    }

    #[test]
    fn test_app_env_takes_precedence_over_node_env() {
        let settings = Settings::resolve(
            FileConfig::default(),
            lookup(&[("APP_ENV", "production"), ("NODE_ENV", "development")]),
        )
        .unwrap();
        assert!(settings.is_production());

        let settings =
            Settings::resolve(FileConfig::default(), lookup(&[("NODE_ENV", "Production")]))
                .unwrap();
        assert!(settings.is_production());
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let settings =
            Settings::resolve(FileConfig::default(), lookup(&[("PORT", "  ")])).unwrap();
        assert_eq!(settings.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Settings::resolve(FileConfig::default(), lookup(&[("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = Settings::resolve(
            FileConfig::default(),
            lookup(&[("REQUEST_TIMEOUT_SECS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidVar {
                name: "REQUEST_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_require_api_key() {
        let settings = Settings::default();
        let err = settings.require_api_key().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable GEMINI_API_KEY is required but not defined"
        );

        let settings =
            Settings::resolve(FileConfig::default(), lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(settings.require_api_key().unwrap(), "k");
    }

    #[test]
    fn test_load_file_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("postboard.toml");
        std::fs::write(&path, "[gemini]\nrequest_timeout_secs = 30\n").unwrap();
        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.gemini.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = FileConfig::parse("[server]\nprot = 1\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileParse { .. }));
    }

    #[test]
    fn test_listen_addr() {
        let settings = Settings::default();
        assert_eq!(settings.listen_addr(), "127.0.0.1:3000");
    }
}
