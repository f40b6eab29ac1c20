//! Configuration management for fnpack
//!
//! Settings come from environment variables with fallback defaults. Request
//! fields always win over these; the configuration only fills gaps.
//!
//! # Environment Variables
//!
//! - `FNPACK_LOG_LEVEL`: Logging level - default: "info"
//! - `FNPACK_LOG_JSON`: JSON log output (true|false) - default: "false"
//! - `FNPACK_EXECUTABLE_SEARCH_PATHS`: Extra executable search paths, in the
//!   platform's `PATH` syntax - default: none
//! - `FNPACK_DEFAULT_ARCHITECTURE`: Architecture used when a request gives
//!   none - default: "x86_64"
//!
//! # Example
//!
//! ```no_run
//! use fnpack::FnpackConfig;
//!
//! let config = FnpackConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use crate::architecture::Architecture;
use crate::workflow::BuildOptions;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_LOG_JSON: bool = false;

pub const ENV_LOG_LEVEL: &str = "FNPACK_LOG_LEVEL";
pub const ENV_LOG_JSON: &str = "FNPACK_LOG_JSON";
pub const ENV_EXECUTABLE_SEARCH_PATHS: &str = "FNPACK_EXECUTABLE_SEARCH_PATHS";
pub const ENV_DEFAULT_ARCHITECTURE: &str = "FNPACK_DEFAULT_ARCHITECTURE";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Process-level settings for fnpack.
///
/// `Default::default()` reads the environment.
#[derive(Debug, Clone)]
pub struct FnpackConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_json: bool,

    /// Searched before `PATH` when a request names no search paths
    pub executable_search_paths: Vec<PathBuf>,

    pub default_architecture: Architecture,
}

impl Default for FnpackConfig {
    fn default() -> Self {
        let log_level = env::var(ENV_LOG_LEVEL)
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let log_json = env::var(ENV_LOG_JSON)
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(DEFAULT_LOG_JSON);

        let executable_search_paths = env::var_os(ENV_EXECUTABLE_SEARCH_PATHS)
            .map(|v| env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
            .unwrap_or_default();

        let default_architecture = env::var(ENV_DEFAULT_ARCHITECTURE)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().parse::<Architecture>().unwrap_or_default())
            .unwrap_or_default();

        Self {
            log_level,
            log_json,
            executable_search_paths,
            default_architecture,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl FnpackConfig {
    /// Like [`Default::default`], but rejects unparseable booleans instead of
    /// falling back to their defaults.
    pub fn from_env_strict() -> Result<Self, ConfigError> {
        if let Ok(value) = env::var(ENV_LOG_JSON) {
            if parse_bool(&value).is_none() {
                return Err(ConfigError::ParseError {
                    field: ENV_LOG_JSON.to_string(),
                    error: format!("'{}' is not a boolean", value),
                });
            }
        }
        Ok(Self::default())
    }

    /// Checks the log level and the default architecture.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` for an unknown log level or an
    /// architecture fnpack does not know how to target.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.default_architecture.is_custom() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid default architecture: {}. Valid options: {}",
                self.default_architecture,
                Architecture::all_variants()
                    .iter()
                    .map(Architecture::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        Ok(())
    }

    /// Fills request fields the caller left empty.
    ///
    /// `explicit_architecture` tells whether the request named an
    /// architecture; a missing one is replaced by the configured default.
    pub fn apply_defaults(&self, options: &mut BuildOptions, explicit_architecture: bool) {
        if options.executable_search_paths.is_empty() {
            options.executable_search_paths = self.executable_search_paths.clone();
        }
        if !explicit_architecture {
            options.architecture = self.default_architecture.clone();
        }
    }
}

impl fmt::Display for FnpackConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fnpack Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Log JSON: {}", self.log_json)?;
        if !self.executable_search_paths.is_empty() {
            let paths: Vec<String> = self
                .executable_search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            writeln!(f, "  Executable Search Paths: {}", paths.join(", "))?;
        }
        writeln!(f, "  Default Architecture: {}", self.default_architecture)?;
        Ok(())
    }
}
