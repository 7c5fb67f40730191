//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`objgate.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`objgate.yaml`, `objgate.yml`, etc.)
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic values passed to [`ConfigLoader::merge`]
//! 3. Profile-specific config file (`objgate.{profile}.toml`)
//! 4. Main config file (`objgate.toml`)
//! 5. Environment variables (`OBJGATE_*`)
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `OBJGATE_` prefix with `__` as separator:
//!
//! - `OBJGATE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `OBJGATE_GATE__CACHE_SIZE=0` → `gate.cache_size = 0`
//!
//! # Example
//!
//! ```rust,ignore
//! use objgate_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/objgate.toml")
//!     .profile("production")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::GateConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "OBJGATE_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "OBJGATE_PROFILE";

/// Configuration file names searched for, in order.
const CONFIG_FILE_NAMES: &[&str] = &[
    #[cfg(feature = "toml-config")]
    "objgate.toml",
    #[cfg(feature = "toml-config")]
    "config.toml",
    #[cfg(feature = "yaml-config")]
    "objgate.yaml",
    #[cfg(feature = "yaml-config")]
    "objgate.yml",
    #[cfg(feature = "yaml-config")]
    "config.yaml",
    #[cfg(feature = "yaml-config")]
    "config.yml",
];

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting the `dev` and `prod` short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `OBJGATE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load, skipping the search.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration values programmatically.
    ///
    /// ```rust,ignore
    /// let config = ConfigLoader::new()
    ///     .merge(GateConfig {
    ///         logging: LoggingConfig { level: LogLevel::Debug, ..Default::default() },
    ///         ..Default::default()
    ///     })
    ///     .load()?;
    /// ```
    pub fn merge(mut self, config: GateConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<GateConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: GateConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            sources = ?config.gate.sources,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(GateConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment)?;
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["profile"]).split("__"));
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    /// Explicit search paths, or the current directory followed by
    /// `~/.config/objgate`.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("objgate")))
            .collect()
    }

    /// Searches every path for the first base file of an enabled format.
    /// Its profile variant (`objgate.production.toml`) is merged first, so
    /// the base file wins on conflicts.
    fn load_config_files(&self, mut figment: Figment) -> ConfigResult<Figment> {
        for dir in self.resolve_search_paths() {
            for name in CONFIG_FILE_NAMES {
                let base_path = dir.join(name);
                if !base_path.exists() {
                    continue;
                }

                if let Some((stem, ext)) = name.rsplit_once('.') {
                    let profile_path = dir.join(format!("{stem}.{}.{ext}", self.profile));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = Self::merge_config_file(figment, &profile_path)?;
                    }
                }

                info!(path = %base_path.display(), "Loading configuration file");
                return Self::merge_config_file(figment, &base_path);
            }
        }

        warn!("No configuration file found, using defaults");
        Ok(figment)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogLevel, TransRule};
    use objgate_core::AttributeSpec;
    use std::io::Write;

    fn empty_dir_loader(dir: &tempfile::TempDir) -> ConfigLoader {
        ConfigLoader::new().without_env().search_path(dir.path())
    }

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = empty_dir_loader(&dir).load().unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.gate.cache_size, 20);
        assert!(config.gate.input.is_empty());
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("DEV"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"

[gate]
permissions = ["greet", "calc.compute"]
constructor_args = ["user"]
cache_size = 4

[gate.input.argname]
x = "float"
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .file(file.path())
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.gate.permissions,
            AttributeSpec::list(["greet", "calc.compute"])
        );
        assert_eq!(config.gate.constructor_args, ["user"]);
        assert_eq!(config.gate.cache_size, 4);
        let TransRule::Layers(input) = &config.gate.input else {
            panic!("expected layers");
        };
        assert_eq!(input.argname["x"], TransRule::Named("float".into()));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("objgate.production.toml"),
            "[gate]\ncache_size = 7\nsources = [\"query\"]\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("objgate.toml"), "[gate]\ncache_size = 3\n").unwrap();

        let config = empty_dir_loader(&dir).profile("prod").load().unwrap();
        assert_eq!(config.gate.cache_size, 3);
        assert_eq!(config.gate.sources, ["query"]);
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/objgate.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = ConfigLoader::new()
            .without_env()
            .file(file.path())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_programmatic_merge() {
        let dir = tempfile::tempdir().unwrap();
        let mut base = GateConfig::default();
        base.gate.cache_size = 0;
        base.logging.level = LogLevel::Warn;

        let config = empty_dir_loader(&dir).merge(base).load().unwrap();
        assert_eq!(config.gate.cache_size, 0);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }
}
