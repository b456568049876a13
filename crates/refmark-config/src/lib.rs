//! Configuration management for refmark.
//!
//! Parses `refmark.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `docs.source_dir`
//! - `converter.program`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override documents source directory.
    pub source_dir: Option<PathBuf>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override inline citation style.
    pub citestyle: Option<String>,
    /// Override bibliography listing style.
    pub bibstyle: Option<String>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override converter program.
    pub converter_program: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "refmark.toml";

/// Longest converter timeout accepted from a config file.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Citation and bibliography style selection.
    pub references: ReferencesConfig,
    /// Document discovery configuration (paths are relative strings from TOML).
    docs: DocsConfigRaw,
    /// External bibliography converter.
    pub converter: ConverterConfig,
    /// Bibliography cache.
    pub cache: CacheConfig,

    /// Resolved docs configuration (set after loading).
    #[serde(skip)]
    pub docs_resolved: DocsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Style selection for citations and the reference listing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReferencesConfig {
    /// Registered name of the inline citation style.
    pub citestyle: String,
    /// Registered name of the bibliography listing style.
    pub bibstyle: String,
    /// Heading rendered above the reference listing. Empty disables it.
    pub heading: String,
}

impl Default for ReferencesConfig {
    fn default() -> Self {
        Self {
            citestyle: "numeric".to_owned(),
            bibstyle: "default".to_owned(),
            heading: "References".to_owned(),
        }
    }
}

/// Raw docs configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocsConfigRaw {
    source_dir: Option<String>,
    include: Option<Vec<String>>,
    output_dir: Option<String>,
}

/// Resolved document discovery configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocsConfig {
    /// Base directory for documents and relative bibliography paths.
    pub source_dir: PathBuf,
    /// Glob patterns (relative to `source_dir`) selecting documents.
    pub include: Vec<String>,
    /// Directory receiving rewritten documents.
    pub output_dir: PathBuf,
    /// Project directory for refmark data (.refmark/).
    pub project_dir: PathBuf,
}

impl DocsConfig {
    /// Cache directory path (.refmark/cache/).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }
}

/// External bibliography converter configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Program invoked to convert bibtex-family sources to CSL-JSON.
    pub program: String,
    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,
}

impl ConverterConfig {
    /// Timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: "pandoc".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Bibliography cache configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether converted bibliographies are cached on disk.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`converter.program`").
        field: String,
        /// Error message (e.g., "${`PANDOC`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `refmark.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source_dir) = &settings.source_dir {
            self.docs_resolved.source_dir.clone_from(source_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.docs_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(citestyle) = &settings.citestyle {
            self.references.citestyle.clone_from(citestyle);
        }
        if let Some(bibstyle) = &settings.bibstyle {
            self.references.bibstyle.clone_from(bibstyle);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache.enabled = cache_enabled;
        }
        if let Some(program) = &settings.converter_program {
            self.converter.program.clone_from(program);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            references: ReferencesConfig::default(),
            docs: DocsConfigRaw::default(),
            converter: ConverterConfig::default(),
            cache: CacheConfig::default(),
            docs_resolved: DocsConfig {
                source_dir: base.to_path_buf(),
                include: default_include(),
                output_dir: base.join("output"),
                project_dir: base.join(".refmark"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Style names are only checked for emptiness here; whether a name is
    /// registered is decided by the engine when it resolves styles.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.references.citestyle, "references.citestyle")?;
        require_non_empty(&self.references.bibstyle, "references.bibstyle")?;
        require_non_empty(&self.converter.program, "converter.program")?;

        if self.converter.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "converter.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.converter.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::Validation(format!(
                "converter.timeout_secs cannot exceed {MAX_TIMEOUT_SECS}"
            )));
        }
        if self.docs_resolved.include.is_empty() {
            return Err(ConfigError::Validation(
                "docs.include must list at least one pattern".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.converter.program = expand::expand_env(&self.converter.program, "converter.program")?;
        if let Some(ref source_dir) = self.docs.source_dir {
            self.docs.source_dir = Some(expand::expand_env(source_dir, "docs.source_dir")?);
        }
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.docs_resolved = DocsConfig {
            source_dir: resolve(self.docs.source_dir.as_deref(), "."),
            include: self.docs.include.clone().unwrap_or_else(default_include),
            output_dir: resolve(self.docs.output_dir.as_deref(), "output"),
            project_dir: config_dir.join(".refmark"),
        };
    }
}

fn default_include() -> Vec<String> {
    vec!["**/*.md".to_owned()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/site"));
        assert_eq!(config.references.citestyle, "numeric");
        assert_eq!(config.references.bibstyle, "default");
        assert_eq!(config.references.heading, "References");
        assert_eq!(config.docs_resolved.source_dir, PathBuf::from("/site"));
        assert_eq!(config.docs_resolved.include, vec!["**/*.md".to_owned()]);
        assert_eq!(config.docs_resolved.output_dir, PathBuf::from("/site/output"));
        assert_eq!(
            config.docs_resolved.cache_dir(),
            PathBuf::from("/site/.refmark/cache")
        );
        assert_eq!(config.converter.program, "pandoc");
        assert_eq!(config.converter.timeout(), Duration::from_secs(30));
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.references.citestyle, "numeric");
        assert_eq!(config.converter.program, "pandoc");
    }

    #[test]
    fn test_parse_references_config() {
        let toml = r#"
[references]
citestyle = "author-year"
bibstyle = "alphabetic"
heading = "Bibliography"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.references.citestyle, "author-year");
        assert_eq!(config.references.bibstyle, "alphabetic");
        assert_eq!(config.references.heading, "Bibliography");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[docs]
source_dir = "content"
include = ["posts/**/*.md"]
output_dir = "public"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.docs_resolved.source_dir,
            PathBuf::from("/project/content")
        );
        assert_eq!(config.docs_resolved.include, vec!["posts/**/*.md".to_owned()]);
        assert_eq!(
            config.docs_resolved.output_dir,
            PathBuf::from("/project/public")
        );
        assert_eq!(
            config.docs_resolved.project_dir,
            PathBuf::from("/project/.refmark")
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let toml = r"
[converter]
timeout_secs = 0
";
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_validate_rejects_huge_timeout() {
        let toml = r"
[converter]
timeout_secs = 601
";
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_style() {
        let toml = r#"
[references]
citestyle = ""
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("references.citestyle"));
    }

    #[test]
    fn test_unknown_style_name_is_not_a_config_error() {
        let toml = r#"
[references]
citestyle = "chicago"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/site"));
        let overrides = CliSettings {
            output_dir: Some(PathBuf::from("/tmp/out")),
            citestyle: Some("author-year".to_owned()),
            cache_enabled: Some(false),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.docs_resolved.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.references.citestyle, "author-year");
        assert_eq!(config.references.bibstyle, "default"); // Unchanged
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("refmark.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("refmark.toml");
        std::fs::write(
            &path,
            r#"
[docs]
source_dir = "content"

[converter]
program = "${REFMARK_TEST_CONVERTER:-pandoc}"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.docs_resolved.source_dir, tmp.path().join("content"));
        assert_eq!(config.converter.program, "pandoc");
        assert_eq!(config.config_path, Some(path));
    }
}
