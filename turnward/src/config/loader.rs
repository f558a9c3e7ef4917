//! Configuration loader
//!
//! Pipeline from a YAML file to a frozen [`BattleConfig`]:
//! 1. Size check
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing into the typed schema
//! 4. Validation
//! 5. Freeze with `Arc`

use std::path::Path;
use std::sync::Arc;

use turnward_core::ConfigError;
use turnward_core::config::{BattleConfig, Validator};
use turnward_core::error::ValidationIssue;

/// Default upper bound on a configuration file.
pub const DEFAULT_MAX_CONFIG_SIZE: usize = 1024 * 1024;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("TURNWARD_MAX_CONFIG_SIZE", DEFAULT_MAX_CONFIG_SIZE),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<BattleConfig>,

    /// Warnings from substitution and validation.
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal finding while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Field path or file the warning refers to.
    pub location: Option<String>,
}

impl From<ValidationIssue> for LoadWarning {
    fn from(issue: ValidationIssue) -> Self {
        Self {
            message: issue.message,
            location: Some(issue.path),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Loads, validates and freezes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, an
    /// environment reference is unresolvable, YAML parsing fails, or
    /// validation reports errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_owned(),
                value: format!("{size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        self.load_str(&raw, path)
    }

    /// Loads a configuration from text; `origin` names it in errors.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut warnings = Vec::new();

        let expanded = expand_env(raw, origin, &mut warnings)?;

        let config: BattleConfig = if expanded.trim().is_empty() {
            BattleConfig::default()
        } else {
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(LoadWarning::from));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expands `${VAR}`, `${VAR:-default}`, `${VAR:?message}` and `$$`.
///
/// An unset `${VAR}` without a default expands to the empty string and
/// records a warning.
fn expand_env(
    raw: &str,
    origin: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(body) = tail.strip_prefix('{') {
            let Some(close) = body.find('}') else {
                return Err(ConfigError::ParseError {
                    path: origin.to_path_buf(),
                    line: Some(raw[..raw.len() - rest.len() + pos].matches('\n').count() + 1),
                    message: "unclosed environment variable reference".to_owned(),
                });
            };
            out.push_str(&resolve_reference(&body[..close], origin, warnings)?);
            rest = &body[close + 1..];
        } else {
            out.push('$');
            rest = tail;
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn resolve_reference(
    spec: &str,
    origin: &Path,
    warnings: &mut Vec<LoadWarning>,
) -> Result<String, ConfigError> {
    let (name, fallback) = match spec.split_once(":-") {
        Some((name, default)) => (name, Fallback::Default(default)),
        None => match spec.split_once(":?") {
            Some((name, message)) => (name, Fallback::Required(message)),
            None => (spec, Fallback::Empty),
        },
    };

    if let Ok(value) = std::env::var(name) {
        return Ok(value);
    }
    match fallback {
        Fallback::Default(default) => Ok(default.to_owned()),
        Fallback::Required(message) => Err(ConfigError::EnvVarNotSet {
            var: name.to_owned(),
            location: if message.is_empty() {
                origin.display().to_string()
            } else {
                message.to_owned()
            },
        }),
        Fallback::Empty => {
            warnings.push(LoadWarning {
                message: format!("environment variable '{name}' is not set, using empty string"),
                location: Some(origin.display().to_string()),
            });
            Ok(String::new())
        }
    }
}

enum Fallback<'a> {
    Default(&'a str),
    Required(&'a str),
    Empty,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
