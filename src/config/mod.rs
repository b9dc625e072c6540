//! Policy configuration for the content security pipeline.
//!
//! - [`ScanPolicy`] – threshold, fail mode, and rule-table adjustments
//! - [`PolicyBuilder`] – builder resolving defaults, files, and env vars
//! - [`FailMode`] – serving behavior for unsafe verdicts
//!
//! ## Resolution order
//!
//! Policies are resolved in the following order (later wins):
//!
//! 1. Compiled defaults (quarantine at score 3, fail closed)
//! 2. Policy file (TOML, YAML, or JSON)
//! 3. Environment variables (`GATEHOUSE_*`)
//!
//! The built policy is a plain value handed to
//! [`ContentPipeline`](crate::pipeline::ContentPipeline); nothing is
//! global and nothing is initialized lazily, so two pipelines with
//! different policies coexist in one process.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gatehouse::config::PolicyBuilder;
//!
//! let policy = PolicyBuilder::new()
//!     .with_file("gatehouse.toml")?
//!     .with_env()
//!     .build()?;
//!
//! assert_eq!(policy.threshold, 3);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use validator::Validate;

use crate::scan::rules::RuleSetConfig;

/// Default score threshold. Findings totalling this weight quarantine a
/// document; one high-severity finding is enough.
pub const DEFAULT_THRESHOLD: u32 = 3;

/// Environment variable overriding [`ScanPolicy::threshold`].
pub const ENV_THRESHOLD: &str = "GATEHOUSE_SCORE_THRESHOLD";

/// Environment variable overriding [`ScanPolicy::fail_mode`].
pub const ENV_FAIL_MODE: &str = "GATEHOUSE_FAIL_MODE";

/// Errors that can occur during policy configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Failed to parse configuration
    #[error("Failed to parse {format} config: {source}")]
    ParseError {
        /// Format that failed to parse (YAML, TOML, JSON)
        format: String,
        /// Underlying parse error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Unsupported or unrecognised configuration file extension
    #[error("Unsupported config file format: {message}")]
    UnsupportedFormat {
        /// Description of the problem
        message: String,
    },

    /// Configuration validation failed
    #[error("Policy validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Environment variable parsing error. Raised at build time; a policy
    /// never falls back silently on a malformed override.
    #[error("Failed to parse environment variable {key}: {message}")]
    EnvParse {
        /// Environment variable key
        key: String,
        /// Error message
        message: String,
    },
}

/// Serving behavior when a scan verdict is unsafe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    /// Quarantine the content; never wrap it for serving
    Closed,
    /// Wrap the content anyway and log a warning. This is the explicit
    /// override path for audit tooling; the score and flags still report
    /// the unsafe verdict
    AuditOnly,
}

impl Default for FailMode {
    fn default() -> Self {
        Self::Closed
    }
}

/// Scan policy: everything the pipeline needs to turn flags into a verdict
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScanPolicy {
    /// Policy version for compatibility tracking
    #[validate(length(min = 1))]
    pub version: String,

    /// Score at or above which content is quarantined. Zero is legal and
    /// quarantines everything, including clean documents
    pub threshold: u32,

    /// Serving behavior for unsafe verdicts
    pub fail_mode: FailMode,

    /// Adjustments to the built-in rule table
    pub rules: RuleSetConfig,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            threshold: DEFAULT_THRESHOLD,
            fail_mode: FailMode::Closed,
            rules: RuleSetConfig::default(),
        }
    }
}

/// Builder for constructing scan policies from multiple sources
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    base: ScanPolicy,
    file_path: Option<PathBuf>,
    use_env: bool,
}

impl PolicyBuilder {
    /// Create a new policy builder with the compiled defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: ScanPolicy::default(),
            file_path: None,
            use_env: false,
        }
    }

    /// Load policy from a configuration file (YAML, TOML, or JSON)
    ///
    /// Missing fields keep their defaults, so a file may override just the
    /// threshold or just the rule adjustments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        self.file_path = Some(path.to_path_buf());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let policy: ScanPolicy = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                })?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                format: "TOML".to_string(),
                source: Box::new(e),
            })?,
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                })?
            }
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    message: "file extension must be .yaml, .yml, .toml, or .json".to_string(),
                });
            }
        };

        self.base = policy;
        Ok(self)
    }

    /// Enable loading overrides from environment variables
    ///
    /// Looks for:
    /// - `GATEHOUSE_SCORE_THRESHOLD=5`
    /// - `GATEHOUSE_FAIL_MODE=audit_only`
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.use_env = true;
        self
    }

    /// Build the final scan policy
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation fails or environment variables
    /// are invalid. A malformed override is rejected here, at startup, not
    /// discovered per scan
    pub fn build(mut self) -> Result<ScanPolicy, ConfigError> {
        if self.use_env {
            dotenvy::dotenv().ok(); // Load .env file if present

            if let Ok(threshold) = std::env::var(ENV_THRESHOLD) {
                self.base.threshold =
                    threshold
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::EnvParse {
                            key: ENV_THRESHOLD.to_string(),
                            message: format!("Must be a non-negative integer, got '{threshold}'"),
                        })?;
            }

            if let Ok(fail_mode) = std::env::var(ENV_FAIL_MODE) {
                self.base.fail_mode = match fail_mode.to_lowercase().as_str() {
                    "closed" => FailMode::Closed,
                    "audit_only" | "auditonly" => FailMode::AuditOnly,
                    _ => {
                        return Err(ConfigError::EnvParse {
                            key: ENV_FAIL_MODE.to_string(),
                            message: "Must be 'closed' or 'audit_only'".to_string(),
                        });
                    }
                };
            }
        }

        self.base.validate()?;

        Ok(self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_policy() {
        let policy = ScanPolicy::default();
        assert_eq!(policy.threshold, DEFAULT_THRESHOLD);
        assert_eq!(policy.fail_mode, FailMode::Closed);
        assert_eq!(policy.version, "1.0");
        assert!(policy.rules.extra_rules.is_empty());
    }

    #[test]
    fn test_policy_builder() {
        let policy = PolicyBuilder::new().build().unwrap();
        assert_eq!(policy.threshold, DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_fail_mode_serialization() {
        let json = serde_json::to_string(&FailMode::AuditOnly).unwrap();
        assert_eq!(json, r#""audit_only""#);

        let parsed: FailMode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, FailMode::AuditOnly);
    }

    #[test]
    fn test_partial_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "threshold = 6").unwrap();

        let policy = PolicyBuilder::new()
            .with_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(policy.threshold, 6);
        // Untouched fields keep their defaults.
        assert_eq!(policy.fail_mode, FailMode::Closed);
        assert_eq!(policy.version, "1.0");
    }

    #[test]
    fn test_file_with_rule_adjustments() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
threshold = 4
fail_mode = "audit_only"

[rules]
disabled_rules = ["hidden-content"]

[[rules.extra_rules]]
id = "ssn"
severity = "high"
pattern = '\d{{3}}-\d{{2}}-\d{{4}}'
detail = "US social security number"
"#
        )
        .unwrap();

        let policy = PolicyBuilder::new()
            .with_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(policy.threshold, 4);
        assert_eq!(policy.fail_mode, FailMode::AuditOnly);
        assert_eq!(policy.rules.disabled_rules, vec!["hidden-content"]);
        assert_eq!(policy.rules.extra_rules[0].id, "ssn");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = PolicyBuilder::new().with_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_empty_version_fails_validation() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap();
        write!(file, r#"{{"version": ""}}"#).unwrap();

        let err = PolicyBuilder::new()
            .with_file(file.path())
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    // Env mutation is process-global; every ENV_THRESHOLD case lives in
    // this one test so parallel test threads never race on the variable.
    #[test]
    fn test_env_threshold_override_and_fail_fast() {
        unsafe { std::env::set_var(ENV_THRESHOLD, "7") };
        let policy = PolicyBuilder::new().with_env().build().unwrap();
        assert_eq!(policy.threshold, 7);

        unsafe { std::env::set_var(ENV_THRESHOLD, "not-a-number") };
        let err = PolicyBuilder::new().with_env().build().unwrap_err();
        assert!(matches!(err, ConfigError::EnvParse { .. }));

        unsafe { std::env::remove_var(ENV_THRESHOLD) };
        let policy = PolicyBuilder::new().with_env().build().unwrap();
        assert_eq!(policy.threshold, DEFAULT_THRESHOLD);
    }
}
