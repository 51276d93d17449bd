//! Pipeline configuration.
//!
//! Defaults come from environment variables so a deployment needs no config
//! file; a TOML file can override any field for local runs and tests.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration for the grading pipeline and its grader panel.
#[derive(Debug, Clone)]
pub struct GradingConfig {
    /// Base URL of the grader API (up to and excluding `/models/...`).
    pub endpoint_url: String,
    /// API key sent with each grader call.
    pub api_key: String,
    /// Model name used for every panel slot.
    pub model_name: String,
    /// Number of independent graders per question. The consensus algorithm
    /// is defined for 3.
    pub fan_out: usize,
    /// Per-grader call deadline; an overdue call is recorded as failed.
    pub grader_timeout_secs: u64,
    /// Whether grader feedback should end with an improvement-tips section.
    pub include_tips: bool,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            endpoint_url: std::env::var("GRADER_API_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into()),
            api_key: std::env::var("GRADER_API_KEY").unwrap_or_default(),
            model_name: std::env::var("GRADER_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".into()),
            fan_out: 3,
            grader_timeout_secs: 120,
            include_tips: false,
        }
    }
}

/// On-disk layout of a config file; every field optional.
#[derive(Debug, Deserialize)]
struct GradingConfigFile {
    endpoint_url: Option<String>,
    api_key: Option<String>,
    model_name: Option<String>,
    fan_out: Option<usize>,
    grader_timeout_secs: Option<u64>,
    include_tips: Option<bool>,
}

impl GradingConfig {
    /// Load from a TOML file, falling back to env/defaults per field.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let file: GradingConfigFile = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        let defaults = Self::default();
        Ok(Self {
            endpoint_url: file.endpoint_url.unwrap_or(defaults.endpoint_url),
            api_key: file.api_key.unwrap_or(defaults.api_key),
            model_name: file.model_name.unwrap_or(defaults.model_name),
            fan_out: file.fan_out.unwrap_or(defaults.fan_out),
            grader_timeout_secs: file
                .grader_timeout_secs
                .unwrap_or(defaults.grader_timeout_secs),
            include_tips: file.include_tips.unwrap_or(defaults.include_tips),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_fan_out_is_three() {
        let config = GradingConfig::default();
        assert_eq!(config.fan_out, 3);
        assert_eq!(config.grader_timeout_secs, 120);
    }

    #[test]
    fn test_toml_overrides_and_fallbacks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model_name = \"gemini-2.5-pro\"\ngrader_timeout_secs = 45\ninclude_tips = true"
        )
        .unwrap();

        let config = GradingConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.model_name, "gemini-2.5-pro");
        assert_eq!(config.grader_timeout_secs, 45);
        assert!(config.include_tips);
        // Unspecified fields keep their defaults.
        assert_eq!(config.fan_out, 3);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = GradingConfig::from_toml_file("/nonexistent/grading.toml").unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
