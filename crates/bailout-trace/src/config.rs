//! Trace reduction configuration: which frames are internal, where user code
//! is entered, and how many reduction passes to run.

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`TraceConfig::max_passes`].
pub const MAX_PASSES_ENV: &str = "BAILOUT_TRACE_MAX_PASSES";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("max_passes must be at least 1")]
    NoPasses,

    #[error("Invalid {name} value '{value}': expected a positive integer")]
    InvalidEnv { name: &'static str, value: String },
}

/// Controls how a captured stack is cut down to user code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Module path prefixes of the utility's own frames and the capture
    /// primitive beneath them.
    pub internal_modules: Vec<String>,
    /// Call and unwind glue that is never shown but does not delimit the
    /// user-code segment either.
    pub hidden_modules: Vec<String>,
    /// Module path prefixes marking where control entered user code:
    /// the recovery guard and the test runner.
    pub boundary_modules: Vec<String>,
    /// Upper bound on reduction passes (default: 4).
    pub max_passes: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            internal_modules: [
                "bailout_core::raise",
                "bailout_core::signal",
                "bailout_core::state",
                "bailout_trace",
                "backtrace",
                "std::backtrace",
                "std::backtrace_rs",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            hidden_modules: [
                "std::panicking",
                "std::panic",
                "core::panicking",
                "core::panic::unwind_safe",
                "core::ops::function",
                "core::ptr::drop_in_place",
                "alloc::boxed",
                "_Unwind_Backtrace",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            boundary_modules: [
                "bailout_core::recover",
                "test::run_test",
                "test::run_test_in_process",
                "test::__rust_begin_short_backtrace",
                "std::rt::lang_start",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_passes: 4,
        }
    }
}

impl TraceConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::NoPasses);
        }
        Ok(())
    }

    /// Apply `BAILOUT_TRACE_MAX_PASSES` if it is set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        match std::env::var(MAX_PASSES_ENV) {
            Ok(value) => self.with_max_passes_str(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_max_passes_str(mut self, value: &str) -> Result<Self, ConfigError> {
        self.max_passes = value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|passes| *passes > 0)
            .ok_or_else(|| ConfigError::InvalidEnv {
                name: MAX_PASSES_ENV,
                value: value.to_string(),
            })?;
        Ok(self)
    }

    /// Add an internal module prefix (e.g. a project's own assertion helpers).
    pub fn with_internal(mut self, prefix: impl Into<String>) -> Self {
        self.internal_modules.push(prefix.into());
        self
    }

    /// Add a hidden module prefix.
    pub fn with_hidden(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_modules.push(prefix.into());
        self
    }

    /// Add a boundary module prefix (e.g. a custom test runner).
    pub fn with_boundary(mut self, prefix: impl Into<String>) -> Self {
        self.boundary_modules.push(prefix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runs_four_passes() {
        let config = TraceConfig::default();
        assert_eq!(config.max_passes, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = TraceConfig::from_json(r#"{ "max_passes": 2 }"#).unwrap();
        assert_eq!(config.max_passes, 2);
        assert_eq!(
            config.internal_modules,
            TraceConfig::default().internal_modules
        );
    }

    #[test]
    fn test_from_json_rejects_zero_passes() {
        let result = TraceConfig::from_json(r#"{ "max_passes": 0 }"#);
        assert!(matches!(result, Err(ConfigError::NoPasses)));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            TraceConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_max_passes_override() {
        let config = TraceConfig::default().with_max_passes_str("7").unwrap();
        assert_eq!(config.max_passes, 7);

        let err = TraceConfig::default().with_max_passes_str("0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
        assert!(TraceConfig::default().with_max_passes_str("many").is_err());
    }

    #[test]
    fn test_builders_extend_defaults() {
        let config = TraceConfig::default()
            .with_hidden("my_runtime::glue")
            .with_boundary("my_runner::execute");
        assert_eq!(config.hidden_modules.last().map(String::as_str), Some("my_runtime::glue"));
        assert_eq!(
            config.boundary_modules.last().map(String::as_str),
            Some("my_runner::execute")
        );
        assert!(config.hidden_modules.len() > 1);
    }
}
