//! Configuration validation utilities and rules

use crate::{error::Result, models::Config};

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        // Hard errors first
        config.validate()?;

        warnings.extend(Self::validate_workload(config));
        warnings.extend(Self::validate_matrix(config));
        warnings.extend(Self::validate_target(config));

        Ok(warnings)
    }

    fn validate_workload(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.requests == 0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Request count is 0, every run will report empty results".to_string(),
            ));
        } else if config.connections > config.requests {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} connections for {} requests leaves {} workers idle",
                    config.connections,
                    config.requests,
                    config.connections - config.requests
                ),
            ));
        }

        if config.max_concurrent != crate::defaults::DEFAULT_MAX_CONCURRENT {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Max concurrent is set to {} but is reserved and not enforced; concurrency equals the connection count",
                    config.max_concurrent
                ),
            ));
        }

        let max_rtt_ms = config.test_cases.iter().map(|c| c.delay_ms as u64 * 2).max().unwrap_or(0);
        if config.call_timeout_seconds * 1000 <= max_rtt_ms {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Call timeout of {}s is shorter than the largest round-trip delay under test",
                    config.call_timeout_seconds
                ),
            ));
        }

        warnings
    }

    fn validate_matrix(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.test_cases.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "No test cases configured, nothing will be measured".to_string(),
            ));
        }

        if config.controller_url.is_none() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "No controller URL configured: conditions are recorded but not applied to traffic".to_string(),
            ));
        }

        if config.stabilize_wait_secs == 0 && !config.readiness_probe {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "Stabilization wait is 0 without readiness probe, runs may start before conditions take effect"
                    .to_string(),
            ));
        }

        if config.readiness_probe && config.controller_url.is_none() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Readiness probe against the in-memory controller always confirms immediately".to_string(),
            ));
        }

        warnings
    }

    fn validate_target(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.http2_port == config.http3_port {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("HTTP/2 and HTTP/3 share port {}", config.http2_port),
            ));
        }

        if config.scheme == "http" && config.http2_prior_knowledge {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Cleartext target: HTTP/2 runs as h2c with prior knowledge".to_string(),
            ));
        }

        if config.scheme == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "HTTP/3 requires TLS, the HTTP/3 runs will fail against a cleartext target".to_string(),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> colored::Color {
        match self {
            Self::Info => colored::Color::Blue,
            Self::Warning => colored::Color::Yellow,
            Self::Error => colored::Color::Red,
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        if use_color {
            use colored::Colorize;
            format!("[{}] {}", self.level.as_str().color(self.level.color()).bold(), self.message)
        } else {
            format!("[{}] {}", self.level.as_str(), self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
