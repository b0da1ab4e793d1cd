//! Environment variable handling and .env file management

use crate::{
    error::{AppError, Result},
    logging::{LogFormat, LogLevel},
    types::TestCase,
};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                println!("Loaded configuration from .env file");
            }
        } else if debug {
            println!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# RPC Transport Bench Configuration
#
# Values here are used as defaults and can be overridden by command-line
# arguments.

# Total requests per benchmark run, split across connections
# BENCH_REQUESTS=50000

# Persistent connections per run (one worker each)
# BENCH_CONNECTIONS=100

# Concurrency cap (reserved, not enforced)
# BENCH_MAX_CONCURRENT=100

# Runtime worker threads (defaults to CPU count)
# BENCH_THREADS=8

# Echo server
# TARGET_HOST=172.30.0.2
# TARGET_SCHEME=https
# HTTP2_PORT=443
# HTTP3_PORT=4433

# Network conditions as delay:loss pairs (milliseconds : percent)
# TEST_CASES=0:3,75:3,150:3,225:3

# Bandwidth cap in Mbit/s, 0 for unlimited
# NETWORK_BANDWIDTH=0

# Network emulation router; leave empty to record conditions only
# CONTROLLER_URL=http://172.30.0.254:8080

# Phase waits in seconds
# STABILIZE_WAIT_SECS=30
# INTER_TRANSPORT_WAIT_SECS=30
# INTER_CASE_WAIT_SECS=15

# Timeout of a single call in seconds
# CALL_TIMEOUT_SECS=30

# Parent directory of the timestamped report directories
# OUTPUT_DIR=logs

# Log level (trace, debug, info, warn, error)
# LOG_LEVEL=info

# Log format (console, json, compact)
# LOG_FORMAT=console

# Enable colored output (true/false)
# ENABLE_COLOR=true

# Quick smoke run against a local echo server over cleartext:
# TARGET_HOST=127.0.0.1
# TARGET_SCHEME=http
# BENCH_REQUESTS=1000
# BENCH_CONNECTIONS=10
# TEST_CASES=0:0
# STABILIZE_WAIT_SECS=0
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        fn positive(key: &str, value: &str) -> Result<()> {
            let n: u64 = value
                .parse()
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            if n == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", key)));
            }
            Ok(())
        }

        fn unsigned(key: &str, value: &str) -> Result<()> {
            value
                .parse::<u64>()
                .map(|_| ())
                .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))
        }

        match key {
            "BENCH_CONNECTIONS" | "BENCH_THREADS" | "CALL_TIMEOUT_SECS" => positive(key, value)?,
            "BENCH_REQUESTS"
            | "BENCH_MAX_CONCURRENT"
            | "NETWORK_BANDWIDTH"
            | "STABILIZE_WAIT_SECS"
            | "INTER_TRANSPORT_WAIT_SECS"
            | "INTER_CASE_WAIT_SECS" => unsigned(key, value)?,
            "HTTP2_PORT" | "HTTP3_PORT" => {
                let port: u16 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if port == 0 {
                    return Err(AppError::config(format!("{} must be between 1 and 65535", key)));
                }
            }
            "TARGET_HOST" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("TARGET_HOST cannot be empty"));
                }
            }
            "TARGET_SCHEME" => {
                if value != "http" && value != "https" {
                    return Err(AppError::config(format!("TARGET_SCHEME must be http or https, got: {}", value)));
                }
            }
            "TEST_CASES" => {
                for case in TestCase::parse_list(value)
                    .map_err(|e| AppError::config(format!("Invalid TEST_CASES value '{}': {}", value, e)))?
                {
                    if case.loss_pct > 100 {
                        return Err(AppError::config(format!("Packet loss must be between 0 and 100 in '{}'", case)));
                    }
                }
            }
            "CONTROLLER_URL" => {
                if !value.trim().is_empty() {
                    url::Url::parse(value)
                        .map_err(|e| AppError::config(format!("Invalid CONTROLLER_URL '{}': {}", value, e)))?;
                }
            }
            "LOG_LEVEL" => {
                value
                    .parse::<LogLevel>()
                    .map_err(|e| AppError::config(format!("Invalid LOG_LEVEL value '{}': {}", value, e)))?;
            }
            "LOG_FORMAT" => {
                value
                    .parse::<LogFormat>()
                    .map_err(|e| AppError::config(format!("Invalid LOG_FORMAT value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("BENCH_REQUESTS", "Total requests per benchmark run", "50000"),
            ("BENCH_CONNECTIONS", "Persistent connections per run", "100"),
            ("BENCH_MAX_CONCURRENT", "Concurrency cap (reserved)", "100"),
            ("BENCH_THREADS", "Runtime worker threads", "8"),
            ("TARGET_HOST", "Host serving the echo endpoint", "172.30.0.2"),
            ("TARGET_SCHEME", "URL scheme for both transports", "https"),
            ("HTTP2_PORT", "HTTP/2 port", "443"),
            ("HTTP3_PORT", "HTTP/3 port", "4433"),
            ("TEST_CASES", "Comma-separated delay:loss pairs", "0:3,75:3,150:3,225:3"),
            ("NETWORK_BANDWIDTH", "Bandwidth cap in Mbit/s (0 = unlimited)", "100"),
            ("CONTROLLER_URL", "Network emulation router base URL", "http://172.30.0.254:8080"),
            ("STABILIZE_WAIT_SECS", "Wait after applying a condition", "30"),
            ("INTER_TRANSPORT_WAIT_SECS", "Wait between transports", "30"),
            ("INTER_CASE_WAIT_SECS", "Wait between test cases", "15"),
            ("CALL_TIMEOUT_SECS", "Timeout of a single call", "30"),
            ("OUTPUT_DIR", "Parent directory for reports", "logs"),
            ("LOG_LEVEL", "Log level", "info"),
            ("LOG_FORMAT", "Log format (console, json, compact)", "compact"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        Ok(warnings)
    }

    /// Check if .env file exists and validate its contents
    pub fn check_env_file() -> Result<Option<Vec<String>>> {
        Self::check_env_file_at(Path::new(".env"))
    }

    pub fn check_env_file_at(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();

        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", var)), "missing {}", var);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("RPC Transport Bench Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("BENCH_REQUESTS", "0").is_ok());
        assert!(EnvManager::validate_env_var("BENCH_CONNECTIONS", "100").is_ok());
        assert!(EnvManager::validate_env_var("HTTP3_PORT", "4433").is_ok());
        assert!(EnvManager::validate_env_var("TEST_CASES", "0:3,75:3").is_ok());
        assert!(EnvManager::validate_env_var("CONTROLLER_URL", "http://router:8080").is_ok());
        assert!(EnvManager::validate_env_var("CONTROLLER_URL", "").is_ok());
        assert!(EnvManager::validate_env_var("LOG_LEVEL", "warning").is_ok());
        assert!(EnvManager::validate_env_var("LOG_FORMAT", "compact").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "anything").is_ok());

        assert!(EnvManager::validate_env_var("BENCH_CONNECTIONS", "0").is_err());
        assert!(EnvManager::validate_env_var("BENCH_REQUESTS", "-5").is_err());
        assert!(EnvManager::validate_env_var("HTTP2_PORT", "0").is_err());
        assert!(EnvManager::validate_env_var("HTTP2_PORT", "70000").is_err());
        assert!(EnvManager::validate_env_var("TARGET_SCHEME", "ftp").is_err());
        assert!(EnvManager::validate_env_var("TEST_CASES", "75").is_err());
        assert!(EnvManager::validate_env_var("TEST_CASES", "0:101").is_err());
        assert!(EnvManager::validate_env_var("CONTROLLER_URL", "not a url").is_err());
        assert!(EnvManager::validate_env_var("LOG_LEVEL", "loud").is_err());
        assert!(EnvManager::validate_env_var("LOG_FORMAT", "xml").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("CONTROLLER_URL"));
        assert!(help.contains("TEST_CASES"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_check_env_file_reports_bad_lines() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(
            temp_file.path(),
            "# comment\nBENCH_REQUESTS=1000\nBENCH_CONNECTIONS=0\nTARGET_SCHEME=gopher\n",
        )
        .unwrap();

        let warnings = EnvManager::check_env_file_at(temp_file.path()).unwrap().unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("BENCH_CONNECTIONS"));
    }

    #[test]
    fn test_check_missing_env_file() {
        let result = EnvManager::check_env_file_at(Path::new("/nonexistent/rtb/.env")).unwrap();
        assert!(result.is_none());
    }
}
