//! Error handling for the transport benchmark

pub mod classifier;

pub use classifier::{ErrorCategory, ErrorClassifier, RpcStatus};

use thiserror::Error;

/// Custom error types for the transport benchmark
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (URLs, JSON, test cases, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Establishing a worker connection failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single echo call failed
    #[error("Call error ({status}): {message}")]
    Call { status: RpcStatus, message: String },

    /// Transport-level timeout
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The network-condition controller rejected or failed to apply a condition
    #[error("Condition apply error: {0}")]
    ConditionApply(String),

    /// Any other controller failure (clear, status)
    #[error("Controller error: {0}")]
    Controller(String),

    /// Writing a report failed
    #[error("Report error: {0}")]
    Report(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    pub fn call<S: Into<String>>(status: RpcStatus, message: S) -> Self {
        Self::Call {
            status,
            message: message.into(),
        }
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn condition_apply<S: Into<String>>(message: S) -> Self {
        Self::ConditionApply(message.into())
    }

    pub fn controller<S: Into<String>>(message: S) -> Self {
        Self::Controller(message.into())
    }

    pub fn report<S: Into<String>>(message: S) -> Self {
        Self::Report(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Io(_) => "IO",
            Self::Connection(_) => "CONNECTION",
            Self::Call { .. } => "CALL",
            Self::Timeout(_) => "TIMEOUT",
            Self::ConditionApply(_) => "CONDITION",
            Self::Controller(_) => "CONTROLLER",
            Self::Report(_) => "REPORT",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Status this error maps to in the RPC taxonomy
    pub fn rpc_status(&self) -> RpcStatus {
        match self {
            Self::Call { status, .. } => *status,
            Self::Connection(_) => RpcStatus::Unavailable,
            Self::Timeout(_) => RpcStatus::DeadlineExceeded,
            _ => RpcStatus::Unknown,
        }
    }

    /// Check if error only affects a bounded part of a run
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Call { .. } | Self::Timeout(_) | Self::ConditionApply(_) => true,
            Self::Controller(_) | Self::Report(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Connection(_) | Self::Call { .. } | Self::Timeout(_) => 2,
            Self::ConditionApply(_) | Self::Controller(_) => 3,
            Self::Io(_) | Self::Report(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Connection(_) | Self::Call { .. } | Self::Timeout(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::ConditionApply(_) | Self::Controller(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) | Self::Report(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() {
            Self::connection(error.to_string())
        } else if let Some(status) = error.status() {
            Self::call(RpcStatus::from_http_status(status.as_u16()), error.to_string())
        } else if error.is_decode() {
            Self::call(RpcStatus::Internal, error.to_string())
        } else {
            Self::call(RpcStatus::Unknown, error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            let context = f();
            match original_error {
                AppError::Io(msg) => AppError::io(format!("{}: {}", context, msg)),
                AppError::Report(msg) => AppError::report(format!("{}: {}", context, msg)),
                AppError::Config(msg) => AppError::config(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_error = AppError::config("Invalid configuration");
        assert_eq!(config_error.category(), "CONFIG");
        assert!(!config_error.is_recoverable());
        assert_eq!(config_error.exit_code(), 1);

        let connection_error = AppError::connection("Connection refused");
        assert_eq!(connection_error.category(), "CONNECTION");
        assert!(connection_error.is_recoverable());
        assert_eq!(connection_error.exit_code(), 2);
    }

    #[test]
    fn test_call_error_display() {
        let error = AppError::call(RpcStatus::Unavailable, "upstream reset");
        let display = error.to_string();
        assert!(display.contains("UNAVAILABLE"));
        assert!(display.contains("upstream reset"));
        assert_eq!(error.rpc_status(), RpcStatus::Unavailable);
    }

    #[test]
    fn test_error_categories() {
        let errors = [
            AppError::config("config"),
            AppError::validation("validation"),
            AppError::parse("parse"),
            AppError::io("io"),
            AppError::connection("connection"),
            AppError::call(RpcStatus::Internal, "call"),
            AppError::timeout("timeout"),
            AppError::condition_apply("apply"),
            AppError::controller("controller"),
            AppError::report("report"),
            AppError::internal("internal"),
        ];

        let expected_categories = [
            "CONFIG", "VALIDATION", "PARSE", "IO", "CONNECTION", "CALL",
            "TIMEOUT", "CONDITION", "CONTROLLER", "REPORT", "INTERNAL",
        ];

        for (error, expected) in errors.iter().zip(expected_categories.iter()) {
            assert_eq!(error.category(), *expected);
        }
    }

    #[test]
    fn test_rpc_status_mapping() {
        assert_eq!(AppError::connection("x").rpc_status(), RpcStatus::Unavailable);
        assert_eq!(AppError::timeout("x").rpc_status(), RpcStatus::DeadlineExceeded);
        assert_eq!(AppError::io("x").rpc_status(), RpcStatus::Unknown);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("test").exit_code(), 1);
        assert_eq!(AppError::connection("test").exit_code(), 2);
        assert_eq!(AppError::condition_apply("test").exit_code(), 3);
        assert_eq!(AppError::io("test").exit_code(), 5);
        assert_eq!(AppError::internal("test").exit_code(), 99);
    }

    #[test]
    fn test_error_conversions() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let app_error: AppError = io_error.into();
        assert_eq!(app_error.category(), "IO");

        let parse_error = "not_a_number".parse::<i32>().unwrap_err();
        let app_error: AppError = parse_error.into();
        assert_eq!(app_error.category(), "PARSE");

        let url_error = url::Url::parse("not a url").unwrap_err();
        let app_error: AppError = url_error.into();
        assert!(app_error.to_string().contains("URL parse error"));
    }

    #[test]
    fn test_dotenv_error_conversion() {
        let dotenv_error = dotenv::Error::LineParse(".env".to_string(), 1);
        let app_error: AppError = dotenv_error.into();
        assert_eq!(app_error.category(), "CONFIG");
        assert!(app_error.to_string().contains("Environment file error"));
    }

    #[test]
    fn test_anyhow_integration() {
        let anyhow_error = anyhow::anyhow!("Test anyhow error");
        let app_error: AppError = anyhow_error.into();
        assert_eq!(app_error.category(), "INTERNAL");
    }

    #[test]
    fn test_error_context_keeps_io_category() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));

        let error = result.with_context(|| "While creating output directory".to_string()).unwrap_err();
        assert_eq!(error.category(), "IO");
        assert!(error.to_string().contains("While creating output directory"));
        assert!(error.to_string().contains("denied"));
    }

    #[test]
    fn test_error_context_wraps_others() {
        let result: Result<()> = Err(AppError::connection("refused"));
        let error = result.context("While probing").unwrap_err();
        assert_eq!(error.category(), "INTERNAL");
        assert!(error.to_string().contains("While probing"));
    }

    #[test]
    fn test_console_formatting() {
        let error = AppError::condition_apply("router returned 500");
        let plain = error.format_for_console(false);
        let colored = error.format_for_console(true);

        assert!(plain.starts_with("[CONDITION]"));
        assert!(colored.contains("CONDITION"));
        assert!(colored.contains("router returned 500"));
    }
}
