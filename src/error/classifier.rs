//! Retry-relevance classification of failed calls
//!
//! The classification is advisory: nothing in the engine retries on it. It is
//! recorded on every failed outcome so reports and future retry policies can
//! tell transient failures from permanent ones.

use super::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Status taxonomy of the echo RPC (the gRPC status codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcStatus {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcStatus {
    /// Map a numeric status code (as carried in a `grpc-status` header)
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Map an HTTP status without a `grpc-status` header, following the
    /// HTTP-to-gRPC table used by gRPC clients
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200..=299 => Self::Ok,
            400 => Self::Internal,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::Unimplemented,
            429 | 502 | 503 | 504 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retry-relevant category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Worth retrying: the service or network may recover
    TransientRetryable,
    /// Retrying the same call will fail the same way
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::TransientRetryable => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

/// Maps call failures onto `ErrorCategory` using a configurable set of
/// transient statuses
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    transient: HashSet<RpcStatus>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::with_transient([
            RpcStatus::Unavailable,
            RpcStatus::DeadlineExceeded,
            RpcStatus::ResourceExhausted,
        ])
    }
}

impl ErrorClassifier {
    /// Build a classifier treating exactly `statuses` as transient
    pub fn with_transient<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = RpcStatus>,
    {
        Self {
            transient: statuses.into_iter().collect(),
        }
    }

    pub fn classify_status(&self, status: RpcStatus) -> ErrorCategory {
        if self.transient.contains(&status) {
            ErrorCategory::TransientRetryable
        } else {
            ErrorCategory::Permanent
        }
    }

    /// Classify an error raised while dialing or calling
    pub fn classify(&self, error: &AppError) -> ErrorCategory {
        self.classify_status(error.rpc_status())
    }

    pub fn is_retryable(&self, error: &AppError) -> bool {
        self.classify(error) == ErrorCategory::TransientRetryable
    }
}
