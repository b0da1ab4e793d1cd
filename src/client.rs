//! Transport capability interface and the echo RPC payloads
//!
//! A benchmark worker only needs two things from a wire protocol: open one
//! connection to an address, and issue echo calls over it. Both transport
//! variants implement [`Transport`], so the worker and runner are written once.

pub mod http;


use crate::{
    error::Result,
    models::Config,
    types::TransportKind,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use http::{Http2Transport, Http3Transport, HttpConnection};

/// Dials connections for one transport variant
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;

    /// Transport tag used in echo messages and results
    fn kind(&self) -> TransportKind;

    /// Establish one connection; returns once it is usable
    async fn dial(&self, address: &str) -> Result<Self::Connection>;
}

/// One established connection, used by exactly one worker
#[async_trait]
pub trait Connection: Send + 'static {
    /// Issue one unary echo call
    async fn call(&mut self, request: EchoRequest) -> Result<EchoResponse>;
}

/// Echo request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub message: String,
    /// Send time in nanoseconds since the Unix epoch
    pub timestamp: i64,
}

impl EchoRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    /// Request number `sequence` of worker `connection_id`
    pub fn for_call(kind: TransportKind, connection_id: usize, sequence: usize) -> Self {
        Self::new(format!("{} request {}-{}", kind, connection_id, sequence))
    }
}

/// Echo response payload; all fields optional on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: i64,
    /// Transport the server saw the call on
    #[serde(default)]
    pub transport: String,
}

/// Client settings shared by both HTTP transports
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// Transport-level bound on a single call
    pub call_timeout: Duration,
    pub connect_timeout: Duration,
    pub accept_invalid_certs: bool,
    pub http2_prior_knowledge: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl TransportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            call_timeout: config.call_timeout(),
            connect_timeout: config.connect_timeout(),
            accept_invalid_certs: config.accept_invalid_certs,
            http2_prior_knowledge: config.http2_prior_knowledge,
        }
    }
}
