//! HTTP/2 and HTTP/3 transports over reqwest
//!
//! Each dial builds a dedicated client that keeps at most one idle
//! connection, so a worker's calls share one persistent connection the way
//! a dedicated RPC channel would.

use super::{Connection, EchoRequest, EchoResponse, Transport, TransportSettings};
use crate::{
    error::{AppError, Result, RpcStatus},
    types::TransportKind,
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url, Version};

const HEALTH_PATH: &str = "health";
const ECHO_PATH: &str = "echo";
const GRPC_STATUS_HEADER: &str = "grpc-status";
const GRPC_MESSAGE_HEADER: &str = "grpc-message";

/// Echo over HTTP/2
#[derive(Debug, Clone, Default)]
pub struct Http2Transport {
    settings: TransportSettings,
}

impl Http2Transport {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Transport for Http2Transport {
    type Connection = HttpConnection;

    fn kind(&self) -> TransportKind {
        TransportKind::Http2
    }

    async fn dial(&self, address: &str) -> Result<HttpConnection> {
        let mut builder = base_builder(&self.settings);
        if self.settings.http2_prior_knowledge {
            builder = builder.http2_prior_knowledge();
        }

        let client = builder
            .build()
            .map_err(|e| AppError::connection(format!("Failed to create HTTP/2 client: {}", e)))?;

        HttpConnection::establish(client, address, TransportKind::Http2, None).await
    }
}

/// Echo over HTTP/3 (QUIC); needs the `http3` cargo feature
#[derive(Debug, Clone, Default)]
pub struct Http3Transport {
    settings: TransportSettings,
}

impl Http3Transport {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    /// Whether this build can actually speak HTTP/3
    pub fn is_supported() -> bool {
        cfg!(feature = "http3")
    }
}

#[async_trait]
impl Transport for Http3Transport {
    type Connection = HttpConnection;

    fn kind(&self) -> TransportKind {
        TransportKind::Http3
    }

    #[cfg(feature = "http3")]
    async fn dial(&self, address: &str) -> Result<HttpConnection> {
        let client = base_builder(&self.settings)
            .http3_prior_knowledge()
            .build()
            .map_err(|e| AppError::connection(format!("Failed to create HTTP/3 client: {}", e)))?;

        HttpConnection::establish(client, address, TransportKind::Http3, Some(Version::HTTP_3)).await
    }

    #[cfg(not(feature = "http3"))]
    async fn dial(&self, address: &str) -> Result<HttpConnection> {
        Err(AppError::connection(format!(
            "Cannot dial {}: HTTP/3 support is not compiled in (build with --features http3)",
            address
        )))
    }
}

fn base_builder(settings: &TransportSettings) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(settings.call_timeout)
        .connect_timeout(settings.connect_timeout)
        .pool_max_idle_per_host(1)
        .danger_accept_invalid_certs(settings.accept_invalid_certs)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
}

/// A dialed HTTP connection bound to one echo endpoint
#[derive(Debug)]
pub struct HttpConnection {
    client: Client,
    echo_url: Url,
    version: Option<Version>,
}

impl HttpConnection {
    /// Blocking dial: the connection only counts as established once the
    /// health endpoint answers
    async fn establish(client: Client, address: &str, kind: TransportKind, version: Option<Version>) -> Result<Self> {
        let base = parse_base(address)?;
        let health_url = base.join(HEALTH_PATH)?;
        let echo_url = base.join(ECHO_PATH)?;

        let mut request = client.get(health_url);
        if let Some(version) = version {
            request = request.version(version);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::connection(format!("Failed to dial {} over {}: {}", address, kind, e)))?;

        if !response.status().is_success() {
            return Err(AppError::connection(format!(
                "Health check of {} over {} returned {}",
                address,
                kind,
                response.status()
            )));
        }

        Ok(Self {
            client,
            echo_url,
            version,
        })
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn call(&mut self, request: EchoRequest) -> Result<EchoResponse> {
        let mut builder = self.client.post(self.echo_url.clone()).json(&request);
        if let Some(version) = self.version {
            builder = builder.version(version);
        }

        let response = check_status(builder.send().await?).await?;
        Ok(response.json::<EchoResponse>().await?)
    }
}

/// Turn a non-OK response into a call error; a `grpc-status` header takes
/// precedence over the HTTP status
async fn check_status(response: Response) -> Result<Response> {
    let grpc_status = response
        .headers()
        .get(GRPC_STATUS_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(RpcStatus::from_code);

    if let Some(status) = grpc_status {
        if status != RpcStatus::Ok {
            let message = response
                .headers()
                .get(GRPC_MESSAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("call failed")
                .to_string();
            return Err(AppError::call(status, message));
        }
    }

    let http_status = response.status();
    if !http_status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            format!("HTTP {}", http_status)
        } else {
            format!("HTTP {}: {}", http_status, body.trim())
        };
        return Err(AppError::call(RpcStatus::from_http_status(http_status.as_u16()), message));
    }

    Ok(response)
}

/// Parse a base address so that relative joins land under it
fn parse_base(address: &str) -> Result<Url> {
    let mut base = Url::parse(address).map_err(|e| AppError::connection(format!("Invalid address '{}': {}", address, e)))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_appends_slash() {
        let base = parse_base("https://10.0.0.2:4433").unwrap();
        assert_eq!(base.join(ECHO_PATH).unwrap().as_str(), "https://10.0.0.2:4433/echo");

        let base = parse_base("http://localhost:8080/api").unwrap();
        assert_eq!(base.join(HEALTH_PATH).unwrap().as_str(), "http://localhost:8080/api/health");
    }

    #[test]
    fn test_parse_base_rejects_garbage() {
        let err = parse_base("not an address").unwrap_err();
        assert_eq!(err.category(), "CONNECTION");
    }

    #[test]
    fn test_transport_kinds() {
        assert_eq!(Http2Transport::default().kind(), TransportKind::Http2);
        assert_eq!(Http3Transport::default().kind(), TransportKind::Http3);
    }
}
