//! Network condition control
//!
//! The benchmark never shapes traffic itself. It asks a controller to install
//! a delay/loss condition, to clear it, or to report what is active.

use crate::{
    error::{AppError, Result},
    logging::Logger,
    types::NetworkCondition,
};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

/// Installs and removes emulated network conditions
#[async_trait]
pub trait NetworkConditionController: Send + Sync {
    fn name(&self) -> &str;

    /// Replace whatever condition is active with `condition`, as one step
    async fn apply(&self, condition: &NetworkCondition) -> Result<()>;

    /// Remove any active condition; succeeds when nothing is active
    async fn clear(&self) -> Result<()>;

    /// Currently active delay and loss; zeros when nothing is active
    async fn status(&self) -> Result<NetworkCondition>;
}

#[derive(Debug, Serialize)]
struct ConfigRequest {
    delay: u32,
    loss: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    bandwidth: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    delay: u32,
    #[serde(default)]
    loss: u32,
}

/// Controller speaking the emulation router's HTTP API
pub struct RouterController {
    client: Client,
    base: Url,
    logger: Logger,
}

impl RouterController {
    pub fn new(base_url: &str, timeout: Duration, logger: Logger) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::config(format!("Invalid controller URL '{}': {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::controller(format!("Failed to create controller client: {}", e)))?;

        Ok(Self { client, base, logger })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn error_body(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        format!("router returned status {}: {}", status.as_u16(), body.trim())
    }
}

#[async_trait]
impl NetworkConditionController for RouterController {
    fn name(&self) -> &str {
        "router"
    }

    async fn apply(&self, condition: &NetworkCondition) -> Result<()> {
        let request = ConfigRequest {
            delay: condition.delay_ms,
            loss: condition.loss_pct,
            bandwidth: condition.bandwidth_mbps,
        };

        self.logger
            .info("Setting network conditions")
            .field("delay_ms", condition.delay_ms)
            .field("loss_pct", condition.loss_pct)
            .field("bandwidth_mbps", condition.bandwidth_mbps)
            .log()
            .await;

        let response = self
            .client
            .post(self.endpoint("network/config")?)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::condition_apply(format!("Failed to set network config: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::condition_apply(Self::error_body(response).await));
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.logger.info("Clearing network conditions").log().await;

        let response = self
            .client
            .post(self.endpoint("network/clear")?)
            .send()
            .await
            .map_err(|e| AppError::controller(format!("Failed to clear network config: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::controller(Self::error_body(response).await));
        }

        Ok(())
    }

    async fn status(&self) -> Result<NetworkCondition> {
        let response = self
            .client
            .get(self.endpoint("network/status")?)
            .send()
            .await
            .map_err(|e| AppError::controller(format!("Failed to get network status: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::controller(Self::error_body(response).await));
        }

        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::controller(format!("Invalid network status response: {}", e)))?;

        Ok(NetworkCondition {
            delay_ms: status.delay,
            loss_pct: status.loss,
            bandwidth_mbps: None,
        })
    }
}

/// Records conditions without shaping any traffic
///
/// Used when no router is configured, and as a test double.
#[derive(Default)]
pub struct InMemoryController {
    active: Mutex<Option<NetworkCondition>>,
    applied: Mutex<Vec<NetworkCondition>>,
    clears: Mutex<usize>,
}

impl InMemoryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn active(&self) -> Option<NetworkCondition> {
        *self.active.lock().await
    }

    /// Every condition applied so far, in order
    pub async fn applied(&self) -> Vec<NetworkCondition> {
        self.applied.lock().await.clone()
    }

    pub async fn clear_count(&self) -> usize {
        *self.clears.lock().await
    }
}

#[async_trait]
impl NetworkConditionController for InMemoryController {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn apply(&self, condition: &NetworkCondition) -> Result<()> {
        *self.active.lock().await = Some(*condition);
        self.applied.lock().await.push(*condition);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.active.lock().await = None;
        *self.clears.lock().await += 1;
        Ok(())
    }

    async fn status(&self) -> Result<NetworkCondition> {
        Ok(self.active.lock().await.unwrap_or(NetworkCondition {
            delay_ms: 0,
            loss_pct: 0,
            bandwidth_mbps: None,
        }))
    }
}
