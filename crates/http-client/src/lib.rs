#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, trace};

use goe_codec::{CodecError, DeviceStatus};
use types::{ApiVersion, WriteRequest};

/// Configuration options for talking to one charger over HTTP.
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub api_version: ApiVersion,
    /// Per-request timeout in milliseconds; applies to reads and writes.
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            api_version: ApiVersion::V1,
            timeout_ms: 5_000,
        }
    }
}

/// Transport-level failures. The bridge reports every variant identically
/// as a device communication error; the distinction only feeds logging.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected http status {code}")]
    UnexpectedStatus { code: u16 },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// The device boundary: one status read, one parameter write.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn read_status(&self) -> Result<DeviceStatus, ClientError>;
    async fn send_write(&self, request: &WriteRequest) -> Result<(), ClientError>;
}

#[derive(Debug, Clone)]
pub struct ChargerClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl ChargerClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn read_url(&self) -> String {
        format!("http://{}/status", self.config.host)
    }

    pub fn write_url(&self, request: &WriteRequest) -> String {
        format!(
            "http://{}/mqtt?payload={}={}",
            self.config.host, request.key, request.value
        )
    }
}

#[async_trait]
impl Transport for ChargerClient {
    async fn read_status(&self) -> Result<DeviceStatus, ClientError> {
        let url = self.read_url();
        trace!(url = %url, "GET status");

        let response = self.http.get(&url).send().await?;
        let code = response.status();
        if !code.is_success() {
            return Err(ClientError::UnexpectedStatus {
                code: code.as_u16(),
            });
        }

        let body = response.text().await?;
        trace!(host = %self.config.host, body = %body, "GET response");

        let status = DeviceStatus::parse(self.config.api_version, &body)?;
        debug!(host = %self.config.host, "status read ok");
        Ok(status)
    }

    async fn send_write(&self, request: &WriteRequest) -> Result<(), ClientError> {
        let url = self.write_url(request);
        trace!(url = %url, "POST write");

        let response = self.http.post(&url).send().await?;
        let code = response.status().as_u16();
        // the firmware acknowledges writes with 200 or 204
        if code != 200 && code != 204 {
            return Err(ClientError::UnexpectedStatus { code });
        }

        debug!(
            host = %self.config.host,
            key = request.key,
            value = %request.value,
            "write ok"
        );
        Ok(())
    }
}
