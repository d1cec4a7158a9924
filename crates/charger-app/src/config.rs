use std::env;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use http_client::ClientConfig;
use poller_actor::ActorConfig;
use types::{ApiVersion, DeviceIdentity};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_RESPAWN_DELAY_MS: u64 = 1_000;

#[derive(Clone, Debug)]
pub struct ChargerConfig {
    pub devices: Vec<DeviceIdentity>,
    /// Template for per-device HTTP clients; the host field is filled in
    /// from each device entry.
    pub http: ClientConfig,
    pub poller: ActorConfig,
    pub channel_capacity: usize,
    pub respawn_delay_ms: u64,
}

impl ChargerConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    pub fn load_with_path(config_path: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(file_config) = load_file_config(config_path.as_deref())? {
            apply_file_config(&mut config, file_config)?;
        }

        apply_env_overrides(&mut config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_ms == 0 {
            anyhow::bail!("http.timeout_ms must be >= 1");
        }
        if self.poller.poll_interval.as_millis() == 0 {
            anyhow::bail!("poller.poll_interval_ms must be >= 1");
        }
        if self.poller.request_timeout.as_millis() == 0 {
            anyhow::bail!("poller.request_timeout_ms must be >= 1");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be >= 1");
        }
        if self.respawn_delay_ms == 0 {
            anyhow::bail!("respawn_delay_ms must be >= 1");
        }
        for device in &self.devices {
            device
                .ip
                .parse::<Ipv4Addr>()
                .map_err(|_| anyhow::anyhow!("device ip '{}' must be a valid IPv4 address", device.ip))?;
        }

        Ok(())
    }
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            http: ClientConfig::default(),
            poller: ActorConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            respawn_delay_ms: DEFAULT_RESPAWN_DELAY_MS,
        }
    }
}

fn apply_env_overrides(config: &mut ChargerConfig) {
    if let Ok(value) = env::var("GOE_DEVICES") {
        config.devices = parse_devices(&value);
    }

    if let Some(timeout_ms) = parse_env_u64("GOE_HTTP_TIMEOUT_MS") {
        config.http.timeout_ms = timeout_ms;
    }

    if let Some(interval_ms) = parse_env_u64("GOE_POLL_INTERVAL_MS") {
        config.poller.poll_interval = Duration::from_millis(interval_ms);
    }

    if let Some(timeout_ms) = parse_env_u64("GOE_REQUEST_TIMEOUT_MS") {
        config.poller.request_timeout = Duration::from_millis(timeout_ms);
    }

    if let Some(jitter_ms) = parse_env_u64("GOE_JITTER_MS") {
        config.poller.jitter_ms = jitter_ms;
    }

    config.channel_capacity =
        parse_env_usize("GOE_CHANNEL_CAPACITY").unwrap_or(config.channel_capacity);
    config.respawn_delay_ms =
        parse_env_u64("GOE_RESPAWN_DELAY_MS").unwrap_or(config.respawn_delay_ms);
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    devices: Option<Vec<FileDeviceConfig>>,
    http: Option<FileHttpConfig>,
    poller: Option<FilePollerConfig>,
    channel_capacity: Option<usize>,
    respawn_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FileDeviceConfig {
    ip: String,
    api_version: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct FileHttpConfig {
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FilePollerConfig {
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    jitter_ms: Option<u64>,
}

fn load_file_config(config_path: Option<&str>) -> Result<Option<FileConfig>> {
    let path = match config_path {
        Some(path) => path.to_string(),
        None => match env::var("GOE_CONFIG") {
            Ok(value) => value,
            Err(_) => return Ok(None),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("read config file {path}"))?;
    let ext = Path::new(&path).extension().and_then(|value| value.to_str());

    let config = match ext {
        Some("json") => serde_json::from_str(&content).context("parse json config")?,
        _ => toml::from_str(&content).context("parse toml config")?,
    };

    Ok(Some(config))
}

fn apply_file_config(config: &mut ChargerConfig, file: FileConfig) -> Result<()> {
    if let Some(devices) = file.devices {
        config.devices = devices
            .into_iter()
            .map(|device| {
                let api_version = match device.api_version {
                    None | Some(1) => ApiVersion::V1,
                    Some(2) => ApiVersion::V2,
                    Some(other) => anyhow::bail!(
                        "device {} has unsupported api_version {other}",
                        device.ip
                    ),
                };
                Ok(DeviceIdentity {
                    ip: device.ip,
                    api_version,
                })
            })
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(http) = file.http {
        if let Some(timeout_ms) = http.timeout_ms {
            config.http.timeout_ms = timeout_ms;
        }
    }

    if let Some(poller) = file.poller {
        if let Some(interval_ms) = poller.poll_interval_ms {
            config.poller.poll_interval = Duration::from_millis(interval_ms);
        }
        if let Some(timeout_ms) = poller.request_timeout_ms {
            config.poller.request_timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(jitter_ms) = poller.jitter_ms {
            config.poller.jitter_ms = jitter_ms;
        }
    }

    if let Some(capacity) = file.channel_capacity {
        config.channel_capacity = capacity;
    }
    if let Some(delay) = file.respawn_delay_ms {
        config.respawn_delay_ms = delay;
    }

    Ok(())
}

fn parse_env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn parse_devices(value: &str) -> Vec<DeviceIdentity> {
    value
        .split(',')
        .filter_map(|entry| {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                return None;
            }
            let (ip, api_version) = match trimmed.split_once(':') {
                Some((ip, version)) => (
                    ip,
                    ApiVersion::from_str(version).unwrap_or_default(),
                ),
                None => (trimmed, ApiVersion::default()),
            };
            Some(DeviceIdentity {
                ip: ip.to_string(),
                api_version,
            })
        })
        .collect()
}
