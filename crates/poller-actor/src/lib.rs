#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use host_bridge::ChargerBridge;

#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub poll_interval: Duration,
    /// Applied to the HTTP client when the app builds it.
    pub request_timeout: Duration,
    pub jitter_ms: u64,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            jitter_ms: 0,
        }
    }
}

/// A lightweight polling task responsible for one charger. Exactly one
/// status read is in flight per device; writes go through the bridge
/// independently.
pub struct PollerActor {
    bridge: Arc<ChargerBridge>,
    shutdown: watch::Receiver<bool>,
    config: ActorConfig,
}

impl PollerActor {
    pub fn new(
        bridge: Arc<ChargerBridge>,
        shutdown: watch::Receiver<bool>,
        config: ActorConfig,
    ) -> Self {
        Self {
            bridge,
            shutdown,
            config,
        }
    }

    pub async fn run(mut self) {
        let ip = self.bridge.device().ip.clone();
        let mut iteration = 0u64;

        loop {
            if *self.shutdown.borrow() {
                info!(ip = %ip, "poller shutdown requested");
                break;
            }

            let cycle_start = Instant::now();
            self.bridge.poll_once().await;

            iteration = iteration.wrapping_add(1);
            let elapsed = cycle_start.elapsed();
            let lag = elapsed.saturating_sub(self.config.poll_interval);
            let delay = jittered_delay(self.config.poll_interval, self.config.jitter_ms, iteration);
            info!(
                ip = %ip,
                elapsed_ms = elapsed.as_millis(),
                lag_ms = lag.as_millis(),
                delay_ms = delay.as_millis(),
                "poll cycle complete"
            );

            tokio::select! {
                _ = sleep(delay) => {},
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!(ip = %ip, "poller shutdown requested");
                        break;
                    }
                }
            }
        }
    }
}

fn jittered_delay(base: Duration, jitter_ms: u64, iteration: u64) -> Duration {
    if jitter_ms == 0 {
        return base;
    }

    let jitter_window = jitter_ms.max(1);
    let seed = unix_ms().wrapping_add(iteration.wrapping_mul(1_664_525));
    let offset = seed % jitter_window;
    base + Duration::from_millis(offset)
}

fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
