#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use goe_codec::{decode, encode, DeviceStatus};
use http_client::Transport;
use types::{Channel, ChannelValue, Command, DeviceIdentity};

/// Device-level connectivity as reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Connectivity {
    Online,
    CommunicationError { message: Option<String> },
}

/// Narrow host interface: receives decoded channel values and connectivity
/// transitions. The mapping layer carries no other coupling to a host
/// runtime.
pub trait ChannelSink: Send + Sync {
    fn channel_updated(&self, device: &DeviceIdentity, channel: Channel, value: ChannelValue);
    fn connectivity_changed(&self, device: &DeviceIdentity, state: Connectivity);
}

/// Sink that logs every update; stands in when no host runtime is attached.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl ChannelSink for LoggingSink {
    fn channel_updated(&self, device: &DeviceIdentity, channel: Channel, value: ChannelValue) {
        info!(ip = %device.ip, channel = %channel, value = ?value, "channel updated");
    }

    fn connectivity_changed(&self, device: &DeviceIdentity, state: Connectivity) {
        info!(ip = %device.ip, state = ?state, "connectivity changed");
    }
}

/// An inbound (channel, command) pair from the host.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub channel: Channel,
    pub command: Command,
}

/// Glue between one charger transport and the host: applies polled status
/// payloads to the sink and turns host commands into device writes.
pub struct ChargerBridge {
    device: DeviceIdentity,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ChannelSink>,
}

impl ChargerBridge {
    pub fn new(
        device: DeviceIdentity,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ChannelSink>,
    ) -> Self {
        Self {
            device,
            transport,
            sink,
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// One poll: read the device status and push the outcome to the host.
    pub async fn poll_once(&self) {
        match self.transport.read_status().await {
            Ok(status) => self.apply_status(Some(&status), None),
            Err(err) => {
                warn!(ip = %self.device.ip, error = %err, "status poll failed");
                self.apply_status(None, Some(&err.to_string()));
            }
        }
    }

    /// Push a status (or its absence) to the host. A missing status marks
    /// the device offline and resets every channel to undefined; a present
    /// one marks it online and recomputes every channel.
    pub fn apply_status(&self, status: Option<&DeviceStatus>, message: Option<&str>) {
        match status {
            None => {
                self.sink.connectivity_changed(
                    &self.device,
                    Connectivity::CommunicationError {
                        message: message.map(str::to_string),
                    },
                );
                for channel in Channel::ALL {
                    self.sink
                        .channel_updated(&self.device, *channel, ChannelValue::Undefined);
                }
            }
            Some(status) => {
                self.sink
                    .connectivity_changed(&self.device, Connectivity::Online);
                for channel in Channel::ALL {
                    self.sink
                        .channel_updated(&self.device, *channel, decode(*channel, status));
                }
            }
        }
    }

    /// Apply one inbound command.
    ///
    /// A refresh is a silent no-op; the poll loop refreshes every channel
    /// anyway. A command the device cannot express suppresses the write and
    /// leaves connectivity untouched. Only a failed transport write flips
    /// the device to a communication error.
    pub async fn handle_command(&self, channel: Channel, command: Command) {
        if matches!(command, Command::Refresh) {
            return;
        }

        match encode(channel, &command) {
            Some(request) => {
                if let Err(err) = self.transport.send_write(&request).await {
                    warn!(
                        ip = %self.device.ip,
                        key = request.key,
                        value = %request.value,
                        error = %err,
                        "write failed"
                    );
                    self.sink.connectivity_changed(
                        &self.device,
                        Connectivity::CommunicationError {
                            message: Some(err.to_string()),
                        },
                    );
                }
            }
            None => {
                warn!(
                    ip = %self.device.ip,
                    channel = %channel,
                    command = ?command,
                    "no device write for command"
                );
            }
        }
    }
}

/// Drains inbound commands until the sender side closes or shutdown flips.
pub async fn command_task(
    bridge: Arc<ChargerBridge>,
    mut commands: mpsc::Receiver<CommandRequest>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe_request = commands.recv() => {
                match maybe_request {
                    Some(request) => {
                        bridge.handle_command(request.channel, request.command).await;
                    }
                    None => break,
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!(ip = %bridge.device().ip, "command task shutdown requested");
                    break;
                }
            }
        }
    }
}
