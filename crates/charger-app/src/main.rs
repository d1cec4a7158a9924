use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{info, warn};

use charger_app::command::parse_assignment;
use charger_app::ChargerConfig;
use host_bridge::{command_task, ChannelSink, ChargerBridge, CommandRequest, LoggingSink};
use http_client::{ChargerClient, Transport};
use poller_actor::{ActorConfig, PollerActor};
use types::DeviceIdentity;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = CliArgs::parse(env::args().skip(1));
    let config = ChargerConfig::load_with_path(args.config_path.clone())
        .context("load config failed")?;
    config.validate().context("config validation failed")?;

    if let Some(assignment) = args.set.as_deref() {
        return run_one_shot(&config, args.device.as_deref(), assignment).await;
    }

    run_pollers(config).await
}

async fn run_pollers(config: ChargerConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if config.devices.is_empty() {
        warn!("no devices configured");
    }

    let sink: Arc<dyn ChannelSink> = Arc::new(LoggingSink);
    let mut specs = HashMap::new();
    let mut command_senders = HashMap::new();
    let mut command_handles = Vec::new();

    for device in &config.devices {
        let client = build_client(&config, device, true)?;
        let transport: Arc<dyn Transport> = Arc::new(client);
        let bridge = Arc::new(ChargerBridge::new(device.clone(), transport, sink.clone()));

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        command_handles.push(tokio::spawn(command_task(
            bridge.clone(),
            rx,
            shutdown_rx.clone(),
        )));
        command_senders.insert(device.ip.clone(), tx);

        let spec = PollerSpec {
            bridge,
            poller_config: config.poller.clone(),
            shutdown: shutdown_rx.clone(),
        };
        specs.insert(device.ip.clone(), spec);
    }

    let stdin_handle = tokio::spawn(stdin_command_task(command_senders, shutdown_rx.clone()));

    let mut join_set = JoinSet::new();
    for spec in specs.values() {
        spawn_poller(spec.clone(), &mut join_set, Duration::from_millis(0));
    }

    notify_ready();
    let watchdog_handle = start_watchdog(shutdown_rx.clone());

    let shutdown_signal = tokio::signal::ctrl_c();
    tokio::pin!(shutdown_signal);
    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                break;
            }
            maybe_result = join_set.join_next() => {
                match maybe_result {
                    Some(Ok(ip)) => {
                        info!(device = %ip, "poller exited");
                        if let Some(spec) = specs.get(&ip) {
                            spawn_poller(
                                spec.clone(),
                                &mut join_set,
                                Duration::from_millis(config.respawn_delay_ms),
                            );
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "poller task failed");
                    }
                    None => break,
                }
            }
        }
    }

    let _ = shutdown_tx.send(true);
    join_set.abort_all();
    while let Some(result) = join_set.join_next().await {
        if let Err(err) = result {
            if !err.is_cancelled() {
                warn!(error = %err, "poller task join failed");
            }
        }
    }

    stdin_handle.abort();
    for handle in command_handles {
        let _ = handle.await;
    }
    if let Some(handle) = watchdog_handle {
        let _ = handle.await;
    }
    Ok(())
}

/// Encode and send a single `--set <channel>=<value>` write, then exit.
async fn run_one_shot(
    config: &ChargerConfig,
    device_ip: Option<&str>,
    assignment: &str,
) -> Result<()> {
    let device = select_device(config, device_ip)?;
    let (channel, command) = parse_assignment(assignment)?;

    let write = goe_codec::encode(channel, &command)
        .with_context(|| format!("channel {channel} cannot encode '{assignment}'"))?;

    let client = build_client(config, device, false)?;
    client.send_write(&write).await.context("device write failed")?;
    info!(ip = %device.ip, key = write.key, value = %write.value, "write acknowledged");
    Ok(())
}

fn select_device<'a>(
    config: &'a ChargerConfig,
    ip: Option<&str>,
) -> Result<&'a DeviceIdentity> {
    match ip {
        Some(ip) => config
            .devices
            .iter()
            .find(|device| device.ip == ip)
            .with_context(|| format!("device {ip} is not configured")),
        None if config.devices.len() == 1 => Ok(&config.devices[0]),
        None => anyhow::bail!("--device is required when multiple devices are configured"),
    }
}

fn build_client(
    config: &ChargerConfig,
    device: &DeviceIdentity,
    apply_poller_timeout: bool,
) -> Result<ChargerClient> {
    let mut client_config = config.http.clone();
    client_config.host = device.ip.clone();
    client_config.api_version = device.api_version;
    if apply_poller_timeout {
        client_config.timeout_ms = config.poller.request_timeout.as_millis() as u64;
    }
    ChargerClient::new(client_config)
        .with_context(|| format!("http client init failed for {}", device.ip))
}

#[derive(Clone)]
struct PollerSpec {
    bridge: Arc<ChargerBridge>,
    poller_config: ActorConfig,
    shutdown: watch::Receiver<bool>,
}

fn spawn_poller(spec: PollerSpec, join_set: &mut JoinSet<String>, delay: Duration) {
    let ip = spec.bridge.device().ip.clone();
    join_set.spawn(async move {
        if delay > Duration::from_millis(0) {
            sleep(delay).await;
        }
        let actor = PollerActor::new(spec.bridge, spec.shutdown, spec.poller_config);
        actor.run().await;
        ip
    });
}

/// Reads command lines from stdin while polling runs. A line is either
/// `<ip> <channel>=<value>` or just `<channel>=<value>` when a single
/// device is configured.
async fn stdin_command_task(
    senders: HashMap<String, mpsc::Sender<CommandRequest>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            maybe_line = lines.next_line() => {
                match maybe_line {
                    Ok(Some(line)) => dispatch_command_line(&senders, &line).await,
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "stdin read failed");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

async fn dispatch_command_line(
    senders: &HashMap<String, mpsc::Sender<CommandRequest>>,
    line: &str,
) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let (sender, assignment) = match line.split_once(' ') {
        Some((ip, rest)) if senders.contains_key(ip) => (senders.get(ip), rest.trim()),
        _ if senders.len() == 1 => (senders.values().next(), line),
        _ => {
            warn!(line = %line, "command does not name a configured device");
            return;
        }
    };
    let Some(sender) = sender else {
        return;
    };

    match parse_assignment(assignment) {
        Ok((channel, command)) => {
            if let Err(err) = sender.send(CommandRequest { channel, command }).await {
                warn!(error = %err, "command channel send failed");
            }
        }
        Err(err) => {
            warn!(line = %line, error = %err, "could not parse command");
        }
    }
}

#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<String>,
    device: Option<String>,
    set: Option<String>,
}

impl CliArgs {
    fn parse(mut args: impl Iterator<Item = String>) -> Self {
        let mut parsed = CliArgs::default();

        while let Some(arg) = args.next() {
            if arg == "--config" {
                parsed.config_path = args.next();
            } else if let Some(path) = arg.strip_prefix("--config=") {
                parsed.config_path = Some(path.to_string());
            } else if arg == "--device" {
                parsed.device = args.next();
            } else if let Some(ip) = arg.strip_prefix("--device=") {
                parsed.device = Some(ip.to_string());
            } else if arg == "--set" {
                parsed.set = args.next();
            } else if let Some(assignment) = arg.strip_prefix("--set=") {
                parsed.set = Some(assignment.to_string());
            }
        }

        parsed
    }
}

#[cfg(target_os = "linux")]
fn notify_ready() {
    if let Err(err) = sd_notify::notify(true, &[sd_notify::NotifyState::Ready]) {
        warn!(error = %err, "systemd ready notify failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn notify_ready() {}

#[cfg(target_os = "linux")]
fn start_watchdog(
    mut shutdown: watch::Receiver<bool>,
) -> Option<tokio::task::JoinHandle<()>> {
    let interval = watchdog_interval()?;
    Some(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sleep(interval) => {
                    if let Err(err) = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]) {
                        warn!(error = %err, "systemd watchdog notify failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }))
}

#[cfg(not(target_os = "linux"))]
fn start_watchdog(_shutdown: watch::Receiver<bool>) -> Option<tokio::task::JoinHandle<()>> {
    None
}

#[cfg(target_os = "linux")]
fn watchdog_interval() -> Option<Duration> {
    let watchdog_usec = env::var("WATCHDOG_USEC").ok()?.parse::<u64>().ok()?;
    if let Some(pid) = env::var("WATCHDOG_PID")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
    {
        if pid != std::process::id() {
            return None;
        }
    }

    let interval = watchdog_usec.saturating_div(2).max(100_000);
    Some(Duration::from_micros(interval))
}
