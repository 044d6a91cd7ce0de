// MIT License - Copyright (c) 2026 Peter Wright
// envisalink-bridge daemon

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use envisalink_bridge::{AlarmBridge, BridgeConfig, BridgeEvent};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "envisalink-bridge")]
#[command(about = "Bridge and proxy for an Envisalink alarm panel interface")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    #[serde(default)]
    proxy: ProxyToml,
    #[serde(default)]
    alarm: AlarmToml,
    #[serde(default, deserialize_with = "deserialize_label_map")]
    zone_names: HashMap<u16, String>,
    #[serde(default, deserialize_with = "deserialize_label_map")]
    user_names: HashMap<u16, String>,
}

// TOML keys are strings; label tables use the numeric id as the key.
fn deserialize_label_map<'de, D>(deserializer: D) -> Result<HashMap<u16, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u16>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid device ID: {k}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    host: String,
    #[serde(default = "default_panel_port")]
    port: u16,
    #[serde(default = "default_password")]
    password: String,
    #[serde(default = "default_reconnect_delay")]
    reconnect_delay_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ProxyToml {
    #[serde(default)]
    enable: bool,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    /// Password proxy clients log in with; panel password when omitted
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlarmToml {
    #[serde(default = "default_max_zones")]
    max_zones: u16,
    #[serde(default = "default_max_partitions")]
    max_partitions: u16,
    #[serde(default = "default_true")]
    atomic_events: bool,
    #[serde(default = "default_true")]
    suppress_initial_update: bool,
    #[serde(default)]
    verify_checksums: bool,
}

impl Default for AlarmToml {
    fn default() -> Self {
        Self {
            max_zones: default_max_zones(),
            max_partitions: default_max_partitions(),
            atomic_events: true,
            suppress_initial_update: true,
            verify_checksums: false,
        }
    }
}

fn default_panel_port() -> u16 {
    4025
}
fn default_password() -> String {
    "user".to_string()
}
fn default_reconnect_delay() -> u64 {
    10000
}
fn default_max_zones() -> u16 {
    64
}
fn default_max_partitions() -> u16 {
    8
}
fn default_true() -> bool {
    true
}

fn load_config(path: &str) -> Result<Config> {
    let text = std::fs::read_to_string(path).context("Failed to read config file")?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn build_bridge_config(config: &Config) -> BridgeConfig {
    let mut builder = BridgeConfig::builder()
        .panel_host(&config.panel.host)
        .panel_port(config.panel.port)
        .panel_password(&config.panel.password)
        .proxy_enable(config.proxy.enable)
        .max_zones(config.alarm.max_zones)
        .max_partitions(config.alarm.max_partitions)
        .atomic_events(config.alarm.atomic_events)
        .suppress_initial_update(config.alarm.suppress_initial_update)
        .verify_checksums(config.alarm.verify_checksums)
        .zone_labels(config.zone_names.clone())
        .user_labels(config.user_names.clone());
    if let Some(host) = &config.proxy.host {
        builder = builder.server_host(host);
    }
    if let Some(port) = config.proxy.port {
        builder = builder.server_port(port);
    }
    if let Some(password) = &config.proxy.password {
        builder = builder.server_password(password);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Event logging
// ---------------------------------------------------------------------------

fn log_event(event: BridgeEvent) {
    match event {
        BridgeEvent::ZoneUpdate(evt) => {
            info!("Zone {} ({}): {}", evt.zone, evt.zone_label, evt.status);
        }
        BridgeEvent::PartitionUpdate(evt) => match (&evt.arm_mode, evt.user_id) {
            (Some(mode), _) => {
                info!("Partition {}: {} ({})", evt.partition, evt.status, mode.as_str());
            }
            (None, Some(user)) => {
                let who = evt.user_label.unwrap_or_else(|| format!("user {user}"));
                info!("Partition {}: {} by {}", evt.partition, evt.status, who);
            }
            (None, None) => {
                info!("Partition {}: {}", evt.partition, evt.status);
            }
        },
        BridgeEvent::PartitionUserUpdate(user, state) => {
            info!("User {user}: {}", state.status);
        }
        BridgeEvent::SystemUpdate(evt) => match evt.trouble {
            Some(trouble) => info!("System: {} ({:?})", evt.status, trouble),
            None => info!("System: {}", evt.status),
        },
        BridgeEvent::CodeRequired(_) => {
            warn!("Panel is requesting an access code (send 200 + code)");
        }
        BridgeEvent::Data(snapshot) => {
            info!(
                "State: {} zones, {} partitions, {} users",
                snapshot.zones.len(),
                snapshot.partitions.len(),
                snapshot.users.len()
            );
        }
        BridgeEvent::ConnectionEnded => {}
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

enum Next {
    Stop,
    Reload,
    Reconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=envisalink_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        let reconnect_delay = Duration::from_millis(config.panel.reconnect_delay_ms);
        let bridge = match AlarmBridge::connect(build_bridge_config(&config)).await {
            Ok(bridge) => bridge,
            Err(e) => {
                error!("Failed to connect to panel: {e}. Retrying in {reconnect_delay:?}");
                tokio::select! {
                    _ = sleep(reconnect_delay) => continue,
                    _ = tokio::signal::ctrl_c() => break,
                    _ = sigterm.recv() => break,
                }
            }
        };
        if let Some(addr) = bridge.proxy_addr() {
            info!("Proxy clients can connect at {addr}");
        }

        let mut events = bridge.subscribe();
        info!("Bridge running. Send SIGHUP to reload config, SIGINT/SIGTERM to stop.");

        let next = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down...");
                    break Next::Stop;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    break Next::Stop;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading config and reconnecting...");
                    break Next::Reload;
                }
                event = events.recv() => match event {
                    Ok(BridgeEvent::ConnectionEnded) => {
                        warn!("Panel connection ended, will reconnect");
                        break Next::Reconnect;
                    }
                    Ok(event) => log_event(event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break Next::Reconnect;
                    }
                },
            }
        };

        bridge.disconnect().await;

        match next {
            Next::Stop => break,
            Next::Reload => {
                // Keep the previous config when the new one fails to parse
                match load_config(&cli.config) {
                    Ok(new_config) => {
                        config = new_config;
                        info!("Config reloaded successfully");
                    }
                    Err(e) => warn!("Failed to reload config, keeping previous: {e}"),
                }
            }
            Next::Reconnect => sleep(reconnect_delay).await,
        }
    }

    info!("Shutdown complete");
    Ok(())
}
