// MIT License - Copyright (c) 2026 Peter Wright
// Upstream session: panel-side TCP connection, frame dispatch, login handling

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info, warn};

use crate::catalogue::{Catalogue, PanelAction};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::event::{BridgeEvent, CodeRequiredEvent, EventSender};
use crate::protocol::{encode_frame, split_frames, CommandFrame};
use crate::state::AlarmStateStore;
use crate::transport::proxy::ProxyServer;

/// Terminal status of a tracked command, resolved by the panel's
/// acknowledge (500) or error (501/502) frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Command acknowledged; carries the echoed 3-character code.
    Completed { echoed: String },
    /// Command rejected; carries the error detail payload (empty for a
    /// checksum rejection, a 3-digit error code for a system error).
    Failed { detail: String },
}

/// One pending tracked command at a time. A newer tracked send silently
/// replaces an unresolved older one, whose receiver then sees a closed
/// channel.
type PendingSlot = Arc<Mutex<Option<oneshot::Sender<CommandOutcome>>>>;

/// Cloneable write handle to the panel socket.
///
/// Frames are checksummed and CRLF-terminated on the way out; callers pass
/// `code + payload` only.
#[derive(Clone)]
pub struct PanelLink {
    writer: Arc<Mutex<tokio::net::tcp::OwnedWriteHalf>>,
}

impl PanelLink {
    pub async fn send(&self, payload: &str) -> Result<()> {
        debug!("-> panel: {payload}");
        let mut writer = self.writer.lock().await;
        writer.write_all(encode_frame(payload).as_bytes()).await?;
        Ok(())
    }
}

/// The authenticated session with the panel interface.
///
/// Owns the reader task; dropping the session aborts it.
pub struct UpstreamSession {
    link: PanelLink,
    pending: PendingSlot,
    reader_handle: Option<tokio::task::JoinHandle<()>>,
}

struct ReaderContext {
    link: PanelLink,
    pending: PendingSlot,
    catalogue: Arc<dyn Catalogue>,
    store: Arc<Mutex<AlarmStateStore>>,
    event_tx: EventSender,
    proxy: Option<Arc<ProxyServer>>,
    password: String,
    verify_checksums: bool,
}

impl UpstreamSession {
    /// Connect to the panel and start dispatching inbound frames.
    ///
    /// Login is driven by the panel: it opens with a password-request frame
    /// (505, status 3) and the reader answers it. Nothing is sent before
    /// that challenge arrives.
    pub async fn connect(
        config: &BridgeConfig,
        catalogue: Arc<dyn Catalogue>,
        store: Arc<Mutex<AlarmStateStore>>,
        event_tx: EventSender,
        proxy: Option<Arc<ProxyServer>>,
    ) -> Result<Self> {
        info!(
            "Connecting to panel at {}:{}",
            config.panel_host, config.panel_port
        );

        let stream = TcpStream::connect((config.panel_host.as_str(), config.panel_port))
            .await
            .map_err(|e| BridgeError::ConnectFailed {
                host: config.panel_host.clone(),
                port: config.panel_port,
                source: e,
            })?;

        let (reader, writer) = stream.into_split();
        let link = PanelLink {
            writer: Arc::new(Mutex::new(writer)),
        };
        let pending: PendingSlot = Arc::new(Mutex::new(None));

        let ctx = ReaderContext {
            link: link.clone(),
            pending: pending.clone(),
            catalogue,
            store,
            event_tx,
            proxy,
            password: config.panel_password.clone(),
            verify_checksums: config.verify_checksums,
        };
        let reader_handle = spawn_reader(reader, ctx);

        Ok(Self {
            link,
            pending,
            reader_handle: Some(reader_handle),
        })
    }

    /// A cloneable write handle, for forwarding proxy client traffic.
    pub fn link(&self) -> PanelLink {
        self.link.clone()
    }

    /// Fire-and-forget send of `code + payload`.
    ///
    /// Clears any pending tracked command: the panel's next acknowledge
    /// belongs to this send, so a stale receiver must not claim it. The
    /// displaced receiver observes a closed channel.
    pub async fn send(&self, payload: &str) -> Result<()> {
        {
            let mut pending = self.pending.lock().await;
            if pending.take().is_some() {
                debug!("Untracked send displaces the pending tracked command");
            }
        }
        self.link.send(payload).await
    }

    /// Send a command and obtain a receiver for its acknowledge/error.
    ///
    /// Only one command is tracked at a time; a second tracked send before
    /// the first resolves takes over the slot and the first receiver gets a
    /// closed-channel error.
    pub async fn send_tracked(&self, payload: &str) -> Result<oneshot::Receiver<CommandOutcome>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.is_some() {
                debug!("Replacing unresolved tracked command");
            }
            *pending = Some(tx);
        }
        self.link.send(payload).await?;
        Ok(rx)
    }
}

impl Drop for UpstreamSession {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
    }
}

fn spawn_reader(
    mut reader: tokio::net::tcp::OwnedReadHalf,
    ctx: ReaderContext,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    info!("Panel closed the connection");
                    if let Some(proxy) = &ctx.proxy {
                        proxy.shutdown().await;
                    }
                    let _ = ctx.event_tx.send(BridgeEvent::ConnectionEnded);
                    break;
                }
                Ok(n) => {
                    // Each chunk is decoded independently; the panel
                    // terminates every frame it sends, so tokens never
                    // straddle reads in practice.
                    let text = String::from_utf8_lossy(&buf[..n]);
                    for token in split_frames(&text) {
                        process_frame(&ctx, token).await;
                    }
                }
                Err(e) => {
                    error!("Panel read error: {e}");
                    if let Some(proxy) = &ctx.proxy {
                        proxy.shutdown().await;
                    }
                    let _ = ctx.event_tx.send(BridgeEvent::ConnectionEnded);
                    break;
                }
            }
        }
    })
}

async fn process_frame(ctx: &ReaderContext, token: &str) {
    let Some(frame) = CommandFrame::parse(token) else {
        debug!("Discarding malformed token: {token:?}");
        return;
    };
    if ctx.verify_checksums && !frame.checksum_ok() {
        warn!("Dropping frame with bad checksum: {token}");
        return;
    }

    let Some(meta) = ctx.catalogue.panel_meta(frame.code) else {
        debug!("Unrecognized panel command: {token}");
        return;
    };
    debug!("<- panel: {} ({})", token, meta.name);

    if meta.action == PanelAction::CodeRequired {
        let _ = ctx.event_tx.send(BridgeEvent::CodeRequired(CodeRequiredEvent {
            status: meta.send.to_string(),
        }));
    } else if meta.bytes == 0 {
        // Bare notification frames carry nothing to dispatch on
        warn!("Empty response: {}", meta.pre);
    } else {
        match meta.action {
            PanelAction::UpdateZone => {
                ctx.store.lock().await.update_zone(meta, frame.raw);
            }
            PanelAction::UpdatePartition => {
                ctx.store.lock().await.update_partition(meta, frame.raw);
            }
            PanelAction::UpdatePartitionUser => {
                ctx.store.lock().await.update_partition_user(meta, frame.raw);
            }
            PanelAction::UpdateSystem => {
                ctx.store.lock().await.update_system(meta, frame.raw);
            }
            PanelAction::LoginResponse => handle_login(ctx, frame.payload).await,
            PanelAction::CommandCompleted => {
                resolve_pending(
                    ctx,
                    CommandOutcome::Completed {
                        echoed: frame.payload.to_string(),
                    },
                )
                .await;
            }
            PanelAction::CommandError => {
                warn!("Panel reported command error: {token}");
                resolve_pending(
                    ctx,
                    CommandOutcome::Failed {
                        detail: frame.payload.to_string(),
                    },
                )
                .await;
            }
            PanelAction::CodeRequired | PanelAction::None => {
                debug!("{}: {}", meta.pre, frame.payload);
            }
        }
    }

    // Every recognized panel frame is re-broadcast to proxy clients,
    // whatever it is and whoever is listening.
    if let Some(proxy) = &ctx.proxy {
        proxy.broadcast(frame.without_checksum()).await;
    }
}

/// React to a login-interaction frame (505) by its status character.
async fn handle_login(ctx: &ReaderContext, status: &str) {
    match status.as_bytes().first() {
        Some(b'0') => warn!("Panel rejected the session password"),
        Some(b'1') => {
            info!("Panel login successful, requesting status report");
            if let Err(e) = ctx.link.send("001").await {
                error!("Failed to request status report: {e}");
            }
        }
        Some(b'2') => warn!("Panel login timed out"),
        Some(b'3') => {
            debug!("Panel requested password");
            if let Err(e) = ctx.link.send(&format!("005{}", ctx.password)).await {
                error!("Failed to send session password: {e}");
            }
        }
        _ => debug!("Unrecognized login status: {status:?}"),
    }
}

async fn resolve_pending(ctx: &ReaderContext, outcome: CommandOutcome) {
    let mut pending = ctx.pending.lock().await;
    if let Some(tx) = pending.take() {
        let _ = tx.send(outcome);
    }
}
